//! The catalog manifest: which collections exist and how they are configured.

use std::fs;
use std::io::ErrorKind;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::collection::CollectionConfig;
use crate::error::{Error, Result};
use crate::metadata::Metadata;
use crate::storage::{write_atomic, MANIFEST_FILE};

/// Current manifest format version.
pub const MANIFEST_VERSION: u32 = 1;

/// Contents of `catalog.json`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Manifest {
    pub version: u32,
    /// Collections in creation order.
    pub collections: Vec<ManifestEntry>,
}

/// One collection as recorded in the manifest.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ManifestEntry {
    /// Storage directory name.
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub metadata: Metadata,
    pub config: CollectionConfig,
}

impl Manifest {
    pub fn new() -> Self {
        Self {
            version: MANIFEST_VERSION,
            collections: Vec::new(),
        }
    }

    /// Reads the manifest under `root`; `None` if the catalog is new.
    pub fn load(root: &Path) -> Result<Option<Self>> {
        let path = root.join(MANIFEST_FILE);
        let bytes = match fs::read(&path) {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(e) => {
                return Err(Error::IoError(format!(
                    "failed to read {}: {}",
                    path.display(),
                    e
                )))
            }
        };

        let manifest: Manifest = serde_json::from_slice(&bytes)
            .map_err(|e| Error::CatalogCorrupted(format!("{}: {}", path.display(), e)))?;
        if manifest.version != MANIFEST_VERSION {
            return Err(Error::CatalogCorrupted(format!(
                "{}: unsupported manifest version {}",
                path.display(),
                manifest.version
            )));
        }
        Ok(Some(manifest))
    }

    /// Atomically replaces the manifest under `root`.
    pub fn save(&self, root: &Path) -> Result<()> {
        let bytes = serde_json::to_vec_pretty(self)
            .map_err(|e| Error::IoError(format!("manifest serialization failed: {}", e)))?;
        write_atomic(&root.join(MANIFEST_FILE), &bytes)
    }
}

impl Default for Manifest {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::EmbeddingConfig;
    use crate::distance::DistanceMetric;
    use crate::storage::test_util::temp_dir;

    #[test]
    fn test_manifest_save_and_load() {
        let root = temp_dir("manifest");
        assert!(Manifest::load(&root).unwrap().is_none());

        let mut manifest = Manifest::new();
        manifest.collections.push(ManifestEntry {
            id: "00ff00ff00ff00ff".into(),
            name: "travel_policies".into(),
            metadata: Metadata::new().with_field("description", "Travel rules"),
            config: CollectionConfig::new()
                .with_embedding(EmbeddingConfig::local_with_dimension(16))
                .with_metric(DistanceMetric::Euclidean),
        });
        manifest.save(&root).unwrap();

        let loaded = Manifest::load(&root).unwrap().unwrap();
        assert_eq!(loaded, manifest);

        fs::remove_dir_all(&root).unwrap();
    }

    #[test]
    fn test_manifest_garbage_is_corrupted() {
        let root = temp_dir("manifest");
        fs::write(root.join(MANIFEST_FILE), b"{not json").unwrap();
        assert!(matches!(
            Manifest::load(&root),
            Err(Error::CatalogCorrupted(_))
        ));
        fs::remove_dir_all(&root).unwrap();
    }

    #[test]
    fn test_manifest_unknown_version() {
        let root = temp_dir("manifest");
        fs::write(
            root.join(MANIFEST_FILE),
            br#"{"version":99,"collections":[]}"#,
        )
        .unwrap();
        assert!(matches!(
            Manifest::load(&root),
            Err(Error::CatalogCorrupted(_))
        ));
        fs::remove_dir_all(&root).unwrap();
    }
}
