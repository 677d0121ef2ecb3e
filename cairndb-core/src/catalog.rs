//! The catalog: a registry of named collections, in memory or on disk.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use parking_lot::RwLock;
use tracing::{debug, info, warn};

use crate::codec::EmbeddingConfig;
use crate::collection::{Collection, CollectionConfig};
use crate::distance::DistanceMetric;
use crate::error::{Error, Result};
use crate::metadata::Metadata;
use crate::storage::{self, Manifest, ManifestEntry};

/// WAL entries per collection before the data file is rewritten.
pub const DEFAULT_CHECKPOINT_THRESHOLD: usize = 1000;

const MIN_NAME_LEN: usize = 3;
const MAX_NAME_LEN: usize = 63;

/// Configuration for opening a catalog.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CatalogConfig {
    /// Root directory; `None` keeps everything in memory.
    pub path: Option<PathBuf>,
    /// See [`DEFAULT_CHECKPOINT_THRESHOLD`].
    pub checkpoint_threshold: usize,
}

impl CatalogConfig {
    /// A durable catalog rooted at `path`.
    pub fn new<P: Into<PathBuf>>(path: P) -> Self {
        Self {
            path: Some(path.into()),
            checkpoint_threshold: DEFAULT_CHECKPOINT_THRESHOLD,
        }
    }

    /// A catalog without storage.
    pub fn in_memory() -> Self {
        Self {
            path: None,
            checkpoint_threshold: DEFAULT_CHECKPOINT_THRESHOLD,
        }
    }

    /// Sets the checkpoint threshold (minimum 1). Chainable.
    pub fn with_checkpoint_threshold(mut self, threshold: usize) -> Self {
        self.checkpoint_threshold = threshold.max(1);
        self
    }
}

/// Options for creating a collection.
#[derive(Debug, Clone, Default)]
pub struct CollectionOptions {
    pub metadata: Metadata,
    pub config: CollectionConfig,
}

impl CollectionOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_metadata(mut self, metadata: Metadata) -> Self {
        self.metadata = metadata;
        self
    }

    pub fn with_config(mut self, config: CollectionConfig) -> Self {
        self.config = config;
        self
    }

    pub fn with_embedding(mut self, embedding: EmbeddingConfig) -> Self {
        self.config.embedding = embedding;
        self
    }

    pub fn with_metric(mut self, metric: DistanceMetric) -> Self {
        self.config.metric = metric;
        self
    }
}

/// Changes applied by [`Catalog::modify_collection`].
#[derive(Debug, Clone, Default)]
pub struct CollectionUpdate {
    /// New name.
    pub name: Option<String>,
    /// Replacement metadata.
    pub metadata: Option<Metadata>,
}

impl CollectionUpdate {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn rename(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn with_metadata(mut self, metadata: Metadata) -> Self {
        self.metadata = Some(metadata);
        self
    }
}

/// Summary of one collection, as returned by [`Catalog::list_collections`].
#[derive(Debug, Clone, PartialEq)]
pub struct CollectionInfo {
    pub name: String,
    pub metadata: Metadata,
    pub count: usize,
}

struct CatalogInner {
    root: Option<PathBuf>,
    checkpoint_threshold: usize,
    /// Collections in creation order.
    collections: RwLock<Vec<Collection>>,
}

/// A set of named collections.
///
/// In-memory catalogs vanish with the process. Durable catalogs keep a
/// manifest plus one directory per collection under their root and survive
/// restarts.
///
/// # Example
///
/// ```
/// use cairndb_core::{Catalog, CollectionOptions, CollectionUpdate, Metadata};
///
/// let catalog = Catalog::in_memory();
/// catalog.create_collection("hr_policies", CollectionOptions::default()).unwrap();
/// catalog
///     .create_collection(
///         "travel_policies",
///         CollectionOptions::new()
///             .with_metadata(Metadata::new().with_field("description", "Travel rules")),
///     )
///     .unwrap();
///
/// catalog
///     .modify_collection(
///         "travel_policies",
///         CollectionUpdate::new().rename("legacy_travel_policies"),
///     )
///     .unwrap();
///
/// let names: Vec<String> = catalog.list_collections().into_iter().map(|c| c.name).collect();
/// assert_eq!(names, ["hr_policies", "legacy_travel_policies"]);
/// ```
#[derive(Clone)]
pub struct Catalog {
    inner: Arc<CatalogInner>,
}

impl Catalog {
    /// Creates an empty catalog without storage.
    pub fn in_memory() -> Self {
        Self::from_parts(None, DEFAULT_CHECKPOINT_THRESHOLD, Vec::new())
    }

    /// Opens (or initializes) a durable catalog at `path`.
    pub fn open<P: Into<PathBuf>>(path: P) -> Result<Self> {
        Self::open_with_config(CatalogConfig::new(path))
    }

    /// Opens a catalog with explicit configuration.
    pub fn open_with_config(config: CatalogConfig) -> Result<Self> {
        let threshold = config.checkpoint_threshold.max(1);
        let Some(root) = config.path else {
            return Ok(Self::from_parts(None, threshold, Vec::new()));
        };

        let collections_dir = storage::collections_dir(&root);
        fs::create_dir_all(&collections_dir).map_err(|e| {
            Error::IoError(format!(
                "create dir {} failed: {}",
                collections_dir.display(),
                e
            ))
        })?;

        let manifest = match Manifest::load(&root)? {
            Some(manifest) => manifest,
            None => {
                let manifest = Manifest::new();
                manifest.save(&root)?;
                manifest
            }
        };

        let mut collections: Vec<Collection> = Vec::with_capacity(manifest.collections.len());
        for entry in manifest.collections {
            if collections.iter().any(|c| c.name() == entry.name) {
                return Err(Error::CatalogCorrupted(format!(
                    "collection {} listed twice",
                    entry.name
                )));
            }
            let dir = storage::collection_dir(&root, &entry.id);
            let collection = Collection::open_durable(
                entry.id,
                entry.name,
                entry.metadata,
                entry.config,
                &dir,
                threshold,
            )?;
            collections.push(collection);
        }

        remove_orphans(&collections_dir, &collections)?;

        info!(
            path = %root.display(),
            collections = collections.len(),
            "catalog opened"
        );
        Ok(Self::from_parts(Some(root), threshold, collections))
    }

    fn from_parts(root: Option<PathBuf>, threshold: usize, collections: Vec<Collection>) -> Self {
        Self {
            inner: Arc::new(CatalogInner {
                root,
                checkpoint_threshold: threshold,
                collections: RwLock::new(collections),
            }),
        }
    }

    /// Root directory of a durable catalog.
    pub fn path(&self) -> Option<&Path> {
        self.inner.root.as_deref()
    }

    pub fn is_persistent(&self) -> bool {
        self.inner.root.is_some()
    }

    /// Creates a new collection.
    ///
    /// # Errors
    ///
    /// `CollectionAlreadyExists` if the name is taken,
    /// `InvalidCollectionName` if it breaks the naming rules.
    pub fn create_collection(&self, name: &str, options: CollectionOptions) -> Result<Collection> {
        validate_collection_name(name)?;
        options.config.embedding.validate()?;
        options.metadata.validate()?;

        let mut collections = self.inner.collections.write();
        if find(&collections, name).is_some() {
            return Err(Error::CollectionAlreadyExists(name.to_string()));
        }
        self.create_locked(&mut collections, name, options)
    }

    /// Returns the named collection, creating it if absent.
    ///
    /// For an existing collection `options` is ignored.
    pub fn get_or_create_collection(
        &self,
        name: &str,
        options: CollectionOptions,
    ) -> Result<Collection> {
        validate_collection_name(name)?;

        let mut collections = self.inner.collections.write();
        if let Some(pos) = find(&collections, name) {
            return Ok(collections[pos].clone());
        }
        options.config.embedding.validate()?;
        options.metadata.validate()?;
        self.create_locked(&mut collections, name, options)
    }

    /// Returns the named collection.
    pub fn get_collection(&self, name: &str) -> Result<Collection> {
        let collections = self.inner.collections.read();
        find(&collections, name)
            .map(|pos| collections[pos].clone())
            .ok_or_else(|| Error::CollectionNotFound(name.to_string()))
    }

    /// Name, metadata and record count of every collection, in creation order.
    pub fn list_collections(&self) -> Vec<CollectionInfo> {
        self.inner
            .collections
            .read()
            .iter()
            .map(|c| CollectionInfo {
                name: c.name(),
                metadata: c.metadata(),
                count: c.count().unwrap_or(0),
            })
            .collect()
    }

    /// Handles to every collection, in creation order.
    pub fn collections(&self) -> Vec<Collection> {
        self.inner.collections.read().clone()
    }

    pub fn count_collections(&self) -> usize {
        self.inner.collections.read().len()
    }

    /// Deletes a collection with all its records and files.
    ///
    /// Existing handles fail with `CollectionNotFound` afterwards.
    pub fn delete_collection(&self, name: &str) -> Result<()> {
        let mut collections = self.inner.collections.write();
        let pos = find(&collections, name)
            .ok_or_else(|| Error::CollectionNotFound(name.to_string()))?;

        let collection = collections.remove(pos);
        if let Err(e) = self.save_manifest(&collections) {
            collections.insert(pos, collection);
            return Err(e);
        }
        collection.mark_dropped();

        if let Some(root) = &self.inner.root {
            let dir = storage::collection_dir(root, collection.id());
            if let Err(e) = fs::remove_dir_all(&dir) {
                // Unlisted directories are swept on the next open.
                warn!(path = %dir.display(), error = %e, "failed to remove collection files");
            }
        }

        info!(collection = name, "collection deleted");
        Ok(())
    }

    /// Renames a collection and/or replaces its metadata.
    pub fn modify_collection(&self, name: &str, update: CollectionUpdate) -> Result<()> {
        if let Some(metadata) = &update.metadata {
            metadata.validate()?;
        }

        let mut collections = self.inner.collections.write();
        let pos = find(&collections, name)
            .ok_or_else(|| Error::CollectionNotFound(name.to_string()))?;

        if let Some(new_name) = &update.name {
            validate_collection_name(new_name)?;
            if let Some(other) = find(&collections, new_name) {
                if other != pos {
                    return Err(Error::CollectionAlreadyExists(new_name.clone()));
                }
            }
        }

        let collection = collections[pos].clone();
        let old_name = collection.name();
        let old_metadata = collection.metadata();

        if let Some(new_name) = update.name {
            collection.set_name(new_name);
        }
        if let Some(metadata) = update.metadata {
            collection.set_metadata(metadata);
        }

        if let Err(e) = self.save_manifest(&collections) {
            collection.set_name(old_name);
            collection.set_metadata(old_metadata);
            return Err(e);
        }

        debug!(collection = name, new_name = %collection.name(), "collection modified");
        Ok(())
    }

    /// Checkpoints every collection, leaving empty logs behind.
    pub fn close(&self) -> Result<()> {
        for collection in self.inner.collections.read().iter() {
            collection.checkpoint()?;
        }
        if let Some(root) = &self.inner.root {
            info!(path = %root.display(), "catalog closed");
        }
        Ok(())
    }

    fn create_locked(
        &self,
        collections: &mut Vec<Collection>,
        name: &str,
        options: CollectionOptions,
    ) -> Result<Collection> {
        let id = new_collection_id(collections);

        let collection = match &self.inner.root {
            Some(root) => {
                let dir = storage::collection_dir(root, &id);
                Collection::open_durable(
                    id,
                    name.to_string(),
                    options.metadata,
                    options.config,
                    &dir,
                    self.inner.checkpoint_threshold,
                )?
            }
            None => Collection::in_memory(id, name.to_string(), options.metadata, options.config),
        };

        collections.push(collection.clone());
        if let Err(e) = self.save_manifest(collections) {
            collections.pop();
            if let Some(root) = &self.inner.root {
                let _ = fs::remove_dir_all(storage::collection_dir(root, collection.id()));
            }
            return Err(e);
        }

        info!(
            collection = name,
            dimension = collection.dimension(),
            metric = collection.config().metric.as_str(),
            "collection created"
        );
        Ok(collection)
    }

    fn save_manifest(&self, collections: &[Collection]) -> Result<()> {
        let Some(root) = &self.inner.root else {
            return Ok(());
        };
        let manifest = Manifest {
            collections: collections
                .iter()
                .map(|c| ManifestEntry {
                    id: c.id().to_string(),
                    name: c.name(),
                    metadata: c.metadata(),
                    config: c.config().clone(),
                })
                .collect(),
            ..Manifest::new()
        };
        manifest.save(root)
    }
}

impl std::fmt::Debug for Catalog {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Catalog")
            .field("root", &self.inner.root)
            .field("collections", &self.count_collections())
            .finish()
    }
}

fn find(collections: &[Collection], name: &str) -> Option<usize> {
    collections.iter().position(|c| c.name() == name)
}

/// Random 16-hex-digit directory id, unique within the catalog.
fn new_collection_id(collections: &[Collection]) -> String {
    loop {
        let id = format!("{:016x}", rand::random::<u64>());
        if !collections.iter().any(|c| c.id() == id) {
            return id;
        }
    }
}

/// Removes collection directories the manifest does not reference.
fn remove_orphans(collections_dir: &Path, collections: &[Collection]) -> Result<()> {
    let entries = fs::read_dir(collections_dir).map_err(|e| {
        Error::IoError(format!(
            "read dir {} failed: {}",
            collections_dir.display(),
            e
        ))
    })?;

    for entry in entries.flatten() {
        let file_name = entry.file_name();
        let Some(id) = file_name.to_str() else {
            continue;
        };
        if collections.iter().any(|c| c.id() == id) {
            continue;
        }
        let path = entry.path();
        warn!(path = %path.display(), "removing unreferenced collection directory");
        let removed = if path.is_dir() {
            fs::remove_dir_all(&path)
        } else {
            fs::remove_file(&path)
        };
        if let Err(e) = removed {
            warn!(path = %path.display(), error = %e, "failed to remove orphan");
        }
    }
    Ok(())
}

/// Checks a collection name against the naming rules.
///
/// Names are 3 to 63 characters of ASCII letters, digits, `_`, `-` and
/// `.`, start and end with a letter or digit and never contain `..`.
pub fn validate_collection_name(name: &str) -> Result<()> {
    let invalid = |reason: &str| {
        Err(Error::InvalidCollectionName {
            name: name.to_string(),
            reason: reason.to_string(),
        })
    };

    if name.len() < MIN_NAME_LEN || name.len() > MAX_NAME_LEN {
        return invalid("length must be between 3 and 63 characters");
    }
    if !name
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | '-' | '.'))
    {
        return invalid("only ASCII letters, digits, '_', '-' and '.' are allowed");
    }
    let bytes = name.as_bytes();
    if !bytes[0].is_ascii_alphanumeric() || !bytes[bytes.len() - 1].is_ascii_alphanumeric() {
        return invalid("must start and end with a letter or digit");
    }
    if name.contains("..") {
        return invalid("must not contain two consecutive periods");
    }
    Ok(())
}
