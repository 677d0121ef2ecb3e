//! On-disk persistence for durable catalogs.
//!
//! Layout under the catalog root:
//!
//! ```text
//! catalog.json                  manifest (names, metadata, configs)
//! collections/<id>/data.cdb     compacted records
//! collections/<id>/wal.log      mutations since the last checkpoint
//! ```
//!
//! Collection directories are keyed by a random id, never by name, so a
//! rename only rewrites the manifest.

pub mod data_file;
pub mod manifest;
pub mod wal;

use std::fs::{self, File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

use crate::error::{Error, Result};

pub use data_file::DataFile;
pub use manifest::{Manifest, ManifestEntry};
pub use wal::{Wal, WalEntry};

pub(crate) const MANIFEST_FILE: &str = "catalog.json";
pub(crate) const COLLECTIONS_DIR: &str = "collections";
pub(crate) const DATA_FILE: &str = "data.cdb";
pub(crate) const WAL_FILE: &str = "wal.log";

/// Converts a length to the `u32` used by on-disk framing.
pub(crate) fn frame_len(len: usize, what: &str) -> Result<u32> {
    u32::try_from(len).map_err(|_| {
        Error::InvalidArgument(format!(
            "{what} is {len} bytes, larger than the {} byte limit",
            u32::MAX
        ))
    })
}

/// Directory holding all collection directories.
pub(crate) fn collections_dir(root: &Path) -> PathBuf {
    root.join(COLLECTIONS_DIR)
}

/// Directory of one collection.
pub(crate) fn collection_dir(root: &Path, id: &str) -> PathBuf {
    collections_dir(root).join(id)
}

/// Replaces `path` with `bytes` so readers see either the old or the new
/// content, never a mix.
pub(crate) fn write_atomic(path: &Path, bytes: &[u8]) -> Result<()> {
    let mut tmp = path.as_os_str().to_owned();
    tmp.push(".tmp");
    let tmp = PathBuf::from(tmp);

    {
        let mut file = OpenOptions::new()
            .create(true)
            .write(true)
            .truncate(true)
            .open(&tmp)
            .map_err(|e| Error::IoError(format!("failed to create {}: {}", tmp.display(), e)))?;
        file.write_all(bytes)
            .map_err(|e| Error::IoError(format!("write {} failed: {}", tmp.display(), e)))?;
        file.sync_all()
            .map_err(|e| Error::IoError(format!("sync {} failed: {}", tmp.display(), e)))?;
    }

    fs::rename(&tmp, path)
        .map_err(|e| Error::IoError(format!("rename to {} failed: {}", path.display(), e)))?;

    if let Some(parent) = path.parent() {
        sync_dir(parent)?;
    }
    Ok(())
}

/// Flushes directory entries (creates, renames, removals) to disk.
pub(crate) fn sync_dir(dir: &Path) -> Result<()> {
    #[cfg(unix)]
    {
        File::open(dir)
            .and_then(|d| d.sync_all())
            .map_err(|e| Error::IoError(format!("sync dir {} failed: {}", dir.display(), e)))?;
    }
    #[cfg(not(unix))]
    {
        let _ = dir;
    }
    Ok(())
}

#[cfg(test)]
pub(crate) mod test_util {
    use std::path::PathBuf;
    use std::sync::atomic::{AtomicU64, Ordering};

    static TEST_COUNTER: AtomicU64 = AtomicU64::new(0);

    /// A fresh, empty directory under the system temp dir.
    pub fn temp_dir(prefix: &str) -> PathBuf {
        let id = TEST_COUNTER.fetch_add(1, Ordering::SeqCst);
        let dir = std::env::temp_dir().join(format!(
            "cairndb_test_{}_{}_{}",
            prefix,
            std::process::id(),
            id
        ));
        let _ = std::fs::remove_dir_all(&dir);
        std::fs::create_dir_all(&dir).unwrap();
        dir
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_frame_len_bounds() {
        assert_eq!(frame_len(0, "entry").unwrap(), 0);
        assert_eq!(frame_len(u32::MAX as usize, "entry").unwrap(), u32::MAX);
    }

    #[cfg(target_pointer_width = "64")]
    #[test]
    fn test_frame_len_rejects_oversized() {
        let err = frame_len(u32::MAX as usize + 1, "WAL entry").unwrap_err();
        assert!(matches!(err, Error::InvalidArgument(msg) if msg.contains("WAL entry")));
    }

    #[test]
    fn test_write_atomic_replaces_content() {
        let dir = test_util::temp_dir("atomic");
        let path = dir.join("file.json");

        write_atomic(&path, b"first").unwrap();
        write_atomic(&path, b"second").unwrap();

        assert_eq!(fs::read(&path).unwrap(), b"second");
        assert!(!dir.join("file.json.tmp").exists());
        fs::remove_dir_all(&dir).unwrap();
    }

    #[test]
    fn test_layout_paths() {
        let root = Path::new("/data/db");
        assert_eq!(
            collection_dir(root, "abc"),
            PathBuf::from("/data/db/collections/abc")
        );
    }
}
