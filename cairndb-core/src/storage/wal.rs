//! Write-Ahead Log (WAL) for crash-safe collection mutations.
//!
//! Every mutating collection call becomes exactly one entry, appended and
//! fsynced before the call returns. On open, the log is replayed on top of
//! the data file.
//!
//! # Format
//!
//! Each WAL entry has the format:
//! ```text
//! [checksum:u32][length:u32][json:length]
//! ```
//!
//! A short final entry is a write interrupted by a crash: it is dropped and
//! the file is cut back to the last complete entry.

use std::fs::{File, OpenOptions};
use std::io::{ErrorKind, Read, Write};
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::error::{Error, Result};
use crate::record::Record;
use crate::storage::frame_len;

const HEADER_LEN: usize = 8;

/// One logged mutation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum WalEntry {
    /// Records inserted or replaced, fully resolved (embeddings included).
    Put { records: Vec<Record> },
    /// Records removed by id.
    Delete { ids: Vec<String> },
}

impl WalEntry {
    fn to_bytes(&self) -> Result<Vec<u8>> {
        serde_json::to_vec(self)
            .map_err(|e| Error::WalCorrupted(format!("serialization failed: {}", e)))
    }

    fn from_bytes(bytes: &[u8]) -> Result<Self> {
        serde_json::from_slice(bytes)
            .map_err(|e| Error::WalCorrupted(format!("deserialization failed: {}", e)))
    }
}

/// Result of scanning a log file.
#[derive(Debug, Default)]
pub struct WalReplay {
    /// Complete entries, in append order.
    pub entries: Vec<WalEntry>,
    /// Byte length covered by those entries.
    pub valid_len: u64,
    /// True if trailing bytes after `valid_len` were dropped.
    pub torn_tail: bool,
}

/// Append-only log of one collection.
#[derive(Debug)]
pub struct Wal {
    path: PathBuf,
    file: File,
    len: u64,
    entries: usize,
}

impl Wal {
    /// Opens or creates the log and returns the entries it already holds.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<(Self, Vec<WalEntry>)> {
        let path = path.as_ref().to_path_buf();
        let replay = Self::read_all(&path)?;

        let file = OpenOptions::new()
            .create(true)
            .read(true)
            .write(true)
            .open(&path)
            .map_err(|e| Error::IoError(format!("failed to open WAL: {}", e)))?;

        if replay.torn_tail {
            file.set_len(replay.valid_len)
                .and_then(|_| file.sync_all())
                .map_err(|e| Error::IoError(format!("failed to cut torn WAL tail: {}", e)))?;
        }

        let wal = Self {
            path,
            file,
            len: replay.valid_len,
            entries: replay.entries.len(),
        };
        Ok((wal, replay.entries))
    }

    /// Appends an entry and syncs it to disk.
    ///
    /// On failure the file is cut back so no partial entry remains.
    pub fn append(&mut self, entry: &WalEntry) -> Result<()> {
        let data = entry.to_bytes()?;
        let length = frame_len(data.len(), "WAL entry")?;
        let checksum = crc32fast::hash(&data);

        let mut buf = Vec::with_capacity(HEADER_LEN + data.len());
        buf.extend_from_slice(&checksum.to_le_bytes());
        buf.extend_from_slice(&length.to_le_bytes());
        buf.extend_from_slice(&data);

        let written = self.write_at_end(&buf);
        if let Err(e) = written {
            let _ = self.file.set_len(self.len);
            return Err(e);
        }

        self.len += buf.len() as u64;
        self.entries += 1;
        Ok(())
    }

    fn write_at_end(&mut self, buf: &[u8]) -> Result<()> {
        use std::io::{Seek, SeekFrom};

        self.file
            .seek(SeekFrom::Start(self.len))
            .map_err(|e| Error::IoError(format!("seek failed: {}", e)))?;
        self.file
            .write_all(buf)
            .map_err(|e| Error::IoError(format!("write entry failed: {}", e)))?;
        self.file
            .sync_data()
            .map_err(|e| Error::IoError(format!("sync failed: {}", e)))
    }

    /// Empties the log after its contents were checkpointed.
    pub fn truncate(&mut self) -> Result<()> {
        self.file
            .set_len(0)
            .and_then(|_| self.file.sync_all())
            .map_err(|e| Error::IoError(format!("truncate failed: {}", e)))?;
        self.len = 0;
        self.entries = 0;
        Ok(())
    }

    /// Number of entries since the last truncation.
    #[inline]
    pub fn entry_count(&self) -> usize {
        self.entries
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Reads all complete entries of a log file.
    pub fn read_all<P: AsRef<Path>>(path: P) -> Result<WalReplay> {
        let path = path.as_ref();
        let mut bytes = Vec::new();
        match File::open(path) {
            Ok(mut file) => {
                file.read_to_end(&mut bytes)
                    .map_err(|e| Error::IoError(format!("failed to read WAL: {}", e)))?;
            }
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(WalReplay::default()),
            Err(e) => return Err(Error::IoError(format!("failed to open WAL for read: {}", e))),
        }

        let mut replay = WalReplay::default();
        let mut offset = 0usize;

        while offset < bytes.len() {
            let remaining = bytes.len() - offset;
            if remaining < HEADER_LEN {
                replay.torn_tail = true;
                break;
            }

            let expected = u32::from_le_bytes(read4(&bytes, offset));
            let length = u32::from_le_bytes(read4(&bytes, offset + 4)) as usize;
            let start = offset + HEADER_LEN;
            let end = start.saturating_add(length);
            if end > bytes.len() {
                replay.torn_tail = true;
                break;
            }

            let data = &bytes[start..end];
            let actual = crc32fast::hash(data);
            if actual != expected {
                if end == bytes.len() {
                    // Last entry: the crash hit mid-write.
                    replay.torn_tail = true;
                    break;
                }
                return Err(Error::WalCorrupted(format!(
                    "checksum mismatch at offset {}: expected {}, got {}",
                    offset, expected, actual
                )));
            }

            replay.entries.push(WalEntry::from_bytes(data)?);
            offset = end;
        }

        replay.valid_len = offset as u64;
        if replay.torn_tail {
            warn!(
                path = %path.display(),
                dropped_bytes = bytes.len() - offset,
                "ignoring torn WAL tail"
            );
        }
        Ok(replay)
    }
}

fn read4(bytes: &[u8], at: usize) -> [u8; 4] {
    [bytes[at], bytes[at + 1], bytes[at + 2], bytes[at + 3]]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metadata::Metadata;
    use crate::storage::test_util::temp_dir;
    use std::fs;

    fn put(id: &str) -> WalEntry {
        WalEntry::Put {
            records: vec![Record::new(id, vec![1.0, 2.0, 3.0])
                .with_document("doc")
                .with_metadata(Metadata::new().with_field("key", "value"))],
        }
    }

    #[test]
    fn test_wal_append_and_read() {
        let dir = temp_dir("wal");
        let path = dir.join("wal.log");

        {
            let (mut wal, existing) = Wal::open(&path).unwrap();
            assert!(existing.is_empty());
            wal.append(&put("a")).unwrap();
            wal.append(&put("b")).unwrap();
            wal.append(&WalEntry::Delete {
                ids: vec!["a".into()],
            })
            .unwrap();
            assert_eq!(wal.entry_count(), 3);
        }

        let (wal, entries) = Wal::open(&path).unwrap();
        assert_eq!(wal.entry_count(), 3);
        assert_eq!(entries.len(), 3);
        assert_eq!(entries[0], put("a"));
        assert!(matches!(&entries[2], WalEntry::Delete { ids } if ids == &["a"]));

        fs::remove_dir_all(&dir).unwrap();
    }

    #[test]
    fn test_wal_truncate() {
        let dir = temp_dir("wal");
        let path = dir.join("wal.log");

        {
            let (mut wal, _) = Wal::open(&path).unwrap();
            wal.append(&put("a")).unwrap();
            wal.truncate().unwrap();
            assert_eq!(wal.entry_count(), 0);
            wal.append(&put("b")).unwrap();
        }

        let replay = Wal::read_all(&path).unwrap();
        assert_eq!(replay.entries, vec![put("b")]);

        fs::remove_dir_all(&dir).unwrap();
    }

    #[test]
    fn test_wal_missing_file() {
        let dir = temp_dir("wal");
        let replay = Wal::read_all(dir.join("absent.log")).unwrap();
        assert!(replay.entries.is_empty());
        assert!(!replay.torn_tail);
        fs::remove_dir_all(&dir).unwrap();
    }

    #[test]
    fn test_wal_torn_tail_is_dropped() {
        let dir = temp_dir("wal");
        let path = dir.join("wal.log");

        {
            let (mut wal, _) = Wal::open(&path).unwrap();
            wal.append(&put("a")).unwrap();
            wal.append(&put("b")).unwrap();
        }
        let full_len = fs::metadata(&path).unwrap().len();
        let file = OpenOptions::new().write(true).open(&path).unwrap();
        file.set_len(full_len - 5).unwrap();
        drop(file);

        let (mut wal, entries) = Wal::open(&path).unwrap();
        assert_eq!(entries, vec![put("a")]);

        // Appending after recovery must not leave garbage in between.
        wal.append(&put("c")).unwrap();
        drop(wal);
        let replay = Wal::read_all(&path).unwrap();
        assert_eq!(replay.entries, vec![put("a"), put("c")]);
        assert!(!replay.torn_tail);

        fs::remove_dir_all(&dir).unwrap();
    }

    #[test]
    fn test_wal_corruption_in_middle() {
        let dir = temp_dir("wal");
        let path = dir.join("wal.log");

        {
            let (mut wal, _) = Wal::open(&path).unwrap();
            wal.append(&put("a")).unwrap();
            wal.append(&put("b")).unwrap();
        }
        let mut bytes = fs::read(&path).unwrap();
        bytes[HEADER_LEN + 2] ^= 0xFF;
        fs::write(&path, &bytes).unwrap();

        assert!(matches!(
            Wal::read_all(&path),
            Err(Error::WalCorrupted(_))
        ));

        fs::remove_dir_all(&dir).unwrap();
    }

    #[test]
    fn test_wal_entry_serialization() {
        let entry = put("x");
        let bytes = entry.to_bytes().unwrap();
        let json: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(json["op"], "put");
        assert_eq!(WalEntry::from_bytes(&bytes).unwrap(), entry);
    }
}
