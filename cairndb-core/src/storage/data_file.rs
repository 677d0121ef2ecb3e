//! Compacted record snapshot of one collection.
//!
//! The data file is rewritten as a whole at every checkpoint and replaced
//! atomically, so it is always a complete, self-consistent snapshot.
//!
//! # Format
//!
//! ```text
//! [magic:"CDB1"][count:u32]
//! count x [checksum:u32][length:u32][record:length]
//!
//! record = [id_len:u32][id][has_doc:u8][doc_len:u32][doc]
//!          [dim:u32][f32 le * dim][meta_len:u32][meta:json]
//! ```
//!
//! Records are stored in insertion order and embeddings bit-exact.

use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use crate::error::{Error, Result};
use crate::metadata::Metadata;
use crate::record::Record;
use crate::storage::{frame_len, write_atomic};

const MAGIC: &[u8; 4] = b"CDB1";

/// Handle to a collection's data file.
#[derive(Debug, Clone)]
pub struct DataFile {
    path: PathBuf,
}

impl DataFile {
    pub fn new<P: AsRef<Path>>(path: P) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Replaces the file with a snapshot of `records`.
    pub fn write<'a, I>(&self, records: I) -> Result<()>
    where
        I: IntoIterator<Item = &'a Record>,
    {
        let mut body = Vec::new();
        let mut count: u32 = 0;
        for record in records {
            let encoded = encode_record(record)?;
            body.extend_from_slice(&crc32fast::hash(&encoded).to_le_bytes());
            body.extend_from_slice(&frame_len(encoded.len(), "record")?.to_le_bytes());
            body.extend_from_slice(&encoded);
            count = count
                .checked_add(1)
                .ok_or_else(|| Error::InvalidArgument("too many records for one data file".into()))?;
        }

        let mut bytes = Vec::with_capacity(8 + body.len());
        bytes.extend_from_slice(MAGIC);
        bytes.extend_from_slice(&count.to_le_bytes());
        bytes.extend_from_slice(&body);

        write_atomic(&self.path, &bytes)
    }

    /// Loads all records. A missing file is an empty collection.
    pub fn read(&self) -> Result<Vec<Record>> {
        let bytes = match fs::read(&self.path) {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => {
                return Err(Error::IoError(format!(
                    "failed to read data file {}: {}",
                    self.path.display(),
                    e
                )))
            }
        };

        let mut reader = ByteReader::new(&bytes, &self.path);
        if reader.take(4)? != MAGIC {
            return Err(reader.corrupted("bad magic"));
        }
        let count = reader.u32()? as usize;

        let mut records = Vec::with_capacity(count.min(1 << 20));
        for _ in 0..count {
            let expected = reader.u32()?;
            let length = reader.u32()? as usize;
            let data = reader.take(length)?;
            if crc32fast::hash(data) != expected {
                return Err(reader.corrupted("record checksum mismatch"));
            }
            records.push(decode_record(data, &self.path)?);
        }
        if !reader.is_empty() {
            return Err(reader.corrupted("trailing bytes"));
        }
        Ok(records)
    }
}

fn encode_record(record: &Record) -> Result<Vec<u8>> {
    let metadata = serde_json::to_vec(&record.metadata)
        .map_err(|e| Error::IoError(format!("metadata serialization failed: {}", e)))?;

    let mut buf = Vec::with_capacity(
        16 + record.id.len() + record.embedding.len() * 4 + metadata.len(),
    );
    put_bytes(&mut buf, record.id.as_bytes(), "record id")?;
    match &record.document {
        Some(doc) => {
            buf.push(1);
            put_bytes(&mut buf, doc.as_bytes(), "document")?;
        }
        None => {
            buf.push(0);
            buf.extend_from_slice(&0u32.to_le_bytes());
        }
    }
    buf.extend_from_slice(&frame_len(record.embedding.len(), "embedding")?.to_le_bytes());
    for &val in &record.embedding {
        buf.extend_from_slice(&val.to_le_bytes());
    }
    put_bytes(&mut buf, &metadata, "metadata")?;
    Ok(buf)
}

fn decode_record(data: &[u8], path: &Path) -> Result<Record> {
    let mut reader = ByteReader::new(data, path);

    let id = reader.string()?;
    let has_doc = reader.take(1)?[0];
    let doc = reader.string()?;
    let document = match has_doc {
        0 => None,
        1 => Some(doc),
        _ => return Err(reader.corrupted("bad document flag")),
    };

    let dim = reader.u32()? as usize;
    let raw = reader.take(dim.saturating_mul(4))?;
    let embedding = raw
        .chunks_exact(4)
        .map(|c| f32::from_le_bytes([c[0], c[1], c[2], c[3]]))
        .collect();

    let meta_len = reader.u32()? as usize;
    let metadata: Metadata = serde_json::from_slice(reader.take(meta_len)?)
        .map_err(|e| reader.corrupted(&format!("metadata: {}", e)))?;

    Ok(Record {
        id,
        document,
        embedding,
        metadata,
    })
}

fn put_bytes(buf: &mut Vec<u8>, bytes: &[u8], what: &str) -> Result<()> {
    buf.extend_from_slice(&frame_len(bytes.len(), what)?.to_le_bytes());
    buf.extend_from_slice(bytes);
    Ok(())
}

/// Bounds-checked cursor over a byte slice.
struct ByteReader<'a> {
    bytes: &'a [u8],
    pos: usize,
    path: &'a Path,
}

impl<'a> ByteReader<'a> {
    fn new(bytes: &'a [u8], path: &'a Path) -> Self {
        Self {
            bytes,
            pos: 0,
            path,
        }
    }

    fn take(&mut self, n: usize) -> Result<&'a [u8]> {
        let end = self
            .pos
            .checked_add(n)
            .filter(|&end| end <= self.bytes.len())
            .ok_or_else(|| self.corrupted("unexpected end of file"))?;
        let bytes = self.bytes;
        let slice = &bytes[self.pos..end];
        self.pos = end;
        Ok(slice)
    }

    fn u32(&mut self) -> Result<u32> {
        let b = self.take(4)?;
        Ok(u32::from_le_bytes([b[0], b[1], b[2], b[3]]))
    }

    fn string(&mut self) -> Result<String> {
        let len = self.u32()? as usize;
        let bytes = self.take(len)?;
        String::from_utf8(bytes.to_vec()).map_err(|_| self.corrupted("invalid utf-8"))
    }

    fn is_empty(&self) -> bool {
        self.pos == self.bytes.len()
    }

    fn corrupted(&self, what: &str) -> Error {
        Error::CatalogCorrupted(format!(
            "data file {}: {} at byte {}",
            self.path.display(),
            what,
            self.pos
        ))
    }
}
