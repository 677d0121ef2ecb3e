//! Records and the batch structure used to write them.

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::metadata::Metadata;

/// One stored document: id, optional text, embedding and metadata.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Record {
    /// Caller-supplied id, unique within its collection.
    pub id: String,
    /// Text payload, if the record was written with one.
    pub document: Option<String>,
    /// The record's vector. Length equals the collection dimension.
    pub embedding: Vec<f32>,
    /// Scalar metadata.
    pub metadata: Metadata,
}

impl Record {
    pub fn new(id: impl Into<String>, embedding: Vec<f32>) -> Self {
        Self {
            id: id.into(),
            document: None,
            embedding,
            metadata: Metadata::new(),
        }
    }

    /// Sets the document. Chainable.
    pub fn with_document(mut self, document: impl Into<String>) -> Self {
        self.document = Some(document.into());
        self
    }

    /// Sets the metadata. Chainable.
    pub fn with_metadata(mut self, metadata: Metadata) -> Self {
        self.metadata = metadata;
        self
    }
}

/// A write request for [`Collection::add`](crate::Collection::add) and
/// [`Collection::upsert`](crate::Collection::upsert).
///
/// `ids` is required. Each optional column, when present, must have exactly
/// one entry per id.
///
/// # Example
///
/// ```
/// use cairndb_core::{Metadata, RecordBatch};
///
/// let batch = RecordBatch::new(["flight_policy_01", "hotel_policy_01"])
///     .with_documents([
///         "Economy class for domestic flights.",
///         "Hotels up to $250 per night.",
///     ])
///     .with_metadatas([
///         Metadata::new().with_field("policy_type", "flights"),
///         Metadata::new().with_field("policy_type", "hotels"),
///     ]);
///
/// assert_eq!(batch.len(), 2);
/// ```
#[derive(Debug, Clone, Default)]
pub struct RecordBatch {
    pub ids: Vec<String>,
    pub documents: Option<Vec<String>>,
    pub embeddings: Option<Vec<Vec<f32>>>,
    pub metadatas: Option<Vec<Metadata>>,
}

impl RecordBatch {
    pub fn new<I, S>(ids: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            ids: ids.into_iter().map(Into::into).collect(),
            ..Default::default()
        }
    }

    pub fn with_documents<I, S>(mut self, documents: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.documents = Some(documents.into_iter().map(Into::into).collect());
        self
    }

    pub fn with_embeddings<I>(mut self, embeddings: I) -> Self
    where
        I: IntoIterator<Item = Vec<f32>>,
    {
        self.embeddings = Some(embeddings.into_iter().collect());
        self
    }

    pub fn with_metadatas<I>(mut self, metadatas: I) -> Self
    where
        I: IntoIterator<Item = Metadata>,
    {
        self.metadatas = Some(metadatas.into_iter().collect());
        self
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.ids.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    /// Checks column alignment, metadata values and id uniqueness within
    /// the batch.
    pub(crate) fn validate(&self) -> Result<()> {
        let n = self.ids.len();
        check_column("documents", self.documents.as_ref().map(Vec::len), n)?;
        check_column("embeddings", self.embeddings.as_ref().map(Vec::len), n)?;
        check_column("metadatas", self.metadatas.as_ref().map(Vec::len), n)?;
        for metadata in self.metadatas.iter().flatten() {
            metadata.validate()?;
        }

        let mut seen = std::collections::HashSet::with_capacity(n);
        for id in &self.ids {
            if id.is_empty() {
                return Err(Error::InvalidArgument("record ids must not be empty".into()));
            }
            if !seen.insert(id.as_str()) {
                return Err(Error::DuplicateId(id.clone()));
            }
        }
        Ok(())
    }

    /// Splits the batch into one entry per id.
    pub(crate) fn into_entries(self) -> Vec<BatchEntry> {
        let mut documents = self.documents.map(Vec::into_iter);
        let mut embeddings = self.embeddings.map(Vec::into_iter);
        let mut metadatas = self.metadatas.map(Vec::into_iter);

        self.ids
            .into_iter()
            .map(|id| BatchEntry {
                id,
                document: documents.as_mut().and_then(Iterator::next),
                embedding: embeddings.as_mut().and_then(Iterator::next),
                metadata: metadatas.as_mut().and_then(Iterator::next),
            })
            .collect()
    }
}

fn check_column(name: &str, len: Option<usize>, expected: usize) -> Result<()> {
    match len {
        Some(len) if len != expected => Err(Error::InvalidArgument(format!(
            "{name} has {len} entries but {expected} ids were given"
        ))),
        _ => Ok(()),
    }
}

/// One row of a [`RecordBatch`], with each column still optional.
#[derive(Debug, Clone)]
pub(crate) struct BatchEntry {
    pub id: String,
    pub document: Option<String>,
    pub embedding: Option<Vec<f32>>,
    pub metadata: Option<Metadata>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_batch_validate_aligned() {
        let batch = RecordBatch::new(["a", "b"])
            .with_documents(["one", "two"])
            .with_metadatas([Metadata::new(), Metadata::new()]);
        assert!(batch.validate().is_ok());
    }

    #[test]
    fn test_batch_validate_misaligned() {
        let batch = RecordBatch::new(["a", "b"]).with_documents(["one"]);
        assert!(matches!(batch.validate(), Err(Error::InvalidArgument(_))));
    }

    #[test]
    fn test_batch_validate_repeated_id() {
        let batch = RecordBatch::new(["a", "a"]).with_documents(["one", "two"]);
        assert!(matches!(batch.validate(), Err(Error::DuplicateId(id)) if id == "a"));
    }

    #[test]
    fn test_batch_validate_empty_id() {
        let batch = RecordBatch::new([""]).with_documents(["one"]);
        assert!(matches!(batch.validate(), Err(Error::InvalidArgument(_))));
    }

    #[test]
    fn test_batch_validate_non_finite_metadata() {
        let batch = RecordBatch::new(["a", "b"])
            .with_documents(["one", "two"])
            .with_metadatas([
                Metadata::new().with_field("score", 1.0),
                Metadata::new().with_field("score", f64::NAN),
            ]);
        assert!(matches!(batch.validate(), Err(Error::InvalidArgument(_))));
    }

    #[test]
    fn test_into_entries_keeps_columns_aligned() {
        let entries = RecordBatch::new(["a", "b"])
            .with_embeddings([vec![1.0], vec![2.0]])
            .with_metadatas([
                Metadata::new().with_field("k", 1),
                Metadata::new().with_field("k", 2),
            ])
            .into_entries();

        assert_eq!(entries.len(), 2);
        assert_eq!(entries[1].id, "b");
        assert_eq!(entries[1].embedding, Some(vec![2.0]));
        assert_eq!(entries[1].metadata.as_ref().unwrap().get_i64("k"), Some(2));
        assert!(entries[0].document.is_none());
    }
}
