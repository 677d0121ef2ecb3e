//! Brute-force (flat) index for exact nearest neighbor search.
//!
//! Every query scans all stored records, so results are exact. Each record
//! carries an insertion sequence number; it orders unfiltered listings and
//! breaks distance ties, which makes query results deterministic.

use std::cmp::Ordering;
use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::distance::DistanceMetric;
use crate::error::{Error, Result};
use crate::filter::Filter;
use crate::metadata::Metadata;
use crate::record::Record;

/// A single query hit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchResult {
    /// The id of the matched record.
    pub id: String,
    /// Distance from the query (lower = more similar).
    pub distance: f32,
    /// The record's document, if it has one.
    pub document: Option<String>,
    /// The record's metadata.
    pub metadata: Metadata,
}

#[derive(Debug, Clone)]
struct Entry {
    seq: u64,
    record: Record,
}

/// Flat index over the records of one collection.
///
/// # Example
///
/// ```
/// use cairndb_core::{BruteForceIndex, DistanceMetric, Filter, Metadata, Record};
///
/// let mut index = BruteForceIndex::new(DistanceMetric::Euclidean, 2);
/// index.insert(Record::new("a", vec![0.0, 0.0])).unwrap();
/// index
///     .insert(Record::new("b", vec![3.0, 4.0]).with_metadata(Metadata::new().with_field("k", 1)))
///     .unwrap();
///
/// let hits = index.search(&[3.0, 4.0], 1, None).unwrap();
/// assert_eq!(hits[0].id, "b");
///
/// let filter = Filter::field("k").eq(1);
/// let hits = index.search(&[0.0, 0.0], 10, Some(&filter)).unwrap();
/// assert_eq!(hits.len(), 1);
/// ```
#[derive(Debug)]
pub struct BruteForceIndex {
    dimension: usize,
    metric: DistanceMetric,
    entries: HashMap<String, Entry>,
    next_seq: u64,
}

impl BruteForceIndex {
    pub fn new(metric: DistanceMetric, dimension: usize) -> Self {
        Self {
            dimension,
            metric,
            entries: HashMap::new(),
            next_seq: 0,
        }
    }

    #[inline]
    pub fn dimension(&self) -> usize {
        self.dimension
    }

    #[inline]
    pub fn metric(&self) -> DistanceMetric {
        self.metric
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    #[inline]
    pub fn contains(&self, id: &str) -> bool {
        self.entries.contains_key(id)
    }

    /// Inserts a new record.
    ///
    /// # Errors
    ///
    /// `DimensionMismatch` if the embedding has the wrong length,
    /// `DuplicateId` if the id is already present.
    pub fn insert(&mut self, record: Record) -> Result<()> {
        self.check_dimension(&record.embedding)?;
        if self.entries.contains_key(&record.id) {
            return Err(Error::DuplicateId(record.id));
        }
        let seq = self.take_seq();
        self.entries.insert(record.id.clone(), Entry { seq, record });
        Ok(())
    }

    /// Inserts or replaces a record. A replaced record keeps its position
    /// in insertion order.
    ///
    /// Returns true if an existing record was replaced.
    pub fn upsert(&mut self, record: Record) -> Result<bool> {
        self.check_dimension(&record.embedding)?;
        if let Some(entry) = self.entries.get_mut(&record.id) {
            entry.record = record;
            return Ok(true);
        }
        let seq = self.take_seq();
        self.entries.insert(record.id.clone(), Entry { seq, record });
        Ok(false)
    }

    /// Removes a record, returning it if it existed.
    pub fn delete(&mut self, id: &str) -> Option<Record> {
        self.entries.remove(id).map(|e| e.record)
    }

    pub fn get(&self, id: &str) -> Option<&Record> {
        self.entries.get(id).map(|e| &e.record)
    }

    /// All records in insertion order.
    pub fn records(&self) -> Vec<&Record> {
        let mut entries: Vec<&Entry> = self.entries.values().collect();
        entries.sort_unstable_by_key(|e| e.seq);
        entries.into_iter().map(|e| &e.record).collect()
    }

    /// Records matching `filter` (all if `None`), in insertion order.
    pub fn scan<'a>(&'a self, filter: Option<&Filter>) -> Vec<&'a Record> {
        let mut entries: Vec<&Entry> = self
            .entries
            .values()
            .filter(|e| filter.map_or(true, |f| f.matches(&e.record)))
            .collect();
        entries.sort_unstable_by_key(|e| e.seq);
        entries.into_iter().map(|e| &e.record).collect()
    }

    /// Returns the `k` records nearest to `query`, ascending by distance.
    ///
    /// Records at equal distance come back in insertion order.
    pub fn search(
        &self,
        query: &[f32],
        k: usize,
        filter: Option<&Filter>,
    ) -> Result<Vec<SearchResult>> {
        self.check_dimension(query)?;
        if k == 0 {
            return Ok(Vec::new());
        }

        let mut candidates: Vec<(f32, u64, &Record)> = self
            .entries
            .values()
            .filter(|e| filter.map_or(true, |f| f.matches(&e.record)))
            .map(|e| {
                let distance = self.metric.compute(query, &e.record.embedding);
                (distance, e.seq, &e.record)
            })
            .collect();

        candidates.sort_unstable_by(|a, b| match a.0.total_cmp(&b.0) {
            Ordering::Equal => a.1.cmp(&b.1),
            ord => ord,
        });
        candidates.truncate(k);

        Ok(candidates
            .into_iter()
            .map(|(distance, _, record)| SearchResult {
                id: record.id.clone(),
                distance,
                document: record.document.clone(),
                metadata: record.metadata.clone(),
            })
            .collect())
    }

    pub fn clear(&mut self) {
        self.entries.clear();
        self.next_seq = 0;
    }

    fn take_seq(&mut self) -> u64 {
        let seq = self.next_seq;
        self.next_seq += 1;
        seq
    }

    fn check_dimension(&self, vector: &[f32]) -> Result<()> {
        if vector.len() != self.dimension {
            return Err(Error::DimensionMismatch {
                expected: self.dimension,
                got: vector.len(),
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(id: &str, embedding: Vec<f32>, kind: &str) -> Record {
        Record::new(id, embedding).with_metadata(Metadata::new().with_field("type", kind))
    }

    fn create_test_index() -> BruteForceIndex {
        let mut index = BruteForceIndex::new(DistanceMetric::Euclidean, 3);
        index.insert(record("x", vec![1.0, 0.0, 0.0], "a")).unwrap();
        index.insert(record("y", vec![0.0, 1.0, 0.0], "b")).unwrap();
        index.insert(record("z", vec![0.0, 0.0, 1.0], "a")).unwrap();
        index
    }

    #[test]
    fn test_new_index() {
        let index = BruteForceIndex::new(DistanceMetric::Cosine, 384);
        assert_eq!(index.dimension(), 384);
        assert_eq!(index.metric(), DistanceMetric::Cosine);
        assert!(index.is_empty());
    }

    #[test]
    fn test_insert_dimension_mismatch() {
        let mut index = BruteForceIndex::new(DistanceMetric::Euclidean, 3);
        let result = index.insert(Record::new("a", vec![1.0, 2.0]));
        assert!(matches!(
            result,
            Err(Error::DimensionMismatch { expected: 3, got: 2 })
        ));
    }

    #[test]
    fn test_insert_duplicate_id() {
        let mut index = create_test_index();
        let result = index.insert(Record::new("x", vec![4.0, 5.0, 6.0]));
        assert!(matches!(result, Err(Error::DuplicateId(id)) if id == "x"));
        assert_eq!(index.get("x").unwrap().embedding, vec![1.0, 0.0, 0.0]);
    }

    #[test]
    fn test_upsert_keeps_position() {
        let mut index = create_test_index();
        assert!(index.upsert(record("x", vec![0.5, 0.5, 0.0], "c")).unwrap());
        assert!(!index.upsert(record("w", vec![0.0, 0.5, 0.5], "c")).unwrap());

        let ids: Vec<&str> = index.records().iter().map(|r| r.id.as_str()).collect();
        assert_eq!(ids, vec!["x", "y", "z", "w"]);
        assert_eq!(index.get("x").unwrap().metadata.get_str("type"), Some("c"));
    }

    #[test]
    fn test_delete() {
        let mut index = create_test_index();
        assert!(index.delete("x").is_some());
        assert_eq!(index.len(), 2);
        assert!(index.get("x").is_none());
        assert!(index.delete("x").is_none());
    }

    #[test]
    fn test_search_basic() {
        let index = create_test_index();
        let results = index.search(&[1.0, 0.0, 0.0], 3, None).unwrap();
        assert_eq!(results.len(), 3);
        assert_eq!(results[0].id, "x");
        assert!(results[0].distance < f32::EPSILON);
        assert!(results.windows(2).all(|w| w[0].distance <= w[1].distance));
    }

    #[test]
    fn test_search_k_limit_and_zero() {
        let index = create_test_index();
        assert_eq!(index.search(&[1.0, 0.0, 0.0], 1, None).unwrap().len(), 1);
        assert!(index.search(&[1.0, 0.0, 0.0], 0, None).unwrap().is_empty());
    }

    #[test]
    fn test_search_ties_in_insertion_order() {
        let index = create_test_index();
        // y and z are equidistant from this query.
        let results = index.search(&[1.0, 0.0, 0.0], 3, None).unwrap();
        assert_eq!(results[1].id, "y");
        assert_eq!(results[2].id, "z");
    }

    #[test]
    fn test_search_with_filter() {
        let index = create_test_index();
        let filter = Filter::field("type").eq("a");
        let results = index.search(&[0.5, 0.5, 0.5], 10, Some(&filter)).unwrap();
        assert_eq!(results.len(), 2);
        assert!(results.iter().all(|r| r.metadata.get_str("type") == Some("a")));
    }

    #[test]
    fn test_search_wrong_dimension() {
        let index = create_test_index();
        assert!(matches!(
            index.search(&[1.0, 0.0], 3, None),
            Err(Error::DimensionMismatch { .. })
        ));
    }

    #[test]
    fn test_search_empty_index() {
        let index = BruteForceIndex::new(DistanceMetric::Cosine, 3);
        assert!(index.search(&[1.0, 0.0, 0.0], 10, None).unwrap().is_empty());
    }

    #[test]
    fn test_scan_in_insertion_order() {
        let index = create_test_index();
        let filter = Filter::field("type").eq("a");
        let ids: Vec<&str> = index.scan(Some(&filter)).iter().map(|r| r.id.as_str()).collect();
        assert_eq!(ids, vec!["x", "z"]);
        assert_eq!(index.scan(None).len(), 3);
    }

    #[test]
    fn test_clear() {
        let mut index = create_test_index();
        index.clear();
        assert!(index.is_empty());
    }
}
