//! Named collections of records with crash-safe storage.
//!
//! A `Collection` combines the in-memory index, the collection's vector
//! codec and, in durable catalogs, its write-ahead log and data file:
//! - every mutation is one WAL entry, synced before the call returns
//! - the data file is rewritten at checkpoints
//! - state is rebuilt from data file + WAL on open
//!
//! Handles are obtained from a [`Catalog`](crate::Catalog) and are cheap to
//! clone; all clones share the same state.

use std::collections::HashSet;
use std::fmt;
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::codec::{EmbeddingConfig, VectorCodec};
use crate::distance::DistanceMetric;
use crate::error::{Error, Result};
use crate::filter::Filter;
use crate::index::{BruteForceIndex, SearchResult};
use crate::metadata::Metadata;
use crate::record::{BatchEntry, Record, RecordBatch};
use crate::storage::{DataFile, Wal, WalEntry, DATA_FILE, WAL_FILE};

/// Number of results per query when none is requested.
pub const DEFAULT_N_RESULTS: usize = 10;

/// Configuration for a collection, fixed at creation.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CollectionConfig {
    /// How document text becomes a vector. Also fixes the dimension.
    pub embedding: EmbeddingConfig,
    /// Distance used to rank query results.
    pub metric: DistanceMetric,
}

impl CollectionConfig {
    /// Local embeddings, cosine distance.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the embedding codec. Chainable.
    pub fn with_embedding(mut self, embedding: EmbeddingConfig) -> Self {
        self.embedding = embedding;
        self
    }

    /// Sets the distance metric. Chainable.
    pub fn with_metric(mut self, metric: DistanceMetric) -> Self {
        self.metric = metric;
        self
    }

    #[inline]
    pub fn dimension(&self) -> usize {
        self.embedding.dimension()
    }
}

/// Parameters of [`Collection::get`].
#[derive(Debug, Clone, Default)]
pub struct GetRequest {
    /// Ids to fetch; `None` selects every record.
    pub ids: Option<Vec<String>>,
    pub filter: Option<Filter>,
    pub limit: Option<usize>,
    pub offset: usize,
}

impl GetRequest {
    /// Selects every record, in insertion order.
    pub fn all() -> Self {
        Self::default()
    }

    /// Selects the given ids, in the given order. Unknown ids are skipped.
    pub fn ids<I, S>(ids: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            ids: Some(ids.into_iter().map(Into::into).collect()),
            ..Self::default()
        }
    }

    pub fn with_filter(mut self, filter: Filter) -> Self {
        self.filter = Some(filter);
        self
    }

    pub fn with_limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }

    pub fn with_offset(mut self, offset: usize) -> Self {
        self.offset = offset;
        self
    }
}

/// What a query searches with.
#[derive(Debug, Clone, PartialEq)]
pub enum QueryInput {
    /// Texts embedded with the collection's codec.
    Texts(Vec<String>),
    /// Vectors used as-is.
    Embeddings(Vec<Vec<f32>>),
}

/// Parameters of [`Collection::query`].
#[derive(Debug, Clone)]
pub struct QueryRequest {
    pub input: QueryInput,
    pub n_results: usize,
    pub filter: Option<Filter>,
}

impl QueryRequest {
    pub fn texts<I, S>(texts: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::from_input(QueryInput::Texts(
            texts.into_iter().map(Into::into).collect(),
        ))
    }

    pub fn embeddings<I>(embeddings: I) -> Self
    where
        I: IntoIterator<Item = Vec<f32>>,
    {
        Self::from_input(QueryInput::Embeddings(embeddings.into_iter().collect()))
    }

    fn from_input(input: QueryInput) -> Self {
        Self {
            input,
            n_results: DEFAULT_N_RESULTS,
            filter: None,
        }
    }

    pub fn with_n_results(mut self, n_results: usize) -> Self {
        self.n_results = n_results;
        self
    }

    pub fn with_filter(mut self, filter: Filter) -> Self {
        self.filter = Some(filter);
        self
    }
}

/// Durable side of a collection.
#[derive(Debug)]
struct Storage {
    wal: Wal,
    data: DataFile,
    checkpoint_threshold: usize,
}

#[derive(Debug)]
struct State {
    index: BruteForceIndex,
    storage: Option<Storage>,
}

struct Inner {
    id: String,
    name: RwLock<String>,
    metadata: RwLock<Metadata>,
    config: CollectionConfig,
    codec: VectorCodec,
    state: RwLock<State>,
    dropped: AtomicBool,
}

/// A handle to one collection.
///
/// # Example
///
/// ```
/// use cairndb_core::{Catalog, CollectionOptions, QueryRequest, RecordBatch};
///
/// let catalog = Catalog::in_memory();
/// let policies = catalog
///     .get_or_create_collection("travel_policies", CollectionOptions::default())
///     .unwrap();
///
/// policies
///     .add(RecordBatch::new(["flights", "hotels"]).with_documents([
///         "Economy class is required for domestic flights.",
///         "Hotel stays are capped at 250 dollars per night.",
///     ]))
///     .unwrap();
///
/// let results = policies
///     .query(QueryRequest::texts(["domestic flights"]).with_n_results(1))
///     .unwrap();
/// assert_eq!(results[0][0].id, "flights");
/// ```
#[derive(Clone)]
pub struct Collection {
    inner: Arc<Inner>,
}

impl Collection {
    /// Creates a collection that lives only in memory.
    pub(crate) fn in_memory(
        id: String,
        name: String,
        metadata: Metadata,
        config: CollectionConfig,
    ) -> Self {
        let index = BruteForceIndex::new(config.metric, config.dimension());
        Self::from_parts(id, name, metadata, config, index, None)
    }

    /// Opens (or creates) a durable collection stored in `dir`, replaying
    /// its log on top of its data file.
    pub(crate) fn open_durable(
        id: String,
        name: String,
        metadata: Metadata,
        config: CollectionConfig,
        dir: &Path,
        checkpoint_threshold: usize,
    ) -> Result<Self> {
        std::fs::create_dir_all(dir).map_err(|e| {
            Error::IoError(format!("create dir {} failed: {}", dir.display(), e))
        })?;

        let data = DataFile::new(dir.join(DATA_FILE));
        let mut index = BruteForceIndex::new(config.metric, config.dimension());
        for record in data.read()? {
            index.upsert(record).map_err(|e| {
                Error::CatalogCorrupted(format!("data file {}: {}", data.path().display(), e))
            })?;
        }

        let (wal, entries) = Wal::open(dir.join(WAL_FILE))?;
        let replayed = entries.len();
        for entry in entries {
            apply(&mut index, entry)
                .map_err(|e| Error::WalCorrupted(format!("replay failed: {}", e)))?;
        }

        debug!(
            collection = %name,
            records = index.len(),
            replayed,
            "collection loaded"
        );

        let storage = Storage {
            wal,
            data,
            checkpoint_threshold,
        };
        Ok(Self::from_parts(id, name, metadata, config, index, Some(storage)))
    }

    fn from_parts(
        id: String,
        name: String,
        metadata: Metadata,
        config: CollectionConfig,
        index: BruteForceIndex,
        storage: Option<Storage>,
    ) -> Self {
        let codec = VectorCodec::from_config(&config.embedding);
        Self {
            inner: Arc::new(Inner {
                id,
                name: RwLock::new(name),
                metadata: RwLock::new(metadata),
                config,
                codec,
                state: RwLock::new(State { index, storage }),
                dropped: AtomicBool::new(false),
            }),
        }
    }

    /// Current name of the collection.
    pub fn name(&self) -> String {
        self.inner.name.read().clone()
    }

    /// Collection-level metadata.
    pub fn metadata(&self) -> Metadata {
        self.inner.metadata.read().clone()
    }

    pub fn config(&self) -> &CollectionConfig {
        &self.inner.config
    }

    /// Length of every embedding in this collection.
    #[inline]
    pub fn dimension(&self) -> usize {
        self.inner.config.dimension()
    }

    pub(crate) fn id(&self) -> &str {
        &self.inner.id
    }

    pub(crate) fn set_name(&self, name: String) {
        *self.inner.name.write() = name;
    }

    pub(crate) fn set_metadata(&self, metadata: Metadata) {
        *self.inner.metadata.write() = metadata;
    }

    /// Returns true if both handles refer to the same collection.
    pub fn same_as(&self, other: &Collection) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }

    /// Adds new records.
    ///
    /// Records without an embedding are embedded from their document. The
    /// call is all-or-nothing: if any id already exists (or repeats within
    /// the batch) nothing is written.
    ///
    /// # Errors
    ///
    /// - `DuplicateId` for an existing or repeated id.
    /// - `InvalidArgument` for misaligned columns or a record with neither
    ///   document nor embedding.
    /// - `DimensionMismatch` for a supplied embedding of the wrong length.
    /// - Codec errors (`CredentialMissing`, `ProviderUnavailable`,
    ///   `RateLimited`) from embedding documents.
    pub fn add(&self, batch: RecordBatch) -> Result<()> {
        self.ensure_live()?;
        batch.validate()?;
        if batch.is_empty() {
            return Ok(());
        }

        let mut entries = batch.into_entries();
        for entry in &entries {
            if entry.document.is_none() && entry.embedding.is_none() {
                return Err(Error::InvalidArgument(format!(
                    "record {} has neither a document nor an embedding",
                    entry.id
                )));
            }
            if let Some(embedding) = &entry.embedding {
                self.check_vector(embedding)?;
            }
        }

        // Fail fast before paying for embeddings.
        {
            let state = self.inner.state.read();
            check_absent(&state.index, entries.iter().map(|e| e.id.as_str()))?;
        }

        self.resolve_embeddings(&mut entries)?;

        let records: Vec<Record> = entries
            .into_iter()
            .map(|e| Record {
                id: e.id,
                document: e.document,
                embedding: e.embedding.unwrap_or_default(),
                metadata: e.metadata.unwrap_or_default(),
            })
            .collect();

        let mut state = self.inner.state.write();
        self.ensure_live()?;
        check_absent(&state.index, records.iter().map(|r| r.id.as_str()))?;

        let count = records.len();
        self.commit(&mut state, WalEntry::Put { records })?;
        debug!(collection = %self.name(), count, "added records");
        Ok(())
    }

    /// Inserts new records and updates existing ones.
    ///
    /// For an existing id only the supplied fields change; supplied metadata
    /// replaces the stored map. A new document without an embedding is
    /// re-embedded. New ids need a document or an embedding.
    pub fn upsert(&self, batch: RecordBatch) -> Result<()> {
        self.ensure_live()?;
        batch.validate()?;
        if batch.is_empty() {
            return Ok(());
        }

        let mut entries = batch.into_entries();
        for entry in &entries {
            if let Some(embedding) = &entry.embedding {
                self.check_vector(embedding)?;
            }
        }
        self.resolve_embeddings(&mut entries)?;

        let mut state = self.inner.state.write();
        self.ensure_live()?;

        let mut records = Vec::with_capacity(entries.len());
        let mut updated = 0usize;
        for entry in entries {
            let record = match state.index.get(&entry.id) {
                Some(existing) => {
                    updated += 1;
                    Record {
                        document: entry.document.or_else(|| existing.document.clone()),
                        embedding: entry
                            .embedding
                            .unwrap_or_else(|| existing.embedding.clone()),
                        metadata: entry
                            .metadata
                            .unwrap_or_else(|| existing.metadata.clone()),
                        id: entry.id,
                    }
                }
                None => {
                    let embedding = entry.embedding.ok_or_else(|| {
                        Error::InvalidArgument(format!(
                            "new record {} has neither a document nor an embedding",
                            entry.id
                        ))
                    })?;
                    Record {
                        id: entry.id,
                        document: entry.document,
                        embedding,
                        metadata: entry.metadata.unwrap_or_default(),
                    }
                }
            };
            records.push(record);
        }

        let count = records.len();
        self.commit(&mut state, WalEntry::Put { records })?;
        debug!(
            collection = %self.name(),
            inserted = count - updated,
            updated,
            "upserted records"
        );
        Ok(())
    }

    /// Fetches records by id or by filter.
    pub fn get(&self, request: GetRequest) -> Result<Vec<Record>> {
        if let Some(filter) = &request.filter {
            filter.validate()?;
        }

        let state = self.inner.state.read();
        self.ensure_live()?;

        let selected: Vec<&Record> = match &request.ids {
            Some(ids) => {
                let mut seen = HashSet::with_capacity(ids.len());
                ids.iter()
                    .map(String::as_str)
                    .filter(|id| seen.insert(*id))
                    .filter_map(|id| state.index.get(id))
                    .filter(|r| request.filter.as_ref().map_or(true, |f| f.matches(r)))
                    .collect()
            }
            None => state.index.scan(request.filter.as_ref()),
        };

        let limit = request.limit.unwrap_or(usize::MAX);
        Ok(selected
            .into_iter()
            .skip(request.offset)
            .take(limit)
            .cloned()
            .collect())
    }

    /// Removes records by id and returns how many existed.
    ///
    /// Unknown ids are ignored.
    pub fn delete<I, S>(&self, ids: I) -> Result<usize>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let ids: Vec<String> = ids.into_iter().map(|s| s.as_ref().to_string()).collect();

        let mut state = self.inner.state.write();
        self.ensure_live()?;

        let mut seen = HashSet::with_capacity(ids.len());
        let existing: Vec<String> = ids
            .into_iter()
            .filter(|id| state.index.contains(id) && seen.insert(id.clone()))
            .collect();
        if existing.is_empty() {
            return Ok(0);
        }

        let count = existing.len();
        self.commit(&mut state, WalEntry::Delete { ids: existing })?;
        debug!(collection = %self.name(), count, "deleted records");
        Ok(count)
    }

    /// Number of records.
    pub fn count(&self) -> Result<usize> {
        let state = self.inner.state.read();
        self.ensure_live()?;
        Ok(state.index.len())
    }

    /// Nearest-neighbor search. Returns one result list per query, each
    /// sorted ascending by distance.
    pub fn query(&self, request: QueryRequest) -> Result<Vec<Vec<SearchResult>>> {
        self.ensure_live()?;
        if request.n_results == 0 {
            return Err(Error::InvalidArgument(
                "n_results must be at least 1".into(),
            ));
        }
        if let Some(filter) = &request.filter {
            filter.validate()?;
        }

        let vectors = match request.input {
            QueryInput::Texts(texts) => {
                let texts: Vec<&str> = texts.iter().map(String::as_str).collect();
                self.inner.codec.embed(&texts)?
            }
            QueryInput::Embeddings(vectors) => vectors,
        };
        for vector in &vectors {
            self.check_vector(vector)?;
        }

        let state = self.inner.state.read();
        self.ensure_live()?;

        let results = vectors
            .iter()
            .map(|v| state.index.search(v, request.n_results, request.filter.as_ref()))
            .collect::<Result<Vec<_>>>()?;

        debug!(
            collection = %self.name(),
            queries = results.len(),
            n_results = request.n_results,
            "query finished"
        );
        Ok(results)
    }

    /// The first `limit` records in insertion order.
    pub fn peek(&self, limit: usize) -> Result<Vec<Record>> {
        self.get(GetRequest::all().with_limit(limit))
    }

    /// Rewrites the data file from memory and empties the log.
    ///
    /// A no-op for in-memory collections.
    pub fn checkpoint(&self) -> Result<()> {
        let mut state = self.inner.state.write();
        self.ensure_live()?;
        self.checkpoint_locked(&mut state)
    }

    /// Detaches the collection from its storage. Later calls on any handle
    /// fail with `CollectionNotFound`.
    pub(crate) fn mark_dropped(&self) {
        let mut state = self.inner.state.write();
        self.inner.dropped.store(true, Ordering::SeqCst);
        state.storage = None;
        state.index.clear();
    }

    /// Logs `entry` (durable mode), then applies it to the index.
    fn commit(&self, state: &mut State, entry: WalEntry) -> Result<()> {
        if let Some(storage) = state.storage.as_mut() {
            storage.wal.append(&entry)?;
        }
        apply(&mut state.index, entry)?;

        let due = state
            .storage
            .as_ref()
            .is_some_and(|s| s.wal.entry_count() >= s.checkpoint_threshold);
        if due {
            // The mutation is already durable in the log.
            if let Err(e) = self.checkpoint_locked(state) {
                warn!(collection = %self.name(), error = %e, "automatic checkpoint failed");
            }
        }
        Ok(())
    }

    fn checkpoint_locked(&self, state: &mut State) -> Result<()> {
        let State { index, storage } = state;
        let Some(storage) = storage.as_mut() else {
            return Ok(());
        };
        if storage.wal.entry_count() == 0 {
            return Ok(());
        }

        storage.data.write(index.records())?;
        storage.wal.truncate()?;
        info!(collection = %self.name(), records = index.len(), "checkpoint complete");
        Ok(())
    }

    /// Embeds the documents of entries that came without an embedding.
    fn resolve_embeddings(&self, entries: &mut [BatchEntry]) -> Result<()> {
        let pending: Vec<usize> = entries
            .iter()
            .enumerate()
            .filter(|(_, e)| e.embedding.is_none() && e.document.is_some())
            .map(|(i, _)| i)
            .collect();
        if pending.is_empty() {
            return Ok(());
        }

        let texts: Vec<&str> = pending
            .iter()
            .filter_map(|&i| entries[i].document.as_deref())
            .collect();
        let vectors = self.inner.codec.embed(&texts)?;
        debug!(
            collection = %self.name(),
            codec = self.inner.codec.name(),
            count = vectors.len(),
            "embedded documents"
        );

        for (i, vector) in pending.into_iter().zip(vectors) {
            self.check_vector(&vector)?;
            entries[i].embedding = Some(vector);
        }
        Ok(())
    }

    fn check_vector(&self, vector: &[f32]) -> Result<()> {
        let expected = self.dimension();
        if vector.len() != expected {
            return Err(Error::DimensionMismatch {
                expected,
                got: vector.len(),
            });
        }
        if vector.iter().any(|x| !x.is_finite()) {
            return Err(Error::InvalidArgument(
                "embeddings must not contain NaN or infinite values".into(),
            ));
        }
        Ok(())
    }

    fn ensure_live(&self) -> Result<()> {
        if self.inner.dropped.load(Ordering::SeqCst) {
            return Err(Error::CollectionNotFound(self.name()));
        }
        Ok(())
    }
}

impl fmt::Debug for Collection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Collection")
            .field("id", &self.inner.id)
            .field("name", &*self.inner.name.read())
            .field("config", &self.inner.config)
            .finish()
    }
}

/// Applies a logged mutation to an index.
fn apply(index: &mut BruteForceIndex, entry: WalEntry) -> Result<()> {
    match entry {
        WalEntry::Put { records } => {
            for record in records {
                index.upsert(record)?;
            }
        }
        WalEntry::Delete { ids } => {
            for id in ids {
                index.delete(&id);
            }
        }
    }
    Ok(())
}

fn check_absent<'a, I>(index: &BruteForceIndex, ids: I) -> Result<()>
where
    I: IntoIterator<Item = &'a str>,
{
    match ids.into_iter().find(|id| index.contains(id)) {
        Some(id) => Err(Error::DuplicateId(id.to_string())),
        None => Ok(()),
    }
}

// Async API when tokio feature is enabled
#[cfg(feature = "async")]
mod async_api {
    use super::*;

    fn join_error(e: tokio::task::JoinError) -> Error {
        Error::TaskFailed(format!("spawn_blocking failed: {}", e))
    }

    /// Async wrapper for Collection.
    ///
    /// Every call runs on tokio's blocking pool via `spawn_blocking`, so
    /// provider round-trips and fsyncs never stall the async executor.
    ///
    /// # Example
    ///
    /// ```ignore
    /// use cairndb_core::{AsyncCollection, Catalog, CollectionOptions, RecordBatch};
    ///
    /// #[tokio::main]
    /// async fn main() {
    ///     let catalog = Catalog::in_memory();
    ///     let col = catalog.get_or_create_collection("notes", CollectionOptions::default()).unwrap();
    ///     let col = AsyncCollection::from_sync(col);
    ///
    ///     col.add(RecordBatch::new(["a"]).with_documents(["hello"])).await.unwrap();
    ///     assert_eq!(col.count().await.unwrap(), 1);
    /// }
    /// ```
    #[derive(Clone, Debug)]
    pub struct AsyncCollection {
        inner: Collection,
    }

    impl AsyncCollection {
        /// Wraps an existing Collection in an async wrapper.
        pub fn from_sync(collection: Collection) -> Self {
            Self { inner: collection }
        }

        pub async fn add(&self, batch: RecordBatch) -> Result<()> {
            let inner = self.inner.clone();
            tokio::task::spawn_blocking(move || inner.add(batch))
                .await
                .map_err(join_error)?
        }

        pub async fn upsert(&self, batch: RecordBatch) -> Result<()> {
            let inner = self.inner.clone();
            tokio::task::spawn_blocking(move || inner.upsert(batch))
                .await
                .map_err(join_error)?
        }

        pub async fn get(&self, request: GetRequest) -> Result<Vec<Record>> {
            let inner = self.inner.clone();
            tokio::task::spawn_blocking(move || inner.get(request))
                .await
                .map_err(join_error)?
        }

        pub async fn delete(&self, ids: Vec<String>) -> Result<usize> {
            let inner = self.inner.clone();
            tokio::task::spawn_blocking(move || inner.delete(ids))
                .await
                .map_err(join_error)?
        }

        pub async fn count(&self) -> Result<usize> {
            let inner = self.inner.clone();
            tokio::task::spawn_blocking(move || inner.count())
                .await
                .map_err(join_error)?
        }

        pub async fn query(&self, request: QueryRequest) -> Result<Vec<Vec<SearchResult>>> {
            let inner = self.inner.clone();
            tokio::task::spawn_blocking(move || inner.query(request))
                .await
                .map_err(join_error)?
        }

        pub async fn peek(&self, limit: usize) -> Result<Vec<Record>> {
            let inner = self.inner.clone();
            tokio::task::spawn_blocking(move || inner.peek(limit))
                .await
                .map_err(join_error)?
        }

        pub async fn checkpoint(&self) -> Result<()> {
            let inner = self.inner.clone();
            tokio::task::spawn_blocking(move || inner.checkpoint())
                .await
                .map_err(join_error)?
        }

        pub fn name(&self) -> String {
            self.inner.name()
        }

        /// Returns reference to inner sync collection.
        pub fn inner(&self) -> &Collection {
            &self.inner
        }
    }

}

#[cfg(feature = "async")]
pub use async_api::AsyncCollection;
