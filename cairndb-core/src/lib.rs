//! # CairnDB Core
//!
//! Core library for CairnDB, an embedded document store with similarity
//! search.
//!
//! Documents are stored in named collections together with an embedding and
//! scalar metadata. Collections answer nearest-neighbor queries by text or by
//! vector, and a catalog can keep them durable on disk across restarts.
//!
//! ## Crate Features
//!
//! - `async` - Enables [`AsyncCollection`] for tokio-compatible async operations
//!
//! ## Core Types
//!
//! ### Catalog and collections
//!
//! - [`Catalog`] - Registry of named collections, in memory or on disk
//! - [`Collection`] - Thread-safe record store with WAL durability
//! - [`AsyncCollection`] - Async wrapper for tokio compatibility (requires `async` feature)
//!
//! ### Embeddings
//!
//! - [`EmbeddingConfig`] - Per-collection choice of vector codec
//! - [`LocalEmbedder`] - Deterministic offline model
//! - [`ProviderEmbedder`] - OpenAI-compatible embeddings API
//!
//! ### Search
//!
//! - [`BruteForceIndex`] - Exact nearest neighbor search, O(n) complexity
//! - [`Filter`] - Declarative conditions on metadata and document text
//! - [`DistanceMetric`] - Supported distance functions
//!
//! ### Types
//!
//! - [`Record`] / [`RecordBatch`] - Stored documents and write requests
//! - [`Metadata`] - Scalar key-value metadata

pub mod catalog;
pub mod codec;
pub mod collection;
pub mod distance;
pub mod error;
pub mod filter;
pub mod index;
pub mod metadata;
pub mod record;
pub mod storage;

// Re-exports for convenient access
pub use catalog::{
    validate_collection_name, Catalog, CatalogConfig, CollectionInfo, CollectionOptions,
    CollectionUpdate, DEFAULT_CHECKPOINT_THRESHOLD,
};
pub use codec::{
    EmbeddingConfig, LocalEmbedder, ProviderConfig, ProviderEmbedder, VectorCodec,
    DEFAULT_LOCAL_DIMENSION, DEFAULT_PROVIDER_MODEL,
};
#[cfg(feature = "async")]
pub use collection::AsyncCollection;
pub use collection::{
    Collection, CollectionConfig, GetRequest, QueryInput, QueryRequest, DEFAULT_N_RESULTS,
};
pub use distance::DistanceMetric;
pub use error::{Error, Result};
pub use filter::{FieldFilter, Filter, FilterCondition};
pub use index::{BruteForceIndex, SearchResult};
pub use metadata::{Metadata, MetadataValue};
pub use record::{Record, RecordBatch};

/// Re-export commonly used types for convenience.
///
/// # Example
///
/// ```rust
/// use cairndb_core::prelude::*;
///
/// let catalog = Catalog::in_memory();
/// let notes = catalog
///     .get_or_create_collection("notes", CollectionOptions::default())
///     .unwrap();
/// notes
///     .add(RecordBatch::new(["n1"]).with_documents(["remember the milk"]))
///     .unwrap();
/// assert_eq!(notes.count().unwrap(), 1);
/// ```
pub mod prelude {
    pub use crate::{
        Catalog, CatalogConfig, Collection, CollectionConfig, CollectionOptions,
        CollectionUpdate, DistanceMetric, EmbeddingConfig, Error, Filter, GetRequest, Metadata,
        ProviderConfig, QueryRequest, Record, RecordBatch, Result, SearchResult,
    };
    #[cfg(feature = "async")]
    pub use crate::AsyncCollection;
}
