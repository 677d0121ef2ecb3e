//! # CairnDB
//!
//! **An embedded document store with similarity search for local AI and RAG workloads.**
//!
//! CairnDB keeps text documents, their embeddings and scalar metadata in
//! named collections, and answers "which stored documents are closest to
//! this text?" in-process:
//!
//! - **RAG applications** — Semantic retrieval for LLM context
//! - **Policy and knowledge lookup** — Query a corpus by meaning, filter by metadata
//! - **Offline use** — A deterministic local embedding model, no network needed
//!
//! ## Features
//!
//! | Feature | Description |
//! |---------|-------------|
//! | **Collections** | Named, independently configured record sets |
//! | **Embeddings** | Local hashing model or an OpenAI-compatible provider |
//! | **Distance Metrics** | Cosine, Euclidean, SquaredEuclidean |
//! | **Filtered Queries** | Combine similarity with metadata and document conditions |
//! | **Persistence** | WAL-based crash-safe durability, checkpointed data files |
//! | **Async API** | Tokio-compatible async operations (feature flag) |
//!
//! ## Quick Start
//!
//! ### In-Memory Catalog
//!
//! ```rust
//! use cairndb::prelude::*;
//!
//! let catalog = Catalog::in_memory();
//! let policies = catalog
//!     .get_or_create_collection("travel_policies", CollectionOptions::default())
//!     .unwrap();
//!
//! policies
//!     .add(
//!         RecordBatch::new(["flight_policy_01", "hotel_policy_01"])
//!             .with_documents([
//!                 "Economy class for domestic flights.",
//!                 "Hotels up to $250 per night.",
//!             ])
//!             .with_metadatas([
//!                 Metadata::new().with_field("policy_type", "flights"),
//!                 Metadata::new().with_field("policy_type", "hotels"),
//!             ]),
//!     )
//!     .unwrap();
//!
//! let results = policies
//!     .query(QueryRequest::texts(["flights"]).with_n_results(1))
//!     .unwrap();
//! assert_eq!(results[0].len(), 1);
//! ```
//!
//! ### Persistent Catalog
//!
//! ```no_run
//! use cairndb::prelude::*;
//!
//! fn main() -> Result<()> {
//!     let catalog = Catalog::open("./policy_db")?;
//!     let saved = catalog.get_or_create_collection("saved_policies", CollectionOptions::default())?;
//!
//!     saved.upsert(
//!         RecordBatch::new(["expense_policy_01"])
//!             .with_documents(["Receipts are required for expenses over $25."]),
//!     )?;
//!
//!     // Checkpoints every collection; the data survives a restart either way.
//!     catalog.close()?;
//!     Ok(())
//! }
//! ```
//!
//! ### Filtered Queries
//!
//! ```rust
//! use cairndb::prelude::*;
//!
//! let catalog = Catalog::in_memory();
//! let docs = catalog
//!     .create_collection(
//!         "vectors",
//!         CollectionOptions::new().with_embedding(EmbeddingConfig::local_with_dimension(3)),
//!     )
//!     .unwrap();
//!
//! docs.add(
//!     RecordBatch::new(["a", "b", "c"])
//!         .with_embeddings([vec![1.0, 0.0, 0.0], vec![0.9, 0.1, 0.0], vec![0.8, 0.2, 0.0]])
//!         .with_metadatas([
//!             Metadata::new().with_field("category", "A"),
//!             Metadata::new().with_field("category", "B"),
//!             Metadata::new().with_field("category", "A"),
//!         ]),
//! )
//! .unwrap();
//!
//! let results = docs
//!     .query(
//!         QueryRequest::embeddings([vec![1.0, 0.0, 0.0]])
//!             .with_filter(Filter::field("category").eq("A")),
//!     )
//!     .unwrap();
//!
//! assert_eq!(results[0].len(), 2); // Only category A results
//! ```
//!
//! ## Crate Features
//!
//! | Feature | Description |
//! |---------|-------------|
//! | `async` | Enables `AsyncCollection` for tokio compatibility |
//!
//! ```toml
//! [dependencies]
//! cairndb = { version = "0.1", features = ["async"] }
//! ```
//!
//! ## Architecture
//!
//! CairnDB is organized into two crates:
//!
//! - **`cairndb-core`** — Core library with no async runtime dependency
//! - **`cairndb`** — Main crate that re-exports everything
//!
//! ### Core Components
//!
//! - [`Catalog`] — Registry of collections, in memory or under a directory
//! - [`Collection`] — Thread-safe record store with WAL durability
//! - [`EmbeddingConfig`] — Local or provider embeddings, fixed per collection
//! - [`BruteForceIndex`] — Exact nearest neighbor search (O(n))
//! - [`Filter`] — Metadata and document filter expressions
//! - [`Metadata`] — Scalar key-value metadata for records
//!
//! ## Error Handling
//!
//! All fallible operations return [`Result<T>`](crate::Result), which uses
//! the [`Error`] enum for error types.
//!
//! ## Thread Safety
//!
//! - [`BruteForceIndex`] is not thread-safe; use external synchronization
//! - [`Catalog`] and [`Collection`] are cheap to clone and share across threads
//! - [`AsyncCollection`] is `Clone` and safe to share across tasks

// Re-export everything from core
pub use cairndb_core::*;
