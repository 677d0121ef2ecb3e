//! In-memory record indexes.

pub mod brute_force;

pub use brute_force::{BruteForceIndex, SearchResult};
