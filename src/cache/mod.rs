//! Durable memoization of source calls.
//!
//! Entries are keyed by a hash of the call's identifying inputs and never
//! expire: catalog details are fixed reference data.

pub mod key;
pub mod sqlite;
pub mod store;

pub use key::CacheKey;
pub use sqlite::{CacheStats, SqliteCacheStore};
pub use store::{CacheEntry, CacheStore, InMemoryCacheStore};
