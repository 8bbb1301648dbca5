//! Retrieval layers around a catalog source.
//!
//! Composition, outermost first: `MemoizedFetcher` -> `RetryingSource` ->
//! the raw `CatalogSource`. Cache hits never reach the retry loop.

pub mod memoized;
pub mod retry;

pub use memoized::{MemoizedFetcher, FETCH_DETAIL_OPERATION};
pub use retry::{RetryPolicy, RetryingSource};
