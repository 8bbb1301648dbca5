//! Catalog sources and the catalog lister.
//!
//! This module provides the seam to the external data provider:
//! - `CatalogSource`: list pages and per-item detail lookups
//! - `Dnd5eClient`: HTTP implementation against the D&D 5e SRD API
//! - `CatalogLister`: flattens pagination into one complete catalog

pub mod dnd5e;
pub mod lister;
pub mod types;

pub use dnd5e::{Dnd5eClient, DEFAULT_BASE_URL};
pub use lister::{CatalogLister, DEFAULT_MAX_PAGES};
pub use types::*;
