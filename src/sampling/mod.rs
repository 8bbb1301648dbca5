//! Deterministic daily sampling.
//!
//! A sample is a pure function of the catalog contents and the calendar
//! date: the date's canonical `YYYY-MM-DD` form is hashed into a ChaCha8
//! seed, the catalog is put into a canonical order, and a seeded shuffle
//! picks the first `count` entries. Rerunning on the same day reproduces the
//! sample; the next day rotates it.
//!
//! # Example
//!
//! ```ignore
//! use monster_forge::sampling::DailySampler;
//!
//! let sampler = DailySampler::for_date(date);
//! let sample = sampler.sample(&catalog, 5);
//! ```

use chrono::NaiveDate;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::collections::BTreeSet;

use crate::collectors::CatalogEntry;

/// Canonical text form of a seed date.
pub fn canonical_date(date: NaiveDate) -> String {
    date.format("%Y-%m-%d").to_string()
}

/// Ordered identifiers selected for one run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Sample {
    /// Date the sample was seeded with.
    pub seed_date: NaiveDate,

    /// Selected identifiers in draw order. No duplicates.
    pub identifiers: Vec<String>,
}

impl Sample {
    pub fn len(&self) -> usize {
        self.identifiers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.identifiers.is_empty()
    }
}

/// Sampler seeded from a calendar date.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DailySampler {
    date: NaiveDate,
}

impl DailySampler {
    pub fn for_date(date: NaiveDate) -> Self {
        Self { date }
    }

    pub fn date(&self) -> NaiveDate {
        self.date
    }

    /// 32-byte ChaCha8 seed: SHA-256 of the canonical date string.
    pub fn seed(&self) -> [u8; 32] {
        let digest = Sha256::digest(canonical_date(self.date).as_bytes());
        let mut seed = [0u8; 32];
        seed.copy_from_slice(&digest);
        seed
    }

    /// Draw up to `count` distinct entries from `catalog`.
    ///
    /// The catalog is sorted by identifier and deduplicated first, so the
    /// result does not depend on upstream ordering. Asking for more than the
    /// catalog holds returns the whole catalog in seeded order.
    pub fn sample(&self, catalog: &[CatalogEntry], count: usize) -> Sample {
        let mut pool = canonicalize(catalog);
        let mut rng = ChaCha8Rng::from_seed(self.seed());
        pool.shuffle(&mut rng);
        pool.truncate(count);

        Sample {
            seed_date: self.date,
            identifiers: pool,
        }
    }
}

/// Sorted, duplicate-free identifiers.
fn canonicalize(catalog: &[CatalogEntry]) -> Vec<String> {
    let unique: BTreeSet<&str> = catalog
        .iter()
        .map(|entry| entry.identifier.as_str())
        .collect();
    unique.into_iter().map(str::to_string).collect()
}
