//! Record validation for monster-forge.
//!
//! This module checks raw detail payloads against the monster schema and
//! normalizes them into [`Monster`] records.

pub mod monster;

pub use monster::{validate, Action, Monster, NormalizedRecord};
