//! Export module for run outputs.
//!
//! Provides the JSON records artifact and its run report sidecar.

pub mod artifact;

pub use artifact::{read_records, report_path_for, ArtifactWriter, JsonArtifactWriter};
