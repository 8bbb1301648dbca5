//! JSON artifact writer.
//!
//! The records artifact is a pretty-printed JSON array of normalized records
//! in sample order. The optional report sidecar (`<output>.report.json`)
//! carries the full [`PipelineResult`] so partial runs can be detected.

use async_trait::async_trait;
use serde::Serialize;
use serde_json::ser::PrettyFormatter;
use std::path::{Path, PathBuf};

use crate::error::ExportError;
use crate::pipeline::PipelineResult;
use crate::validation::NormalizedRecord;

/// Indentation of written JSON.
const INDENT: &[u8] = b"    ";

/// Persists the outcome of a run.
#[async_trait]
pub trait ArtifactWriter: Send + Sync {
    async fn write(&self, result: &PipelineResult) -> Result<(), ExportError>;
}

/// Writes records to a JSON file, replacing it atomically.
#[derive(Debug, Clone)]
pub struct JsonArtifactWriter {
    path: PathBuf,
    write_report: bool,
}

impl JsonArtifactWriter {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            write_report: true,
        }
    }

    pub fn with_report(mut self, enabled: bool) -> Self {
        self.write_report = enabled;
        self
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Path of the run report written next to the artifact.
    pub fn report_path(&self) -> PathBuf {
        report_path_for(&self.path)
    }
}

#[async_trait]
impl ArtifactWriter for JsonArtifactWriter {
    async fn write(&self, result: &PipelineResult) -> Result<(), ExportError> {
        write_json_atomic(&self.path, &result.records).await?;
        tracing::info!(
            path = %self.path.display(),
            records = result.records.len(),
            "Wrote records artifact"
        );

        if self.write_report {
            let report = self.report_path();
            write_json_atomic(&report, result).await?;
            tracing::debug!(path = %report.display(), "Wrote run report");
        }

        Ok(())
    }
}

/// `monsters.json` -> `monsters.report.json`.
pub fn report_path_for(path: &Path) -> PathBuf {
    let stem = path
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "output".to_string());
    path.with_file_name(format!("{stem}.report.json"))
}

/// Read a records artifact back.
pub async fn read_records(path: &Path) -> Result<Vec<NormalizedRecord>, ExportError> {
    let bytes = tokio::fs::read(path).await?;
    Ok(serde_json::from_slice(&bytes)?)
}

fn to_pretty_json<T: Serialize + ?Sized>(value: &T) -> Result<Vec<u8>, ExportError> {
    let mut buf = Vec::new();
    let mut ser = serde_json::Serializer::with_formatter(&mut buf, PrettyFormatter::with_indent(INDENT));
    value.serialize(&mut ser)?;
    buf.push(b'\n');
    Ok(buf)
}

/// Write to a sibling temp file, then rename over the target so readers
/// never observe a half-written artifact.
async fn write_json_atomic<T: Serialize + ?Sized + Sync>(
    path: &Path,
    value: &T,
) -> Result<(), ExportError> {
    let bytes = to_pretty_json(value)?;
    let wrap = |source: std::io::Error| ExportError::Write {
        path: path.display().to_string(),
        source,
    };

    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        tokio::fs::create_dir_all(parent).await.map_err(wrap)?;
    }

    let mut tmp = path.as_os_str().to_owned();
    tmp.push(".tmp");
    let tmp = PathBuf::from(tmp);

    tokio::fs::write(&tmp, &bytes).await.map_err(wrap)?;
    tokio::fs::rename(&tmp, path).await.map_err(wrap)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::ItemFailure;
    use crate::error::FailureKind;
    use crate::validation::{Action, Monster};
    use chrono::{NaiveDate, Utc};
    use uuid::Uuid;

    fn result_with(records: Vec<Monster>) -> PipelineResult {
        PipelineResult {
            run_id: Uuid::new_v4(),
            generated_for: NaiveDate::from_ymd_opt(2026, 10, 19).unwrap(),
            requested_count: records.len() + 1,
            records,
            failures: vec![ItemFailure {
                identifier: "kraken".into(),
                kind: FailureKind::NotFound,
                reason: "Item 'kraken' not found in catalog source".into(),
            }],
            finished_at: Utc::now(),
        }
    }

    fn owlbear() -> Monster {
        Monster {
            index: "owlbear".into(),
            name: "Owlbear".into(),
            hit_points: 59,
            armor_class: Some(13),
            actions: vec![Action {
                name: "Multiattack".into(),
                desc: "The owlbear makes two attacks.".into(),
            }],
        }
    }

    fn bat() -> Monster {
        Monster {
            index: "bat".into(),
            name: "Bat".into(),
            hit_points: 1,
            armor_class: None,
            actions: Vec::new(),
        }
    }

    #[test]
    fn test_report_path() {
        assert_eq!(
            report_path_for(Path::new("out/monsters.json")),
            PathBuf::from("out/monsters.report.json")
        );
        assert_eq!(
            report_path_for(Path::new("monsters")),
            PathBuf::from("monsters.report.json")
        );
    }

    #[tokio::test]
    async fn test_records_round_trip_in_order() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("monsters.json");
        let records = vec![owlbear(), bat()];

        JsonArtifactWriter::new(&path)
            .write(&result_with(records.clone()))
            .await
            .unwrap();

        let read = read_records(&path).await.unwrap();
        assert_eq!(read, records);
    }

    #[tokio::test]
    async fn test_report_sidecar_toggle() {
        let dir = tempfile::tempdir().unwrap();

        let with = JsonArtifactWriter::new(dir.path().join("a.json"));
        with.write(&result_with(vec![bat()])).await.unwrap();
        let report: serde_json::Value =
            serde_json::from_slice(&std::fs::read(with.report_path()).unwrap()).unwrap();
        assert_eq!(report["failures"][0]["identifier"], "kraken");
        assert_eq!(report["requested_count"], 2);

        let without = JsonArtifactWriter::new(dir.path().join("b.json")).with_report(false);
        without.write(&result_with(vec![bat()])).await.unwrap();
        assert!(!without.report_path().exists());
    }

    #[tokio::test]
    async fn test_overwrites_and_leaves_no_temp_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("monsters.json");
        let writer = JsonArtifactWriter::new(&path).with_report(false);

        writer.write(&result_with(vec![owlbear()])).await.unwrap();
        writer.write(&result_with(Vec::new())).await.unwrap();

        assert!(read_records(&path).await.unwrap().is_empty());
        let names: Vec<_> = std::fs::read_dir(path.parent().unwrap())
            .unwrap()
            .map(|e| e.unwrap().file_name())
            .collect();
        assert_eq!(names, vec![std::ffi::OsString::from("monsters.json")]);
    }

    #[tokio::test]
    async fn test_output_uses_four_space_indent() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("monsters.json");
        JsonArtifactWriter::new(&path)
            .with_report(false)
            .write(&result_with(vec![bat()]))
            .await
            .unwrap();

        let text = std::fs::read_to_string(&path).unwrap();
        assert!(text.starts_with("[\n    {\n        \"index\": \"bat\""));
    }
}
