//! Append-only JSON-lines record of delivered results.
//!
//! One line per tick with at least one label, written to
//! `<results_dir>/labels.jsonl`. The file is opened in append mode for each
//! record so external rotation is safe.

use std::fs::OpenOptions;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::detect::BoundingBox;
use crate::pipeline::PipelineRun;

pub const RESULTS_FILE: &str = "labels.jsonl";

/// One serialized tick.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct ResultRecord {
    /// Milliseconds since the Unix epoch.
    pub timestamp_ms: u64,
    pub labels: Vec<String>,
    pub scores: Vec<f32>,
    pub boxes: Vec<[f32; 4]>,
    pub localize_ms: f64,
    pub classify_ms: f64,
}

impl ResultRecord {
    pub fn from_run(run: &PipelineRun) -> Self {
        Self {
            timestamp_ms: now_millis(),
            labels: run.labels.clone(),
            scores: run.detections.iter().map(|d| d.score).collect(),
            boxes: run.detections.iter().map(|d| corners(&d.bbox)).collect(),
            localize_ms: run.localize_time.as_secs_f64() * 1000.0,
            classify_ms: run.classify_time.as_secs_f64() * 1000.0,
        }
    }
}

pub struct ResultLog {
    path: PathBuf,
}

impl ResultLog {
    /// Create `dir` if needed and target `dir/labels.jsonl`.
    pub fn open<P: AsRef<Path>>(dir: P) -> Result<Self> {
        let dir = dir.as_ref();
        std::fs::create_dir_all(dir)
            .with_context(|| format!("failed to create results dir {}", dir.display()))?;
        Ok(Self {
            path: dir.join(RESULTS_FILE),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn append(&self, record: &ResultRecord) -> Result<()> {
        let mut line = serde_json::to_string(record).context("serialize result record")?;
        line.push('\n');
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .with_context(|| format!("failed to open {}", self.path.display()))?;
        file.write_all(line.as_bytes())
            .with_context(|| format!("failed to write {}", self.path.display()))?;
        Ok(())
    }

    /// Read every record back, oldest first.
    pub fn read_all(&self) -> Result<Vec<ResultRecord>> {
        let contents = match std::fs::read_to_string(&self.path) {
            Ok(contents) => contents,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(err) => {
                return Err(err).with_context(|| format!("failed to read {}", self.path.display()))
            }
        };
        contents
            .lines()
            .filter(|line| !line.trim().is_empty())
            .enumerate()
            .map(|(i, line)| {
                serde_json::from_str(line)
                    .with_context(|| format!("{} line {}", self.path.display(), i + 1))
            })
            .collect()
    }
}

fn corners(bbox: &BoundingBox) -> [f32; 4] {
    [bbox.xmin, bbox.ymin, bbox.xmax, bbox.ymax]
}

fn now_millis() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::detect::{Detection, Label};
    use std::time::Duration;

    #[test]
    fn appends_one_line_per_record() -> Result<()> {
        let dir = tempfile::tempdir()?;
        let log = ResultLog::open(dir.path().join("nested"))?;
        assert!(log.read_all()?.is_empty());

        let run = PipelineRun {
            detections: vec![Detection {
                bbox: BoundingBox::new(1.0, 2.0, 3.0, 4.0),
                score: 0.9,
                label: Label::Candidate,
            }],
            labels: vec!["Stop".to_string()],
            localize_time: Duration::from_millis(12),
            classify_time: Duration::from_millis(3),
        };
        log.append(&ResultRecord::from_run(&run))?;
        log.append(&ResultRecord::from_run(&run))?;

        let records = log.read_all()?;
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].labels, vec!["Stop".to_string()]);
        assert_eq!(records[0].boxes, vec![[1.0, 2.0, 3.0, 4.0]]);
        assert_eq!(records[0].scores, vec![0.9]);
        assert_eq!(std::fs::read_to_string(log.path())?.lines().count(), 2);
        Ok(())
    }
}
