//! Destinations for the periodic side effects of training.

use std::{
    fs::{File, OpenOptions},
    io::{BufWriter, Write},
    path::{Path, PathBuf},
    time::{SystemTime, UNIX_EPOCH},
};

use burn::tensor::{backend::Backend, Tensor};
use serde::{Deserialize, Serialize};

use crate::{
    error::{DeepFillError, DeepFillResult},
    visualize::save_image_grid,
};

/// Receives scalar training metrics.
pub trait MetricsSink {
    /// Records `value` under `name` at training step `step`.
    ///
    /// # Errors
    ///
    /// Returns `Err(DeepFillError::SinkError)` if the value cannot be stored.
    fn add_scalar(&mut self, name: &str, value: f64, step: usize) -> DeepFillResult<()>;
}

/// Receives formatted progress lines.
pub trait LogSink {
    fn log_line(&mut self, line: &str);
}

/// Persists image grids.
pub trait ImageSink<B: Backend> {
    /// Tiles `images` with `columns` per row and writes them to `path`.
    ///
    /// # Errors
    ///
    /// Returns `Err(DeepFillError::SinkError)` if the grid cannot be written.
    fn save_grid(
        &mut self,
        images: Tensor<B, 4>,
        path: &Path,
        columns: usize,
        normalize: bool,
    ) -> DeepFillResult<()>;
}

/// One line of the metrics file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScalarRecord {
    pub name: String,
    pub value: f64,
    pub step: usize,
    /// Seconds since the Unix epoch.
    pub wall_time: f64,
}

/// Appends metrics as JSON lines.
pub struct JsonlMetricsWriter {
    path: PathBuf,
    writer: BufWriter<File>,
}

impl JsonlMetricsWriter {
    /// Opens `path` for appending, creating it if needed.
    ///
    /// # Errors
    ///
    /// Returns `Err(DeepFillError::SinkError)` if the file cannot be opened.
    pub fn create(path: impl Into<PathBuf>) -> DeepFillResult<Self> {
        let path = path.into();
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .map_err(|e| sink_error(&path, e))?;
        Ok(Self {
            path,
            writer: BufWriter::new(file),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

fn sink_error(path: &Path, reason: impl std::fmt::Display) -> DeepFillError {
    DeepFillError::SinkError {
        sink: path.display().to_string(),
        reason: reason.to_string(),
    }
}

impl MetricsSink for JsonlMetricsWriter {
    fn add_scalar(&mut self, name: &str, value: f64, step: usize) -> DeepFillResult<()> {
        let wall_time = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map_or(0.0, |elapsed| elapsed.as_secs_f64());
        let record = ScalarRecord {
            name: name.to_string(),
            value,
            step,
            wall_time,
        };

        serde_json::to_writer(&mut self.writer, &record).map_err(|e| sink_error(&self.path, e))?;
        self.writer
            .write_all(b"\n")
            .and_then(|()| self.writer.flush())
            .map_err(|e| sink_error(&self.path, e))
    }
}

/// Forwards progress lines to `tracing` at info level.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingLog;

impl LogSink for TracingLog {
    fn log_line(&mut self, line: &str) {
        tracing::info!("{line}");
    }
}

/// Writes image grids as PNG files.
#[derive(Debug, Default, Clone, Copy)]
pub struct GridWriter;

impl<B: Backend> ImageSink<B> for GridWriter {
    fn save_grid(
        &mut self,
        images: Tensor<B, 4>,
        path: &Path,
        columns: usize,
        normalize: bool,
    ) -> DeepFillResult<()> {
        save_image_grid(images, path, columns, normalize)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_jsonl_writer_appends_records() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("metrics.jsonl");

        let mut writer = JsonlMetricsWriter::create(&path).unwrap();
        writer.add_scalar("l1", 0.25, 5).unwrap();
        writer.add_scalar("d", -1.5, 5).unwrap();
        drop(writer);

        // Reopening appends instead of truncating.
        let mut writer = JsonlMetricsWriter::create(&path).unwrap();
        writer.add_scalar("l1", 0.125, 10).unwrap();

        let records: Vec<ScalarRecord> = std::fs::read_to_string(&path)
            .unwrap()
            .lines()
            .map(|line| serde_json::from_str(line).unwrap())
            .collect();
        assert_eq!(records.len(), 3);
        assert_eq!(records[0].name, "l1");
        assert_eq!(records[1].value, -1.5);
        assert_eq!(records[2].step, 10);
        assert!(records[2].wall_time > 0.0);
    }

    #[test]
    fn test_writer_fails_for_missing_directory() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("missing").join("metrics.jsonl");
        assert!(matches!(
            JsonlMetricsWriter::create(path),
            Err(DeepFillError::SinkError { .. })
        ));
    }
}
