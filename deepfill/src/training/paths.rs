//! Layout of a run directory.

use std::{
    fs,
    path::{Path, PathBuf},
};

use crate::error::{DeepFillError, DeepFillResult};

/// Directories of one training run.
///
/// `<root>/<dataset_name>/` holds a copy of the configuration next to
/// `run/` (metrics), `log/` (text log), `image/` (visualization grids) and
/// `model/` (checkpoints).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunPaths {
    pub root: PathBuf,
    pub run: PathBuf,
    pub log: PathBuf,
    pub image: PathBuf,
    pub model: PathBuf,
}

impl RunPaths {
    /// Creates the run directories below `root/dataset_name`.
    ///
    /// # Errors
    ///
    /// Returns `Err(DeepFillError::SinkError)` if a directory cannot be created.
    pub fn create(root: &Path, dataset_name: &str) -> DeepFillResult<Self> {
        let root = root.join(dataset_name);
        let paths = Self {
            run: root.join("run"),
            log: root.join("log"),
            image: root.join("image"),
            model: root.join("model"),
            root,
        };

        for dir in [&paths.run, &paths.log, &paths.image, &paths.model] {
            fs::create_dir_all(dir).map_err(|e| DeepFillError::SinkError {
                sink: dir.display().to_string(),
                reason: e.to_string(),
            })?;
        }
        Ok(paths)
    }

    /// Copies the configuration file into the run root.
    ///
    /// # Errors
    ///
    /// Returns `Err(DeepFillError::SinkError)` if the file cannot be copied.
    pub fn copy_config(&self, config_path: &Path) -> DeepFillResult<PathBuf> {
        let file_name = config_path
            .file_name()
            .map_or_else(|| "config.json".into(), |name| name.to_os_string());
        let target = self.root.join(file_name);
        fs::copy(config_path, &target).map_err(|e| DeepFillError::SinkError {
            sink: target.display().to_string(),
            reason: e.to_string(),
        })?;
        Ok(target)
    }

    /// File name of the visualization grid of `iteration`.
    pub fn grid(&self, iteration: usize) -> PathBuf {
        self.image.join(format!("niter_{iteration:03}.png"))
    }

    pub fn metrics(&self) -> PathBuf {
        self.run.join("metrics.jsonl")
    }

    pub fn log_file(&self) -> PathBuf {
        self.log.join("train.log")
    }
}
