use crate::core::mask::MaskTable;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

const CONFIG_DIR: &str = "framecull";
const CONFIG_FILE: &str = "config.json";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error reading {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid settings file {}: {source}", path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("Blur kernel size must be odd or 0, got {0}")]
    InvalidBlurRadius(u32),

    #[error("Score threshold must be a non-negative number, got {0}")]
    InvalidThreshold(f64),

    #[error("Minimum contour area must be a non-negative number, got {0}")]
    InvalidMinArea(f64),

    #[error("Worker count must be at least 1")]
    InvalidWorkers,
}

/// Comparison settings shared by every camera task
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Gaussian kernel sizes, applied in order
    pub blur_kernels: Vec<u32>,
    /// Contours smaller than this are noise
    pub min_contour_area: f64,
    /// Pairs scoring below this are duplicates
    pub score_threshold: f64,
    /// Worker pool size; `None` uses every available core
    pub workers: Option<usize>,
    pub masks: MaskTable,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            blur_kernels: vec![5, 11, 21],
            min_contour_area: 500.0,
            score_threshold: 100.0,
            workers: None,
            masks: MaskTable::default(),
        }
    }
}

impl Settings {
    /// Reads settings from `path`, or from the user config file when no path
    /// is given. Falls back to defaults when neither exists.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let path = match path {
            Some(path) => path.to_path_buf(),
            None => match default_config_path().filter(|p| p.is_file()) {
                Some(path) => path,
                None => {
                    log::debug!("No settings file found, using defaults");
                    return Ok(Self::default());
                }
            },
        };

        Self::from_file(&path)
    }

    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let settings: Settings =
            serde_json::from_str(&content).map_err(|source| ConfigError::Parse {
                path: path.to_path_buf(),
                source,
            })?;

        log::info!("Loaded settings from {}", path.display());
        settings.validate()?;
        Ok(settings)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if let Some(&k) = self.blur_kernels.iter().find(|&&k| k != 0 && k % 2 == 0) {
            return Err(ConfigError::InvalidBlurRadius(k));
        }
        if !self.score_threshold.is_finite() || self.score_threshold < 0.0 {
            return Err(ConfigError::InvalidThreshold(self.score_threshold));
        }
        if !self.min_contour_area.is_finite() || self.min_contour_area < 0.0 {
            return Err(ConfigError::InvalidMinArea(self.min_contour_area));
        }
        if self.workers == Some(0) {
            return Err(ConfigError::InvalidWorkers);
        }
        Ok(())
    }

    pub fn worker_count(&self) -> usize {
        self.workers.unwrap_or_else(|| {
            std::thread::available_parallelism()
                .map(|n| n.get())
                .unwrap_or(1)
        })
    }
}

/// `<config dir>/framecull/config.json`, if the platform has a config dir
pub fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join(CONFIG_DIR).join(CONFIG_FILE))
}
