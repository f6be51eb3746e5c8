//! JSON configuration and report helpers for crop row detection runs.

use crate::detector::{CropRowDetectionResult, CropRowDetector, CropRowError, CropRowParams};
use croprow_core::{LineSpace, RowLine};
use serde::{Deserialize, Serialize};
use std::{
    fs,
    path::{Path, PathBuf},
};

#[derive(thiserror::Error, Debug)]
pub enum CropRowIoError {
    #[error(transparent)]
    Io(#[from] std::io::Error),
    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

/// Configuration of a detection run over a directory of frames.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CropRowDetectConfig {
    pub image_dir: Option<String>,
    pub output_dir: Option<String>,
    pub params: CropRowParams,
}

impl CropRowDetectConfig {
    /// Load a JSON config from disk.
    pub fn load_json(path: impl AsRef<Path>) -> Result<Self, CropRowIoError> {
        let raw = fs::read_to_string(path)?;
        Ok(serde_json::from_str(&raw)?)
    }

    /// Write this config to disk as pretty JSON.
    pub fn write_json(&self, path: impl AsRef<Path>) -> Result<(), CropRowIoError> {
        let json = serde_json::to_string_pretty(self)?;
        fs::write(path, json)?;
        Ok(())
    }

    /// Resolve the output directory, `output` by default.
    pub fn output_dir(&self) -> PathBuf {
        self.output_dir
            .as_ref()
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from("output"))
    }

    pub fn build_detector(&self) -> Result<CropRowDetector, CropRowError> {
        CropRowDetector::new(self.params.clone())
    }
}

/// Outcome for one frame.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CropRowFrameReport {
    pub name: String,
    pub lines: Vec<RowLine>,
    pub space: LineSpace,
    pub latency_ms: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl CropRowFrameReport {
    pub fn from_result(
        name: impl Into<String>,
        result: &CropRowDetectionResult,
        latency_ms: f64,
    ) -> Self {
        Self {
            name: name.into(),
            lines: result.lines.clone(),
            space: result.space,
            latency_ms,
            error: None,
        }
    }

    pub fn failed(name: impl Into<String>, error: impl ToString) -> Self {
        Self {
            name: name.into(),
            lines: Vec::new(),
            space: LineSpace::default(),
            latency_ms: 0.0,
            error: Some(error.to_string()),
        }
    }
}

/// Report of a whole run.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CropRowDetectReport {
    pub params: CropRowParams,
    pub frames: Vec<CropRowFrameReport>,
    pub max_latency_ms: f64,
    pub mean_latency_ms: f64,
}

impl CropRowDetectReport {
    pub fn write_json(&self, path: impl AsRef<Path>) -> Result<(), CropRowIoError> {
        let json = serde_json::to_string_pretty(self)?;
        fs::write(path, json)?;
        Ok(())
    }
}
