//! Core types and error definitions for gesture_dataset.

use std::path::PathBuf;
use thiserror::Error;

/// Gesture classes are a closed set: labels 0 through 10.
pub const NUM_CLASSES: usize = 11;

pub type DatasetResult<T> = Result<T, GestureDatasetError>;

#[derive(Debug, Error)]
pub enum GestureDatasetError {
    #[error("io error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("json parse error at {path}: {source}")]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
    #[error("not a gesture pack at {path}: {msg}")]
    Format { path: PathBuf, msg: String },
    #[error("label validation failed at {path}: {msg}")]
    Validation { path: PathBuf, msg: String },
    #[error("payload checksum mismatch at {path}")]
    Checksum { path: PathBuf },
    #[error("{0}")]
    Other(String),
}

/// One dataset sample: a fixed-length stack of grayscale frames plus a label.
#[derive(Debug, Clone)]
pub struct GestureSample {
    /// Frame stack in frame-major layout, `n_frame * height * width` floats
    /// normalized to [0, 1].
    pub frames: Vec<f32>,
    pub n_frame: usize,
    pub width: u32,
    pub height: u32,
    pub label: u32,
}
