//! Gesture pack file format: reading, writing, and manifest sidecars.
//!
//! Layout (little-endian):
//!
//! ```text
//! magic     8 bytes  b"GSTPACK1"
//! version   u32      = 1
//! samples   u32
//! n_frame   u32      stored frames per sample
//! height    u32
//! width     u32
//! checksum  32 bytes SHA-256 of the payload region
//! payload   per sample: label u32, then n_frame*height*width f32 in [0, 1]
//!           (frame-major, row-major within a frame)
//! ```

use crate::types::{DatasetResult, GestureDatasetError, GestureSample, NUM_CLASSES};
use serde::{Deserialize, Serialize};
use sha2::Digest;
use std::fs;
use std::path::{Path, PathBuf};

const MAGIC: &[u8; 8] = b"GSTPACK1";
const PACK_VERSION: u32 = 1;
const HEADER_LEN: usize = 8 + 5 * 4 + 32;
const CHECKSUM_OFFSET: usize = 8 + 5 * 4;

/// A fully loaded gesture pack. Read-only after construction; one instance
/// per split per run.
pub struct GesturePack {
    path: PathBuf,
    n_frame: usize,
    width: u32,
    height: u32,
    labels: Vec<u32>,
    /// All frame data, sample-major then frame-major.
    frames: Vec<f32>,
}

impl GesturePack {
    pub fn load(path: &Path) -> DatasetResult<Self> {
        let raw = fs::read(path).map_err(|e| GestureDatasetError::Io {
            path: path.to_path_buf(),
            source: e,
        })?;
        if raw.len() < HEADER_LEN {
            return Err(GestureDatasetError::Format {
                path: path.to_path_buf(),
                msg: format!("file too short for header ({} bytes)", raw.len()),
            });
        }
        if &raw[0..8] != MAGIC {
            return Err(GestureDatasetError::Format {
                path: path.to_path_buf(),
                msg: "bad magic".to_string(),
            });
        }
        let version = read_u32(&raw, 8);
        if version != PACK_VERSION {
            return Err(GestureDatasetError::Format {
                path: path.to_path_buf(),
                msg: format!("unsupported version {version}"),
            });
        }
        let samples = read_u32(&raw, 12) as usize;
        let n_frame = read_u32(&raw, 16) as usize;
        let height = read_u32(&raw, 20);
        let width = read_u32(&raw, 24);

        let frame_elems = n_frame
            .checked_mul(height as usize)
            .and_then(|v| v.checked_mul(width as usize))
            .ok_or_else(|| GestureDatasetError::Format {
                path: path.to_path_buf(),
                msg: "frame size overflow".to_string(),
            })?;
        let sample_bytes = 4 + frame_elems * 4;
        let expected = samples
            .checked_mul(sample_bytes)
            .ok_or_else(|| GestureDatasetError::Format {
                path: path.to_path_buf(),
                msg: "payload size overflow".to_string(),
            })?;
        let payload = &raw[HEADER_LEN..];
        if payload.len() != expected {
            return Err(GestureDatasetError::Format {
                path: path.to_path_buf(),
                msg: format!(
                    "payload is {} bytes, expected {} for {} samples",
                    payload.len(),
                    expected,
                    samples
                ),
            });
        }

        if !skip_checksum_from_env() {
            let digest = sha2::Sha256::digest(payload);
            if digest.as_slice() != &raw[CHECKSUM_OFFSET..HEADER_LEN] {
                return Err(GestureDatasetError::Checksum {
                    path: path.to_path_buf(),
                });
            }
        }

        let mut labels = Vec::with_capacity(samples);
        let mut frames = Vec::with_capacity(samples * frame_elems);
        for s in 0..samples {
            let base = s * sample_bytes;
            let label = read_u32(payload, base);
            if label as usize >= NUM_CLASSES {
                return Err(GestureDatasetError::Validation {
                    path: path.to_path_buf(),
                    msg: format!("sample {s} label {label} outside 0..{NUM_CLASSES}"),
                });
            }
            labels.push(label);
            for chunk in payload[base + 4..base + sample_bytes].chunks_exact(4) {
                let mut arr = [0u8; 4];
                arr.copy_from_slice(chunk);
                frames.push(f32::from_le_bytes(arr));
            }
        }

        Ok(Self {
            path: path.to_path_buf(),
            n_frame,
            width,
            height,
            labels,
            frames,
        })
    }

    pub fn len(&self) -> usize {
        self.labels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }

    /// Frames stored per sample (the maximum a caller may request).
    pub fn n_frame(&self) -> usize {
        self.n_frame
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Label of sample `idx`.
    ///
    /// # Panics
    ///
    /// Panics when `idx` is out of range; use [`GesturePack::sample`] for a
    /// checked lookup.
    pub fn label(&self, idx: usize) -> u32 {
        self.labels[idx]
    }

    /// Extract sample `idx` truncated to the leading `n_frame` frames.
    pub fn sample(&self, idx: usize, n_frame: usize) -> DatasetResult<GestureSample> {
        if idx >= self.labels.len() {
            return Err(GestureDatasetError::Other(format!(
                "sample {idx} out of range for {}",
                self.path.display()
            )));
        }
        if n_frame == 0 || n_frame > self.n_frame {
            return Err(GestureDatasetError::Validation {
                path: self.path.clone(),
                msg: format!(
                    "requested {n_frame} frames but pack stores {}",
                    self.n_frame
                ),
            });
        }
        let frame_elems = self.height as usize * self.width as usize;
        let stored = self.n_frame * frame_elems;
        let start = idx * stored;
        let frames = self.frames[start..start + n_frame * frame_elems].to_vec();
        Ok(GestureSample {
            frames,
            n_frame,
            width: self.width,
            height: self.height,
            label: self.labels[idx],
        })
    }

    /// Per-class sample counts; the label set is closed over 0..NUM_CLASSES.
    pub fn class_histogram(&self) -> [usize; NUM_CLASSES] {
        let mut hist = [0usize; NUM_CLASSES];
        for &label in &self.labels {
            hist[label as usize] += 1;
        }
        hist
    }
}

/// Write a gesture pack. Each sample is `(label, frames)` with
/// `n_frame * height * width` floats.
pub fn write_pack(
    path: &Path,
    n_frame: usize,
    height: u32,
    width: u32,
    samples: &[(u32, Vec<f32>)],
) -> DatasetResult<()> {
    let frame_elems = n_frame * height as usize * width as usize;
    for (i, (label, frames)) in samples.iter().enumerate() {
        if *label as usize >= NUM_CLASSES {
            return Err(GestureDatasetError::Validation {
                path: path.to_path_buf(),
                msg: format!("sample {i} label {label} outside 0..{NUM_CLASSES}"),
            });
        }
        if frames.len() != frame_elems {
            return Err(GestureDatasetError::Validation {
                path: path.to_path_buf(),
                msg: format!(
                    "sample {i} has {} floats, expected {frame_elems}",
                    frames.len()
                ),
            });
        }
    }

    let mut payload = Vec::with_capacity(samples.len() * (4 + frame_elems * 4));
    for (label, frames) in samples {
        payload.extend_from_slice(&label.to_le_bytes());
        for v in frames {
            payload.extend_from_slice(&v.to_le_bytes());
        }
    }
    let checksum = sha2::Sha256::digest(&payload);

    let mut out = Vec::with_capacity(HEADER_LEN + payload.len());
    out.extend_from_slice(MAGIC);
    out.extend_from_slice(&PACK_VERSION.to_le_bytes());
    out.extend_from_slice(&(samples.len() as u32).to_le_bytes());
    out.extend_from_slice(&(n_frame as u32).to_le_bytes());
    out.extend_from_slice(&height.to_le_bytes());
    out.extend_from_slice(&width.to_le_bytes());
    out.extend_from_slice(checksum.as_slice());
    out.extend_from_slice(&payload);

    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() && !parent.exists() {
            fs::create_dir_all(parent).map_err(|e| GestureDatasetError::Io {
                path: parent.to_path_buf(),
                source: e,
            })?;
        }
    }
    fs::write(path, out).map_err(|e| GestureDatasetError::Io {
        path: path.to_path_buf(),
        source: e,
    })
}

/// JSON sidecar describing a generated pack (written by `packgen`).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PackManifest {
    pub path: String,
    pub samples: usize,
    pub n_frame: usize,
    pub height: u32,
    pub width: u32,
    /// Hex-encoded SHA-256 of the payload region.
    pub checksum_sha256: String,
    pub class_histogram: Vec<usize>,
}

impl PackManifest {
    /// Build a manifest by re-reading an existing pack file.
    pub fn from_pack_file(path: &Path) -> DatasetResult<Self> {
        let raw = fs::read(path).map_err(|e| GestureDatasetError::Io {
            path: path.to_path_buf(),
            source: e,
        })?;
        let pack = GesturePack::load(path)?;
        let digest = sha2::Sha256::digest(&raw[HEADER_LEN..]);
        Ok(Self {
            path: path.display().to_string(),
            samples: pack.len(),
            n_frame: pack.n_frame(),
            height: pack.height(),
            width: pack.width(),
            checksum_sha256: format!("{:x}", digest),
            class_histogram: pack.class_histogram().to_vec(),
        })
    }

    pub fn save(&self, path: &Path) -> DatasetResult<()> {
        let data = serde_json::to_vec_pretty(self).map_err(|e| GestureDatasetError::Json {
            path: path.to_path_buf(),
            source: e,
        })?;
        fs::write(path, data).map_err(|e| GestureDatasetError::Io {
            path: path.to_path_buf(),
            source: e,
        })
    }

    pub fn load(path: &Path) -> DatasetResult<Self> {
        let raw = fs::read(path).map_err(|e| GestureDatasetError::Io {
            path: path.to_path_buf(),
            source: e,
        })?;
        serde_json::from_slice(&raw).map_err(|e| GestureDatasetError::Json {
            path: path.to_path_buf(),
            source: e,
        })
    }
}

fn read_u32(buf: &[u8], offset: usize) -> u32 {
    let mut arr = [0u8; 4];
    arr.copy_from_slice(&buf[offset..offset + 4]);
    u32::from_le_bytes(arr)
}

fn skip_checksum_from_env() -> bool {
    std::env::var("GESTURE_PACK_SKIP_CHECKSUM")
        .ok()
        .map(|v| v.trim().to_ascii_lowercase())
        .map(|v| v == "1" || v == "true" || v == "on")
        .unwrap_or(false)
}
