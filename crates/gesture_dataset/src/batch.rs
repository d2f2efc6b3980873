//! Batch iteration for training and validation.

use crate::archive::GesturePack;
use crate::aug::RandomResizedCrop;
use crate::types::{DatasetResult, GestureDatasetError, GestureSample};
use burn::tensor::{backend::Backend, Int, Tensor, TensorData};
use rand::seq::SliceRandom;
use rand::SeedableRng;
use rayon::prelude::*;
use std::time::{Duration, Instant};

pub(crate) const DEFAULT_LOG_EVERY_SAMPLES: usize = 1000;

#[derive(Debug, Clone)]
pub struct DatasetConfig {
    /// Frames taken from the head of each stored sequence.
    pub n_frame: usize,
    /// Shuffle samples before iteration.
    pub shuffle: bool,
    /// Seed for reproducible shuffling and augmentation.
    pub seed: Option<u64>,
    /// Drop the final partial batch; the default keeps it.
    pub drop_last: bool,
    /// Optional augmentation applied per sample (train split only).
    pub transform: Option<RandomResizedCrop>,
}

impl Default for DatasetConfig {
    fn default() -> Self {
        Self {
            n_frame: 60,
            shuffle: true,
            seed: None,
            drop_last: false,
            transform: None,
        }
    }
}

pub struct GestureBatch<B: Backend> {
    /// Frame stacks, `[batch, n_frame, h, w]`.
    pub frames: Tensor<B, 4>,
    /// Gesture labels, `[batch]`.
    pub labels: Tensor<B, 1, Int>,
}

pub struct BatchIter<'a> {
    pack: &'a GesturePack,
    order: Vec<usize>,
    cursor: usize,
    cfg: DatasetConfig,
    processed_samples: usize,
    processed_batches: usize,
    started: Instant,
    last_log: Instant,
    last_logged_samples: usize,
    log_every_samples: Option<usize>,
    frames_buf: Vec<f32>,
    labels_buf: Vec<i64>,
}

impl<'a> BatchIter<'a> {
    pub fn new(pack: &'a GesturePack, cfg: DatasetConfig) -> DatasetResult<Self> {
        if cfg.n_frame == 0 || cfg.n_frame > pack.n_frame() {
            return Err(GestureDatasetError::Validation {
                path: pack.path().to_path_buf(),
                msg: format!(
                    "requested {} frames but pack stores {}",
                    cfg.n_frame,
                    pack.n_frame()
                ),
            });
        }
        let mut order: Vec<usize> = (0..pack.len()).collect();
        if cfg.shuffle {
            let mut rng = match cfg.seed {
                Some(seed) => rand::rngs::StdRng::seed_from_u64(seed),
                None => rand::rngs::StdRng::from_rng(&mut rand::rng()),
            };
            order.shuffle(&mut rng);
        }
        let log_every_samples = match std::env::var("GESTURE_DATASET_LOG_EVERY") {
            Ok(val) => {
                if val.eq_ignore_ascii_case("off") || val.trim() == "0" {
                    None
                } else {
                    val.parse::<usize>().ok().filter(|v| *v > 0)
                }
            }
            Err(_) => Some(DEFAULT_LOG_EVERY_SAMPLES),
        };
        let now = Instant::now();
        Ok(Self {
            pack,
            order,
            cursor: 0,
            cfg,
            processed_samples: 0,
            processed_batches: 0,
            started: now,
            last_log: now,
            last_logged_samples: 0,
            log_every_samples,
            frames_buf: Vec::new(),
            labels_buf: Vec::new(),
        })
    }

    /// Sample order after shuffling; useful for reproducibility checks.
    pub fn order(&self) -> &[usize] {
        &self.order
    }

    pub fn next_batch<B: Backend>(
        &mut self,
        batch_size: usize,
        device: &B::Device,
    ) -> DatasetResult<Option<GestureBatch<B>>> {
        let batch_size = batch_size.max(1);
        if self.cursor >= self.order.len() {
            return Ok(None);
        }
        let end = (self.cursor + batch_size).min(self.order.len());
        let slice = &self.order[self.cursor..end];
        self.cursor = end;

        if self.cfg.drop_last && slice.len() < batch_size {
            return Ok(None);
        }

        let n_frame = self.cfg.n_frame;
        let transform = self.cfg.transform.as_ref();
        let loaded: Vec<DatasetResult<GestureSample>> = slice
            .par_iter()
            .map(|&idx| {
                let sample = self.pack.sample(idx, n_frame)?;
                Ok(match transform {
                    Some(t) => t.apply(&sample, idx as u64),
                    None => sample,
                })
            })
            .collect();

        self.frames_buf.clear();
        self.labels_buf.clear();
        let mut size: Option<(u32, u32)> = None;
        for res in loaded {
            let sample = res?;
            match size {
                None => size = Some((sample.width, sample.height)),
                Some(sz) if sz != (sample.width, sample.height) => {
                    return Err(GestureDatasetError::Other(
                        "batch contains varying frame sizes".to_string(),
                    ));
                }
                _ => {}
            }
            self.frames_buf.extend_from_slice(&sample.frames);
            self.labels_buf.push(sample.label as i64);
        }

        let (width, height) = size.expect("non-empty slice sets the frame size");
        let batch_len = self.labels_buf.len();
        let frames = Tensor::<B, 1>::from_floats(self.frames_buf.as_slice(), device).reshape([
            batch_len,
            n_frame,
            height as usize,
            width as usize,
        ]);
        let labels = Tensor::<B, 1, Int>::from_data(
            TensorData::new(self.labels_buf.clone(), [batch_len]),
            device,
        );

        self.processed_samples += batch_len;
        self.processed_batches += 1;
        self.maybe_log_progress();

        Ok(Some(GestureBatch { frames, labels }))
    }

    fn maybe_log_progress(&mut self) {
        let Some(threshold) = self.log_every_samples else {
            return;
        };
        let processed_since = self
            .processed_samples
            .saturating_sub(self.last_logged_samples);
        let since_last = self.last_log.elapsed();
        if processed_since < threshold && since_last < Duration::from_secs(30) {
            return;
        }
        let secs = self.started.elapsed().as_secs_f32().max(0.001);
        let rate = self.processed_samples as f32 / secs;
        eprintln!(
            "[dataset] batches={} samples={} elapsed={:.1}s rate={:.1} samples/s",
            self.processed_batches, self.processed_samples, secs, rate
        );
        self.last_logged_samples = self.processed_samples;
        self.last_log = Instant::now();
    }
}
