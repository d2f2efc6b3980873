//! Train/validate/test drivers over `GestureNet`.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::Context;
use burn::backend::Autodiff;
use burn::module::{AutodiffModule, Module};
use burn::nn::loss::CrossEntropyLossConfig;
use burn::optim::decay::WeightDecayConfig;
use burn::optim::{AdamConfig, GradientsParams, Optimizer};
use burn::prelude::*;
use burn::record::{BinFileRecorder, FullPrecisionSettings, RecorderError};
use gesture_dataset::{BatchIter, DatasetConfig, GesturePack};
use models::{GestureNet, GestureNetConfig};

use crate::metrics::accuracy;
use crate::TrainBackend;

pub type ADBackend = Autodiff<TrainBackend>;

#[derive(Debug, Clone)]
pub struct FitConfig {
    pub epochs: usize,
    pub batch_size: usize,
    pub lr: f32,
    /// Apply the fixed 1e-3 weight-decay penalty used by the train mode; the
    /// sweep runs without it.
    pub weight_decay: bool,
    /// Best-snapshot destination; nothing is written when None.
    pub save_path: Option<PathBuf>,
}

/// Best values observed across all epochs of one `fit` run.
#[derive(Debug, Clone)]
pub struct FitReport {
    pub best_train_acc: f32,
    pub best_train_loss: f32,
    pub best_valid_acc: f32,
}

/// Run the full train/validate loop.
///
/// Every epoch iterates a freshly shuffled train pass (forward, cross-entropy,
/// Adam step) followed by a validation pass on the inner backend. The best
/// snapshot by validation accuracy is saved to `cfg.save_path` as it improves.
/// Returns the final model so sweep callers can carry its state forward.
pub fn fit(
    mut model: GestureNet<ADBackend>,
    train: &GesturePack,
    valid: &GesturePack,
    train_cfg: &DatasetConfig,
    valid_cfg: &DatasetConfig,
    cfg: &FitConfig,
) -> anyhow::Result<(GestureNet<ADBackend>, FitReport)> {
    let device = <ADBackend as Backend>::Device::default();
    let loss_fn = CrossEntropyLossConfig::new().init(&device);
    let mut adam = AdamConfig::new();
    if cfg.weight_decay {
        adam = adam.with_weight_decay(Some(WeightDecayConfig::new(1e-3)));
    }
    let mut optim = adam.init();

    let batch_size = cfg.batch_size.max(1);
    let mut report = FitReport {
        best_train_acc: 0.0,
        best_train_loss: f32::INFINITY,
        best_valid_acc: 0.0,
    };
    let mut best_valid: Option<f32> = None;

    for epoch in 0..cfg.epochs {
        let mut loss_sum = 0.0f64;
        let mut batches = 0usize;
        let mut correct = 0.0f32;
        let mut samples = 0usize;

        let mut iter = BatchIter::new(train, train_cfg.clone())?;
        loop {
            let batch = match iter.next_batch::<ADBackend>(batch_size, &device)? {
                Some(batch) => batch,
                None => break,
            };
            let batch_len = batch.labels.dims()[0];

            let logits = model.forward(batch.frames);
            let loss = loss_fn.forward(logits.clone(), batch.labels.clone());
            let loss_val: f64 = loss.clone().into_scalar().elem::<f64>();

            let batch_acc = accuracy(logits.detach(), batch.labels);
            let grads = GradientsParams::from_grads(loss.backward(), &model);
            model = optim.step(cfg.lr as f64, model, grads);

            loss_sum += loss_val;
            batches += 1;
            correct += batch_acc * batch_len as f32;
            samples += batch_len;
        }

        let train_loss = if batches > 0 {
            (loss_sum / batches as f64) as f32
        } else {
            f32::NAN
        };
        let train_acc = if samples > 0 {
            correct / samples as f32
        } else {
            0.0
        };

        // Validation on the inner backend; no autodiff overhead.
        let model_valid = model.valid();
        let (valid_loss, valid_acc) = evaluate(&model_valid, valid, valid_cfg, batch_size)?;

        println!(
            "epoch {epoch}: train_loss={train_loss:.4} train_acc={train_acc:.3} valid_loss={valid_loss:.4} valid_acc={valid_acc:.3}"
        );

        if train_loss.is_finite() && train_loss < report.best_train_loss {
            report.best_train_loss = train_loss;
        }
        if train_acc > report.best_train_acc {
            report.best_train_acc = train_acc;
        }
        if best_valid.map_or(true, |best| valid_acc > best) {
            best_valid = Some(valid_acc);
            if let Some(path) = &cfg.save_path {
                save_checkpoint(&model, path)?;
            }
        }
    }

    report.best_valid_acc = best_valid.unwrap_or(0.0);
    Ok((model, report))
}

/// One pass over `pack` without parameter updates; returns (loss, accuracy).
pub fn evaluate(
    model: &GestureNet<TrainBackend>,
    pack: &GesturePack,
    data_cfg: &DatasetConfig,
    batch_size: usize,
) -> anyhow::Result<(f32, f32)> {
    let device = <TrainBackend as Backend>::Device::default();
    let loss_fn = CrossEntropyLossConfig::new().init(&device);
    let batch_size = batch_size.max(1);

    let mut loss_sum = 0.0f64;
    let mut batches = 0usize;
    let mut correct = 0.0f32;
    let mut samples = 0usize;

    let mut iter = BatchIter::new(pack, data_cfg.clone())?;
    loop {
        let batch = match iter.next_batch::<TrainBackend>(batch_size, &device)? {
            Some(batch) => batch,
            None => break,
        };
        let batch_len = batch.labels.dims()[0];
        let logits = model.forward(batch.frames);
        let loss = loss_fn.forward(logits.clone(), batch.labels.clone());
        loss_sum += loss.into_scalar().elem::<f64>();
        batches += 1;
        correct += accuracy(logits, batch.labels) * batch_len as f32;
        samples += batch_len;
    }

    let loss = if batches > 0 {
        (loss_sum / batches as f64) as f32
    } else {
        f32::NAN
    };
    let acc = if samples > 0 {
        correct / samples as f32
    } else {
        0.0
    };
    Ok((loss, acc))
}

pub fn save_checkpoint(model: &GestureNet<ADBackend>, path: &Path) -> anyhow::Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)
                .with_context(|| format!("failed to create {}", parent.display()))?;
        }
    }
    let recorder = BinFileRecorder::<FullPrecisionSettings>::new();
    model
        .clone()
        .save_file(path, &recorder)
        .map_err(|e| anyhow::anyhow!("failed to save checkpoint: {e}"))
}

pub fn load_gesture_net_from_checkpoint<P: AsRef<Path>>(
    path: P,
    cfg: GestureNetConfig,
    device: &<TrainBackend as Backend>::Device,
) -> Result<GestureNet<TrainBackend>, RecorderError> {
    let recorder = BinFileRecorder::<FullPrecisionSettings>::new();
    GestureNet::<TrainBackend>::new(cfg, device).load_file(path.as_ref(), &recorder, device)
}
