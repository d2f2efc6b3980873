//! Hyperparameter grid sweep over frame count and learning rate.

use anyhow::Context;
use burn::prelude::*;
use gesture_dataset::{DatasetConfig, GesturePack};
use models::{GestureNet, GestureNetConfig};

use crate::driver::{fit, ADBackend, FitConfig};
use crate::util::RunArgs;

/// Frame counts explored by the sweep.
pub const SWEEP_N_FRAMES: [usize; 3] = [30, 50, 70];
/// Learning rates explored by the sweep.
pub const SWEEP_LRS: [f64; 4] = [1e-1, 1e-2, 1e-3, 1e-4];

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SweepPoint {
    pub n_frame: usize,
    pub lr: f64,
}

#[derive(Debug, Clone)]
pub struct SweepOutcome {
    pub best: Option<SweepPoint>,
    pub best_loss: f32,
    /// Every grid point in visit order with its training loss.
    pub visited: Vec<(SweepPoint, f32)>,
}

/// Walk the `n_frames` x `lrs` grid, calling `train_point` for each pair and
/// keeping the point with the lowest reported training loss. NaN losses are
/// recorded but never selected.
pub fn scan_grid<F>(n_frames: &[usize], lrs: &[f64], mut train_point: F) -> anyhow::Result<SweepOutcome>
where
    F: FnMut(usize, f64) -> anyhow::Result<f32>,
{
    let mut outcome = SweepOutcome {
        best: None,
        best_loss: f32::INFINITY,
        visited: Vec::with_capacity(n_frames.len() * lrs.len()),
    };

    for &n_frame in n_frames {
        for &lr in lrs {
            let loss = train_point(n_frame, lr)?;
            println!("Current model: n_frame={n_frame}, lr={lr}, train_loss={loss:.3}");
            outcome.visited.push((SweepPoint { n_frame, lr }, loss));
            if loss.is_finite() && loss < outcome.best_loss {
                outcome.best_loss = loss;
                outcome.best = Some(SweepPoint { n_frame, lr });
                println!("\tCurrent best model!");
            }
        }
    }

    if let Some(best) = outcome.best {
        println!(
            "\tBest model: n_frame={}, lr={}, train_loss={:.3}",
            best.n_frame, best.lr, outcome.best_loss
        );
    }
    Ok(outcome)
}

/// Sweep driver: trains one short run per grid point on the real packs.
///
/// The network input width depends on the frame count, so the model is rebuilt
/// whenever `n_frame` changes and its state carries across the learning rates
/// within that frame count. The sweep runs without augmentation and without
/// weight decay.
pub fn run_tune(args: &RunArgs) -> anyhow::Result<SweepOutcome> {
    let train = GesturePack::load(&args.train_path)
        .with_context(|| format!("failed to load train pack {}", args.train_path.display()))?;
    let valid = GesturePack::load(&args.valid_path)
        .with_context(|| format!("failed to load valid pack {}", args.valid_path.display()))?;

    // No augmentation in the sweep, so both splits feed the network at their
    // stored geometry.
    let input_size = GestureNetConfig::default().input_size;
    crate::util::ensure_frame_size(&train, input_size)?;
    crate::util::ensure_frame_size(&valid, input_size)?;

    let device = <ADBackend as Backend>::Device::default();
    let mut carried: Option<(usize, GestureNet<ADBackend>)> = None;

    scan_grid(&SWEEP_N_FRAMES, &SWEEP_LRS, |n_frame, lr| {
        let model = match carried.take() {
            Some((frames, model)) if frames == n_frame => model,
            _ => GestureNet::new(
                GestureNetConfig {
                    n_frame,
                    ..GestureNetConfig::default()
                },
                &device,
            ),
        };

        let train_cfg = DatasetConfig {
            n_frame,
            ..DatasetConfig::default()
        };
        let valid_cfg = DatasetConfig {
            n_frame,
            shuffle: false,
            ..DatasetConfig::default()
        };
        let fit_cfg = FitConfig {
            epochs: args.epoch,
            batch_size: args.batchsize,
            lr: lr as f32,
            weight_decay: false,
            save_path: None,
        };

        let (model, report) = fit(model, &train, &valid, &train_cfg, &valid_cfg, &fit_cfg)?;
        carried = Some((n_frame, model));
        Ok(report.best_train_loss)
    })
}
