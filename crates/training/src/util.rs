use std::path::PathBuf;

use anyhow::Context;
use burn::tensor::backend::Backend;
use clap::{Parser, ValueEnum};
use gesture_dataset::{DatasetConfig, GesturePack, RandomResizedCrop};
use models::{GestureNet, GestureNetConfig};

use crate::driver::{evaluate, fit, load_gesture_net_from_checkpoint, ADBackend, FitConfig};
use crate::tune::run_tune;
use crate::TrainBackend;

#[derive(ValueEnum, Debug, Clone, Copy)]
pub enum BackendKind {
    NdArray,
    Wgpu,
}

#[derive(Parser, Debug)]
#[command(name = "gesture", about = "Train/evaluate GestureNet on frame-pack datasets")]
pub struct RunArgs {
    /// Training pack.
    #[arg(long, default_value = "train.gpack")]
    pub train_path: PathBuf,
    /// Validation pack.
    #[arg(long, default_value = "valid.gpack")]
    pub valid_path: PathBuf,
    /// Held-out test pack (used with --test).
    #[arg(long, default_value = "test.gpack")]
    pub test_path: PathBuf,
    /// Frames taken from the front of each sample.
    #[arg(long, default_value_t = 60)]
    pub nframe: usize,
    /// Batch size.
    #[arg(long, default_value_t = 256)]
    pub batchsize: usize,
    /// Checkpoint to evaluate in --test mode.
    #[arg(long, default_value = "output/last.ckpt")]
    pub model_path: PathBuf,
    /// Learning rate.
    #[arg(long, default_value_t = 1e-3)]
    pub lr: f32,
    /// Where the best snapshot is written during training.
    #[arg(long, default_value = "output/gesture_net.ckpt")]
    pub save_path: PathBuf,
    /// Number of epochs.
    #[arg(long, default_value_t = 50)]
    pub epoch: usize,
    /// Sweep frame counts and learning rates instead of a single run.
    #[arg(long)]
    pub tune: bool,
    /// Evaluate a saved checkpoint on the test pack; overrides --tune.
    #[arg(long)]
    pub test: bool,
    /// Backend to use (ndarray or wgpu if enabled).
    #[arg(long, value_enum, default_value_t = BackendKind::NdArray)]
    pub backend: BackendKind,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunMode {
    Train,
    Test,
    Tune,
}

impl RunMode {
    /// Test wins when both flags are set.
    pub fn from_flags(test: bool, tune: bool) -> Self {
        if test {
            RunMode::Test
        } else if tune {
            RunMode::Tune
        } else {
            RunMode::Train
        }
    }
}

pub fn run(args: RunArgs) -> anyhow::Result<()> {
    validate_backend_choice(args.backend)?;
    match RunMode::from_flags(args.test, args.tune) {
        RunMode::Test => run_test(&args),
        RunMode::Tune => run_tune(&args).map(|_| ()),
        RunMode::Train => run_train(&args),
    }
}

fn run_train(args: &RunArgs) -> anyhow::Result<()> {
    let train = GesturePack::load(&args.train_path)
        .with_context(|| format!("failed to load train pack {}", args.train_path.display()))?;
    let valid = GesturePack::load(&args.valid_path)
        .with_context(|| format!("failed to load valid pack {}", args.valid_path.display()))?;
    println!(
        "train pack: {} samples, class histogram {:?}",
        train.len(),
        train.class_histogram()
    );
    println!("valid pack: {} samples", valid.len());

    let net_cfg = GestureNetConfig {
        n_frame: args.nframe,
        ..GestureNetConfig::default()
    };
    // The train split is cropped to the network's input size; the validation
    // split is fed at its stored geometry, so it must already match.
    ensure_frame_size(&valid, net_cfg.input_size)?;

    let device = <ADBackend as Backend>::Device::default();
    let model = GestureNet::<ADBackend>::new(net_cfg, &device);

    let train_cfg = DatasetConfig {
        n_frame: args.nframe,
        transform: Some(RandomResizedCrop::default()),
        ..DatasetConfig::default()
    };
    let valid_cfg = DatasetConfig {
        n_frame: args.nframe,
        shuffle: false,
        ..DatasetConfig::default()
    };
    let fit_cfg = FitConfig {
        epochs: args.epoch,
        batch_size: args.batchsize,
        lr: args.lr,
        weight_decay: true,
        save_path: Some(args.save_path.clone()),
    };

    println!("Start training...");
    let (_, report) = fit(model, &train, &valid, &train_cfg, &valid_cfg, &fit_cfg)?;
    println!(
        "Training finished, best loss={:.3}, best train acc={:.3}, best valid acc={:.3}",
        report.best_train_loss, report.best_train_acc, report.best_valid_acc
    );
    Ok(())
}

fn run_test(args: &RunArgs) -> anyhow::Result<()> {
    let pack = GesturePack::load(&args.test_path)
        .with_context(|| format!("failed to load test pack {}", args.test_path.display()))?;

    let net_cfg = GestureNetConfig {
        n_frame: args.nframe,
        ..GestureNetConfig::default()
    };
    ensure_frame_size(&pack, net_cfg.input_size)?;

    let device = <TrainBackend as Backend>::Device::default();
    let model = load_gesture_net_from_checkpoint(&args.model_path, net_cfg, &device)
    .map_err(|e| {
        anyhow::anyhow!(
            "failed to load checkpoint {}: {e}",
            args.model_path.display()
        )
    })?;

    let cfg = DatasetConfig {
        n_frame: args.nframe,
        shuffle: false,
        ..DatasetConfig::default()
    };

    println!("Start testing...");
    let (loss, acc) = evaluate(&model, &pack, &cfg, args.batchsize)?;
    println!("Testing finished, loss={loss:.3}, acc={acc:.3}");
    Ok(())
}

/// Packs consumed without augmentation must match the network's frame
/// geometry; a mismatch would otherwise surface as a shape panic inside the
/// classifier head mid-run.
pub fn ensure_frame_size(pack: &GesturePack, expected: (usize, usize)) -> anyhow::Result<()> {
    let actual = (pack.height() as usize, pack.width() as usize);
    if actual != expected {
        anyhow::bail!(
            "pack {} stores {}x{} frames but the network expects {}x{}",
            pack.path().display(),
            actual.0,
            actual.1,
            expected.0,
            expected.1
        );
    }
    Ok(())
}

pub fn validate_backend_choice(kind: BackendKind) -> anyhow::Result<()> {
    let built_wgpu = cfg!(feature = "backend-wgpu");
    match (kind, built_wgpu) {
        (BackendKind::Wgpu, false) => {
            anyhow::bail!("backend-wgpu feature not enabled; rebuild with --features backend-wgpu or choose ndarray backend")
        }
        (BackendKind::NdArray, true) => {
            println!("note: built with backend-wgpu; runs will still use the WGPU backend despite --backend ndarray");
        }
        _ => {}
    }
    Ok(())
}
