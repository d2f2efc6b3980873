use std::path::Path;

use burn::module::AutodiffModule;
use gesture_dataset::{write_pack, DatasetConfig, GesturePack, NUM_CLASSES};
use models::{GestureNet, GestureNetConfig};
use training::util::ensure_frame_size;
use training::{
    evaluate, fit, load_gesture_net_from_checkpoint, ADBackend, FitConfig, TrainBackend,
};

const FRAMES: usize = 2;
const SIZE: usize = 16;

fn tiny_config() -> GestureNetConfig {
    GestureNetConfig {
        n_frame: FRAMES,
        input_size: (SIZE, SIZE),
        hidden: 8,
        ..GestureNetConfig::default()
    }
}

fn write_tiny_pack(path: &Path, count: usize) -> GesturePack {
    let elems = FRAMES * SIZE * SIZE;
    let samples: Vec<(u32, Vec<f32>)> = (0..count)
        .map(|i| {
            let label = (i % NUM_CLASSES) as u32;
            // Class-dependent constant frames give the loss a real gradient.
            let frames = vec![(label as f32 + 1.0) / (NUM_CLASSES as f32 + 1.0); elems];
            (label, frames)
        })
        .collect();
    write_pack(path, FRAMES, SIZE as u32, SIZE as u32, &samples).unwrap();
    GesturePack::load(path).unwrap()
}

fn tiny_dataset_cfg() -> DatasetConfig {
    DatasetConfig {
        n_frame: FRAMES,
        shuffle: false,
        ..DatasetConfig::default()
    }
}

#[test]
fn fit_one_epoch_reports_finite_metrics_and_saves_checkpoint() {
    let dir = tempfile::tempdir().unwrap();
    let train = write_tiny_pack(&dir.path().join("train.gpack"), 8);
    let valid = write_tiny_pack(&dir.path().join("valid.gpack"), 4);
    let ckpt = dir.path().join("snapshot.ckpt");

    let device = Default::default();
    let model = GestureNet::<ADBackend>::new(tiny_config(), &device);
    let cfg = FitConfig {
        epochs: 1,
        batch_size: 4,
        lr: 1e-3,
        weight_decay: true,
        save_path: Some(ckpt.clone()),
    };

    let (_, report) = fit(
        model,
        &train,
        &valid,
        &tiny_dataset_cfg(),
        &tiny_dataset_cfg(),
        &cfg,
    )
    .unwrap();

    assert!(report.best_train_loss.is_finite());
    assert!((0.0..=1.0).contains(&report.best_train_acc));
    assert!((0.0..=1.0).contains(&report.best_valid_acc));
    // The first validation pass always snapshots.
    assert!(ckpt.with_extension("bin").exists());
}

#[test]
fn saved_checkpoint_loads_and_evaluates() {
    let dir = tempfile::tempdir().unwrap();
    let train = write_tiny_pack(&dir.path().join("train.gpack"), 8);
    let valid = write_tiny_pack(&dir.path().join("valid.gpack"), 4);
    let ckpt = dir.path().join("snapshot.ckpt");

    let device = Default::default();
    let model = GestureNet::<ADBackend>::new(tiny_config(), &device);
    let cfg = FitConfig {
        epochs: 1,
        batch_size: 4,
        lr: 1e-3,
        weight_decay: false,
        save_path: Some(ckpt.clone()),
    };
    fit(
        model,
        &train,
        &valid,
        &tiny_dataset_cfg(),
        &tiny_dataset_cfg(),
        &cfg,
    )
    .unwrap();

    let device = Default::default();
    let restored =
        load_gesture_net_from_checkpoint(&ckpt, tiny_config(), &device).unwrap();
    let (loss, acc) = evaluate(&restored, &valid, &tiny_dataset_cfg(), 4).unwrap();
    assert!(loss.is_finite());
    assert!((0.0..=1.0).contains(&acc));
}

#[test]
fn training_changes_model_output() {
    let dir = tempfile::tempdir().unwrap();
    let train = write_tiny_pack(&dir.path().join("train.gpack"), 8);
    let valid = write_tiny_pack(&dir.path().join("valid.gpack"), 4);

    let device = Default::default();
    let model = GestureNet::<ADBackend>::new(tiny_config(), &device);
    let probe = burn::tensor::Tensor::<TrainBackend, 4>::ones([1, FRAMES, SIZE, SIZE], &device);
    let before: Vec<f32> = model
        .valid()
        .forward(probe.clone())
        .into_data()
        .to_vec()
        .unwrap();

    let cfg = FitConfig {
        epochs: 1,
        batch_size: 4,
        lr: 0.1,
        weight_decay: false,
        save_path: None,
    };
    let (trained, _) = fit(
        model,
        &train,
        &valid,
        &tiny_dataset_cfg(),
        &tiny_dataset_cfg(),
        &cfg,
    )
    .unwrap();

    let after: Vec<f32> = trained.valid().forward(probe).into_data().to_vec().unwrap();
    assert!(before
        .iter()
        .zip(&after)
        .any(|(a, b)| (a - b).abs() > 1e-6));
}

#[test]
fn frame_size_mismatch_is_reported_up_front() {
    let dir = tempfile::tempdir().unwrap();
    let pack = write_tiny_pack(&dir.path().join("test.gpack"), 2);

    assert!(ensure_frame_size(&pack, (SIZE, SIZE)).is_ok());
    let err = ensure_frame_size(&pack, (128, 128)).unwrap_err();
    let msg = err.to_string();
    assert!(msg.contains("16x16"));
    assert!(msg.contains("128x128"));
}

#[test]
fn evaluate_updates_nothing_on_disk() {
    let dir = tempfile::tempdir().unwrap();
    let pack = write_tiny_pack(&dir.path().join("test.gpack"), 6);

    let device = Default::default();
    let model = GestureNet::<TrainBackend>::new(tiny_config(), &device);
    let mut before: Vec<_> = std::fs::read_dir(dir.path())
        .unwrap()
        .map(|e| e.unwrap().file_name())
        .collect();
    before.sort();

    let (loss, acc) = evaluate(&model, &pack, &tiny_dataset_cfg(), 4).unwrap();
    assert!(loss.is_finite());
    assert!((0.0..=1.0).contains(&acc));

    let mut after: Vec<_> = std::fs::read_dir(dir.path())
        .unwrap()
        .map(|e| e.unwrap().file_name())
        .collect();
    after.sort();
    assert_eq!(before, after);
}
