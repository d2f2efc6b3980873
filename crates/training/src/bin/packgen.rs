//! Generates synthetic gesture packs for local smoke runs.
//!
//! Each class moves a sinusoidal band across the frame at a class-specific
//! speed, so a trained network has real signal to latch onto without needing
//! captured footage on disk.

use std::f32::consts::PI;
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::Context;
use clap::Parser;
use gesture_dataset::{write_pack, PackManifest, NUM_CLASSES};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

#[derive(Parser, Debug)]
#[command(name = "packgen", about = "Generate synthetic gesture packs")]
struct PackgenArgs {
    /// Output directory for the three packs and their manifests.
    #[arg(long, default_value = "packs")]
    out_dir: PathBuf,
    /// Frame height and width in pixels.
    #[arg(long, default_value_t = 128)]
    size: usize,
    /// Frames per sample.
    #[arg(long, default_value_t = 70)]
    nframe: usize,
    #[arg(long, default_value_t = 512)]
    train_samples: usize,
    #[arg(long, default_value_t = 128)]
    valid_samples: usize,
    #[arg(long, default_value_t = 128)]
    test_samples: usize,
    #[arg(long, default_value_t = 42)]
    seed: u64,
}

fn synth_sample(rng: &mut StdRng, label: u32, n_frame: usize, size: usize) -> Vec<f32> {
    let speed = (label as f32 + 1.0) * 0.5;
    let phase: f32 = rng.random_range(0.0..2.0 * PI);
    let mut frames = Vec::with_capacity(n_frame * size * size);
    for t in 0..n_frame {
        let offset = t as f32 * speed;
        for y in 0..size {
            for x in 0..size {
                let band = 0.5
                    + 0.4
                        * ((2.0 * PI * (x as f32 + offset) / size as f32)
                            + phase
                            + 0.3 * (y as f32 / size as f32))
                            .sin();
                let noise: f32 = rng.random_range(-0.05..0.05);
                frames.push((band + noise).clamp(0.0, 1.0));
            }
        }
    }
    frames
}

fn write_split(
    rng: &mut StdRng,
    path: &Path,
    count: usize,
    n_frame: usize,
    size: usize,
) -> anyhow::Result<()> {
    let mut samples = Vec::with_capacity(count);
    for i in 0..count {
        // Round-robin labels keep every class represented.
        let label = (i % NUM_CLASSES) as u32;
        samples.push((label, synth_sample(rng, label, n_frame, size)));
    }
    write_pack(path, n_frame, size as u32, size as u32, &samples)
        .with_context(|| format!("failed to write pack {}", path.display()))?;

    let manifest = PackManifest::from_pack_file(path)?;
    let manifest_path = path.with_extension("manifest.json");
    manifest.save(&manifest_path)?;
    println!(
        "wrote {} ({count} samples, {n_frame} frames of {size}x{size})",
        path.display()
    );
    Ok(())
}

fn main() -> anyhow::Result<()> {
    let args = PackgenArgs::parse();
    fs::create_dir_all(&args.out_dir)
        .with_context(|| format!("failed to create {}", args.out_dir.display()))?;

    let mut rng = StdRng::seed_from_u64(args.seed);
    write_split(
        &mut rng,
        &args.out_dir.join("train.gpack"),
        args.train_samples,
        args.nframe,
        args.size,
    )?;
    write_split(
        &mut rng,
        &args.out_dir.join("valid.gpack"),
        args.valid_samples,
        args.nframe,
        args.size,
    )?;
    write_split(
        &mut rng,
        &args.out_dir.join("test.gpack"),
        args.test_samples,
        args.nframe,
        args.size,
    )?;
    Ok(())
}
