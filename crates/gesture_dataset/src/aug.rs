//! Frame-stack augmentation: random resized crop.
//!
//! One crop window is drawn per sample and applied identically to every frame
//! of the sequence, so the temporal structure of the gesture is preserved.

use crate::types::GestureSample;
use image::imageops::FilterType;
use image::{ImageBuffer, Luma};
use rand::{Rng, SeedableRng};

#[derive(Debug, Clone)]
pub struct RandomResizedCrop {
    /// Output frame size (width, height).
    pub out_size: (u32, u32),
    /// Crop area as a fraction of the source area, sampled uniformly.
    pub scale: (f32, f32),
    /// Crop aspect ratio (w/h), sampled log-uniformly.
    pub ratio: (f32, f32),
    /// Seed for per-sample deterministic crops; thread-local RNG if None.
    pub seed: Option<u64>,
}

impl Default for RandomResizedCrop {
    fn default() -> Self {
        Self {
            out_size: (128, 128),
            scale: (0.7, 1.0),
            ratio: (0.7, 1.4),
            seed: None,
        }
    }
}

impl RandomResizedCrop {
    pub fn describe(&self) -> String {
        format!(
            "out_size={}x{} scale=[{:.2},{:.2}] ratio=[{:.2},{:.2}] seed={}",
            self.out_size.0,
            self.out_size.1,
            self.scale.0,
            self.scale.1,
            self.ratio.0,
            self.ratio.1,
            self.seed
                .map(|s| s.to_string())
                .unwrap_or_else(|| "none".to_string())
        )
    }

    /// Crop and resize every frame of `sample` with a single shared window.
    pub fn apply(&self, sample: &GestureSample, sample_id: u64) -> GestureSample {
        // Seeded if provided (per-sample deterministic), else thread-local.
        let mut rng_local;
        let mut seeded_rng;
        let rng: &mut dyn rand::RngCore = if let Some(seed) = self.seed {
            let mixed = seed ^ sample_id;
            seeded_rng = rand::rngs::StdRng::seed_from_u64(mixed);
            &mut seeded_rng
        } else {
            rng_local = rand::rng();
            &mut rng_local
        };

        let window = self.pick_window(sample.width, sample.height, rng);
        let (out_w, out_h) = self.out_size;
        let frame_elems = (sample.width * sample.height) as usize;

        let mut frames = Vec::with_capacity(sample.n_frame * (out_w * out_h) as usize);
        for f in 0..sample.n_frame {
            let plane = &sample.frames[f * frame_elems..(f + 1) * frame_elems];
            frames.extend(crop_resize_plane(
                plane,
                sample.width,
                window,
                out_w,
                out_h,
            ));
        }

        GestureSample {
            frames,
            n_frame: sample.n_frame,
            width: out_w,
            height: out_h,
            label: sample.label,
        }
    }

    /// Draw a crop window `(x0, y0, w, h)` in source pixel coordinates.
    fn pick_window(&self, width: u32, height: u32, rng: &mut dyn rand::RngCore) -> (u32, u32, u32, u32) {
        let area = (width as f32) * (height as f32);
        for _ in 0..10 {
            let target_area = area * rng.random_range(self.scale.0..self.scale.1);
            let aspect = rng
                .random_range(self.ratio.0.ln()..self.ratio.1.ln())
                .exp();
            let cw = (target_area * aspect).sqrt().round() as u32;
            let ch = (target_area / aspect).sqrt().round() as u32;
            if cw >= 1 && ch >= 1 && cw <= width && ch <= height {
                let x0 = if cw == width {
                    0
                } else {
                    rng.random_range(0..=(width - cw))
                };
                let y0 = if ch == height {
                    0
                } else {
                    rng.random_range(0..=(height - ch))
                };
                return (x0, y0, cw, ch);
            }
        }

        // Fallback: centered crop clamped to the admissible aspect range.
        let in_ratio = width as f32 / height as f32;
        let (cw, ch) = if in_ratio < self.ratio.0 {
            let cw = width;
            (cw, ((cw as f32 / self.ratio.0).round() as u32).clamp(1, height))
        } else if in_ratio > self.ratio.1 {
            let ch = height;
            (((ch as f32 * self.ratio.1).round() as u32).clamp(1, width), ch)
        } else {
            (width, height)
        };
        ((width - cw) / 2, (height - ch) / 2, cw, ch)
    }
}

fn crop_resize_plane(
    plane: &[f32],
    width: u32,
    window: (u32, u32, u32, u32),
    out_w: u32,
    out_h: u32,
) -> Vec<f32> {
    let (x0, y0, cw, ch) = window;
    let crop = ImageBuffer::<Luma<f32>, Vec<f32>>::from_fn(cw, ch, |x, y| {
        Luma([plane[((y0 + y) * width + x0 + x) as usize]])
    });
    let resized = image::imageops::resize(&crop, out_w, out_h, FilterType::Triangle);
    resized
        .into_raw()
        .into_iter()
        .map(|v| v.clamp(0.0, 1.0))
        .collect()
}

#[cfg(test)]
mod aug_tests {
    use super::RandomResizedCrop;
    use crate::types::GestureSample;

    fn sample_with_frames(n_frame: usize, width: u32, height: u32) -> GestureSample {
        let frame_elems = (width * height) as usize;
        let mut frames = Vec::with_capacity(n_frame * frame_elems);
        for _ in 0..n_frame {
            for i in 0..frame_elems {
                frames.push((i % 7) as f32 / 7.0);
            }
        }
        GestureSample {
            frames,
            n_frame,
            width,
            height,
            label: 3,
        }
    }

    #[test]
    fn crop_output_matches_target_dims() {
        let crop = RandomResizedCrop {
            out_size: (16, 16),
            seed: Some(7),
            ..Default::default()
        };
        let sample = sample_with_frames(4, 24, 24);
        let out = crop.apply(&sample, 0);
        assert_eq!(out.width, 16);
        assert_eq!(out.height, 16);
        assert_eq!(out.frames.len(), 4 * 16 * 16);
        assert_eq!(out.label, 3);
    }

    #[test]
    fn crop_values_stay_in_unit_range() {
        let crop = RandomResizedCrop {
            out_size: (8, 8),
            seed: Some(11),
            ..Default::default()
        };
        let sample = sample_with_frames(2, 20, 20);
        let out = crop.apply(&sample, 5);
        assert!(out.frames.iter().all(|v| (0.0..=1.0).contains(v)));
    }

    #[test]
    fn same_seed_reproduces_crop() {
        let crop = RandomResizedCrop {
            out_size: (12, 12),
            seed: Some(42),
            ..Default::default()
        };
        let sample = sample_with_frames(3, 30, 30);
        let a = crop.apply(&sample, 9);
        let b = crop.apply(&sample, 9);
        assert_eq!(a.frames, b.frames);
    }

    #[test]
    fn crop_window_is_shared_across_frames() {
        // Two identical frames must produce two identical output planes.
        let crop = RandomResizedCrop {
            out_size: (10, 10),
            seed: Some(3),
            ..Default::default()
        };
        let sample = sample_with_frames(2, 26, 26);
        let out = crop.apply(&sample, 1);
        let plane = 10 * 10;
        assert_eq!(out.frames[..plane], out.frames[plane..2 * plane]);
    }
}
