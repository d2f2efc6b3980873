#![recursion_limit = "256"]

pub mod driver;
pub mod metrics;
pub mod tune;
pub mod util;

pub use driver::{
    evaluate, fit, load_gesture_net_from_checkpoint, save_checkpoint, ADBackend, FitConfig,
    FitReport,
};
pub use metrics::accuracy;
pub use models::{GestureNet, GestureNetConfig};
pub use tune::{scan_grid, SweepOutcome, SweepPoint};
pub use util::{run, RunArgs, RunMode};

/// Backend alias for training/eval (NdArray by default; WGPU if enabled).
#[cfg(feature = "backend-wgpu")]
pub type TrainBackend = burn_wgpu::Wgpu<f32>;
#[cfg(not(feature = "backend-wgpu"))]
pub type TrainBackend = burn_ndarray::NdArray<f32>;
