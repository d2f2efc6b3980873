//! Gesture pack loading, augmentation, and Burn-compatible batching.
//!
//! This crate provides utilities for:
//! - Reading and writing gesture packs (frame-sequence datasets)
//! - Pack manifests with content checksums
//! - Random-resized-crop augmentation over frame stacks
//! - Burn-compatible batch iteration

pub mod archive;
pub mod aug;
pub mod batch;
pub mod types;

pub use archive::{write_pack, GesturePack, PackManifest};
pub use aug::RandomResizedCrop;
pub use batch::{BatchIter, DatasetConfig, GestureBatch};
pub use types::{DatasetResult, GestureDatasetError, GestureSample, NUM_CLASSES};
