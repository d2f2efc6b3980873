//! Burn model for gesture classification over frame sequences.
//!
//! `GestureNet` treats a fixed-length stack of grayscale video frames as the
//! input channel axis and classifies the whole sequence into one of the
//! gesture classes. It is a pure Burn Module with no awareness of the dataset
//! pipeline; losses, optimizers, and checkpoints live in the `training` crate.

use burn::module::Module;
use burn::nn;
use burn::nn::conv::{Conv2d, Conv2dConfig};
use burn::nn::pool::{MaxPool2d, MaxPool2dConfig};
use burn::nn::{Initializer, PaddingConfig2d};
use burn::tensor::activation::relu;
use burn::tensor::backend::Backend;
use burn::tensor::Tensor;

/// Channel widths of the four conv stages; each stage halves both spatial dims.
const STAGE_CHANNELS: [usize; 4] = [32, 64, 128, 128];

#[derive(Debug, Clone)]
pub struct GestureNetConfig {
    /// Frames per sample; becomes the input channel count.
    pub n_frame: usize,
    pub num_classes: usize,
    /// Input frame size (height, width). Four pooling stages halve each dim.
    pub input_size: (usize, usize),
    /// Width of the hidden classifier layer.
    pub hidden: usize,
}

impl Default for GestureNetConfig {
    fn default() -> Self {
        Self {
            n_frame: 60,
            num_classes: 11,
            input_size: (128, 128),
            hidden: 256,
        }
    }
}

impl GestureNetConfig {
    /// Flattened feature count after the conv stack.
    fn flat_dim(&self) -> usize {
        let (mut h, mut w) = self.input_size;
        for _ in 0..STAGE_CHANNELS.len() {
            h /= 2;
            w /= 2;
        }
        STAGE_CHANNELS[STAGE_CHANNELS.len() - 1] * h * w
    }
}

#[derive(Debug, Module)]
pub struct GestureNet<B: Backend> {
    convs: Vec<Conv2d<B>>,
    pools: Vec<MaxPool2d>,
    fc1: nn::Linear<B>,
    fc2: nn::Linear<B>,
}

impl<B: Backend> GestureNet<B> {
    pub fn new(cfg: GestureNetConfig, device: &B::Device) -> Self {
        let xavier = Initializer::XavierUniform { gain: 1.0 };

        let mut convs = Vec::new();
        let mut pools = Vec::new();
        let mut in_channels = cfg.n_frame.max(1);
        for out_channels in STAGE_CHANNELS {
            convs.push(
                Conv2dConfig::new([in_channels, out_channels], [3, 3])
                    .with_padding(PaddingConfig2d::Same)
                    .with_initializer(xavier.clone())
                    .init(device),
            );
            pools.push(MaxPool2dConfig::new([2, 2]).with_strides([2, 2]).init());
            in_channels = out_channels;
        }

        let fc1 = nn::LinearConfig::new(cfg.flat_dim(), cfg.hidden)
            .with_initializer(xavier.clone())
            .init(device);
        let fc2 = nn::LinearConfig::new(cfg.hidden, cfg.num_classes)
            .with_initializer(xavier)
            .init(device);

        Self {
            convs,
            pools,
            fc1,
            fc2,
        }
    }

    /// Forward pass over `[batch, n_frame, h, w]` frame stacks; returns
    /// per-class logits `[batch, num_classes]`.
    pub fn forward(&self, frames: Tensor<B, 4>) -> Tensor<B, 2> {
        let mut x = frames;
        for (conv, pool) in self.convs.iter().zip(self.pools.iter()) {
            x = pool.forward(relu(conv.forward(x)));
        }
        let [batch, channels, h, w] = x.dims();
        let x = x.reshape([batch, channels * h * w]);
        let x = relu(self.fc1.forward(x));
        self.fc2.forward(x)
    }
}

pub mod prelude {
    pub use super::{GestureNet, GestureNetConfig};
}
