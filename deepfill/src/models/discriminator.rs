//! # Discriminators
//!
//! WGAN critics at two scales: a local critic that only sees the hole region
//! and a global critic that sees the whole composited image. Both share the
//! same layout: four strided 5x5 convolutions followed by a linear score.

use burn::{
    nn::{Linear, LinearConfig},
    prelude::*,
};

use super::layers::{BlockActivation, ConvBlock, ConvBlockConfig};
use crate::config::DiscriminatorConfig;

/// Total downsampling factor of a critic.
pub const CRITIC_STRIDE: usize = 16;

/// Configuration for a [`Critic`].
#[derive(Config, Debug)]
pub struct CriticConfig {
    /// Number of image channels.
    input_dim: usize,
    /// Base number of feature channels.
    cnum: usize,
    /// Height and width of the critic's input, multiples of 16.
    input_size: [usize; 2],
}

impl CriticConfig {
    /// Initializes a new `Critic` module.
    pub fn init<B: Backend>(&self, device: &Device<B>) -> Critic<B> {
        let cnum = self.cnum;
        let channels = [self.input_dim, cnum, 2 * cnum, 4 * cnum, 4 * cnum];
        let convs = channels
            .windows(2)
            .map(|pair| {
                ConvBlockConfig::new(pair[0], pair[1])
                    .with_kernel_size(5)
                    .with_stride(2)
                    .with_activation(BlockActivation::LeakyRelu)
                    .init(device)
            })
            .collect();

        let [height, width] = self.input_size;
        let features = 4 * cnum * (height / CRITIC_STRIDE) * (width / CRITIC_STRIDE);
        let linear = LinearConfig::new(features, 1).init(device);

        Critic { convs, linear }
    }
}

/// A single WGAN critic.
#[derive(Module, Debug)]
pub struct Critic<B: Backend> {
    convs: Vec<ConvBlock<B>>,
    linear: Linear<B>,
}

impl<B: Backend> Critic<B> {
    /// Scores a batch of images.
    ///
    /// # Shapes
    /// - x: `[N, C, H, W]` with the configured `H` and `W`
    /// - output: `[N, 1]`
    pub fn forward(&self, x: Tensor<B, 4>) -> Tensor<B, 2> {
        let x = self.convs.iter().fold(x, |x, conv| conv.forward(x));
        let x: Tensor<B, 2> = x.flatten(1, 3);
        self.linear.forward(x)
    }
}

impl DiscriminatorConfig {
    /// Initializes the local and global critics.
    ///
    /// `patch_size` is the size of the hole box, `image_size` the size of the
    /// whole image.
    pub fn init<B: Backend>(
        &self,
        patch_size: [usize; 2],
        image_size: [usize; 2],
        device: &Device<B>,
    ) -> Discriminators<B> {
        Discriminators {
            local: CriticConfig::new(self.input_dim, self.ndf, patch_size).init(device),
            global: CriticConfig::new(self.input_dim, self.ndf, image_size).init(device),
        }
    }
}

/// The local and global critics, optimized together.
#[derive(Module, Debug)]
pub struct Discriminators<B: Backend> {
    pub local: Critic<B>,
    pub global: Critic<B>,
}
