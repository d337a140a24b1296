//! Convolution blocks shared by the generator and the discriminators.

use burn::{
    nn::{
        conv::{Conv2d, Conv2dConfig},
        PaddingConfig2d,
    },
    module::Ignored,
    prelude::*,
    tensor::{
        activation::{leaky_relu, relu},
        module::interpolate,
        ops::{InterpolateMode, InterpolateOptions},
    },
};

/// Activation applied after a [`ConvBlock`].
#[derive(Config, Debug, PartialEq, Eq)]
pub enum BlockActivation {
    /// Exponential linear unit, used by the generator.
    Elu,
    /// Leaky ReLU with slope 0.2, used by the critics.
    LeakyRelu,
    /// No activation, used by output layers.
    Linear,
}

/// Configuration for a [`ConvBlock`].
#[derive(Config, Debug)]
pub struct ConvBlockConfig {
    in_channels: usize,
    out_channels: usize,
    #[config(default = "3")]
    kernel_size: usize,
    #[config(default = "1")]
    stride: usize,
    #[config(default = "1")]
    dilation: usize,
    #[config(default = "BlockActivation::Elu")]
    activation: BlockActivation,
}

impl ConvBlockConfig {
    /// Initializes a `ConvBlock` with "same" padding for odd kernels.
    pub fn init<B: Backend>(&self, device: &Device<B>) -> ConvBlock<B> {
        let padding = self.dilation * (self.kernel_size - 1) / 2;
        let conv = Conv2dConfig::new(
            [self.in_channels, self.out_channels],
            [self.kernel_size, self.kernel_size],
        )
        .with_stride([self.stride, self.stride])
        .with_dilation([self.dilation, self.dilation])
        .with_padding(PaddingConfig2d::Explicit(padding, padding))
        .init(device);

        ConvBlock {
            conv,
            activation: Ignored(self.activation.clone()),
        }
    }
}

/// A convolution followed by an activation.
#[derive(Module, Debug)]
pub struct ConvBlock<B: Backend> {
    conv: Conv2d<B>,
    activation: Ignored<BlockActivation>,
}

impl<B: Backend> ConvBlock<B> {
    pub fn forward(&self, x: Tensor<B, 4>) -> Tensor<B, 4> {
        let x = self.conv.forward(x);
        match self.activation.0 {
            BlockActivation::Elu => elu(x),
            BlockActivation::LeakyRelu => leaky_relu(x, 0.2),
            BlockActivation::Linear => x,
        }
    }
}

/// `elu(x) = x` for `x > 0`, `exp(x) - 1` otherwise.
pub fn elu<B: Backend, const D: usize>(x: Tensor<B, D>) -> Tensor<B, D> {
    relu(x.clone()) + x.clamp_max(0.0).exp().sub_scalar(1.0)
}

/// Nearest-neighbour upsampling by an integer factor.
pub fn upsample<B: Backend>(x: Tensor<B, 4>, factor: usize) -> Tensor<B, 4> {
    let [_, _, height, width] = x.dims();
    interpolate(
        x,
        [height * factor, width * factor],
        InterpolateOptions::new(InterpolateMode::Nearest),
    )
}
