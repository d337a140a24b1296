//! # Model Architectures
//!
//! - `generator`: the two-stage coarse-to-fine inpainting generator.
//! - `discriminator`: the local and global WGAN critics.
//! - `layers`: convolution blocks and resampling shared by both.

pub mod discriminator;
pub mod generator;
pub mod layers;

pub use discriminator::{Critic, CriticConfig, Discriminators, CRITIC_STRIDE};
pub use generator::{Generator, GeneratorOutput, InpaintStage, InpaintStageConfig};
pub use layers::{BlockActivation, ConvBlock, ConvBlockConfig};
