//! # DeepFill-Burn
//!
//! Adversarial training of a coarse-to-fine image inpainting network, built
//! using the Burn deep learning framework.
//!
//! ## Modules
//!
//! - `config`: The training configuration, loaded once from JSON.
//! - `dataset`: Image-folder dataset and the batcher that draws hole boxes.
//! - `device`: The devices a trainer evaluates on.
//! - `error`: Defines the custom error types used throughout the crate.
//! - `losses`: Reconstruction and WGAN loss terms.
//! - `models`: The generator and the local and global critics.
//! - `training`: The trainer aggregate, checkpoints, sinks and the training loop.
//!
//! ## Key Components
//!
//! - `TrainingLoop`: Drives a `GanTrainer` for `niter` iterations.
//! - `InpaintTrainer`: The `GanTrainer` for the networks of this crate.
//! - `TrainingConfig`: The configuration every component is built from.
//! - `DeepFillError`: The enum for all errors that end a run.

mod config;
mod device;
mod error;

pub mod dataset;
pub mod losses;
pub mod metrics;
pub mod models;
pub mod training;
pub mod visualize;

#[doc(inline)]
pub use config::{DiscriminatorConfig, GeneratorConfig, TrainingConfig};
#[doc(inline)]
pub use dataset::{InpaintBatch, InpaintBatcher, InpaintDataset, InpaintItem};
#[doc(inline)]
pub use device::DeviceContext;
#[doc(inline)]
pub use error::{DeepFillError, DeepFillResult, EvalError};
#[doc(inline)]
pub use models::{Discriminators, Generator};
#[doc(inline)]
pub use training::{GanTrainer, InpaintTrainer, TrainingLoop};

#[cfg(test)]
mod tests;
