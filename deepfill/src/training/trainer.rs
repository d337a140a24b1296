//! The trainer aggregate seen by the training loop.

use std::path::Path;

use burn::tensor::{backend::Backend, Int, Tensor};

use super::bundle::LossBundle;
use crate::error::{DeepFillResult, EvalError};

/// The two separately optimized networks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Network {
    Generator,
    Discriminator,
}

/// Inputs of one forward evaluation.
#[derive(Debug, Clone)]
pub struct EvalInput<B: Backend> {
    /// Ground truth with the holes zeroed, [N, 3, H, W]
    pub masked: Tensor<B, 4>,
    /// Hole boxes, [N, 4] as (top, left, height, width)
    pub bboxes: Tensor<B, 2, Int>,
    /// Hole masks, [N, 1, H, W]
    pub masks: Tensor<B, 4>,
    /// Ground truth, [N, 3, H, W]
    pub ground_truth: Tensor<B, 4>,
}

/// Outputs of one forward evaluation.
#[derive(Debug, Clone)]
pub struct Evaluation<B: Backend> {
    /// Per-replica loss terms.
    pub losses: LossBundle<B>,
    /// Refined prediction composited into the known context, [N, 3, H, W]
    pub inpainted: Tensor<B, 4>,
    /// Offset-field visualization, [N, 3, H, W]
    pub offset_flow: Tensor<B, 4>,
}

/// Generator and discriminators together with their optimizers.
///
/// Parameters only change through [`GanTrainer::step`]. Gradients are
/// collected by [`GanTrainer::backward`] and cleared by
/// [`GanTrainer::zero_grad`].
pub trait GanTrainer<B: Backend> {
    /// Runs the networks and computes the loss terms.
    ///
    /// The discriminator terms `wgan_d` and `wgan_gp` are always present. The
    /// generator terms `l1`, `ae` and `wgan_g` are only computed when
    /// `compute_g_loss` is set.
    ///
    /// # Errors
    ///
    /// Returns an [`EvalError`]; see [`EvalError::is_recoverable`] for which
    /// kinds allow skipping the iteration.
    fn evaluate(
        &mut self,
        input: EvalInput<B>,
        compute_g_loss: bool,
    ) -> Result<Evaluation<B>, EvalError>;

    /// Clears the collected gradients of `network`.
    fn zero_grad(&mut self, network: Network);

    /// Collects the gradients of `loss` with respect to `network`'s parameters.
    fn backward(&mut self, network: Network, loss: Tensor<B, 1>);

    /// Applies the collected gradients of `network` with its optimizer.
    fn step(&mut self, network: Network);

    /// Writes a checkpoint for `iteration` into `dir`.
    ///
    /// # Errors
    ///
    /// Returns `Err(DeepFillError::CheckpointError)` if a record cannot be written.
    fn save(&self, dir: &Path, iteration: usize) -> DeepFillResult<()>;

    /// Loads the latest checkpoint of `dir` and returns the next iteration.
    ///
    /// # Errors
    ///
    /// Returns `Err(DeepFillError::CheckpointError)` if no complete checkpoint
    /// can be loaded.
    fn resume(&mut self, dir: &Path) -> DeepFillResult<usize>;
}
