//! Additional operations for the Burn deep learning framework
//!
//! This crate provides the tensor operations image inpainting needs that are not
//! available in the core Burn framework: hole masks, spatial discounting, replica
//! reduction, a first-order gradient penalty and offset-field rendering.

use burn::prelude::*;

mod discount;
mod flow;
mod mask;
mod penalty;
mod reduce;

// Convenient re-exports
pub use discount::{spatial_discount_values, spatial_discounting_mask};
pub use flow::offset_to_color;
pub use mask::{box_mask, masked_input, HoleBox};
pub use penalty::{GradientPenalty, GradientPenaltyConfig};
pub use reduce::{gather_replicas, reduce_replicas};

/// Additional operations for Burn tensors
pub trait TensorExtraOps<B: Backend> {
    /// Zeroes the pixels where `mask` is 1, see [`masked_input`].
    fn mask_out(self, mask: Tensor<B, 4>) -> Self;

    /// Composites `self` into the hole of `context`: `self * mask + context * (1 - mask)`.
    fn fill_hole(self, context: Tensor<B, 4>, mask: Tensor<B, 4>) -> Self;
}

impl<B: Backend> TensorExtraOps<B> for Tensor<B, 4> {
    fn mask_out(self, mask: Tensor<B, 4>) -> Self {
        masked_input(self, mask)
    }

    fn fill_hole(self, context: Tensor<B, 4>, mask: Tensor<B, 4>) -> Self {
        let channels = self.dims()[1];
        let mask = mask.repeat_dim(1, channels);
        self * mask.clone() + context * mask.neg().add_scalar(1.0)
    }
}
