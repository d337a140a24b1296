//! # Gradient Penalty
//!
//! WGAN-GP style penalty that keeps a critic close to 1-Lipschitz.
//!
//! Burn's autodiff only supports first-order gradients, so the critic's slope is
//! estimated with a central finite difference along the real-to-fake direction at a
//! random interpolate, instead of differentiating the critic output with respect to
//! its input. The estimate stays differentiable with respect to the critic's
//! parameters, which is all the discriminator update needs.

use burn::{prelude::*, tensor::Distribution};

/// Configuration for the [`GradientPenalty`].
#[derive(Config, Debug)]
pub struct GradientPenaltyConfig {
    /// Half-width of the finite-difference stencil, in input units.
    #[config(default = 1e-2)]
    pub step: f64,
    /// Added to the direction norm to avoid dividing by zero when real equals fake.
    #[config(default = 1e-8)]
    pub epsilon: f64,
}

impl GradientPenaltyConfig {
    /// Initializes a new gradient penalty.
    pub const fn init(&self) -> GradientPenalty {
        GradientPenalty {
            step: self.step,
            epsilon: self.epsilon,
        }
    }
}

/// Finite-difference gradient penalty.
#[derive(Debug, Clone, Copy)]
pub struct GradientPenalty {
    step: f64,
    epsilon: f64,
}

impl Default for GradientPenalty {
    fn default() -> Self {
        GradientPenaltyConfig::new().init()
    }
}

impl GradientPenalty {
    /// Computes `mean((|slope| - 1)^2)` over the batch.
    ///
    /// `fake` should already be detached from the generator graph.
    ///
    /// # Shapes
    /// - real, fake: `[batch_size, channels, height, width]`
    /// - critic output: `[batch_size, 1]`
    /// - output: `[1]`
    pub fn forward<B, F>(&self, critic: F, real: Tensor<B, 4>, fake: Tensor<B, 4>) -> Tensor<B, 1>
    where
        B: Backend,
        F: Fn(Tensor<B, 4>) -> Tensor<B, 2>,
    {
        let batch_size = real.dims()[0];
        let alpha = Tensor::<B, 4>::random(
            [batch_size, 1, 1, 1],
            Distribution::Uniform(0.0, 1.0),
            &real.device(),
        );
        let interpolates =
            real.clone() * alpha.clone() + fake.clone() * alpha.neg().add_scalar(1.0);

        let delta = real - fake;
        let norm = delta
            .clone()
            .powf_scalar(2.0)
            .sum_dim(1)
            .sum_dim(2)
            .sum_dim(3)
            .sqrt()
            .add_scalar(self.epsilon);
        let offset = (delta / norm).mul_scalar(self.step);

        let ahead = critic(interpolates.clone() + offset.clone());
        let behind = critic(interpolates - offset);
        let slope = (ahead - behind).div_scalar(2.0 * self.step);

        slope.abs().sub_scalar(1.0).powf_scalar(2.0).mean()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use burn::backend::{ndarray::NdArrayDevice, Autodiff, NdArray};

    type TestBackend = NdArray;

    fn corner_critic<B: Backend>(scale: f64) -> impl Fn(Tensor<B, 4>) -> Tensor<B, 2> {
        move |x: Tensor<B, 4>| {
            let batch_size = x.dims()[0];
            x.slice(s![.., 0..1, 0..1, 0..1])
                .reshape([batch_size, 1])
                .mul_scalar(scale)
        }
    }

    #[test]
    fn test_penalty_of_linear_critic() {
        let device = NdArrayDevice::default();
        let real = Tensor::<TestBackend, 4>::zeros([2, 1, 4, 4], &device);
        // Real and fake differ only at the pixel the critic reads.
        let fake = real.clone().slice_assign(
            s![.., 0..1, 0..1, 0..1],
            Tensor::ones([2, 1, 1, 1], &device),
        );

        let penalty = GradientPenalty::default().forward(corner_critic(3.0), real, fake);

        assert_eq!(penalty.dims(), [1]);
        assert!((penalty.into_scalar() - 4.0).abs() < 1e-2);
    }

    #[test]
    fn test_unit_slope_has_no_penalty() {
        let device = NdArrayDevice::default();
        let real = Tensor::<TestBackend, 4>::zeros([1, 1, 2, 2], &device);
        let fake = real.clone().slice_assign(
            s![.., 0..1, 0..1, 0..1],
            Tensor::full([1, 1, 1, 1], -2.0, &device),
        );

        let penalty = GradientPenalty::default().forward(corner_critic(1.0), real, fake);
        assert!(penalty.into_scalar().abs() < 1e-4);
    }

    #[test]
    fn test_penalty_is_differentiable_in_critic_weight() {
        type AutodiffBackend = Autodiff<NdArray>;
        let device = NdArrayDevice::default();
        let weight = Tensor::<AutodiffBackend, 1>::from_floats([3.0], &device).require_grad();
        let real = Tensor::<AutodiffBackend, 4>::zeros([1, 1, 2, 2], &device);
        let fake = real.clone().slice_assign(
            s![.., 0..1, 0..1, 0..1],
            Tensor::ones([1, 1, 1, 1], &device),
        );

        let critic = |x: Tensor<AutodiffBackend, 4>| {
            x.slice(s![.., 0..1, 0..1, 0..1])
                .reshape([1, 1])
                .mul(weight.clone().reshape([1, 1]))
        };
        let penalty = GradientPenalty::default().forward(critic, real, fake);
        let grads = penalty.backward();
        let grad = weight.grad(&grads).expect("weight gradient");

        // d/dw (w - 1)^2 = 2 (w - 1) = 4 at w = 3.
        assert!((grad.into_scalar() - 4.0).abs() < 1e-2);
    }
}
