//! Loss functions for DeepFill training.
//!
//! Reconstruction terms compare the generator's two stages against the ground
//! truth, adversarial terms turn critic scores into WGAN losses. The gradient
//! penalty is estimated by `burn_extra_ops` from the critics themselves.

use burn::prelude::*;
use burn::tensor::{backend::Backend, Tensor};
use burn_extra_ops::{spatial_discounting_mask, GradientPenalty, GradientPenaltyConfig};

use crate::config::TrainingConfig;

/// Configuration for [`InpaintLoss`].
#[derive(Config, Debug)]
pub struct InpaintLossConfig {
    /// Weight of the coarse stage in the reconstruction terms.
    #[config(default = 1.2)]
    pub coarse_l1_alpha: f64,
    /// Weight of the global critic in the adversarial terms.
    #[config(default = 1.0)]
    pub global_wgan_loss_alpha: f64,
    /// Weight hole pixels by their distance to the hole border.
    #[config(default = true)]
    pub discounted_mask: bool,
    #[config(default = 0.9)]
    pub spatial_discounting_gamma: f64,
    #[config(default = "GradientPenaltyConfig::new()")]
    pub gradient_penalty: GradientPenaltyConfig,
}

impl InpaintLossConfig {
    /// Extracts the loss settings of a training configuration.
    pub fn from_training(config: &TrainingConfig) -> Self {
        Self::new()
            .with_coarse_l1_alpha(config.coarse_l1_alpha)
            .with_global_wgan_loss_alpha(config.global_wgan_loss_alpha)
            .with_discounted_mask(config.discounted_mask)
            .with_spatial_discounting_gamma(config.spatial_discounting_gamma)
    }

    /// Initialize a new inpainting loss with the given configuration.
    pub fn init(&self) -> InpaintLoss {
        InpaintLoss {
            coarse_l1_alpha: self.coarse_l1_alpha,
            global_wgan_loss_alpha: self.global_wgan_loss_alpha,
            discounted_mask: self.discounted_mask,
            gamma: self.spatial_discounting_gamma,
            penalty: self.gradient_penalty.init(),
        }
    }
}

/// The reconstruction and adversarial losses of DeepFill.
#[derive(Debug, Clone)]
pub struct InpaintLoss {
    coarse_l1_alpha: f64,
    global_wgan_loss_alpha: f64,
    discounted_mask: bool,
    gamma: f64,
    penalty: GradientPenalty,
}

impl Default for InpaintLoss {
    fn default() -> Self {
        InpaintLossConfig::new().init()
    }
}

/// Mean absolute error.
pub fn l1_loss<B: Backend>(pred: Tensor<B, 4>, target: Tensor<B, 4>) -> Tensor<B, 1> {
    (pred - target).abs().mean()
}

impl InpaintLoss {
    /// Discounted L1 inside the hole patches.
    ///
    /// # Shapes
    /// - all inputs: `[N, C, h, w]`, cropped to the hole boxes
    pub fn local_l1<B: Backend>(
        &self,
        coarse: Tensor<B, 4>,
        refined: Tensor<B, 4>,
        target: Tensor<B, 4>,
    ) -> Tensor<B, 1> {
        let [_, _, height, width] = target.dims();
        let discount = spatial_discounting_mask::<B>(
            height,
            width,
            self.gamma,
            self.discounted_mask,
            &target.device(),
        );

        let target = target * discount.clone();
        l1_loss(coarse * discount.clone(), target.clone()).mul_scalar(self.coarse_l1_alpha)
            + l1_loss(refined * discount, target)
    }

    /// L1 on the known context, normalized by the fraction of known pixels.
    ///
    /// # Shapes
    /// - coarse, refined, target: `[N, C, H, W]`
    /// - masks: `[N, 1, H, W]`, one inside the holes
    pub fn autoencoder<B: Backend>(
        &self,
        coarse: Tensor<B, 4>,
        refined: Tensor<B, 4>,
        target: Tensor<B, 4>,
        masks: Tensor<B, 4>,
    ) -> Tensor<B, 1> {
        let known = masks.neg().add_scalar(1.0);
        let target = target * known.clone();
        let loss = l1_loss(coarse * known.clone(), target.clone()).mul_scalar(self.coarse_l1_alpha)
            + l1_loss(refined * known.clone(), target);
        loss / known.mean()
    }

    /// Generator adversarial loss from the critics' scores of the fakes.
    pub fn generator_wgan<B: Backend>(
        &self,
        local_fake: Tensor<B, 2>,
        global_fake: Tensor<B, 2>,
    ) -> Tensor<B, 1> {
        local_fake.mean().neg() - global_fake.mean().mul_scalar(self.global_wgan_loss_alpha)
    }

    /// Critic WGAN loss: fake scores minus real scores at both scales.
    pub fn discriminator_wgan<B: Backend>(
        &self,
        local_real: Tensor<B, 2>,
        local_fake: Tensor<B, 2>,
        global_real: Tensor<B, 2>,
        global_fake: Tensor<B, 2>,
    ) -> Tensor<B, 1> {
        (local_fake - local_real).mean()
            + (global_fake - global_real)
                .mean()
                .mul_scalar(self.global_wgan_loss_alpha)
    }

    /// Gradient penalty of one critic, see [`GradientPenalty`].
    pub fn gradient_penalty<B, F>(
        &self,
        critic: F,
        real: Tensor<B, 4>,
        fake: Tensor<B, 4>,
    ) -> Tensor<B, 1>
    where
        B: Backend,
        F: Fn(Tensor<B, 4>) -> Tensor<B, 2>,
    {
        self.penalty.forward(critic, real, fake)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use burn::backend::{ndarray::NdArrayDevice, NdArray};
    use burn_extra_ops::{box_mask, HoleBox};

    type TestBackend = NdArray;

    fn approx(tensor: Tensor<TestBackend, 1>, expected: f32) {
        let value = tensor.into_scalar();
        assert!((value - expected).abs() < 1e-5, "{value} != {expected}");
    }

    #[test]
    fn test_local_l1_without_discount() {
        let device = NdArrayDevice::Cpu;
        let loss = InpaintLossConfig::new()
            .with_coarse_l1_alpha(2.0)
            .with_discounted_mask(false)
            .init();

        let target = Tensor::<TestBackend, 4>::zeros([2, 3, 4, 4], &device);
        let coarse = Tensor::full([2, 3, 4, 4], 0.5, &device);
        let refined = Tensor::full([2, 3, 4, 4], -0.25, &device);

        approx(loss.local_l1(coarse, refined, target), 2.0 * 0.5 + 0.25);
    }

    #[test]
    fn test_local_l1_is_discounted() {
        let device = NdArrayDevice::Cpu;
        let discounted = InpaintLossConfig::new().with_spatial_discounting_gamma(0.5).init();
        let plain = InpaintLossConfig::new().with_discounted_mask(false).init();

        let target = Tensor::<TestBackend, 4>::zeros([1, 3, 8, 8], &device);
        let pred = Tensor::<TestBackend, 4>::ones([1, 3, 8, 8], &device);

        let discounted = discounted
            .local_l1(pred.clone(), pred.clone(), target.clone())
            .into_scalar();
        let plain = plain.local_l1(pred.clone(), pred, target).into_scalar();
        assert!(discounted < plain);
    }

    #[test]
    fn test_autoencoder_ignores_hole() {
        let device = NdArrayDevice::Cpu;
        let loss = InpaintLossConfig::new().with_coarse_l1_alpha(1.0).init();

        let masks = box_mask::<TestBackend>(&[HoleBox::new(0, 0, 2, 4)], 4, 4, &device);
        let target = Tensor::<TestBackend, 4>::zeros([1, 3, 4, 4], &device);
        // Large error inside the hole, unit error on the context.
        let pred = Tensor::<TestBackend, 4>::ones([1, 3, 4, 4], &device)
            + masks.clone().repeat_dim(1, 3).mul_scalar(9.0);

        // Each stage: mean(|1| * known) = 0.5, divided by mean(known) = 0.5.
        approx(loss.autoencoder(pred.clone(), pred, target, masks), 2.0);
    }

    #[test]
    fn test_wgan_terms() {
        let device = NdArrayDevice::Cpu;
        let loss = InpaintLossConfig::new()
            .with_global_wgan_loss_alpha(0.5)
            .init();

        let local_real = Tensor::<TestBackend, 2>::from_floats([[1.0], [3.0]], &device);
        let local_fake = Tensor::<TestBackend, 2>::from_floats([[0.0], [1.0]], &device);
        let global_real = Tensor::<TestBackend, 2>::from_floats([[2.0], [2.0]], &device);
        let global_fake = Tensor::<TestBackend, 2>::from_floats([[4.0], [0.0]], &device);

        approx(
            loss.generator_wgan(local_fake.clone(), global_fake.clone()),
            -0.5 - 0.5 * 2.0,
        );
        approx(
            loss.discriminator_wgan(local_real, local_fake, global_real, global_fake),
            (0.5 - 2.0) + 0.5 * (2.0 - 2.0),
        );
    }
}
