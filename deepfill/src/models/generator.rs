//! # Generator
//!
//! Two-stage coarse-to-fine inpainting network. The coarse stage predicts a
//! blurry fill of the hole, the fine stage refines the composite of that
//! prediction with the known context. The fine stage also predicts a
//! two-channel offset field that points every pixel to the context it borrows
//! from; it is only used for visualization.

use burn::{prelude::*, tensor::activation::tanh};
use burn_extra_ops::{offset_to_color, TensorExtraOps};

use super::layers::{upsample, BlockActivation, ConvBlock, ConvBlockConfig};
use crate::config::GeneratorConfig;

/// Channels of the generator input: image, a constant plane and the mask.
fn stage_input_channels(image_channels: usize) -> usize {
    image_channels + 2
}

/// Configuration for one [`InpaintStage`].
#[derive(Config, Debug)]
pub struct InpaintStageConfig {
    /// Number of image channels.
    input_dim: usize,
    /// Base number of feature channels.
    cnum: usize,
    /// Add the offset-field head.
    #[config(default = false)]
    offset_head: bool,
}

impl InpaintStageConfig {
    /// Initializes a new `InpaintStage` module.
    pub fn init<B: Backend>(&self, device: &Device<B>) -> InpaintStage<B> {
        let cnum = self.cnum;
        let block = |in_channels: usize, out_channels: usize| ConvBlockConfig::new(in_channels, out_channels);

        let encoder = vec![
            block(stage_input_channels(self.input_dim), cnum)
                .with_kernel_size(5)
                .init(device),
            block(cnum, 2 * cnum).with_stride(2).init(device),
            block(2 * cnum, 2 * cnum).init(device),
            block(2 * cnum, 4 * cnum).with_stride(2).init(device),
            block(4 * cnum, 4 * cnum).init(device),
            block(4 * cnum, 4 * cnum).init(device),
        ];
        let dilated = [2, 4, 8, 16]
            .into_iter()
            .map(|dilation| block(4 * cnum, 4 * cnum).with_dilation(dilation).init(device))
            .chain([
                block(4 * cnum, 4 * cnum).init(device),
                block(4 * cnum, 4 * cnum).init(device),
            ])
            .collect();
        let decoder_mid = vec![
            block(4 * cnum, 2 * cnum).init(device),
            block(2 * cnum, 2 * cnum).init(device),
        ];
        let decoder_out = vec![
            block(2 * cnum, cnum).init(device),
            block(cnum, cnum / 2).init(device),
            block(cnum / 2, self.input_dim)
                .with_activation(BlockActivation::Linear)
                .init(device),
        ];
        let offset_head = self.offset_head.then(|| {
            block(4 * cnum, 2)
                .with_activation(BlockActivation::Linear)
                .init(device)
        });

        InpaintStage {
            encoder,
            dilated,
            decoder_mid,
            decoder_out,
            offset_head,
        }
    }
}

/// Encoder, dilated bottleneck and decoder of one generator stage.
#[derive(Module, Debug)]
pub struct InpaintStage<B: Backend> {
    encoder: Vec<ConvBlock<B>>,
    dilated: Vec<ConvBlock<B>>,
    decoder_mid: Vec<ConvBlock<B>>,
    decoder_out: Vec<ConvBlock<B>>,
    offset_head: Option<ConvBlock<B>>,
}

impl<B: Backend> InpaintStage<B> {
    /// Returns the prediction in `[-1, 1]` and, if the stage has an offset
    /// head, the `[N, 2, H, W]` offset field in `[-1, 1]`.
    pub fn forward(&self, x: Tensor<B, 4>) -> (Tensor<B, 4>, Option<Tensor<B, 4>>) {
        let x = self.encoder.iter().fold(x, |x, layer| layer.forward(x));
        let x = self.dilated.iter().fold(x, |x, layer| layer.forward(x));

        let offsets = self
            .offset_head
            .as_ref()
            .map(|head| upsample(tanh(head.forward(x.clone())), 4));

        let x = upsample(x, 2);
        let x = self.decoder_mid.iter().fold(x, |x, layer| layer.forward(x));
        let x = upsample(x, 2);
        let x = self.decoder_out.iter().fold(x, |x, layer| layer.forward(x));

        (x.clamp(-1.0, 1.0), offsets)
    }
}

/// Outputs of a generator forward pass.
#[derive(Debug, Clone)]
pub struct GeneratorOutput<B: Backend> {
    /// Coarse prediction, [N, C, H, W]
    pub coarse: Tensor<B, 4>,
    /// Refined prediction, [N, C, H, W]
    pub refined: Tensor<B, 4>,
    /// Color rendering of the offset field, [N, 3, H, W] in [0, 1]
    pub offset_flow: Tensor<B, 4>,
}

impl GeneratorConfig {
    /// Initializes a new `Generator` module.
    pub fn init<B: Backend>(&self, device: &Device<B>) -> Generator<B> {
        Generator {
            coarse: InpaintStageConfig::new(self.input_dim, self.ngf).init(device),
            fine: InpaintStageConfig::new(self.input_dim, self.ngf)
                .with_offset_head(true)
                .init(device),
        }
    }
}

/// Coarse-to-fine inpainting generator.
#[derive(Module, Debug)]
pub struct Generator<B: Backend> {
    coarse: InpaintStage<B>,
    fine: InpaintStage<B>,
}

impl<B: Backend> Generator<B> {
    /// Fills the holes of `masked`.
    ///
    /// # Shapes
    /// - masked: `[N, C, H, W]`, zero inside the holes
    /// - masks: `[N, 1, H, W]`, one inside the holes
    pub fn forward(&self, masked: Tensor<B, 4>, masks: Tensor<B, 4>) -> GeneratorOutput<B> {
        let [batch_size, _, height, width] = masked.dims();
        let ones = Tensor::ones([batch_size, 1, height, width], &masked.device());

        let input = Tensor::cat(vec![masked.clone(), ones.clone(), masks.clone()], 1);
        let (coarse, _) = self.coarse.forward(input);

        let composite = coarse.clone().fill_hole(masked, masks.clone());
        let input = Tensor::cat(vec![composite, ones, masks], 1);
        let (refined, offsets) = self.fine.forward(input);

        let offset_flow = match offsets {
            Some(offsets) => offset_to_color(offsets),
            None => Tensor::zeros([batch_size, 3, height, width], &refined.device()),
        };

        GeneratorOutput {
            coarse,
            refined,
            offset_flow,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use burn::backend::{ndarray::NdArrayDevice, NdArray};
    use burn::tensor::Distribution;

    type TestBackend = NdArray;

    #[test]
    fn test_generator_output_shapes_and_range() {
        let device = NdArrayDevice::Cpu;
        let generator = GeneratorConfig::new().with_ngf(4).init::<TestBackend>(&device);

        let masked =
            Tensor::<TestBackend, 4>::random([2, 3, 16, 16], Distribution::Uniform(-1.0, 1.0), &device);
        let masks = Tensor::<TestBackend, 4>::zeros([2, 1, 16, 16], &device);
        let output = generator.forward(masked, masks);

        assert_eq!(output.coarse.dims(), [2, 3, 16, 16]);
        assert_eq!(output.refined.dims(), [2, 3, 16, 16]);
        assert_eq!(output.offset_flow.dims(), [2, 3, 16, 16]);
        assert!(output.refined.clone().abs().max().into_scalar() <= 1.0);
        assert!(output.offset_flow.clone().min().into_scalar() >= 0.0);
        assert!(output.offset_flow.max().into_scalar() <= 1.0);
    }
}
