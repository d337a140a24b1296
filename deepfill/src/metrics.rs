//! Image quality metrics for DeepFill training.

use burn::tensor::{backend::Backend, ElementConversion, Tensor};

/// Upper bound reported for identical images.
pub const MAX_PSNR: f64 = 100.0;

/// PSNR and mean squared error of a prediction.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ImageQuality {
    /// Peak signal-to-noise ratio in dB.
    pub psnr: f64,
    /// Mean squared error on the `[0, 1]` scale.
    pub l2: f64,
}

/// Converts a mean squared error on the `[0, 1]` scale to PSNR.
pub fn psnr_from_l2(l2: f64) -> f64 {
    if l2 <= 0.0 {
        return MAX_PSNR;
    }
    (10.0 * (1.0 / l2).log10()).min(MAX_PSNR)
}

/// Compares two batches of `[-1, 1]` images.
///
/// Both inputs are mapped to `[0, 1]` before the error is taken.
pub fn calculate_psnr<B: Backend>(
    ground_truth: Tensor<B, 4>,
    prediction: Tensor<B, 4>,
) -> ImageQuality {
    let ground_truth = ground_truth.add_scalar(1.0).div_scalar(2.0);
    let prediction = prediction.add_scalar(1.0).div_scalar(2.0).clamp(0.0, 1.0);

    let l2 = (ground_truth - prediction)
        .powf_scalar(2.0)
        .mean()
        .into_scalar()
        .elem::<f64>();

    ImageQuality {
        psnr: psnr_from_l2(l2),
        l2,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use burn::backend::{ndarray::NdArrayDevice, NdArray};

    type TestBackend = NdArray;

    #[test]
    fn test_identical_images_are_capped() {
        let device = NdArrayDevice::Cpu;
        let image = Tensor::<TestBackend, 4>::zeros([2, 3, 8, 8], &device);

        let quality = calculate_psnr(image.clone(), image);
        assert_eq!(quality.l2, 0.0);
        assert_eq!(quality.psnr, MAX_PSNR);
    }

    #[test]
    fn test_known_error() {
        let device = NdArrayDevice::Cpu;
        let ground_truth = Tensor::<TestBackend, 4>::full([1, 3, 4, 4], -1.0, &device);
        // 0.2 apart in [-1, 1] is 0.1 apart in [0, 1].
        let prediction = Tensor::<TestBackend, 4>::full([1, 3, 4, 4], -0.8, &device);

        let quality = calculate_psnr(ground_truth, prediction);
        assert!((quality.l2 - 0.01).abs() < 1e-6);
        assert!((quality.psnr - 20.0).abs() < 1e-3);
    }
}
