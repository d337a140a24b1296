//! # Spatial Discounting
//!
//! Weights for the reconstruction loss inside a hole. Pixels close to the hole
//! border are more constrained by their context than pixels in the middle, so
//! their weight decays as `gamma^distance` towards the center.

use burn::{prelude::*, tensor::TensorData};

/// Computes the `height * width` row-major discount weights.
///
/// `weight[i, j] = max(gamma^min(i, height - i), gamma^min(j, width - j))`
pub fn spatial_discount_values(height: usize, width: usize, gamma: f64) -> Vec<f32> {
    let mut values = Vec::with_capacity(height * width);
    for i in 0..height {
        let row = gamma.powi(i.min(height - i) as i32);
        for j in 0..width {
            let col = gamma.powi(j.min(width - j) as i32);
            values.push(row.max(col) as f32);
        }
    }
    values
}

/// Builds the `[1, 1, height, width]` discount mask.
///
/// When `discounted` is false every weight is 1.
pub fn spatial_discounting_mask<B: Backend>(
    height: usize,
    width: usize,
    gamma: f64,
    discounted: bool,
    device: &B::Device,
) -> Tensor<B, 4> {
    if !discounted {
        return Tensor::ones([1, 1, height, width], device);
    }

    let data = TensorData::new(spatial_discount_values(height, width, gamma), [1, 1, height, width])
        .convert::<B::FloatElem>();
    Tensor::from_data(data, device)
}

#[cfg(test)]
mod tests {
    use super::*;
    use burn::backend::{ndarray::NdArrayDevice, NdArray};

    #[test]
    fn test_discount_values_decay_towards_center() {
        let values = spatial_discount_values(5, 5, 0.5);

        assert_eq!(values.len(), 25);
        assert_eq!(values[0], 1.0);
        // Center pixel: distance 2 from both borders.
        assert_eq!(values[2 * 5 + 2], 0.25);
        // Row 1, column 2: max(0.5^1, 0.5^2).
        assert_eq!(values[5 + 2], 0.5);
    }

    #[test]
    fn test_undiscounted_mask_is_ones() {
        let device = NdArrayDevice::default();
        let mask = spatial_discounting_mask::<NdArray>(4, 6, 0.9, false, &device);
        assert_eq!(mask.dims(), [1, 1, 4, 6]);
        assert_eq!(mask.sum().into_scalar(), 24.0);
    }

    #[test]
    fn test_discounted_mask_matches_values() {
        let device = NdArrayDevice::default();
        let mask = spatial_discounting_mask::<NdArray>(3, 3, 0.5, true, &device);
        let expected: f32 = spatial_discount_values(3, 3, 0.5).iter().sum();
        assert!((mask.sum().into_scalar() - expected).abs() < 1e-6);
    }
}
