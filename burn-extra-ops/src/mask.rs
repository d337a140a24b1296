//! # Hole Masks
//!
//! Rectangular hole masks and the masked-input derivation used by image inpainting.
//! A mask holds 1 at pixels that must be filled in and 0 everywhere else.

use burn::{prelude::*, tensor::TensorData};

/// A rectangular hole in pixel coordinates, stored as `(top, left, height, width)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct HoleBox {
    pub top: usize,
    pub left: usize,
    pub height: usize,
    pub width: usize,
}

impl HoleBox {
    /// Creates a new hole box.
    pub const fn new(top: usize, left: usize, height: usize, width: usize) -> Self {
        Self {
            top,
            left,
            height,
            width,
        }
    }

    /// Builds a box from a `[top, left, height, width]` row.
    pub const fn from_array([top, left, height, width]: [usize; 4]) -> Self {
        Self::new(top, left, height, width)
    }

    /// Returns the box as a `[top, left, height, width]` row.
    pub const fn to_array(self) -> [usize; 4] {
        [self.top, self.left, self.height, self.width]
    }

    /// One past the last covered row.
    pub const fn bottom(&self) -> usize {
        self.top + self.height
    }

    /// One past the last covered column.
    pub const fn right(&self) -> usize {
        self.left + self.width
    }

    /// Shrinks the box by `delta_h` rows on both vertical sides and `delta_w`
    /// columns on both horizontal sides. The result never collapses below one pixel.
    pub fn shrink(&self, delta_h: usize, delta_w: usize) -> Self {
        let delta_h = delta_h.min(self.height.saturating_sub(1) / 2);
        let delta_w = delta_w.min(self.width.saturating_sub(1) / 2);
        Self {
            top: self.top + delta_h,
            left: self.left + delta_w,
            height: self.height - 2 * delta_h,
            width: self.width - 2 * delta_w,
        }
    }
}

/// Zeroes the pixels selected by `mask`: `ground_truth * (1 - mask)`.
///
/// # Shapes
/// - ground_truth: `[batch_size, channels, height, width]`
/// - mask: `[batch_size, 1, height, width]`
/// - output: `[batch_size, channels, height, width]`
pub fn masked_input<B: Backend>(ground_truth: Tensor<B, 4>, mask: Tensor<B, 4>) -> Tensor<B, 4> {
    let channels = ground_truth.dims()[1];
    let keep = mask.neg().add_scalar(1.0).repeat_dim(1, channels);
    ground_truth * keep
}

/// Rasterizes one hole per image into a `[boxes.len(), 1, height, width]` mask.
///
/// Parts of a box that fall outside the image are clipped.
pub fn box_mask<B: Backend>(
    boxes: &[HoleBox],
    height: usize,
    width: usize,
    device: &B::Device,
) -> Tensor<B, 4> {
    let plane = height * width;
    let mut values = vec![0.0f32; boxes.len() * plane];

    for (index, hole) in boxes.iter().enumerate() {
        let offset = index * plane;
        for y in hole.top.min(height)..hole.bottom().min(height) {
            let row = offset + y * width;
            values[row + hole.left.min(width)..row + hole.right().min(width)].fill(1.0);
        }
    }

    let data = TensorData::new(values, [boxes.len(), 1, height, width]).convert::<B::FloatElem>();
    Tensor::from_data(data, device)
}

#[cfg(test)]
mod tests {
    use super::*;
    use burn::{
        backend::{ndarray::NdArrayDevice, NdArray},
        tensor::Distribution,
    };

    type TestBackend = NdArray;

    #[test]
    fn test_masked_input_zeroes_hole_and_keeps_context() {
        let device = NdArrayDevice::default();
        let ground_truth =
            Tensor::<TestBackend, 4>::random([2, 3, 8, 8], Distribution::Uniform(0.5, 1.0), &device);
        let holes = [HoleBox::new(1, 2, 3, 4), HoleBox::new(4, 0, 4, 8)];
        let mask = box_mask::<TestBackend>(&holes, 8, 8, &device);

        let masked = masked_input(ground_truth.clone(), mask.clone());
        assert_eq!(masked.dims(), [2, 3, 8, 8]);

        let mask = mask.repeat_dim(1, 3);
        let inside = masked.clone() * mask.clone();
        assert_eq!(inside.abs().sum().into_scalar(), 0.0);

        let keep = mask.neg().add_scalar(1.0);
        let outside_diff = (masked - ground_truth) * keep;
        assert_eq!(outside_diff.abs().sum().into_scalar(), 0.0);
    }

    #[test]
    fn test_box_mask_covers_exact_area() {
        let device = NdArrayDevice::default();
        let mask = box_mask::<TestBackend>(&[HoleBox::new(2, 3, 4, 5)], 16, 16, &device);

        assert_eq!(mask.dims(), [1, 1, 16, 16]);
        assert_eq!(mask.clone().sum().into_scalar(), 20.0);
        assert_eq!(
            mask.slice(s![0..1, 0..1, 2..6, 3..8]).sum().into_scalar(),
            20.0
        );
    }

    #[test]
    fn test_box_mask_clips_to_image() {
        let device = NdArrayDevice::default();
        let mask = box_mask::<TestBackend>(&[HoleBox::new(6, 6, 4, 4)], 8, 8, &device);
        assert_eq!(mask.sum().into_scalar(), 4.0);
    }

    #[test]
    fn test_shrink_keeps_box_centered() {
        let hole = HoleBox::new(10, 20, 32, 16);
        assert_eq!(hole.shrink(4, 2), HoleBox::new(14, 22, 24, 12));
        assert_eq!(hole.shrink(0, 0), hole);
    }

    #[test]
    fn test_shrink_never_collapses() {
        let hole = HoleBox::new(0, 0, 4, 3);
        let shrunk = hole.shrink(10, 10);
        assert!(shrunk.height >= 1);
        assert!(shrunk.width >= 1);
    }
}
