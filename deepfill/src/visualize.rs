//! Image grids for visual inspection of training progress.

use std::path::Path;

use burn::tensor::{backend::Backend, DType, Tensor};
use image::{buffer::ConvertBuffer, ImageBuffer, Rgb, RgbImage};

use crate::error::{DeepFillError, DeepFillResult};

/// Pixels between two grid cells.
pub const GRID_PADDING: usize = 2;

/// Tiles a batch of RGB images into one image, `columns` images per row.
///
/// With `normalize` the whole batch is min-max scaled to `[0, 1]` first,
/// otherwise values are expected in `[0, 1]` already and are clamped.
///
/// # Errors
///
/// Returns `Err(DeepFillError::InvalidTensorShape)` if the images are not 3-channel
/// or the batch is empty.
pub fn make_grid<B: Backend>(
    images: Tensor<B, 4>,
    columns: usize,
    normalize: bool,
) -> DeepFillResult<RgbImage> {
    let [count, channels, height, width] = images.dims();
    if channels != 3 || count == 0 {
        return Err(DeepFillError::shape(
            "grid images",
            "[N > 0, 3, H, W]",
            &images.dims(),
        ));
    }

    let mut data = images
        .into_data()
        .convert_dtype(DType::F32)
        .to_vec::<f32>()
        .map_err(|e| DeepFillError::SinkError {
            sink: "image grid".to_string(),
            reason: format!("Failed to convert tensor to f32: {e:?}"),
        })?;

    if normalize {
        let (min, max) = data
            .iter()
            .fold((f32::INFINITY, f32::NEG_INFINITY), |(lo, hi), &v| {
                (lo.min(v), hi.max(v))
            });
        let range = (max - min).max(1e-5);
        data.iter_mut().for_each(|v| *v = (*v - min) / range);
    }

    let columns = columns.clamp(1, count);
    let rows = count.div_ceil(columns);
    let grid_width = columns * (width + GRID_PADDING) + GRID_PADDING;
    let grid_height = rows * (height + GRID_PADDING) + GRID_PADDING;

    let mut grid = ImageBuffer::<Rgb<f32>, Vec<f32>>::new(grid_width as u32, grid_height as u32);
    let plane = height * width;
    for index in 0..count {
        let x0 = (index % columns) * (width + GRID_PADDING) + GRID_PADDING;
        let y0 = (index / columns) * (height + GRID_PADDING) + GRID_PADDING;
        let image = &data[index * channels * plane..(index + 1) * channels * plane];
        for y in 0..height {
            for x in 0..width {
                let offset = y * width + x;
                let pixel = [0, 1, 2].map(|c| image[c * plane + offset].clamp(0.0, 1.0));
                grid.put_pixel((x0 + x) as u32, (y0 + y) as u32, Rgb(pixel));
            }
        }
    }

    Ok(grid.convert())
}

/// Writes [`make_grid`] of `images` to `path`.
///
/// # Errors
///
/// Returns `Err(DeepFillError::SinkError)` if the file cannot be written.
pub fn save_image_grid<B: Backend>(
    images: Tensor<B, 4>,
    path: &Path,
    columns: usize,
    normalize: bool,
) -> DeepFillResult<()> {
    let grid = make_grid(images, columns, normalize)?;
    grid.save(path).map_err(|e| DeepFillError::SinkError {
        sink: path.display().to_string(),
        reason: e.to_string(),
    })
}
