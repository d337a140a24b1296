//! Colour rendering of 2-channel offset fields.

use burn::prelude::*;

/// Renders an offset field as an RGB image in `[0, 1]`.
///
/// The horizontal offset drives red, the vertical offset drives green and blue
/// fades out with the offset magnitude, so a zero field renders as mid-grey
/// with full blue.
///
/// # Shapes
/// - offsets: `[batch_size, 2, height, width]`, values in `[-1, 1]`
/// - output: `[batch_size, 3, height, width]`
pub fn offset_to_color<B: Backend>(offsets: Tensor<B, 4>) -> Tensor<B, 4> {
    let dx = offsets.clone().slice(s![.., 0..1, .., ..]);
    let dy = offsets.slice(s![.., 1..2, .., ..]);

    let magnitude = (dx.clone().powf_scalar(2.0) + dy.clone().powf_scalar(2.0))
        .sqrt()
        .div_scalar(core::f64::consts::SQRT_2)
        .clamp(0.0, 1.0);

    Tensor::cat(
        vec![
            dx.add_scalar(1.0).div_scalar(2.0),
            dy.add_scalar(1.0).div_scalar(2.0),
            magnitude.neg().add_scalar(1.0),
        ],
        1,
    )
    .clamp(0.0, 1.0)
}
