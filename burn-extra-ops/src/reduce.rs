//! Reduction of per-replica values gathered from data-parallel evaluation.

use burn::prelude::*;

/// Reduces a vector of per-replica values to a single value with the arithmetic mean.
///
/// Values that already hold a single element are returned unchanged.
///
/// # Shapes
/// - values: `[replicas]`
/// - output: `[1]`
pub fn reduce_replicas<B: Backend>(values: Tensor<B, 1>) -> Tensor<B, 1> {
    if values.dims()[0] > 1 {
        values.mean()
    } else {
        values
    }
}

/// Gathers per-replica scalars onto `device` as a single `[replicas]` vector.
pub fn gather_replicas<B: Backend>(values: Vec<Tensor<B, 1>>, device: &B::Device) -> Tensor<B, 1> {
    let values = values
        .into_iter()
        .map(|value| value.to_device(device))
        .collect();
    Tensor::cat(values, 0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use burn::backend::{ndarray::NdArrayDevice, NdArray};

    type TestBackend = NdArray;

    #[test]
    fn test_reduce_replicas_takes_mean() {
        let device = NdArrayDevice::default();
        let values = Tensor::<TestBackend, 1>::from_floats([0.1, 0.3, 0.2], &device);

        let reduced = reduce_replicas(values);

        assert_eq!(reduced.dims(), [1]);
        assert!((reduced.into_scalar() - 0.2).abs() < 1e-6);
    }

    #[test]
    fn test_reduce_replicas_keeps_scalar() {
        let device = NdArrayDevice::default();
        let values = Tensor::<TestBackend, 1>::from_floats([1.5], &device);
        assert_eq!(reduce_replicas(values).into_scalar(), 1.5);
    }

    #[test]
    fn test_gather_replicas_concatenates_in_order() {
        let device = NdArrayDevice::default();
        let gathered = gather_replicas(
            vec![
                Tensor::<TestBackend, 1>::from_floats([0.5], &device),
                Tensor::<TestBackend, 1>::from_floats([1.5], &device),
            ],
            &device,
        );

        assert_eq!(gathered.dims(), [2]);
        assert_eq!(gathered.into_data().to_vec::<f32>().unwrap(), vec![0.5, 1.5]);
    }
}
