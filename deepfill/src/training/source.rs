//! Batch supply that never runs dry.

use burn::{
    data::dataloader::{DataLoader, DataLoaderIterator},
    tensor::backend::Backend,
};

/// Why a source could not produce a batch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FetchError {
    /// The current pass over the data is finished.
    Exhausted,
    /// The source hit a fault that a new pass may clear.
    Transient { reason: String },
}

/// A supplier of training batches.
///
/// The training loop calls [`BatchSource::new_pass`] whenever
/// [`BatchSource::next_batch`] fails and then asks again.
pub trait BatchSource<O> {
    /// Returns the next batch of the current pass.
    ///
    /// # Errors
    ///
    /// Returns a [`FetchError`] when the current pass cannot continue.
    fn next_batch(&mut self) -> Result<O, FetchError>;

    /// Starts a new pass over the data with a fresh shuffle.
    fn new_pass(&mut self);
}

/// [`BatchSource`] over a Burn [`DataLoader`].
///
/// A shuffling data loader reshuffles on every call to `iter`, so every pass
/// visits the data in a new order.
pub struct LoaderSource<'a, B: Backend, O> {
    loader: &'a dyn DataLoader<B, O>,
    iterator: Box<dyn DataLoaderIterator<O> + 'a>,
    served: usize,
}

impl<'a, B: Backend, O> LoaderSource<'a, B, O> {
    pub fn new(loader: &'a dyn DataLoader<B, O>) -> Self {
        Self {
            loader,
            iterator: loader.iter(),
            served: 0,
        }
    }
}

impl<B: Backend, O> BatchSource<O> for LoaderSource<'_, B, O> {
    /// A pass that ends before its first batch is reported as
    /// [`FetchError::Transient`], a pass that served batches as
    /// [`FetchError::Exhausted`].
    fn next_batch(&mut self) -> Result<O, FetchError> {
        match self.iterator.next() {
            Some(batch) => {
                self.served += 1;
                Ok(batch)
            }
            None if self.served == 0 => Err(FetchError::Transient {
                reason: "the data loader produced no batch in this pass".to_string(),
            }),
            None => Err(FetchError::Exhausted),
        }
    }

    fn new_pass(&mut self) {
        self.iterator = self.loader.iter();
        self.served = 0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dataset::{BoxMaskConfig, InpaintBatcher, InpaintDataset};
    use burn::{
        backend::{ndarray::NdArrayDevice, NdArray},
        data::{
            dataloader::{batcher::Batcher, DataLoaderBuilder},
            dataset::InMemDataset,
        },
    };
    use image::{Rgb, RgbImage};

    type TestBackend = NdArray;

    #[derive(Clone, Default)]
    struct SumBatcher;

    impl Batcher<TestBackend, i32, i32> for SumBatcher {
        fn batch(&self, items: Vec<i32>, _device: &NdArrayDevice) -> i32 {
            items.into_iter().sum()
        }
    }

    #[test]
    fn test_loader_source_restarts_after_exhaustion() {
        let loader = DataLoaderBuilder::new(SumBatcher)
            .batch_size(2)
            .build(InMemDataset::new(vec![1, 2, 3, 4]));
        let mut source = LoaderSource::new(loader.as_ref());

        assert_eq!(source.next_batch(), Ok(3));
        assert_eq!(source.next_batch(), Ok(7));
        assert_eq!(source.next_batch(), Err(FetchError::Exhausted));

        source.new_pass();
        assert_eq!(source.next_batch(), Ok(3));
    }

    #[test]
    fn test_empty_pass_is_transient() {
        let loader = DataLoaderBuilder::new(SumBatcher)
            .batch_size(2)
            .build(InMemDataset::new(Vec::<i32>::new()));
        let mut source = LoaderSource::new(loader.as_ref());

        assert!(matches!(
            source.next_batch(),
            Err(FetchError::Transient { .. })
        ));
    }

    #[test]
    fn test_undecodable_image_does_not_end_pass() {
        let dir = tempfile::tempdir().unwrap();
        let broken = dir.path().join("a_broken.png");
        let good = dir.path().join("b_good.png");
        std::fs::write(&broken, b"not an image").unwrap();
        RgbImage::from_pixel(16, 16, Rgb([10, 20, 30]))
            .save(&good)
            .unwrap();

        let device = NdArrayDevice::Cpu;
        let dataset =
            InpaintDataset::<TestBackend>::from_paths(vec![broken, good], [16, 16], &device);
        let mask = BoxMaskConfig {
            image_size: [16, 16],
            mask_shape: [8, 8],
            margin: [0, 0],
            max_delta_shape: [2, 2],
            mask_batch_same: false,
        };
        let loader = DataLoaderBuilder::new(InpaintBatcher::<TestBackend>::new(mask, 3))
            .batch_size(1)
            .build(dataset);
        let mut source = LoaderSource::new(loader.as_ref());

        // Both indices serve the decodable image.
        for _ in 0..2 {
            let batch = source.next_batch().unwrap();
            assert_eq!(batch.ground_truth.dims(), [1, 3, 16, 16]);
        }
        assert_eq!(source.next_batch().err(), Some(FetchError::Exhausted));

        source.new_pass();
        assert!(source.next_batch().is_ok());
    }
}
