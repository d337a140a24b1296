//! Dataset implementation for DeepFill training.
//!
//! This module loads training images from a folder tree, turns them into
//! `[-1, 1]` tensors and, at batching time, draws a rectangular hole per image.
//! Each image carries exactly one hole object and one "in image" relationship
//! triple, so the batch layout matches what the trainer expects from richer
//! scene datasets.

use std::{
    marker::PhantomData,
    path::{Path, PathBuf},
    sync::{Arc, Mutex},
};

use burn::data::{dataloader::batcher::Batcher, dataset::Dataset};
use burn::tensor::{backend::Backend, Int, Tensor, TensorData};
use burn_extra_ops::{box_mask, HoleBox};
use image::{imageops::FilterType, DynamicImage};
use rand::{rngs::StdRng, Rng, SeedableRng};
use walkdir::WalkDir;

use crate::{
    config::TrainingConfig,
    error::{DeepFillError, DeepFillResult},
};

/// Object id of the hole object every image carries.
pub const HOLE_OBJECT: i64 = 0;
/// Predicate id of the `__in_image__` relationship.
pub const IN_IMAGE_PREDICATE: i64 = 0;

const IMAGE_EXTENSIONS: [&str; 3] = ["png", "jpg", "jpeg"];

/// A single preprocessed training image.
#[derive(Debug, Clone)]
pub struct InpaintItem<B: Backend> {
    /// Image tensor with shape [3, H, W] and values in [-1, 1]
    pub image: Tensor<B, 3>,
}

/// A batch of training images together with their holes.
#[derive(Debug, Clone)]
pub struct InpaintBatch<B: Backend> {
    /// Ground-truth images with shape [N, 3, H, W]
    pub ground_truth: Tensor<B, 4>,
    /// Object ids with shape [O]
    pub objs: Tensor<B, 1, Int>,
    /// Hole boxes with shape [N, 4] as (top, left, height, width)
    pub bboxes: Tensor<B, 2, Int>,
    /// Relationship triples with shape [T, 3] as (subject, predicate, object)
    pub triples: Tensor<B, 2, Int>,
    /// Hole masks with shape [N, 1, H, W], 1 inside the hole
    pub masks: Tensor<B, 4>,
    /// Image index of every object, shape [O]
    pub obj_to_img: Tensor<B, 1, Int>,
    /// Image index of every triple, shape [T]
    pub triple_to_img: Tensor<B, 1, Int>,
}

impl<B: Backend> InpaintBatch<B> {
    /// Checks the shape contract of a batch.
    ///
    /// # Errors
    ///
    /// Returns `Err(DeepFillError::InvalidTensorShape)` for the first tensor that
    /// violates the contract.
    pub fn validate(&self) -> DeepFillResult<()> {
        let [batch_size, channels, height, width] = self.ground_truth.dims();
        if channels != 3 {
            return Err(DeepFillError::shape(
                "ground_truth",
                "[N, 3, H, W]",
                &self.ground_truth.dims(),
            ));
        }

        let expected = format!("[{batch_size}, 1, {height}, {width}]");
        if self.masks.dims() != [batch_size, 1, height, width] {
            return Err(DeepFillError::shape("masks", expected, &self.masks.dims()));
        }

        if self.bboxes.dims() != [batch_size, 4] {
            return Err(DeepFillError::shape(
                "bboxes",
                format!("[{batch_size}, 4]"),
                &self.bboxes.dims(),
            ));
        }

        let [num_triples, triple_width] = self.triples.dims();
        if triple_width != 3 {
            return Err(DeepFillError::shape("triples", "[T, 3]", &self.triples.dims()));
        }
        if self.triple_to_img.dims() != [num_triples] {
            return Err(DeepFillError::shape(
                "triple_to_img",
                format!("[{num_triples}]"),
                &self.triple_to_img.dims(),
            ));
        }
        if self.obj_to_img.dims() != self.objs.dims() {
            return Err(DeepFillError::shape(
                "obj_to_img",
                format!("{:?}", self.objs.dims()),
                &self.obj_to_img.dims(),
            ));
        }

        Ok(())
    }
}

/// Reads `[N, 4]` hole boxes back to the host.
///
/// # Errors
///
/// Returns `Err(DeepFillError::InvalidTensorShape)` if the tensor is not `[N, 4]`
/// or holds negative coordinates.
pub fn hole_boxes<B: Backend>(bboxes: Tensor<B, 2, Int>) -> DeepFillResult<Vec<HoleBox>> {
    let dims = bboxes.dims();
    if dims[1] != 4 {
        return Err(DeepFillError::shape("bboxes", "[N, 4]", &dims));
    }

    let values = bboxes
        .into_data()
        .convert::<i64>()
        .to_vec::<i64>()
        .map_err(|e| DeepFillError::DatasetError {
            message: format!("Failed to read hole boxes: {e:?}"),
        })?;

    values
        .chunks_exact(4)
        .map(|row| {
            let mut coords = [0usize; 4];
            for (coord, value) in coords.iter_mut().zip(row) {
                *coord = usize::try_from(*value).map_err(|_| DeepFillError::InvalidTensorShape {
                    name: "bboxes".to_string(),
                    expected: "non-negative coordinates".to_string(),
                    actual: format!("{row:?}"),
                })?;
            }
            Ok(HoleBox::from_array(coords))
        })
        .collect()
}

/// Geometry of the random holes drawn by the [`InpaintBatcher`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BoxMaskConfig {
    /// Image height and width.
    pub image_size: [usize; 2],
    /// Hole height and width before shrinking.
    pub mask_shape: [usize; 2],
    /// Minimum distance to the image border.
    pub margin: [usize; 2],
    /// Maximum total shrink, split evenly over both sides.
    pub max_delta_shape: [usize; 2],
    /// Share one hole across the whole batch.
    pub mask_batch_same: bool,
}

impl BoxMaskConfig {
    /// Extracts the hole geometry from a training configuration.
    pub const fn from_training(config: &TrainingConfig) -> Self {
        Self {
            image_size: config.image_size(),
            mask_shape: config.mask_shape,
            margin: config.margin,
            max_delta_shape: config.max_delta_shape,
            mask_batch_same: config.mask_batch_same,
        }
    }

    /// Draws a hole box inside the margins.
    pub fn random_bbox<R: Rng + ?Sized>(&self, rng: &mut R) -> HoleBox {
        let [height, width] = self.image_size;
        let [mask_height, mask_width] = self.mask_shape;
        let [margin_height, margin_width] = self.margin;

        let max_top = height.saturating_sub(margin_height + mask_height).max(margin_height);
        let max_left = width.saturating_sub(margin_width + mask_width).max(margin_width);
        let top = rng.random_range(margin_height..=max_top);
        let left = rng.random_range(margin_width..=max_left);

        HoleBox::new(top, left, mask_height, mask_width)
    }

    /// Shrinks `bbox` by a random amount on every side.
    pub fn jitter<R: Rng + ?Sized>(&self, bbox: HoleBox, rng: &mut R) -> HoleBox {
        let delta_h = rng.random_range(0..=self.max_delta_shape[0] / 2);
        let delta_w = rng.random_range(0..=self.max_delta_shape[1] / 2);
        bbox.shrink(delta_h, delta_w)
    }
}

/// Batcher that stacks images and draws their holes.
///
/// The random state is shared between clones so that data-loader workers do not
/// replay the same hole sequence.
#[derive(Clone)]
pub struct InpaintBatcher<B: Backend> {
    mask: BoxMaskConfig,
    rng: Arc<Mutex<StdRng>>,
    _phantom: PhantomData<B>,
}

impl<B: Backend> InpaintBatcher<B> {
    /// Create a new batcher whose holes are drawn from `seed`.
    pub fn new(mask: BoxMaskConfig, seed: u64) -> Self {
        Self {
            mask,
            rng: Arc::new(Mutex::new(StdRng::seed_from_u64(seed))),
            _phantom: PhantomData,
        }
    }

    /// Draws `(bbox, shrunk hole)` pairs for `batch_size` images.
    fn draw_holes(&self, batch_size: usize) -> Vec<(HoleBox, HoleBox)> {
        let mut rng = match self.rng.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };

        let shared = self
            .mask
            .mask_batch_same
            .then(|| self.mask.random_bbox(&mut *rng));
        (0..batch_size)
            .map(|_| {
                let bbox = shared.unwrap_or_else(|| self.mask.random_bbox(&mut *rng));
                (bbox, self.mask.jitter(bbox, &mut *rng))
            })
            .collect()
    }
}

fn int_tensor<B: Backend, const D: usize>(
    values: Vec<i64>,
    shape: [usize; D],
    device: &B::Device,
) -> Tensor<B, D, Int> {
    Tensor::from_data(TensorData::new(values, shape).convert::<B::IntElem>(), device)
}

impl<B: Backend> Batcher<B, InpaintItem<B>, InpaintBatch<B>> for InpaintBatcher<B> {
    fn batch(&self, items: Vec<InpaintItem<B>>, device: &B::Device) -> InpaintBatch<B> {
        let batch_size = items.len();
        let [height, width] = self.mask.image_size;

        let images = items
            .into_iter()
            .map(|item| item.image.to_device(device))
            .collect();
        let ground_truth = Tensor::stack(images, 0);

        let holes = self.draw_holes(batch_size);
        let bboxes = holes
            .iter()
            .flat_map(|(bbox, _)| bbox.to_array().map(|v| v as i64))
            .collect();
        let shrunk: Vec<HoleBox> = holes.iter().map(|(_, hole)| *hole).collect();
        let masks = box_mask::<B>(&shrunk, height, width, device);

        let index: Vec<i64> = (0..batch_size as i64).collect();
        let triples = index
            .iter()
            .flat_map(|&o| [o, IN_IMAGE_PREDICATE, o])
            .collect();

        InpaintBatch {
            ground_truth,
            objs: int_tensor(vec![HOLE_OBJECT; batch_size], [batch_size], device),
            bboxes: int_tensor(bboxes, [batch_size, 4], device),
            triples: int_tensor(triples, [batch_size, 3], device),
            masks,
            obj_to_img: int_tensor(index.clone(), [batch_size], device),
            triple_to_img: int_tensor(index, [batch_size], device),
        }
    }
}

/// Image-folder dataset.
///
/// Every `png`, `jpg` or `jpeg` file below the root is one item. Images are
/// resized to fill the training shape and center-cropped.
pub struct InpaintDataset<B: Backend> {
    items: Vec<PathBuf>,
    device: B::Device,
    image_size: [usize; 2],
}

impl<B: Backend> InpaintDataset<B> {
    /// Create a dataset over `config.train_data_path`.
    ///
    /// # Errors
    ///
    /// Returns `Err(DeepFillError::DatasetError)` if the directory does not exist
    /// or contains no images.
    pub fn new(config: &TrainingConfig, device: &B::Device) -> DeepFillResult<Self> {
        let items = Self::collect_images(&config.train_data_path)?;
        tracing::info!(
            images = items.len(),
            root = %config.train_data_path.display(),
            "Found training images"
        );
        Ok(Self::from_paths(items, config.image_size(), device))
    }

    /// Create a dataset from an explicit list of files.
    pub fn from_paths(items: Vec<PathBuf>, image_size: [usize; 2], device: &B::Device) -> Self {
        Self {
            items,
            device: device.clone(),
            image_size,
        }
    }

    fn collect_images(root: &Path) -> DeepFillResult<Vec<PathBuf>> {
        if !root.is_dir() {
            return Err(DeepFillError::DatasetError {
                message: format!("Image directory does not exist: {}", root.display()),
            });
        }

        let mut items = Vec::new();
        for entry in WalkDir::new(root).follow_links(true) {
            let entry = entry.map_err(|e| DeepFillError::DatasetError {
                message: format!("Failed to read directory entry: {e}"),
            })?;
            if entry.file_type().is_file() && is_image(entry.path()) {
                items.push(entry.into_path());
            }
        }
        // Stable order, the loader shuffles.
        items.sort();

        if items.is_empty() {
            return Err(DeepFillError::DatasetError {
                message: format!("No images found in {}", root.display()),
            });
        }
        Ok(items)
    }

    fn load(&self, index: usize) -> Option<InpaintItem<B>> {
        let path = &self.items[index];
        match image::open(path) {
            Ok(image) => Some(InpaintItem {
                image: self.image_to_tensor(image),
            }),
            Err(e) => {
                tracing::warn!(path = %path.display(), error = %e, "Failed to decode image");
                None
            }
        }
    }

    /// Convert an image to a [3, H, W] tensor in [-1, 1].
    fn image_to_tensor(&self, img: DynamicImage) -> Tensor<B, 3> {
        let [height, width] = self.image_size;
        let img = img
            .resize_to_fill(width as u32, height as u32, FilterType::Lanczos3)
            .to_rgb32f();
        let (img_width, img_height) = img.dimensions();
        let data = TensorData::new(
            img.into_raw(),
            [img_height as usize, img_width as usize, 3],
        )
        .convert::<B::FloatElem>();
        let tensor = Tensor::<B, 3>::from_data(data, &self.device);
        // HWC to CHW
        tensor.permute([2, 0, 1]).mul_scalar(2.0).sub_scalar(1.0)
    }
}

fn is_image(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| {
            IMAGE_EXTENSIONS
                .iter()
                .any(|known| known.eq_ignore_ascii_case(ext))
        })
}

impl<B: Backend> Dataset<InpaintItem<B>> for InpaintDataset<B> {
    /// Loads item `index`.
    ///
    /// A file that cannot be decoded is replaced by the next decodable one, so
    /// a broken file never ends a pass. `None` only past the end or when no
    /// file decodes at all.
    fn get(&self, index: usize) -> Option<InpaintItem<B>> {
        let len = self.items.len();
        if index >= len {
            return None;
        }
        (0..len).find_map(|offset| self.load((index + offset) % len))
    }

    fn len(&self) -> usize {
        self.items.len()
    }
}
