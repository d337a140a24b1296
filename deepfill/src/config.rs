//! Training configuration for DeepFill.
//!
//! The configuration is loaded once from a JSON document at start-up and never
//! mutated afterwards. Every field has a default, so a configuration file only
//! needs to name the values it changes.

use std::path::PathBuf;

use burn::prelude::*;

use crate::error::{DeepFillError, DeepFillResult};

/// Generator network configuration.
#[derive(Config, Debug)]
pub struct GeneratorConfig {
    /// Number of image channels.
    #[config(default = 3)]
    pub input_dim: usize,
    /// Base number of feature channels.
    #[config(default = 32)]
    pub ngf: usize,
}

/// Discriminator network configuration, shared by the local and global critics.
#[derive(Config, Debug)]
pub struct DiscriminatorConfig {
    /// Number of image channels.
    #[config(default = 3)]
    pub input_dim: usize,
    /// Base number of feature channels.
    #[config(default = 64)]
    pub ndf: usize,
}

/// Complete configuration of a training run.
#[derive(Config, Debug)]
pub struct TrainingConfig {
    /// Name of the dataset, also the name of the run directory.
    #[config(default = "String::from(\"places2\")")]
    pub dataset_name: String,
    /// Directory scanned recursively for training images.
    #[config(default = "PathBuf::from(\"datasets/train\")")]
    pub train_data_path: PathBuf,
    /// Root under which run directories are created.
    #[config(default = "PathBuf::from(\"checkpoints\")")]
    pub checkpoint_root: PathBuf,
    /// Checkpoint directory to resume from.
    #[config(default = "None")]
    pub resume: Option<PathBuf>,

    /// Run on GPU devices.
    #[config(default = false)]
    pub cuda: bool,
    /// Device indices used for data-parallel evaluation.
    #[config(default = "vec![0]")]
    pub gpu_ids: Vec<usize>,

    #[config(default = 16)]
    pub batch_size: usize,
    #[config(default = 4)]
    pub num_workers: usize,

    /// Training image shape as `[height, width, channels]`.
    #[config(default = "[256, 256, 3]")]
    pub image_shape: [usize; 3],
    /// Hole shape as `[height, width]`.
    #[config(default = "[128, 128]")]
    pub mask_shape: [usize; 2],
    /// Minimum distance between the hole and the image border as `[vertical, horizontal]`.
    #[config(default = "[0, 0]")]
    pub margin: [usize; 2],
    /// Maximum total shrink applied to the hole as `[vertical, horizontal]`.
    #[config(default = "[32, 32]")]
    pub max_delta_shape: [usize; 2],
    /// Use the same hole position for every image of a batch.
    #[config(default = false)]
    pub mask_batch_same: bool,
    /// Weight the local reconstruction loss with a spatial discount.
    #[config(default = true)]
    pub discounted_mask: bool,
    #[config(default = 0.9)]
    pub spatial_discounting_gamma: f64,

    #[config(default = 1e-4)]
    pub lr: f64,
    #[config(default = 0.5)]
    pub beta1: f64,
    #[config(default = 0.9)]
    pub beta2: f64,

    /// Total number of iterations.
    #[config(default = 500000)]
    pub niter: usize,
    /// The generator is updated on every `n_critic`-th iteration.
    #[config(default = 5)]
    pub n_critic: usize,
    #[config(default = 100)]
    pub print_iter: usize,
    #[config(default = 1000)]
    pub viz_iter: usize,
    /// Maximum number of samples in a visualization grid.
    #[config(default = 16)]
    pub viz_max_out: usize,
    #[config(default = 5000)]
    pub snapshot_save_iter: usize,

    #[config(default = 1.2)]
    pub coarse_l1_alpha: f64,
    #[config(default = 1.2)]
    pub l1_loss_alpha: f64,
    #[config(default = 1.2)]
    pub ae_loss_alpha: f64,
    #[config(default = 1.0)]
    pub global_wgan_loss_alpha: f64,
    #[config(default = 0.001)]
    pub gan_loss_alpha: f64,
    #[config(default = 10.0)]
    pub wgan_gp_lambda: f64,

    #[config(default = "GeneratorConfig::new()")]
    pub generator: GeneratorConfig,
    #[config(default = "DiscriminatorConfig::new()")]
    pub discriminator: DiscriminatorConfig,
}

impl TrainingConfig {
    /// Validate the configuration and return appropriate errors for invalid settings.
    ///
    /// # Errors
    ///
    /// Returns `Err(DeepFillError::InvalidConfiguration)` if any validation rule is violated.
    pub fn validate(&self) -> DeepFillResult<()> {
        let invalid = |reason: String| Err(DeepFillError::InvalidConfiguration { reason });

        // 1. Counters and cadences must be positive
        for (name, value) in [
            ("niter", self.niter),
            ("n_critic", self.n_critic),
            ("print_iter", self.print_iter),
            ("viz_iter", self.viz_iter),
            ("viz_max_out", self.viz_max_out),
            ("snapshot_save_iter", self.snapshot_save_iter),
            ("batch_size", self.batch_size),
        ] {
            if value == 0 {
                return invalid(format!("{name} must be greater than 0"));
            }
        }

        // 2. Devices
        if self.cuda && self.gpu_ids.is_empty() {
            return invalid("gpu_ids must not be empty when cuda is enabled".to_string());
        }

        // 3. Image and hole geometry
        let [height, width, channels] = self.image_shape;
        let [mask_height, mask_width] = self.mask_shape;
        let [margin_height, margin_width] = self.margin;
        if channels != self.generator.input_dim || channels != self.discriminator.input_dim {
            return invalid(format!(
                "image channels ({channels}) must match generator ({}) and discriminator ({}) input_dim",
                self.generator.input_dim, self.discriminator.input_dim
            ));
        }
        if mask_height + 2 * margin_height > height || mask_width + 2 * margin_width > width {
            return invalid(format!(
                "mask {mask_height}x{mask_width} with margin {margin_height}x{margin_width} does not fit into image {height}x{width}"
            ));
        }
        if self.max_delta_shape[0] >= mask_height || self.max_delta_shape[1] >= mask_width {
            return invalid(format!(
                "max_delta_shape {:?} must be smaller than mask_shape {:?}",
                self.max_delta_shape, self.mask_shape
            ));
        }

        // 4. Both critics downsample by 16, the generator by 4
        for (name, value) in [
            ("image height", height),
            ("image width", width),
            ("mask height", mask_height),
            ("mask width", mask_width),
        ] {
            if value == 0 || value % 16 != 0 {
                return invalid(format!("{name} ({value}) must be a positive multiple of 16"));
            }
        }

        // 5. Loss weights
        if !(self.spatial_discounting_gamma > 0.0 && self.spatial_discounting_gamma <= 1.0) {
            return invalid(format!(
                "spatial_discounting_gamma must be in (0, 1], got {}",
                self.spatial_discounting_gamma
            ));
        }
        if self.wgan_gp_lambda < 0.0 {
            return invalid("wgan_gp_lambda must not be negative".to_string());
        }

        Ok(())
    }

    /// Image height and width.
    #[must_use]
    pub const fn image_size(&self) -> [usize; 2] {
        [self.image_shape[0], self.image_shape[1]]
    }
}
