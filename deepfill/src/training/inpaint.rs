//! The DeepFill trainer: generator, local and global critics and their optimizers.

use std::{
    ops::Range,
    path::{Path, PathBuf},
};

use burn::{
    module::AutodiffModule,
    optim::{AdamConfig, GradientsAccumulator, GradientsParams, Optimizer},
    prelude::*,
    record::{FullPrecisionSettings, NamedMpkFileRecorder, Recorder},
    tensor::backend::AutodiffBackend,
};
use burn_extra_ops::{gather_replicas, HoleBox, TensorExtraOps};

use super::{
    bundle::{LossBundle, LossTerm},
    trainer::{EvalInput, Evaluation, GanTrainer, Network},
};
use crate::{
    config::TrainingConfig,
    dataset::hole_boxes,
    device::DeviceContext,
    error::{DeepFillError, DeepFillResult, EvalError},
    losses::{InpaintLoss, InpaintLossConfig},
    models::{Discriminators, Generator},
};

const GENERATOR_PREFIX: &str = "gen_";
const DISCRIMINATOR_PREFIX: &str = "dis_";
const GENERATOR_OPTIMIZER: &str = "optimizer_gen";
const DISCRIMINATOR_OPTIMIZER: &str = "optimizer_dis";
const RECORD_EXTENSION: &str = "mpk";

type CheckpointRecorder = NamedMpkFileRecorder<FullPrecisionSettings>;

/// Path of the generator record of `iteration`, without extension.
pub fn generator_checkpoint(dir: &Path, iteration: usize) -> PathBuf {
    dir.join(format!("{GENERATOR_PREFIX}{iteration:08}"))
}

/// Path of the discriminator record of `iteration`, without extension.
pub fn discriminator_checkpoint(dir: &Path, iteration: usize) -> PathBuf {
    dir.join(format!("{DISCRIMINATOR_PREFIX}{iteration:08}"))
}

/// Finds the highest iteration with a generator record in `dir`.
pub fn latest_checkpoint(dir: &Path) -> DeepFillResult<Option<usize>> {
    let entries = std::fs::read_dir(dir).map_err(|e| checkpoint_error(dir, e))?;

    let mut latest = None;
    for entry in entries {
        let path = entry.map_err(|e| checkpoint_error(dir, e))?.path();
        if path.extension().and_then(|ext| ext.to_str()) != Some(RECORD_EXTENSION) {
            continue;
        }
        let iteration = path
            .file_stem()
            .and_then(|stem| stem.to_str())
            .and_then(|stem| stem.strip_prefix(GENERATOR_PREFIX))
            .and_then(|digits| digits.parse::<usize>().ok());
        if let Some(iteration) = iteration {
            latest = latest.max(Some(iteration));
        }
    }
    Ok(latest)
}

fn checkpoint_error(path: &Path, reason: impl std::fmt::Display) -> DeepFillError {
    DeepFillError::CheckpointError {
        path: path.display().to_string(),
        reason: reason.to_string(),
    }
}

fn invalid_input(reason: impl Into<String>) -> EvalError {
    EvalError::InvalidInput {
        reason: reason.into(),
    }
}

/// Splits `len` samples into at most `parts` contiguous shards.
fn shard_ranges(len: usize, parts: usize) -> Vec<Range<usize>> {
    let size = len.div_ceil(parts.max(1)).max(1);
    (0..len)
        .step_by(size)
        .map(|start| start..(start + size).min(len))
        .collect()
}

/// Crops every sample to its hole box.
///
/// All boxes must have the same size.
fn local_patch<B: Backend>(x: Tensor<B, 4>, boxes: &[HoleBox]) -> Tensor<B, 4> {
    let patches = boxes
        .iter()
        .enumerate()
        .map(|(index, hole)| {
            x.clone().slice([
                index..index + 1,
                0..x.dims()[1],
                hole.top..hole.bottom(),
                hole.left..hole.right(),
            ])
        })
        .collect();
    Tensor::cat(patches, 0)
}

/// Outputs of one data-parallel shard.
struct ShardOutput<B: Backend> {
    losses: LossBundle<B>,
    inpainted: Tensor<B, 4>,
    offset_flow: Tensor<B, 4>,
}

/// Evaluates one shard with one replica of the networks.
fn evaluate_shard<B: Backend>(
    generator: &Generator<B>,
    critics: &Discriminators<B>,
    loss: &InpaintLoss,
    input: EvalInput<B>,
    boxes: &[HoleBox],
    compute_g_loss: bool,
) -> ShardOutput<B> {
    let EvalInput {
        masked,
        masks,
        ground_truth,
        ..
    } = input;

    let output = generator.forward(masked.clone(), masks.clone());
    let coarse_inpaint = output.coarse.clone().fill_hole(masked.clone(), masks.clone());
    let refined_inpaint = output.refined.clone().fill_hole(masked, masks.clone());

    let local_real = local_patch(ground_truth.clone(), boxes);
    let local_refined = local_patch(refined_inpaint.clone(), boxes);

    // Critic terms see the fakes without the generator graph.
    let local_fake = local_refined.clone().detach();
    let global_fake = refined_inpaint.clone().detach();
    let wgan_d = loss.discriminator_wgan(
        critics.local.forward(local_real.clone()),
        critics.local.forward(local_fake.clone()),
        critics.global.forward(ground_truth.clone()),
        critics.global.forward(global_fake.clone()),
    );
    let wgan_gp = loss.gradient_penalty(
        |x| critics.local.forward(x),
        local_real.clone(),
        local_fake,
    ) + loss.gradient_penalty(
        |x| critics.global.forward(x),
        ground_truth.clone(),
        global_fake,
    );

    let mut losses = LossBundle::new()
        .with(LossTerm::WganD, wgan_d)
        .with(LossTerm::WganGp, wgan_gp);

    if compute_g_loss {
        let l1 = loss.local_l1(
            local_patch(coarse_inpaint, boxes),
            local_refined.clone(),
            local_real,
        );
        let ae = loss.autoencoder(
            output.coarse,
            output.refined,
            ground_truth,
            masks,
        );
        let wgan_g = loss.generator_wgan(
            critics.local.forward(local_refined),
            critics.global.forward(refined_inpaint.clone()),
        );
        losses.insert(LossTerm::L1, l1);
        losses.insert(LossTerm::Ae, ae);
        losses.insert(LossTerm::WganG, wgan_g);
    }

    ShardOutput {
        losses,
        inpainted: refined_inpaint.detach(),
        offset_flow: output.offset_flow.detach(),
    }
}

/// Generator and critics trained with WGAN-GP.
///
/// Batches are split over the devices of the [`DeviceContext`]; every shard is
/// evaluated by a replica forked from the parameters on the primary device.
pub struct InpaintTrainer<B, OG, OD>
where
    B: AutodiffBackend,
    OG: Optimizer<Generator<B>, B>,
    OD: Optimizer<Discriminators<B>, B>,
{
    generator: Generator<B>,
    critics: Discriminators<B>,
    optim_gen: OG,
    optim_dis: OD,
    generator_grads: GradientsAccumulator<Generator<B>>,
    critic_grads: GradientsAccumulator<Discriminators<B>>,
    replicas: Vec<(Generator<B>, Discriminators<B>)>,
    loss: InpaintLoss,
    devices: DeviceContext<B>,
    patch_size: [usize; 2],
    image_size: [usize; 2],
    lr: f64,
}

/// Creates a trainer with Adam optimizers configured from `config`.
pub fn adam_trainer<B: AutodiffBackend>(
    config: &TrainingConfig,
    devices: DeviceContext<B>,
) -> InpaintTrainer<
    B,
    impl Optimizer<Generator<B>, B> + Clone,
    impl Optimizer<Discriminators<B>, B> + Clone,
> {
    let adam = AdamConfig::new()
        .with_beta_1(config.beta1 as f32)
        .with_beta_2(config.beta2 as f32);
    InpaintTrainer::new(
        config,
        devices,
        adam.init::<B, Generator<B>>(),
        adam.init::<B, Discriminators<B>>(),
    )
}

impl<B, OG, OD> InpaintTrainer<B, OG, OD>
where
    B: AutodiffBackend,
    OG: Optimizer<Generator<B>, B>,
    OD: Optimizer<Discriminators<B>, B>,
{
    /// Initializes fresh networks on the primary device.
    pub fn new(
        config: &TrainingConfig,
        devices: DeviceContext<B>,
        optim_gen: OG,
        optim_dis: OD,
    ) -> Self {
        let device = devices.primary();
        let generator = config.generator.init(device);
        let critics = config
            .discriminator
            .init(config.mask_shape, config.image_size(), device);

        tracing::info!(
            replicas = devices.replicas(),
            generator_params = generator.num_params(),
            discriminator_params = critics.num_params(),
            "initialized DeepFill networks"
        );

        Self {
            generator,
            critics,
            optim_gen,
            optim_dis,
            generator_grads: GradientsAccumulator::new(),
            critic_grads: GradientsAccumulator::new(),
            replicas: Vec::new(),
            loss: InpaintLossConfig::from_training(config).init(),
            devices,
            patch_size: config.mask_shape,
            image_size: config.image_size(),
            lr: config.lr,
        }
    }

    pub const fn generator(&self) -> &Generator<B> {
        &self.generator
    }

    pub const fn critics(&self) -> &Discriminators<B> {
        &self.critics
    }

    /// Reads the hole boxes and checks they match the local critic.
    fn checked_boxes(&self, input: &EvalInput<B>) -> Result<Vec<HoleBox>, EvalError> {
        let [batch_size, _, height, width] = input.ground_truth.dims();
        if batch_size == 0 {
            return Err(invalid_input("empty batch"));
        }
        if [height, width] != self.image_size {
            return Err(invalid_input(format!(
                "images are {height}x{width}, the global critic expects {:?}",
                self.image_size
            )));
        }

        let boxes =
            hole_boxes(input.bboxes.clone()).map_err(|e| invalid_input(e.to_string()))?;
        if boxes.len() != batch_size {
            return Err(invalid_input(format!(
                "{} hole boxes for {batch_size} images",
                boxes.len()
            )));
        }
        for hole in &boxes {
            if [hole.height, hole.width] != self.patch_size {
                return Err(invalid_input(format!(
                    "hole {hole:?} does not match the local critic size {:?}",
                    self.patch_size
                )));
            }
            if hole.bottom() > height || hole.right() > width {
                return Err(invalid_input(format!(
                    "hole {hole:?} exceeds the {height}x{width} image"
                )));
            }
        }
        Ok(boxes)
    }

    fn backward_module<M>(
        grads: &mut B::Gradients,
        primary: &M,
        replicas: impl Iterator<Item = M>,
        accumulator: &mut GradientsAccumulator<M>,
        device: &B::Device,
    ) where
        M: AutodiffModule<B>,
    {
        let params = GradientsParams::from_module(grads, primary);
        accumulator.accumulate(primary, params);
        for replica in replicas {
            let params = GradientsParams::from_module(grads, &replica).to_device(device, &replica);
            accumulator.accumulate(primary, params);
        }
    }
}

// Loading an optimizer record consumes the optimizer.
impl<B, OG, OD> GanTrainer<B> for InpaintTrainer<B, OG, OD>
where
    B: AutodiffBackend,
    OG: Optimizer<Generator<B>, B> + Clone,
    OD: Optimizer<Discriminators<B>, B> + Clone,
{
    fn evaluate(
        &mut self,
        input: EvalInput<B>,
        compute_g_loss: bool,
    ) -> Result<Evaluation<B>, EvalError> {
        let boxes = self.checked_boxes(&input)?;
        let primary = self.devices.primary().clone();
        let shards = shard_ranges(boxes.len(), self.devices.replicas());

        self.replicas.clear();
        let mut outputs = Vec::with_capacity(shards.len());
        for (index, (range, device)) in shards.iter().zip(self.devices.devices()).enumerate() {
            let shard = EvalInput {
                masked: input.masked.clone().slice([range.clone()]).to_device(device),
                bboxes: input.bboxes.clone().slice([range.clone()]).to_device(device),
                masks: input.masks.clone().slice([range.clone()]).to_device(device),
                ground_truth: input.ground_truth.clone().slice([range.clone()]).to_device(device),
            };
            let shard_boxes = &boxes[range.clone()];

            let output = if index == 0 {
                evaluate_shard(
                    &self.generator,
                    &self.critics,
                    &self.loss,
                    shard,
                    shard_boxes,
                    compute_g_loss,
                )
            } else {
                let generator = self.generator.clone().fork(device);
                let critics = self.critics.clone().fork(device);
                let output = evaluate_shard(
                    &generator,
                    &critics,
                    &self.loss,
                    shard,
                    shard_boxes,
                    compute_g_loss,
                );
                self.replicas.push((generator, critics));
                output
            };
            outputs.push(output);
        }

        let mut losses = LossBundle::new();
        let terms: Vec<LossTerm> = outputs[0].losses.terms().collect();
        for term in terms {
            let values = outputs
                .iter()
                .filter_map(|output| output.losses.get(term).cloned())
                .collect();
            losses.insert(term, gather_replicas(values, &primary));
        }
        losses.check_finite()?;

        let (inpainted, offset_flow) = outputs
            .into_iter()
            .map(|output| {
                (
                    output.inpainted.to_device(&primary),
                    output.offset_flow.to_device(&primary),
                )
            })
            .unzip();

        Ok(Evaluation {
            losses,
            inpainted: Tensor::cat(inpainted, 0),
            offset_flow: Tensor::cat(offset_flow, 0),
        })
    }

    fn zero_grad(&mut self, network: Network) {
        match network {
            Network::Generator => self.generator_grads = GradientsAccumulator::new(),
            Network::Discriminator => self.critic_grads = GradientsAccumulator::new(),
        }
    }

    fn backward(&mut self, network: Network, loss: Tensor<B, 1>) {
        let mut grads = loss.backward();
        let device = self.devices.primary().clone();
        match network {
            Network::Generator => Self::backward_module(
                &mut grads,
                &self.generator,
                self.replicas.iter().map(|(generator, _)| generator.clone()),
                &mut self.generator_grads,
                &device,
            ),
            Network::Discriminator => Self::backward_module(
                &mut grads,
                &self.critics,
                self.replicas.iter().map(|(_, critics)| critics.clone()),
                &mut self.critic_grads,
                &device,
            ),
        }
    }

    fn step(&mut self, network: Network) {
        match network {
            Network::Generator => {
                let grads = self.generator_grads.grads();
                self.generator = self.optim_gen.step(self.lr, self.generator.clone(), grads);
            }
            Network::Discriminator => {
                let grads = self.critic_grads.grads();
                self.critics = self.optim_dis.step(self.lr, self.critics.clone(), grads);
            }
        }
    }

    fn save(&self, dir: &Path, iteration: usize) -> DeepFillResult<()> {
        let recorder = CheckpointRecorder::new();

        let path = generator_checkpoint(dir, iteration);
        self.generator
            .clone()
            .save_file(path.clone(), &recorder)
            .map_err(|e| checkpoint_error(&path, format!("{e:?}")))?;

        let path = discriminator_checkpoint(dir, iteration);
        self.critics
            .clone()
            .save_file(path.clone(), &recorder)
            .map_err(|e| checkpoint_error(&path, format!("{e:?}")))?;

        let path = dir.join(GENERATOR_OPTIMIZER);
        recorder
            .record(self.optim_gen.to_record(), path.clone())
            .map_err(|e| checkpoint_error(&path, format!("{e:?}")))?;

        let path = dir.join(DISCRIMINATOR_OPTIMIZER);
        recorder
            .record(self.optim_dis.to_record(), path.clone())
            .map_err(|e| checkpoint_error(&path, format!("{e:?}")))?;

        tracing::info!(iteration, dir = %dir.display(), "saved checkpoint");
        Ok(())
    }

    fn resume(&mut self, dir: &Path) -> DeepFillResult<usize> {
        let iteration = latest_checkpoint(dir)?
            .ok_or_else(|| checkpoint_error(dir, "no generator checkpoint found"))?;
        let recorder = CheckpointRecorder::new();
        let device = self.devices.primary().clone();

        let path = generator_checkpoint(dir, iteration);
        self.generator = self
            .generator
            .clone()
            .load_file(path.clone(), &recorder, &device)
            .map_err(|e| checkpoint_error(&path, format!("{e:?}")))?;

        let path = discriminator_checkpoint(dir, iteration);
        self.critics = self
            .critics
            .clone()
            .load_file(path.clone(), &recorder, &device)
            .map_err(|e| checkpoint_error(&path, format!("{e:?}")))?;

        let path = dir.join(GENERATOR_OPTIMIZER);
        let record = recorder
            .load(path.clone(), &device)
            .map_err(|e| checkpoint_error(&path, format!("{e:?}")))?;
        self.optim_gen = self.optim_gen.clone().load_record(record);

        let path = dir.join(DISCRIMINATOR_OPTIMIZER);
        let record = recorder
            .load(path.clone(), &device)
            .map_err(|e| checkpoint_error(&path, format!("{e:?}")))?;
        self.optim_dis = self.optim_dis.clone().load_record(record);

        tracing::info!(iteration, dir = %dir.display(), "resumed from checkpoint");
        Ok(iteration + 1)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dataset::{BoxMaskConfig, InpaintBatcher, InpaintItem};
    use burn::{
        backend::{ndarray::NdArrayDevice, Autodiff, NdArray},
        data::dataloader::batcher::Batcher,
        tensor::Distribution,
    };
    use burn_extra_ops::masked_input;

    type TestBackend = Autodiff<NdArray>;

    fn tiny_config() -> TrainingConfig {
        TrainingConfig::new()
            .with_image_shape([32, 32, 3])
            .with_mask_shape([16, 16])
            .with_max_delta_shape([4, 4])
            .with_generator(crate::config::GeneratorConfig::new().with_ngf(4))
            .with_discriminator(crate::config::DiscriminatorConfig::new().with_ndf(2))
    }

    fn input(config: &TrainingConfig, batch_size: usize) -> EvalInput<TestBackend> {
        let device = NdArrayDevice::Cpu;
        let batcher = InpaintBatcher::<TestBackend>::new(BoxMaskConfig::from_training(config), 1);
        let items = (0..batch_size)
            .map(|_| InpaintItem {
                image: Tensor::random([3, 32, 32], Distribution::Uniform(-1.0, 1.0), &device),
            })
            .collect();
        let batch = batcher.batch(items, &device);

        EvalInput {
            masked: masked_input(batch.ground_truth.clone(), batch.masks.clone()),
            bboxes: batch.bboxes,
            masks: batch.masks,
            ground_truth: batch.ground_truth,
        }
    }

    #[test]
    fn test_shard_ranges() {
        assert_eq!(shard_ranges(5, 2), vec![0..3, 3..5]);
        assert_eq!(shard_ranges(2, 4), vec![0..1, 1..2]);
        assert_eq!(shard_ranges(4, 1), vec![0..4]);
    }

    #[test]
    fn test_evaluate_reports_requested_terms() {
        let config = tiny_config();
        let mut trainer =
            adam_trainer::<TestBackend>(&config, DeviceContext::single(NdArrayDevice::Cpu));

        let critic_only = trainer.evaluate(input(&config, 2), false).unwrap();
        let terms: Vec<_> = critic_only.losses.terms().collect();
        assert_eq!(terms, vec![LossTerm::WganD, LossTerm::WganGp]);

        let full = trainer.evaluate(input(&config, 2), true).unwrap();
        for term in [LossTerm::L1, LossTerm::Ae, LossTerm::WganG] {
            assert!(full.losses.contains(term), "missing {term}");
        }
        assert_eq!(full.inpainted.dims(), [2, 3, 32, 32]);
        assert_eq!(full.offset_flow.dims(), [2, 3, 32, 32]);
    }

    #[test]
    fn test_mismatched_hole_is_not_recoverable() {
        let config = tiny_config();
        let mut trainer =
            adam_trainer::<TestBackend>(&config, DeviceContext::single(NdArrayDevice::Cpu));
        let mut input = input(&config, 1);
        input.bboxes = Tensor::from_ints([[0, 0, 8, 8]], &NdArrayDevice::Cpu);

        let error = trainer.evaluate(input, true).unwrap_err();
        assert!(!error.is_recoverable());
    }

    #[test]
    fn test_discriminator_step_changes_only_critics() {
        let config = tiny_config();
        let mut trainer =
            adam_trainer::<TestBackend>(&config, DeviceContext::single(NdArrayDevice::Cpu));
        let generator_before = trainer.generator().clone().into_record();
        let weights = crate::training::LossWeights::from_training(&config);

        let evaluation = trainer.evaluate(input(&config, 2), false).unwrap();
        let d = evaluation.losses.discriminator_loss(&weights).unwrap();
        let critic_before = trainer.critics().local.clone().forward(
            Tensor::ones([1, 3, 16, 16], &NdArrayDevice::Cpu),
        );

        trainer.zero_grad(Network::Discriminator);
        trainer.backward(Network::Discriminator, d);
        trainer.step(Network::Discriminator);

        let critic_after = trainer
            .critics()
            .local
            .forward(Tensor::ones([1, 3, 16, 16], &NdArrayDevice::Cpu));
        let changed = (critic_after - critic_before).abs().sum().into_scalar();
        assert!(changed > 0.0);

        let generator = trainer.generator().clone();
        let unchanged = generator.load_record(generator_before);
        let x = Tensor::<TestBackend, 4>::zeros([1, 3, 32, 32], &NdArrayDevice::Cpu);
        let m = Tensor::<TestBackend, 4>::zeros([1, 1, 32, 32], &NdArrayDevice::Cpu);
        let a = trainer.generator().forward(x.clone(), m.clone()).refined;
        let b = unchanged.forward(x, m).refined;
        assert_eq!((a - b).abs().sum().into_scalar(), 0.0);
    }

    #[test]
    fn test_save_and_resume() {
        let dir = tempfile::tempdir().unwrap();
        let config = tiny_config();
        let device = NdArrayDevice::Cpu;
        let trainer = adam_trainer::<TestBackend>(&config, DeviceContext::single(device));

        trainer.save(dir.path(), 5).unwrap();
        trainer.save(dir.path(), 10).unwrap();
        assert!(dir.path().join("gen_00000010.mpk").exists());
        assert!(dir.path().join("dis_00000010.mpk").exists());
        assert!(dir.path().join("optimizer_gen.mpk").exists());
        assert!(dir.path().join("optimizer_dis.mpk").exists());
        assert_eq!(latest_checkpoint(dir.path()).unwrap(), Some(10));

        let mut restored = adam_trainer::<TestBackend>(&config, DeviceContext::single(device));
        assert_eq!(restored.resume(dir.path()).unwrap(), 11);

        let x = Tensor::<TestBackend, 4>::ones([1, 3, 32, 32], &device);
        let m = Tensor::<TestBackend, 4>::zeros([1, 1, 32, 32], &device);
        let a = trainer.generator().forward(x.clone(), m.clone()).refined;
        let b = restored.generator().forward(x, m).refined;
        assert!((a - b).abs().max().into_scalar() < 1e-6);
    }

    #[test]
    fn test_resume_without_checkpoint_fails() {
        let dir = tempfile::tempdir().unwrap();
        let config = tiny_config();
        let mut trainer =
            adam_trainer::<TestBackend>(&config, DeviceContext::single(NdArrayDevice::Cpu));

        assert!(matches!(
            trainer.resume(dir.path()),
            Err(DeepFillError::CheckpointError { .. })
        ));
    }

    /// Runs one critic update on a fixed input.
    fn critic_update<OG, OD>(trainer: &mut InpaintTrainer<TestBackend, OG, OD>)
    where
        OG: Optimizer<Generator<TestBackend>, TestBackend> + Clone,
        OD: Optimizer<Discriminators<TestBackend>, TestBackend> + Clone,
    {
        let x = Tensor::<TestBackend, 4>::ones([2, 3, 16, 16], &NdArrayDevice::Cpu);
        let loss = trainer.critics().local.forward(x).mean();
        trainer.zero_grad(Network::Discriminator);
        trainer.backward(Network::Discriminator, loss);
        trainer.step(Network::Discriminator);
    }

    #[test]
    fn test_resume_restores_optimizer_state() {
        let dir = tempfile::tempdir().unwrap();
        let config = tiny_config().with_lr(1e-2);
        let device = NdArrayDevice::Cpu;
        let adam = AdamConfig::new()
            .with_beta_1(config.beta1 as f32)
            .with_beta_2(config.beta2 as f32);

        let mut trainer = InpaintTrainer::new(
            &config,
            DeviceContext::single(device),
            adam.init::<TestBackend, Generator<TestBackend>>(),
            adam.init::<TestBackend, Discriminators<TestBackend>>(),
        );
        assert!(trainer.optim_dis.to_record().is_empty());
        critic_update(&mut trainer);
        critic_update(&mut trainer);
        let moments = trainer.optim_dis.to_record().len();
        assert!(moments > 0);
        trainer.save(dir.path(), 2).unwrap();

        let mut restored = InpaintTrainer::new(
            &config,
            DeviceContext::single(device),
            adam.init::<TestBackend, Generator<TestBackend>>(),
            adam.init::<TestBackend, Discriminators<TestBackend>>(),
        );
        assert_eq!(restored.resume(dir.path()).unwrap(), 3);
        assert_eq!(restored.optim_dis.to_record().len(), moments);
        assert!(restored.optim_gen.to_record().is_empty());

        // Same weights and moments give the same next update.
        critic_update(&mut trainer);
        critic_update(&mut restored);
        let x = Tensor::<TestBackend, 4>::ones([1, 3, 16, 16], &device);
        let a = trainer.critics().local.forward(x.clone());
        let b = restored.critics().local.forward(x);
        assert!((a - b).abs().max().into_scalar() < 1e-5);
    }
}
