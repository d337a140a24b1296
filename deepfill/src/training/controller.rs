//! The training loop: fetch, mask, evaluate, update and report, `niter` times.

use std::{path::Path, time::Instant};

use burn::tensor::{backend::Backend, Tensor};
use burn_extra_ops::masked_input;

use super::{
    bundle::{LossBundle, LossTerm, LossWeights},
    paths::RunPaths,
    schedule::{is_due, update_phases, updates_generator, UpdatePhase},
    sinks::{ImageSink, LogSink, MetricsSink},
    source::BatchSource,
    trainer::{EvalInput, Evaluation, GanTrainer, Network},
};
use crate::{
    config::TrainingConfig,
    dataset::InpaintBatch,
    error::{DeepFillError, DeepFillResult},
    metrics::calculate_psnr,
};

/// Columns of a visualization grid: four samples of three images each.
pub const GRID_COLUMNS: usize = 3 * 4;

/// The loop-relevant part of the configuration.
#[derive(Debug, Clone, PartialEq)]
pub struct LoopSettings {
    pub niter: usize,
    pub n_critic: usize,
    pub print_iter: usize,
    pub viz_iter: usize,
    pub viz_max_out: usize,
    pub snapshot_save_iter: usize,
    pub weights: LossWeights,
    /// Report PSNR and L2 of the inpainted images with every log line.
    pub compute_psnr: bool,
}

impl LoopSettings {
    pub const fn from_training(config: &TrainingConfig, compute_psnr: bool) -> Self {
        Self {
            niter: config.niter,
            n_critic: config.n_critic,
            print_iter: config.print_iter,
            viz_iter: config.viz_iter,
            viz_max_out: config.viz_max_out,
            snapshot_save_iter: config.snapshot_save_iter,
            weights: LossWeights::from_training(config),
            compute_psnr,
        }
    }
}

/// Where the side effects of the loop go.
pub struct Sinks<'a, B: Backend> {
    pub metrics: &'a mut dyn MetricsSink,
    pub log: &'a mut dyn LogSink,
    pub images: &'a mut dyn ImageSink<B>,
}

/// Lifecycle of a [`TrainingLoop`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoopState {
    Initializing,
    Running { iteration: usize },
    Completed { iteration: usize },
    Failed,
}

/// What happened in one iteration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum IterationOutcome {
    Updated { generator: bool },
    Skipped,
}

/// Counters of a finished run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RunSummary {
    pub first_iteration: usize,
    pub last_iteration: usize,
    /// Iterations whose updates were applied.
    pub updated: usize,
    /// Iterations skipped after a recoverable evaluation fault.
    pub skipped: usize,
    pub generator_updates: usize,
}

/// Drives a [`GanTrainer`] over batches from a [`BatchSource`].
pub struct TrainingLoop<'a, B, T, S>
where
    B: Backend,
    T: GanTrainer<B>,
    S: BatchSource<InpaintBatch<B>>,
{
    settings: LoopSettings,
    trainer: T,
    source: S,
    sinks: Sinks<'a, B>,
    paths: RunPaths,
    state: LoopState,
    start_iteration: usize,
    last_log: Instant,
}

impl<'a, B, T, S> TrainingLoop<'a, B, T, S>
where
    B: Backend,
    T: GanTrainer<B>,
    S: BatchSource<InpaintBatch<B>>,
{
    pub fn new(
        settings: LoopSettings,
        trainer: T,
        source: S,
        sinks: Sinks<'a, B>,
        paths: &RunPaths,
    ) -> Self {
        Self {
            settings,
            trainer,
            source,
            sinks,
            paths: paths.clone(),
            state: LoopState::Initializing,
            start_iteration: 1,
            last_log: Instant::now(),
        }
    }

    pub const fn state(&self) -> LoopState {
        self.state
    }

    pub const fn start_iteration(&self) -> usize {
        self.start_iteration
    }

    pub const fn trainer(&self) -> &T {
        &self.trainer
    }

    pub fn into_trainer(self) -> T {
        self.trainer
    }

    /// Restores the trainer from `dir` and continues after the saved iteration.
    ///
    /// # Errors
    ///
    /// Returns the trainer's checkpoint error, or
    /// `Err(DeepFillError::InvalidConfiguration)` once the loop has started.
    pub fn resume(&mut self, dir: &Path) -> DeepFillResult<usize> {
        if self.state != LoopState::Initializing {
            return Err(DeepFillError::InvalidConfiguration {
                reason: "cannot resume a training loop that already ran".to_string(),
            });
        }
        self.start_iteration = self.trainer.resume(dir)?;
        tracing::info!(
            dir = %dir.display(),
            iteration = self.start_iteration,
            "resuming training"
        );
        Ok(self.start_iteration)
    }

    /// Runs iterations `start_iteration..=niter`.
    ///
    /// # Errors
    ///
    /// Returns the first error that is not a recoverable evaluation fault. The
    /// loop is left in [`LoopState::Failed`].
    pub fn run(&mut self) -> DeepFillResult<RunSummary> {
        let mut summary = RunSummary {
            first_iteration: self.start_iteration,
            last_iteration: self.start_iteration.saturating_sub(1),
            updated: 0,
            skipped: 0,
            generator_updates: 0,
        };

        tracing::info!(
            start = self.start_iteration,
            niter = self.settings.niter,
            n_critic = self.settings.n_critic,
            "starting training loop"
        );
        self.last_log = Instant::now();

        for iteration in self.start_iteration..=self.settings.niter {
            self.state = LoopState::Running { iteration };
            match self.iterate(iteration) {
                Ok(IterationOutcome::Updated { generator }) => {
                    summary.updated += 1;
                    summary.generator_updates += usize::from(generator);
                }
                Ok(IterationOutcome::Skipped) => summary.skipped += 1,
                Err(error) => {
                    self.state = LoopState::Failed;
                    return Err(error);
                }
            }
            summary.last_iteration = iteration;
        }

        self.state = LoopState::Completed {
            iteration: summary.last_iteration,
        };
        tracing::info!(
            iterations = summary.updated,
            skipped = summary.skipped,
            "training loop completed"
        );
        Ok(summary)
    }

    /// Fetches a batch, starting a new pass once if the current one cannot continue.
    fn fetch(&mut self) -> DeepFillResult<InpaintBatch<B>> {
        let batch = match self.source.next_batch() {
            Ok(batch) => batch,
            Err(reason) => {
                tracing::debug!(?reason, "starting a new pass over the training data");
                self.source.new_pass();
                self.source
                    .next_batch()
                    .map_err(|reason| DeepFillError::DataSourceFailed {
                        reason: format!("{reason:?}"),
                    })?
            }
        };
        batch.validate()?;
        Ok(batch)
    }

    fn iterate(&mut self, iteration: usize) -> DeepFillResult<IterationOutcome> {
        let batch = self.fetch()?;
        let masked = masked_input(batch.ground_truth.clone(), batch.masks.clone());
        let compute_g_loss = updates_generator(iteration, self.settings.n_critic);

        let input = EvalInput {
            masked: masked.clone(),
            bboxes: batch.bboxes,
            masks: batch.masks,
            ground_truth: batch.ground_truth.clone(),
        };
        let Evaluation {
            losses,
            inpainted,
            offset_flow,
        } = match self.trainer.evaluate(input, compute_g_loss) {
            Ok(evaluation) => evaluation,
            Err(error) if error.is_recoverable() => {
                tracing::warn!(iteration, %error, "skipping iteration after evaluation fault");
                return Ok(IterationOutcome::Skipped);
            }
            Err(error) => return Err(error.into()),
        };

        let mut losses = losses.reduce_replicas();
        let d = losses.discriminator_loss(&self.settings.weights)?;
        losses.insert(LossTerm::D, d.clone());
        let g = if compute_g_loss {
            let g = losses.generator_loss(&self.settings.weights)?;
            losses.insert(LossTerm::G, g.clone());
            Some(g)
        } else {
            None
        };

        for phase in update_phases(compute_g_loss) {
            self.apply(*phase, &d, g.as_ref());
        }

        if is_due(iteration, self.settings.print_iter) {
            self.log(iteration, &losses, batch.ground_truth, inpainted.clone())?;
        }
        if is_due(iteration, self.settings.viz_iter) {
            self.visualize(iteration, masked, inpainted, offset_flow)?;
        }
        if is_due(iteration, self.settings.snapshot_save_iter) {
            self.trainer.save(&self.paths.model, iteration)?;
        }

        Ok(IterationOutcome::Updated {
            generator: compute_g_loss,
        })
    }

    fn apply(&mut self, phase: UpdatePhase, d: &Tensor<B, 1>, g: Option<&Tensor<B, 1>>) {
        match phase {
            UpdatePhase::ZeroDiscriminatorGrads | UpdatePhase::ZeroGeneratorGrads => {
                self.trainer.zero_grad(phase.network());
            }
            UpdatePhase::DiscriminatorBackward => {
                self.trainer.backward(Network::Discriminator, d.clone());
            }
            UpdatePhase::GeneratorBackward => {
                if let Some(g) = g {
                    self.trainer.backward(Network::Generator, g.clone());
                }
            }
            UpdatePhase::GeneratorStep | UpdatePhase::DiscriminatorStep => {
                self.trainer.step(phase.network());
            }
        }
    }

    fn log(
        &mut self,
        iteration: usize,
        losses: &LossBundle<B>,
        ground_truth: Tensor<B, 4>,
        inpainted: Tensor<B, 4>,
    ) -> DeepFillResult<()> {
        let elapsed = self.last_log.elapsed().as_secs_f64();
        self.last_log = Instant::now();
        let speed = self.settings.print_iter as f64 / elapsed.max(f64::EPSILON);

        let mut line = format!("Iter: [{iteration}/{}] ", self.settings.niter);
        for term in LossTerm::LOGGED {
            let value = losses.value(term);
            self.sinks.metrics.add_scalar(term.as_str(), value, iteration)?;
            line.push_str(&format!("{term}: {value:.6} "));
        }
        line.push_str(&format!("speed: {speed:.2} batches/s "));

        if self.settings.compute_psnr {
            let quality = calculate_psnr(ground_truth, inpainted);
            self.sinks.metrics.add_scalar("psnr", quality.psnr, iteration)?;
            self.sinks.metrics.add_scalar("l2", quality.l2, iteration)?;
            line.push_str(&format!(" psnr: {:.3}, l2: {:.3}", quality.psnr, quality.l2));
        }

        self.sinks.log.log_line(&line);
        Ok(())
    }

    fn visualize(
        &mut self,
        iteration: usize,
        masked: Tensor<B, 4>,
        inpainted: Tensor<B, 4>,
        offset_flow: Tensor<B, 4>,
    ) -> DeepFillResult<()> {
        let [batch_size, channels, height, width] = masked.dims();
        let count = batch_size.min(self.settings.viz_max_out);

        // Interleave per sample: masked input, inpainted result, offset field.
        let images = Tensor::stack::<5>(
            vec![
                masked.slice([0..count]),
                inpainted.slice([0..count]),
                offset_flow.slice([0..count]),
            ],
            1,
        )
        .reshape([3 * count, channels, height, width]);

        let path = self.paths.grid(iteration);
        self.sinks.images.save_grid(images, &path, GRID_COLUMNS, true)?;
        tracing::debug!(iteration, path = %path.display(), "saved visualization");
        Ok(())
    }
}
