//! Adversarial training of the inpainting networks.
//!
//! [`TrainingLoop`] drives a [`GanTrainer`] over batches from a
//! [`BatchSource`]. Every iteration updates the critics; every `n_critic`-th
//! iteration also updates the generator. Progress goes to a [`MetricsSink`],
//! a [`LogSink`] and an [`ImageSink`], checkpoints go through the trainer.

mod bundle;
mod controller;
mod inpaint;
mod paths;
mod schedule;
mod sinks;
mod source;
mod trainer;

pub use bundle::{LossBundle, LossTerm, LossWeights};
pub use controller::{LoopSettings, LoopState, RunSummary, Sinks, TrainingLoop, GRID_COLUMNS};
pub use inpaint::{
    adam_trainer, discriminator_checkpoint, generator_checkpoint, latest_checkpoint,
    InpaintTrainer,
};
pub use paths::RunPaths;
pub use schedule::{is_due, update_phases, updates_generator, UpdatePhase};
pub use sinks::{
    GridWriter, ImageSink, JsonlMetricsWriter, LogSink, MetricsSink, ScalarRecord, TracingLog,
};
pub use source::{BatchSource, FetchError, LoaderSource};
pub use trainer::{EvalInput, Evaluation, GanTrainer, Network};
