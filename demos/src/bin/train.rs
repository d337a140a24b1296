//! DeepFill Training
//!
//! Trains the coarse-to-fine inpainting generator against a local and a
//! global WGAN-GP critic.
//!
//! ## Features
//!
//! This binary supports multiple backends through feature flags:
//! - `ndarray`: CPU backend using ndarray (default)
//! - `wgpu`: GPU backend using WGPU
//! - `cuda`: NVIDIA GPU backend using CUDA
//!
//! ## Usage
//!
//! ```bash
//! # Train with a configuration file
//! cargo run --release --bin train -- --config configs/train_config.json
//!
//! # Report PSNR with every log line
//! cargo run --release --bin train -- --config configs/train_config.json --psnr
//! ```
//!
//! Everything of a run lands in `<checkpoint_root>/<dataset_name>/`: a copy of
//! the configuration, `run/metrics.jsonl`, `log/train.log`, the visualization
//! grids in `image/` and the checkpoints in `model/`.

use std::path::PathBuf;

use anyhow::{Context, Result};
use burn::{backend::Autodiff, data::dataloader::DataLoaderBuilder, prelude::*};
use clap::Parser;
use deepfill_burn::{
    dataset::BoxMaskConfig,
    training::{
        adam_trainer, GridWriter, JsonlMetricsWriter, LoaderSource, LoopSettings, RunPaths, Sinks,
        TracingLog,
    },
    DeviceContext, InpaintBatcher, InpaintDataset, TrainingConfig, TrainingLoop,
};
use deepfill_demos::common::{create_devices, get_backend_name, init_tracing, SelectedBackend};
use rand::Rng;

type TrainBackend = Autodiff<SelectedBackend>;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Configuration file path
    #[arg(short, long)]
    config: PathBuf,

    /// Random seed, drawn from 1..=10000 when omitted
    #[arg(long)]
    seed: Option<u64>,

    /// Report PSNR and L2 of the inpainted images
    #[arg(long)]
    psnr: bool,
}

fn main() -> Result<()> {
    let args = Args::parse();

    // Load configuration
    let config = TrainingConfig::load(&args.config)
        .with_context(|| format!("Failed to load config file: {}", args.config.display()))?;
    config.validate().context("Invalid training configuration")?;

    let paths = RunPaths::create(&config.checkpoint_root, &config.dataset_name)
        .context("Failed to create the run directory")?;
    paths.copy_config(&args.config)?;
    init_tracing(&paths.log_file())?;

    if let Err(error) = train(&args, &config, &paths) {
        tracing::error!("Training failed: {error:#}");
        return Err(error);
    }
    Ok(())
}

fn train(args: &Args, config: &TrainingConfig, paths: &RunPaths) -> Result<()> {
    let seed = args
        .seed
        .unwrap_or_else(|| rand::rng().random_range(1..=10000));
    tracing::info!(seed, "Random seed");
    TrainBackend::seed(seed);

    let devices = DeviceContext::<TrainBackend>::new(create_devices(config.cuda, &config.gpu_ids))?;
    tracing::info!(
        backend = get_backend_name(),
        devices = devices.replicas(),
        "Using backend"
    );

    // Data
    let dataset = InpaintDataset::<TrainBackend>::new(config, devices.primary())
        .context("Failed to create training dataset")?;
    let mask = BoxMaskConfig::from_training(config);
    let batcher = InpaintBatcher::<TrainBackend>::new(mask, seed);
    let loader = DataLoaderBuilder::new(batcher)
        .batch_size(config.batch_size)
        .shuffle(seed)
        .num_workers(config.num_workers)
        .build(dataset);
    let source = LoaderSource::new(loader.as_ref());

    // Sinks
    let mut metrics = JsonlMetricsWriter::create(paths.metrics())?;
    let mut log = TracingLog;
    let mut images = GridWriter;
    let sinks = Sinks {
        metrics: &mut metrics,
        log: &mut log,
        images: &mut images,
    };

    let trainer = adam_trainer(config, devices);
    let settings = LoopSettings::from_training(config, args.psnr);
    let mut training_loop = TrainingLoop::new(settings, trainer, source, sinks, paths);

    if let Some(resume) = &config.resume {
        training_loop
            .resume(resume)
            .with_context(|| format!("Failed to resume from {}", resume.display()))?;
    }

    let summary = training_loop.run()?;
    tracing::info!(
        first = summary.first_iteration,
        last = summary.last_iteration,
        skipped = summary.skipped,
        generator_updates = summary.generator_updates,
        "Training completed successfully"
    );
    Ok(())
}
