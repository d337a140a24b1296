//! DeepFill Demos
//!
//! Binaries for the DeepFill inpainting model and the helpers they share.
//!
//! ## Available Binaries
//!
//! - `train`: Adversarial training with periodic logging, visualization and checkpoints
//!
//! ## Usage
//!
//! ```bash
//! # Train with a configuration file
//! cargo run --release --bin train -- --config configs/train_config.json
//!
//! # Train on the GPU with a fixed seed
//! cargo run --release --bin train --features wgpu --no-default-features -- \
//!     --config configs/train_config.json --seed 7
//! ```

pub mod common;

pub use common::{create_devices, get_backend_name, init_tracing, SelectedBackend, SelectedDevice};
