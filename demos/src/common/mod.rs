//! Common utilities for the DeepFill binaries.

pub mod backend;
pub mod logging;

pub use backend::{create_devices, get_backend_name, SelectedBackend, SelectedDevice};
pub use logging::init_tracing;
