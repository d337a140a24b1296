//! Explicit device assignment for a training run.

use burn::tensor::backend::Backend;

use crate::error::{DeepFillError, DeepFillResult};

/// The devices a trainer evaluates on.
///
/// Built once at start-up and handed to the trainer. The first device is the
/// primary one: it holds the parameters and receives the gathered losses. Every
/// further device evaluates one shard of each batch.
#[derive(Debug, Clone)]
pub struct DeviceContext<B: Backend> {
    devices: Vec<B::Device>,
}

impl<B: Backend> DeviceContext<B> {
    /// Creates a context over `devices`.
    ///
    /// # Errors
    ///
    /// Returns `Err(DeepFillError::InvalidConfiguration)` if `devices` is empty.
    pub fn new(devices: Vec<B::Device>) -> DeepFillResult<Self> {
        if devices.is_empty() {
            return Err(DeepFillError::InvalidConfiguration {
                reason: "at least one device is required".to_string(),
            });
        }
        Ok(Self { devices })
    }

    /// A context with a single device.
    pub fn single(device: B::Device) -> Self {
        Self {
            devices: vec![device],
        }
    }

    /// The device holding the parameters.
    pub fn primary(&self) -> &B::Device {
        &self.devices[0]
    }

    /// All devices, primary first.
    pub fn devices(&self) -> &[B::Device] {
        &self.devices
    }

    /// Number of data-parallel replicas.
    pub fn replicas(&self) -> usize {
        self.devices.len()
    }
}
