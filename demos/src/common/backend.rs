//! Backend selection based on enabled features.
//!
//! The training backend is `Autodiff<SelectedBackend>`.

use cfg_if::cfg_if;

cfg_if! {
    if #[cfg(feature = "cuda")] {
        use burn::backend::cuda::{Cuda, CudaDevice};

        /// Selected backend type
        pub type SelectedBackend = Cuda;
        /// Selected device type
        pub type SelectedDevice = CudaDevice;

        /// Creates one device per configured GPU index.
        pub fn create_devices(cuda: bool, gpu_ids: &[usize]) -> Vec<SelectedDevice> {
            if !cuda {
                tracing::warn!("built with the cuda feature, using GPU 0");
                return vec![CudaDevice::default()];
            }
            gpu_ids.iter().map(|&index| CudaDevice::new(index)).collect()
        }

        /// Gets the backend name for logging purposes
        pub const fn get_backend_name() -> &'static str {
            "CUDA (NVIDIA GPU)"
        }
    } else if #[cfg(feature = "wgpu")] {
        use burn::backend::wgpu::{Wgpu, WgpuDevice};

        /// Selected backend type
        pub type SelectedBackend = Wgpu;
        /// Selected device type
        pub type SelectedDevice = WgpuDevice;

        /// Creates one device per configured GPU index.
        pub fn create_devices(cuda: bool, gpu_ids: &[usize]) -> Vec<SelectedDevice> {
            if !cuda {
                return vec![WgpuDevice::default()];
            }
            gpu_ids
                .iter()
                .map(|&index| WgpuDevice::DiscreteGpu(index))
                .collect()
        }

        /// Gets the backend name for logging purposes
        pub const fn get_backend_name() -> &'static str {
            "WGPU (GPU)"
        }
    } else {
        // Default to ndarray backend
        use burn::backend::ndarray::{NdArray, NdArrayDevice};

        /// Selected backend type
        pub type SelectedBackend = NdArray;
        /// Selected device type
        pub type SelectedDevice = NdArrayDevice;

        /// The CPU backend has a single device.
        pub fn create_devices(cuda: bool, gpu_ids: &[usize]) -> Vec<SelectedDevice> {
            if cuda {
                tracing::warn!(?gpu_ids, "cuda requested but no GPU backend compiled in, using the CPU");
            }
            vec![NdArrayDevice::Cpu]
        }

        /// Gets the backend name for logging purposes
        pub const fn get_backend_name() -> &'static str {
            "NdArray (CPU)"
        }
    }
}
