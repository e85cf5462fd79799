//! Backend aliases.
//!
//! Everything in molpc is generic over [`burn::tensor::backend::Backend`]. The
//! aliases here name the backends the workspace is exercised on: the CPU
//! `NdArray` backend (always available) and WGPU behind the `gpu` feature.

pub type CpuBackend = burn::backend::NdArray;
pub type CpuDevice = burn::backend::ndarray::NdArrayDevice;

pub fn init_cpu_device() -> CpuDevice {
    CpuDevice::default()
}

#[cfg(feature = "gpu")]
pub type WgpuBackend = burn::backend::Wgpu;

#[cfg(feature = "gpu")]
pub fn init_gpu_device() -> burn::backend::wgpu::WgpuDevice {
    // Burn's WGPU backend uses Default::default() for device creation
    // Metal backend is automatically selected on macOS when available
    burn::backend::wgpu::WgpuDevice::default()
}

// Helper to ensure Metal is selected
#[cfg(feature = "gpu")]
pub fn ensure_metal_backend() {
    std::env::set_var("BURN_WGPU_BACKEND", "metal");
}
