use burn::prelude::*;
use burn::record::{FullPrecisionSettings, NamedMpkFileRecorder};

#[cfg(feature = "dev-ndarray")]
pub type DemoBackend = burn::backend::NdArray<f32, i32>;
#[cfg(any(feature = "dev-tch-cpu", feature = "dev-tch-gpu"))]
pub type DemoBackend = burn::backend::libtorch::LibTorch<f32, i8>;
#[cfg(any(feature = "dev-wgpu", feature = "dev-metal", feature = "dev-vulkan"))]
pub type DemoBackend = burn::backend::wgpu::Wgpu<f32, i32>;
#[cfg(feature = "dev-cuda")]
pub type DemoBackend = burn::backend::Cuda<f32, i32>;
#[cfg(feature = "dev-rocm")]
pub type DemoBackend = burn::backend::Rocm<f32, i32>;

/// Model records are stored at full precision, whatever the backend element is.
pub type RecorderTy = NamedMpkFileRecorder<FullPrecisionSettings>;

pub trait DemoDevice: Backend {
    /// Name printed by the demos.
    const NAME: &'static str;

    fn demo_device() -> <Self as Backend>::Device {
        Default::default()
    }
}

#[cfg(feature = "dev-ndarray")]
impl DemoDevice for DemoBackend {
    const NAME: &'static str = "ndarray";
}
#[cfg(feature = "dev-tch-cpu")]
impl DemoDevice for DemoBackend {
    const NAME: &'static str = "libtorch (cpu)";
}
#[cfg(all(feature = "dev-tch-gpu", not(target_os = "macos")))]
impl DemoDevice for DemoBackend {
    const NAME: &'static str = "libtorch (cuda)";
    fn demo_device() -> <Self as Backend>::Device {
        burn::backend::libtorch::LibTorchDevice::Cuda(0)
    }
}
#[cfg(all(feature = "dev-tch-gpu", target_os = "macos"))]
impl DemoDevice for DemoBackend {
    const NAME: &'static str = "libtorch (mps)";
    fn demo_device() -> <Self as Backend>::Device {
        burn::backend::libtorch::LibTorchDevice::Mps
    }
}
#[cfg(any(feature = "dev-wgpu", feature = "dev-metal", feature = "dev-vulkan"))]
impl DemoDevice for DemoBackend {
    const NAME: &'static str = "wgpu";
}
#[cfg(feature = "dev-cuda")]
impl DemoDevice for DemoBackend {
    const NAME: &'static str = "cuda";
}
#[cfg(feature = "dev-rocm")]
impl DemoDevice for DemoBackend {
    const NAME: &'static str = "rocm";
}
