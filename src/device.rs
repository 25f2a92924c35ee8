use lazy_static::*;
use log::info;
use tch::Device;

lazy_static! {
    pub static ref CUDA_DEVICE_COUNT: i64 = tch::Cuda::device_count();
}

/// Picks the device once for the whole run
pub fn select_device(no_cuda: bool) -> Device {
    if !no_cuda && tch::Cuda::is_available() {
        info!("Using GPU");
        if *CUDA_DEVICE_COUNT > 1 {
            info!("Available GPUs: {}", *CUDA_DEVICE_COUNT);
        }
        Device::Cuda(0)
    } else {
        info!("Using CPU");
        Device::Cpu
    }
}

/// Extra threads for data augmentation, none when running on the CPU
pub fn num_workers(device: Device) -> usize {
    if device.is_cuda() {
        4
    } else {
        0
    }
}
