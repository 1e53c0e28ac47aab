use candle_core::{Device, Result};

/// Picks the accelerator compiled in through the `cuda` / `metal` features,
/// unless `force_cpu` is set or none is usable.
pub fn select_device(force_cpu: bool) -> Result<Device> {
    let device = if force_cpu {
        Device::Cpu
    } else {
        accelerator().unwrap_or(Device::Cpu)
    };

    log::info!("Training on {}", describe(&device));
    Ok(device)
}

#[allow(unreachable_code)]
fn accelerator() -> Option<Device> {
    #[cfg(feature = "cuda")]
    match Device::cuda_if_available(0) {
        Ok(device) if device.is_cuda() => return Some(device),
        Ok(_) => log::warn!("Built with CUDA support, but no CUDA device was found"),
        Err(e) => log::warn!("Could not open CUDA device: {}", e),
    }

    #[cfg(feature = "metal")]
    match Device::new_metal(0) {
        Ok(device) => return Some(device),
        Err(e) => log::warn!("Could not open Metal device: {}", e),
    }

    None
}

fn describe(device: &Device) -> &'static str {
    if device.is_cuda() {
        "CUDA"
    } else if device.is_metal() {
        "Metal"
    } else {
        "CPU"
    }
}
