use candle_core::Device;

/// Metal when built with `metal` (and not forced to `cpu`) and a GPU is
/// present; CPU otherwise.
pub fn select_device() -> Device {
    #[cfg(all(feature = "metal", not(feature = "cpu")))]
    match Device::new_metal(0) {
        Ok(device) => {
            tracing::info!(device = "metal", "inference device selected");
            return device;
        }
        Err(e) => tracing::warn!(error = %e, "metal unavailable, falling back to cpu"),
    }
    tracing::info!(device = "cpu", "inference device selected");
    Device::Cpu
}
