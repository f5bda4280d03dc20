use anyhow::{anyhow, Result};
use candle_core::Device;

/// Resolve a device string to a Candle `Device`.
///
/// Accepts `"cpu"`, `"cuda"` (first GPU) and `"cuda:N"`.
///
/// # Errors
///
/// Returns an error if the requested CUDA device is not available or the
/// device string is not recognized.
pub fn get_device(device_str: &str) -> Result<Device> {
    let device_str = device_str.trim().to_lowercase();
    if let Some(rest) = device_str.strip_prefix("cuda") {
        let cuda_index = match rest.strip_prefix(':') {
            Some(index) => index
                .parse::<usize>()
                .map_err(|_| anyhow!("Invalid CUDA device index: '{}'", index))?,
            None if rest.is_empty() => 0,
            None => return Err(anyhow!("Unsupported device type: {}", device_str)),
        };

        let device = Device::cuda_if_available(cuda_index)?;
        if !device.is_cuda() {
            return Err(anyhow!("CUDA device {} is not available", cuda_index));
        }
        Ok(device)
    } else {
        match device_str.as_str() {
            "cpu" => Ok(Device::Cpu),
            _ => Err(anyhow!("Unsupported device type: {}", device_str)),
        }
    }
}
