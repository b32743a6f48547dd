//! Device selector parsing.
//!
//! Metrics that can run on an accelerator take an integer device id where
//! [`CPU_DEVICE`] means "no accelerator".

use anyhow::{Context, Result};

/// Sentinel device id for CPU-only execution.
pub const CPU_DEVICE: i32 = -1;

/// Map a device selector string to a device id.
///
/// - `"cpu"` -> [`CPU_DEVICE`]
/// - `"<kind>:<index>"` -> `index`
/// - anything without a colon -> `0`
pub fn parse_device_id(device: &str) -> Result<i32> {
    if device == "cpu" {
        return Ok(CPU_DEVICE);
    }

    match device.split_once(':') {
        Some((_, index)) => index
            .parse::<i32>()
            .with_context(|| format!("Invalid device index in {device:?}")),
        None => Ok(0),
    }
}
