//! Visible accelerator discovery.
//!
//! The device list comes from `CUDA_VISIBLE_DEVICES`, a comma-separated list
//! of device identifiers. The count is passed through to the inference
//! engine untouched; allocation across devices is the engine's business.

use tracing::info;

/// Environment variable listing the devices visible to the inference engine.
pub const VISIBLE_DEVICES_VAR: &str = "CUDA_VISIBLE_DEVICES";

/// Split a raw device list into its identifiers.
///
/// Blank tokens are dropped, so an unset, empty or whitespace-only value
/// yields no devices instead of a single empty one.
pub fn visible_devices(raw: Option<&str>) -> Vec<String> {
    raw.unwrap_or_default()
        .split(',')
        .map(str::trim)
        .filter(|id| !id.is_empty())
        .map(str::to_string)
        .collect()
}

/// Number of devices named by a raw device list.
pub fn device_count_from(raw: Option<&str>) -> usize {
    visible_devices(raw).len()
}

/// Read `CUDA_VISIBLE_DEVICES` from the process environment and count it.
///
/// Never fails: a missing or non-unicode variable counts as zero devices.
pub fn probe_device_count() -> usize {
    let raw = std::env::var(VISIBLE_DEVICES_VAR).ok();
    let count = device_count_from(raw.as_deref());
    info!("using {count} gpus...");
    count
}

#[cfg(test)]
mod tests {
    use super::{device_count_from, visible_devices};

    #[test]
    fn unset_variable_counts_zero_devices() {
        assert_eq!(device_count_from(None), 0);
    }

    #[test]
    fn empty_variable_counts_zero_devices() {
        // A naive split of "" yields one empty token.
        assert_eq!(device_count_from(Some("")), 0);
        assert_eq!(device_count_from(Some("  ")), 0);
    }

    #[test]
    fn counts_comma_separated_ids() {
        assert_eq!(device_count_from(Some("0")), 1);
        assert_eq!(device_count_from(Some("0,1,2,3")), 4);
        assert_eq!(device_count_from(Some("0, 1")), 2);
    }

    #[test]
    fn blank_tokens_are_not_devices() {
        assert_eq!(visible_devices(Some("0,,2,")), vec!["0", "2"]);
    }
}
