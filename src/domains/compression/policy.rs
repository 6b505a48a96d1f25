//! Size and quality targets derived from file size and network class.

use super::types::{CompressionPolicy, EffectiveType, NetworkInfo};

const BYTES_PER_MB: f64 = 1024.0 * 1024.0;

/// Upper bound for the target size on constrained links.
const CONSTRAINED_MAX_SIZE_MB: f64 = 0.5;

/// Target output size in MB.
///
/// Files up to 2MB aim for 0.5MB, up to 5MB for 0.8MB, anything larger for 1MB.
/// Save-data or a 3g-or-slower link caps the target at 0.5MB.
pub fn choose_target_max_size_mb(original_bytes: u64, network_info: &NetworkInfo) -> f64 {
    let mb = original_bytes as f64 / BYTES_PER_MB;
    let base: f64 = if mb <= 2.0 {
        0.5
    } else if mb <= 5.0 {
        0.8
    } else {
        1.0
    };

    if network_info.is_constrained() {
        base.min(CONSTRAINED_MAX_SIZE_MB)
    } else {
        base
    }
}

/// Starting encoder quality in `[0, 1]`.
pub fn choose_initial_quality(network_info: &NetworkInfo) -> f64 {
    if network_info.save_data {
        return 0.7;
    }
    match network_info.effective_type {
        EffectiveType::Slow2g | EffectiveType::TwoG => 0.7,
        EffectiveType::ThreeG => 0.72,
        EffectiveType::FourG | EffectiveType::Unknown => 0.75,
    }
}

pub fn choose_policy(original_bytes: u64, network_info: &NetworkInfo) -> CompressionPolicy {
    CompressionPolicy {
        max_size_mb: choose_target_max_size_mb(original_bytes, network_info),
        initial_quality: choose_initial_quality(network_info),
    }
}
