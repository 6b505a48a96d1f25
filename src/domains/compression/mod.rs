// Declare submodules for the compression domain
pub mod types;
pub mod network;
pub mod policy;
pub mod orientation;
pub mod prescale;
pub mod compressors;
pub mod planner;

// Re-export key types
pub use types::{
    CompressionOptions, CompressionPolicy, CompressionResult, CompressorOptions,
    EffectiveType, ImageFile, NetworkInfo, ProgressCallback,
};

pub use network::{
    get_network_info, ConnectionSnapshot, EnvNetworkMonitor, NetworkMonitor, NoNetworkApi,
    StaticNetworkMonitor,
};
pub use policy::{choose_initial_quality, choose_policy, choose_target_max_size_mb};
pub use prescale::{pre_scale_to_box, should_pre_scale};
pub use compressors::{Compressor, image_compressor::ImageCompressor};
pub use planner::CompressionPlanner;

/// Serializes tests that set process environment variables.
#[cfg(test)]
pub(crate) static ENV_LOCK: std::sync::Mutex<()> = std::sync::Mutex::new(());
