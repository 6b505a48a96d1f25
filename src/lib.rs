//! Network-aware image compression planning for uploads.
//!
//! Picks a target size and starting quality from the file size and the
//! current network class, optionally pre-scales oversized images to 1080p,
//! and runs a pluggable compressor under a deadline with fallback to the
//! original file.

// Public modules
pub mod domains;
pub mod errors;
pub mod ffi;

// Private modules
mod utils;

pub use domains::compression::{
    choose_initial_quality, choose_policy, choose_target_max_size_mb, get_network_info,
    pre_scale_to_box, should_pre_scale, CompressionOptions, CompressionPlanner,
    CompressionPolicy, CompressionResult, Compressor, EffectiveType, ImageCompressor, ImageFile,
    NetworkInfo,
};
pub use utils::format_bytes;
