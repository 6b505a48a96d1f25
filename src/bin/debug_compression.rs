//! Compress one image from disk the way an upload would.
//!
//! Options start from the `UPLOAD_COMPRESS_*` environment (and `.env`); flags
//! override them. The network class comes from `UPLOAD_NETWORK_*`.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use clap::Parser;
use upload_image_core::domains::compression::compressors::guess_mime_type;
use upload_image_core::domains::compression::{
    CompressionOptions, CompressionPlanner, EnvNetworkMonitor, ImageCompressor, ImageFile,
};
use upload_image_core::format_bytes;

#[derive(Parser, Debug)]
#[command(name = "debug_compression")]
#[command(about = "Compress one image for upload and report what happened", long_about = None)]
struct Args {
    /// Image to compress
    input: PathBuf,

    /// Upload the original when compression fails or grows the file
    #[arg(long)]
    allow_original: bool,

    /// Skip the 1920x1080 pre-scale
    #[arg(long)]
    no_prescale: bool,

    /// Compression deadline in milliseconds
    #[arg(long)]
    timeout_ms: Option<u64>,

    /// Where to write the file that would be uploaded
    #[arg(long)]
    out: Option<PathBuf>,
}

impl Args {
    /// Flags layered over `base`; unset flags keep its values.
    fn options(&self, base: CompressionOptions) -> CompressionOptions {
        CompressionOptions {
            timeout_ms: self.timeout_ms.unwrap_or(base.timeout_ms),
            allow_original: base.allow_original || self.allow_original,
            pre_scale_to_1080p: base.pre_scale_to_1080p && !self.no_prescale,
            ..base
        }
    }
}

fn file_name(path: &Path) -> String {
    path.file_name()
        .and_then(|n| n.to_str())
        .unwrap_or("upload")
        .to_string()
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenv::dotenv().ok();
    env_logger::init();

    let args = Args::parse();
    let options = args.options(CompressionOptions::from_env());

    println!("🔍 Upload Compression Debug Tool");
    println!("================================");

    let name = file_name(&args.input);
    let bytes = tokio::fs::read(&args.input).await?;
    let file = ImageFile::new(name.clone(), guess_mime_type(&name), bytes);

    let planner = CompressionPlanner::new()
        .with_compressor(Arc::new(ImageCompressor))
        .with_network_monitor(Arc::new(EnvNetworkMonitor));

    println!(
        "📍 Input: {} ({}, {})",
        args.input.display(),
        file.mime_type,
        format_bytes(Some(file.size()))
    );
    println!("📶 Network: {:?}", planner.network_info());
    println!("⚙️  Options: {:?}", options);

    let options = options.with_progress(|percent| log::debug!("progress {:.0}%", percent));
    let original_size = file.size();
    let result = planner.compress_one(file, options).await?;

    println!("\n📊 Result");
    println!(
        "   Policy: max {}MB, quality {}",
        result.policy.max_size_mb, result.policy.initial_quality
    );
    println!(
        "   Size: {} -> {}",
        format_bytes(Some(original_size)),
        format_bytes(Some(result.file.size()))
    );
    println!("   Type: {}", result.file.mime_type);
    println!("   Used original: {}", result.used_original);
    if let Some(error) = &result.error {
        println!("   ⚠️ Error: {}", error);
    }
    println!("   Took: {}ms", result.duration_ms);

    if let Some(output) = &args.out {
        tokio::fs::write(output, &result.file.bytes).await?;
        println!("\n💾 Wrote {}", output.display());
    }

    Ok(())
}
