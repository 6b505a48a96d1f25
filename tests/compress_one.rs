use std::io::Cursor;
use std::sync::Arc;

use image::{DynamicImage, ImageOutputFormat, Rgb, RgbImage};
use upload_image_core::domains::compression::{ConnectionSnapshot, StaticNetworkMonitor};
use upload_image_core::{
    choose_initial_quality, choose_target_max_size_mb, format_bytes, should_pre_scale,
    CompressionOptions, CompressionPlanner, EffectiveType, ImageCompressor, ImageFile, NetworkInfo,
};

const MB: u64 = 1024 * 1024;

fn noisy_jpeg(width: u32, height: u32) -> Vec<u8> {
    let img = RgbImage::from_fn(width, height, |x, y| {
        let v = ((x * 31 + y * 17) ^ (x * y)) % 256;
        Rgb([v as u8, (255 - v) as u8, ((x + y) % 256) as u8])
    });
    let mut buf = Vec::new();
    DynamicImage::ImageRgb8(img)
        .write_to(&mut Cursor::new(&mut buf), ImageOutputFormat::Jpeg(100))
        .unwrap();
    buf
}

#[test]
fn heuristics_match_documented_examples() {
    let fast = NetworkInfo::new(EffectiveType::FourG, false);
    let slow = NetworkInfo::new(EffectiveType::ThreeG, false);

    assert_eq!(choose_target_max_size_mb(MB, &fast), 0.5);
    assert_eq!(choose_target_max_size_mb(4 * MB, &slow), 0.5);
    assert_eq!(choose_target_max_size_mb(10 * MB, &fast), 1.0);

    assert_eq!(choose_initial_quality(&NetworkInfo::new(EffectiveType::FourG, true)), 0.7);
    assert_eq!(choose_initial_quality(&slow), 0.72);

    assert_eq!(format_bytes(Some(500)), "500B");
    assert_eq!(format_bytes(Some(1536)), "1.5KB");
    assert_eq!(format_bytes(None), "");

    assert!(should_pre_scale(2000, 1000));
    assert!(!should_pre_scale(800, 600));
}

#[tokio::test]
async fn oversized_jpeg_is_prescaled_and_compressed() {
    let original = ImageFile::new("wide.jpg", "image/jpeg", noisy_jpeg(3000, 40));
    let monitor = StaticNetworkMonitor::new(Some(ConnectionSnapshot {
        effective_type: Some("4g".to_string()),
        ..ConnectionSnapshot::default()
    }));

    let result = CompressionPlanner::new()
        .with_compressor(Arc::new(ImageCompressor))
        .with_network_monitor(Arc::new(monitor))
        .compress_one(original.clone(), CompressionOptions::default())
        .await
        .unwrap();

    assert!(!result.used_original);
    assert_eq!(result.error, None);
    assert_eq!(result.file.name, "wide.jpg");
    assert_eq!(result.file.mime_type, "image/jpeg");
    assert!(result.file.size() < original.size());
    assert_eq!(result.network_info.effective_type, EffectiveType::FourG);

    let decoded = image::load_from_memory(&result.file.bytes).unwrap();
    assert_eq!((decoded.width(), decoded.height()), (1920, 25));
}

#[tokio::test]
async fn no_compressor_passes_file_through() {
    let original = ImageFile::new("small.jpg", "image/jpeg", noisy_jpeg(40, 30));
    let result = CompressionPlanner::new()
        .compress_one(original.clone(), CompressionOptions::default())
        .await
        .unwrap();

    assert!(result.used_original);
    assert_eq!(result.file, original);
}

#[tokio::test]
async fn concurrent_calls_are_independent() {
    let planner = CompressionPlanner::new().with_compressor(Arc::new(ImageCompressor));
    let a = ImageFile::new("a.jpg", "image/jpeg", noisy_jpeg(64, 64));
    let b = ImageFile::new("b.jpg", "image/jpeg", noisy_jpeg(32, 96));

    let (ra, rb) = tokio::join!(
        planner.compress_one(a, CompressionOptions::default()),
        planner.compress_one(b, CompressionOptions::default()),
    );

    assert_eq!(ra.unwrap().file.name, "a.jpg");
    assert_eq!(rb.unwrap().file.name, "b.jpg");
}
