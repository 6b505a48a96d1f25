//! EXIF orientation handling.
//!
//! Re-encoded rasters carry no EXIF, so pixels are rotated upright before
//! anything is measured or written.

use image::DynamicImage;
use std::io::Cursor;

/// EXIF orientation tag value (1-8); 1 when absent or unreadable.
pub fn read_orientation(bytes: &[u8]) -> u32 {
    let mut cursor = Cursor::new(bytes);
    match exif::Reader::new().read_from_container(&mut cursor) {
        Ok(exif) => exif
            .get_field(exif::Tag::Orientation, exif::In::PRIMARY)
            .and_then(|field| field.value.get_uint(0))
            .filter(|value| (1..=8).contains(value))
            .unwrap_or(1),
        Err(_) => 1,
    }
}

/// Dimensions as displayed, given the stored ones.
pub fn displayed_dimensions(width: u32, height: u32, orientation: u32) -> (u32, u32) {
    if (5..=8).contains(&orientation) {
        (height, width)
    } else {
        (width, height)
    }
}

/// Rotate and flip `img` so that it displays upright without the tag.
pub fn apply_orientation(img: DynamicImage, orientation: u32) -> DynamicImage {
    match orientation {
        2 => img.fliph(),
        3 => img.rotate180(),
        4 => img.flipv(),
        5 => img.rotate90().fliph(),
        6 => img.rotate90(),
        7 => img.rotate270().fliph(),
        8 => img.rotate270(),
        _ => img,
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use image::{GenericImageView, Rgba, RgbaImage};

    /// Insert an APP1 EXIF segment carrying only an Orientation tag right after SOI.
    pub(crate) fn with_orientation(jpeg: &[u8], orientation: u16) -> Vec<u8> {
        let [hi, lo] = orientation.to_be_bytes();
        let tiff: [u8; 26] = [
            b'M', b'M', 0x00, 0x2A, 0x00, 0x00, 0x00, 0x08, // header, IFD0 at 8
            0x00, 0x01, // one entry
            0x01, 0x12, 0x00, 0x03, // Orientation, SHORT
            0x00, 0x00, 0x00, 0x01, hi, lo, 0x00, 0x00, // count 1, inline value
            0x00, 0x00, 0x00, 0x00, // no next IFD
        ];
        let segment_len = (2 + 6 + tiff.len()) as u16;

        let mut out = Vec::with_capacity(jpeg.len() + segment_len as usize + 2);
        out.extend_from_slice(&jpeg[..2]);
        out.extend_from_slice(&[0xFF, 0xE1]);
        out.extend_from_slice(&segment_len.to_be_bytes());
        out.extend_from_slice(b"Exif\0\0");
        out.extend_from_slice(&tiff);
        out.extend_from_slice(&jpeg[2..]);
        out
    }

    fn marked(width: u32, height: u32) -> DynamicImage {
        let mut img = RgbaImage::from_pixel(width, height, Rgba([0, 0, 0, 255]));
        img.put_pixel(0, 0, Rgba([255, 0, 0, 255]));
        DynamicImage::ImageRgba8(img)
    }

    #[test]
    fn test_reads_orientation_tag() {
        let jpeg = crate::domains::compression::compressors::image_compressor::tests::encoded(
            8,
            4,
            image::ImageOutputFormat::Jpeg(90),
        );
        assert_eq!(read_orientation(&jpeg), 1);
        assert_eq!(read_orientation(&with_orientation(&jpeg, 6)), 6);
        assert_eq!(read_orientation(&with_orientation(&jpeg, 3)), 3);
    }

    #[test]
    fn test_garbage_has_default_orientation() {
        assert_eq!(read_orientation(b"not an image"), 1);
        assert_eq!(read_orientation(&[]), 1);
    }

    #[test]
    fn test_displayed_dimensions() {
        assert_eq!(displayed_dimensions(2400, 1200, 1), (2400, 1200));
        assert_eq!(displayed_dimensions(2400, 1200, 3), (2400, 1200));
        assert_eq!(displayed_dimensions(2400, 1200, 6), (1200, 2400));
        assert_eq!(displayed_dimensions(2400, 1200, 8), (1200, 2400));
    }

    #[test]
    fn test_apply_orientation_moves_pixels() {
        // Red marker at the stored top-left corner
        let upright = apply_orientation(marked(3, 2), 6);
        assert_eq!(upright.dimensions(), (2, 3));
        assert_eq!(upright.get_pixel(1, 0), Rgba([255, 0, 0, 255]));

        let upright = apply_orientation(marked(3, 2), 8);
        assert_eq!(upright.dimensions(), (2, 3));
        assert_eq!(upright.get_pixel(0, 2), Rgba([255, 0, 0, 255]));

        let upright = apply_orientation(marked(3, 2), 3);
        assert_eq!(upright.dimensions(), (3, 2));
        assert_eq!(upright.get_pixel(2, 1), Rgba([255, 0, 0, 255]));

        let upright = apply_orientation(marked(3, 2), 5);
        assert_eq!(upright.get_pixel(0, 0), Rgba([255, 0, 0, 255]));

        let upright = apply_orientation(marked(3, 2), 1);
        assert_eq!(upright.get_pixel(0, 0), Rgba([255, 0, 0, 255]));
    }
}
