//! Upload validation by magic bytes.

use crate::gate::services::{FaceError, FaceImage, ImageFormat};

const JPEG_MAGIC: &[u8] = &[0xFF, 0xD8, 0xFF];
const PNG_MAGIC: &[u8] = &[0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A];
const BMP_MAGIC: &[u8] = b"BM";

#[must_use]
pub fn sniff_format(bytes: &[u8]) -> Option<ImageFormat> {
    if bytes.starts_with(JPEG_MAGIC) {
        Some(ImageFormat::Jpeg)
    } else if bytes.starts_with(PNG_MAGIC) {
        Some(ImageFormat::Png)
    } else if bytes.len() >= 12 && bytes.starts_with(b"RIFF") && &bytes[8..12] == b"WEBP" {
        Some(ImageFormat::Webp)
    } else if bytes.len() > BMP_MAGIC.len() && bytes.starts_with(BMP_MAGIC) {
        Some(ImageFormat::Bmp)
    } else {
        None
    }
}

/// # Errors
/// Returns `FaceError::InvalidImage` for empty uploads and unrecognized formats.
pub fn decode(bytes: &[u8]) -> Result<FaceImage, FaceError> {
    if bytes.is_empty() {
        return Err(FaceError::InvalidImage("empty upload".to_string()));
    }

    sniff_format(bytes)
        .map(|format| FaceImage::new(format, bytes.to_vec()))
        .ok_or_else(|| FaceError::InvalidImage("unsupported image format".to_string()))
}
