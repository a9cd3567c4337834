// SPDX-License-Identifier: GPL-3.0-only

//! Photo encoding and format detection
//!
//! Captures always leave the pipeline as JPEG at the caller's quality.
//! Persistence sniffs incoming bytes to pick a file extension.

use crate::errors::PipelineError;
use image::{DynamicImage, ImageFormat, RgbImage};
use std::io::Cursor;
use tracing::debug;

/// Image container formats recognised by magic bytes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EncodingFormat {
    Jpeg,
    Png,
    WebP,
}

impl EncodingFormat {
    /// Detect a format from the leading bytes of an encoded image
    ///
    /// PNG `89 50 4E 47`, JPEG `FF D8 FF`, WebP `RIFF....WEBP`.
    pub fn detect(bytes: &[u8]) -> Option<Self> {
        if bytes.starts_with(&[0x89, 0x50, 0x4E, 0x47]) {
            Some(EncodingFormat::Png)
        } else if bytes.starts_with(&[0xFF, 0xD8, 0xFF]) {
            Some(EncodingFormat::Jpeg)
        } else if bytes.len() >= 12 && &bytes[0..4] == b"RIFF" && &bytes[8..12] == b"WEBP" {
            Some(EncodingFormat::WebP)
        } else {
            None
        }
    }

    /// Get file extension for this format
    pub fn extension(&self) -> &'static str {
        match self {
            EncodingFormat::Jpeg => "jpg",
            EncodingFormat::Png => "png",
            EncodingFormat::WebP => "webp",
        }
    }

    pub fn mime_type(&self) -> &'static str {
        match self {
            EncodingFormat::Jpeg => "image/jpeg",
            EncodingFormat::Png => "image/png",
            EncodingFormat::WebP => "image/webp",
        }
    }
}

/// Decode encoded bytes into pixels
pub fn decode(bytes: &[u8]) -> Result<DynamicImage, PipelineError> {
    let format = image::guess_format(bytes).unwrap_or(ImageFormat::Jpeg);
    let image = image::load_from_memory_with_format(bytes, format)
        .map_err(|e| PipelineError::Decode(e.to_string()))?;
    if image.width() == 0 || image.height() == 0 {
        return Err(PipelineError::InvalidDimensions {
            width: image.width(),
            height: image.height(),
        });
    }
    Ok(image)
}

/// Encode pixels as baseline JPEG
///
/// `quality` is clamped into the 1-100 range the encoder accepts; 0 is
/// treated as the lowest quality rather than rejected.
pub fn encode_jpeg(rgb: &RgbImage, quality: u8) -> Result<Vec<u8>, PipelineError> {
    let quality = quality.clamp(1, 100);

    let mut output = Vec::new();
    let mut cursor = Cursor::new(&mut output);
    let encoder = image::codecs::jpeg::JpegEncoder::new_with_quality(&mut cursor, quality);
    rgb.write_with_encoder(encoder)
        .map_err(|e| PipelineError::Encode(e.to_string()))?;

    debug!(
        width = rgb.width(),
        height = rgb.height(),
        quality,
        size = output.len(),
        "JPEG encoded"
    );
    Ok(output)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_detect_magic_bytes() {
        assert_eq!(
            EncodingFormat::detect(&[0x89, 0x50, 0x4E, 0x47, 0x0D]),
            Some(EncodingFormat::Png)
        );
        assert_eq!(
            EncodingFormat::detect(&[0xFF, 0xD8, 0xFF, 0xE0]),
            Some(EncodingFormat::Jpeg)
        );
        assert_eq!(
            EncodingFormat::detect(b"RIFF\x10\x00\x00\x00WEBPVP8 "),
            Some(EncodingFormat::WebP)
        );
        assert_eq!(EncodingFormat::detect(b"RIFF"), None);
        assert_eq!(EncodingFormat::detect(&[]), None);
    }

    #[test]
    fn test_jpeg_encode_decodes_to_same_size() {
        let image = RgbImage::from_pixel(40, 30, image::Rgb([90, 120, 200]));
        let bytes = encode_jpeg(&image, 0).unwrap();
        assert_eq!(EncodingFormat::detect(&bytes), Some(EncodingFormat::Jpeg));

        let decoded = decode(&bytes).unwrap();
        assert_eq!((decoded.width(), decoded.height()), (40, 30));
    }

    #[test]
    fn test_decode_garbage_is_decode_error() {
        assert!(decode(b"definitely not an image").is_err());
    }
}
