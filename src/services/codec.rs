use image::{ColorType, DynamicImage, ImageOutputFormat};
use serde::Serialize;
use std::io::Cursor;

use crate::error::{TransferError, TransferResult};

/// JPEG quality used when none is configured.
pub const DEFAULT_JPEG_QUALITY: u8 = 75;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ImageFormat {
    Png,
    Jpeg,
}

impl ImageFormat {
    pub fn content_type(self) -> &'static str {
        match self {
            ImageFormat::Png => "image/png",
            ImageFormat::Jpeg => "image/jpeg",
        }
    }

    pub fn extension(self) -> &'static str {
        match self {
            ImageFormat::Png => "png",
            ImageFormat::Jpeg => "jpg",
        }
    }
}

/// Encodes `img` with the default JPEG quality.
pub fn encode(img: &DynamicImage, format: ImageFormat) -> TransferResult<Vec<u8>> {
    encode_with_quality(img, format, DEFAULT_JPEG_QUALITY)
}

pub fn encode_with_quality(
    img: &DynamicImage,
    format: ImageFormat,
    jpeg_quality: u8,
) -> TransferResult<Vec<u8>> {
    // PNG keeps alpha; JPEG has no alpha channel and only takes 8-bit samples.
    let (source, output) = match format {
        ImageFormat::Png => (to_8bit(img), ImageOutputFormat::Png),
        ImageFormat::Jpeg => (
            DynamicImage::ImageRgb8(img.to_rgb8()),
            ImageOutputFormat::Jpeg(jpeg_quality.clamp(1, 100)),
        ),
    };

    let mut out_data = Vec::new();
    let mut cursor = Cursor::new(&mut out_data);
    source
        .write_to(&mut cursor, output)
        .map_err(|e| TransferError::Encode(e.to_string()))?;
    Ok(out_data)
}

/// Decodes PNG or JPEG bytes; dimensions come from the data itself.
pub fn decode(bytes: &[u8]) -> TransferResult<DynamicImage> {
    image::load_from_memory(bytes).map_err(|e| TransferError::Decode(e.to_string()))
}

fn to_8bit(img: &DynamicImage) -> DynamicImage {
    match img.color() {
        ColorType::Rgba16 | ColorType::La16 | ColorType::Rgba32F => {
            DynamicImage::ImageRgba8(img.to_rgba8())
        }
        ColorType::Rgb16 | ColorType::L16 | ColorType::Rgb32F => {
            DynamicImage::ImageRgb8(img.to_rgb8())
        }
        _ => img.clone(),
    }
}
