// レイヤーのエンコード: RGBAバッファ → JPEG (DCTDecode) / zlib (FlateDecode) + SMask

use std::io::{Cursor, Write};

use flate2::Compression;
use flate2::write::ZlibEncoder;
use image::buffer::ConvertBuffer;
use image::{ImageFormat, RgbImage, RgbaImage};

use super::{EncodedImage, EncoderChoice, ImageFilter};
use crate::error::LayerError;

/// Encode a layer for the document sink with the given compression policy.
///
/// Non-opaque pixels are carried in a separate alpha plane (SMask) for
/// both policies; RGB samples of fully transparent pixels are left as-is.
pub fn encode_layer(buffer: &RgbaImage, choice: EncoderChoice) -> crate::error::Result<EncodedImage> {
    let rgb: RgbImage = buffer.convert();
    let (filter, data) = match choice {
        EncoderChoice::LossyPhotographic(quality) => (ImageFilter::Dct, encode_jpeg(&rgb, quality)?),
        EncoderChoice::LosslessFlat => (ImageFilter::Flate, flate_encode(rgb.as_raw())?),
    };
    let smask = match alpha_plane(buffer) {
        Some(alpha) => Some(flate_encode(&alpha)?),
        None => None,
    };

    Ok(EncodedImage {
        filter,
        data,
        smask,
        width: buffer.width(),
        height: buffer.height(),
    })
}

/// Encode an RGB image to JPEG bytes at `quality` (1-100).
pub fn encode_jpeg(rgb: &RgbImage, quality: u8) -> crate::error::Result<Vec<u8>> {
    if !(1..=100).contains(&quality) {
        return Err(LayerError::encode(format!(
            "JPEG quality must be 1-100, got {}",
            quality
        )));
    }

    let mut buf = Cursor::new(Vec::new());
    let encoder = image::codecs::jpeg::JpegEncoder::new_with_quality(&mut buf, quality);
    rgb.write_with_encoder(encoder)?;

    Ok(buf.into_inner())
}

/// zlibで圧縮
pub fn flate_encode(data: &[u8]) -> crate::error::Result<Vec<u8>> {
    let mut encoder = ZlibEncoder::new(Vec::new(), Compression::default());
    encoder
        .write_all(data)
        .map_err(|e| LayerError::encode(format!("Flate encode error: {}", e)))?;
    encoder
        .finish()
        .map_err(|e| LayerError::encode(format!("Flate encode error: {}", e)))
}

/// The alpha channel as an 8-bit plane, or `None` when every pixel is opaque.
fn alpha_plane(buffer: &RgbaImage) -> Option<Vec<u8>> {
    if buffer.pixels().all(|p| p[3] == u8::MAX) {
        return None;
    }
    Some(buffer.pixels().map(|p| p[3]).collect())
}

/// Standalone image file for a layer: PNG when lossless, JPEG when lossy.
pub fn encode_artifact(buffer: &RgbaImage, choice: EncoderChoice) -> crate::error::Result<Vec<u8>> {
    match choice {
        EncoderChoice::LosslessFlat => {
            let mut buf = Cursor::new(Vec::new());
            buffer.write_to(&mut buf, ImageFormat::Png)?;
            Ok(buf.into_inner())
        }
        EncoderChoice::LossyPhotographic(quality) => encode_jpeg(&buffer.convert(), quality),
    }
}

/// File extension matching [`encode_artifact`].
pub fn artifact_extension(choice: EncoderChoice) -> &'static str {
    match choice {
        EncoderChoice::LosslessFlat => "png",
        EncoderChoice::LossyPhotographic(_) => "jpg",
    }
}
