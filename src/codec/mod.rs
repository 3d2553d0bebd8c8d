//! Codec capability interfaces and their default implementations.
//!
//! The pipeline never names a compression or raster library directly:
//! bitmap decoding talks to an [`Inflater`] and recompression talks to a
//! [`PixelCodec`].  The default implementations are backed by `flate2`
//! (the zlib streams the container format mandates) and the `image`
//! crate (JPEG decode, JPEG/PNG encode).  Tests substitute fakes.
//!
//! # Quality semantics
//! A single 0–100 knob covers both encoders.  For JPEG it is the lossy
//! quality.  For PNG it maps to compression effort only; PNG output is
//! always lossless.

use std::io::Read;

use image::codecs::jpeg::JpegEncoder;
use image::codecs::png::{CompressionType, FilterType as PngFilter, PngEncoder};
use image::{DynamicImage, ImageEncoder, ImageFormat, RgbaImage};
use thiserror::Error;

// ── Error type ───────────────────────────────────────────────────────────────

#[derive(Error, Debug)]
pub enum CodecError {
    #[error("Decompression error: {0}")]
    Decompression(String),
    #[error("Raster decode error: {0}")]
    Decode(String),
    #[error("Raster encode error: {0}")]
    Encode(String),
}

// ── Inflater ─────────────────────────────────────────────────────────────────

pub trait Inflater: Send + Sync {
    fn inflate(&self, data: &[u8]) -> Result<Vec<u8>, CodecError>;
}

/// zlib (RFC 1950) inflater over `flate2`.
pub struct ZlibInflater;

impl Inflater for ZlibInflater {
    fn inflate(&self, data: &[u8]) -> Result<Vec<u8>, CodecError> {
        let mut out = Vec::new();
        flate2::read::ZlibDecoder::new(data)
            .read_to_end(&mut out)
            .map_err(|e| CodecError::Decompression(e.to_string()))?;
        Ok(out)
    }
}

// ── Raster ───────────────────────────────────────────────────────────────────

/// Plain row-major RGBA8 pixel carrier.
///
/// Invariant: `pixels.len() == width * height * 4`.  Kept free of any
/// image-library types so fake codecs need nothing but byte math.
#[derive(Debug, Clone)]
pub struct Raster {
    pub width: u32,
    pub height: u32,
    pub pixels: Vec<u8>,
}

// ── PixelCodec ───────────────────────────────────────────────────────────────

pub trait PixelCodec: Send + Sync {
    fn decode_jpeg(&self, bytes: &[u8]) -> Result<Raster, CodecError>;
    fn encode_jpeg(&self, raster: &Raster, quality: u8) -> Result<Vec<u8>, CodecError>;
    /// `effort` reuses the 0–100 quality knob; it selects compression
    /// effort only and never changes the pixels.
    fn encode_png(&self, raster: &Raster, effort: u8) -> Result<Vec<u8>, CodecError>;
}

/// Default [`PixelCodec`] over the `image` crate.
pub struct ImageCodec;

impl PixelCodec for ImageCodec {
    fn decode_jpeg(&self, bytes: &[u8]) -> Result<Raster, CodecError> {
        let img = image::load_from_memory_with_format(bytes, ImageFormat::Jpeg)
            .map_err(|e| CodecError::Decode(e.to_string()))?;
        let rgba = img.to_rgba8();
        Ok(Raster {
            width: rgba.width(),
            height: rgba.height(),
            pixels: rgba.into_raw(),
        })
    }

    fn encode_jpeg(&self, raster: &Raster, quality: u8) -> Result<Vec<u8>, CodecError> {
        let img = RgbaImage::from_raw(raster.width, raster.height, raster.pixels.clone())
            .ok_or_else(|| CodecError::Encode(mismatch_msg(raster)))?;
        // The JPEG encoder rejects alpha; flatten to RGB first.
        let rgb = DynamicImage::ImageRgba8(img).to_rgb8();
        let mut out = Vec::new();
        let mut encoder = JpegEncoder::new_with_quality(&mut out, quality.clamp(1, 100));
        encoder
            .encode_image(&rgb)
            .map_err(|e| CodecError::Encode(e.to_string()))?;
        Ok(out)
    }

    fn encode_png(&self, raster: &Raster, effort: u8) -> Result<Vec<u8>, CodecError> {
        let compression = match effort {
            0..=33 => CompressionType::Fast,
            34..=66 => CompressionType::Default,
            _ => CompressionType::Best,
        };
        let mut out = Vec::new();
        let encoder = PngEncoder::new_with_quality(&mut out, compression, PngFilter::Adaptive);
        encoder
            .write_image(
                &raster.pixels,
                raster.width,
                raster.height,
                image::ExtendedColorType::Rgba8,
            )
            .map_err(|e| CodecError::Encode(e.to_string()))?;
        Ok(out)
    }
}

fn mismatch_msg(raster: &Raster) -> String {
    format!(
        "pixel buffer of {} bytes does not match {}x{} RGBA",
        raster.pixels.len(),
        raster.width,
        raster.height,
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zlib_roundtrip() {
        use flate2::write::ZlibEncoder;
        use flate2::Compression;
        use std::io::Write;

        let data = b"swfbits zlib roundtrip".repeat(10);
        let mut enc = ZlibEncoder::new(Vec::new(), Compression::default());
        enc.write_all(&data).unwrap();
        let compressed = enc.finish().unwrap();

        assert_eq!(ZlibInflater.inflate(&compressed).unwrap(), data);
    }

    #[test]
    fn zlib_inflate_rejects_garbage() {
        assert!(matches!(
            ZlibInflater.inflate(b"not a zlib stream"),
            Err(CodecError::Decompression(_))
        ));
    }

    #[test]
    fn png_encode_is_lossless_at_any_effort() {
        let raster = Raster {
            width: 2,
            height: 2,
            pixels: vec![
                255, 0, 0, 255, 0, 255, 0, 255, //
                0, 0, 255, 255, 255, 255, 255, 128,
            ],
        };
        for effort in [0u8, 50, 100] {
            let png = ImageCodec.encode_png(&raster, effort).unwrap();
            let back = image::load_from_memory_with_format(&png, ImageFormat::Png)
                .unwrap()
                .to_rgba8();
            assert_eq!(back.into_raw(), raster.pixels);
        }
    }

    #[test]
    fn jpeg_encode_decode_preserves_dimensions() {
        let raster = Raster {
            width: 8,
            height: 4,
            pixels: vec![200u8; 8 * 4 * 4],
        };
        let jpeg = ImageCodec.encode_jpeg(&raster, 90).unwrap();
        let back = ImageCodec.decode_jpeg(&jpeg).unwrap();
        assert_eq!((back.width, back.height), (8, 4));
    }

    #[test]
    fn encode_rejects_mismatched_buffer() {
        let raster = Raster {
            width: 4,
            height: 4,
            pixels: vec![0u8; 7],
        };
        assert!(matches!(
            ImageCodec.encode_jpeg(&raster, 80),
            Err(CodecError::Encode(_))
        ));
    }
}
