//! Re-encoding of decoded bitmaps into portable raster payloads.
//!
//! Each [`BitmapRecord`] is an independent, CPU-bound unit of work:
//! decode (JPEG records only), downscale to the width cap, re-encode at
//! the requested quality, base64 the result.  With the `parallel`
//! feature the batch fans out over Rayon; either way the returned
//! sequence is in the input (tag-discovery) order, never completion
//! order.

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine as _;
use image::imageops::{self, FilterType};
use image::RgbaImage;
use serde::Serialize;

use crate::bitmap::{BitmapData, BitmapRecord};
use crate::codec::{CodecError, PixelCodec, Raster};

/// Default re-encode quality.
pub const DEFAULT_QUALITY: u8 = 100;
/// Default output width cap in pixels.
pub const DEFAULT_MAX_WIDTH: u32 = 1024;

// ── Options ──────────────────────────────────────────────────────────────────

/// Configuration for the re-encode stage.
#[derive(Debug, Clone, Copy)]
pub struct RecompressOptions {
    /// Re-encode quality, 0–100.  JPEG: lossy quality.  PNG: compression
    /// effort only.
    pub quality: u8,
    /// Images wider than this are downscaled with the aspect ratio
    /// preserved; narrower images are never upscaled.
    pub max_width: u32,
}

impl Default for RecompressOptions {
    fn default() -> Self {
        Self {
            quality: DEFAULT_QUALITY,
            max_width: DEFAULT_MAX_WIDTH,
        }
    }
}

// ── Result record ────────────────────────────────────────────────────────────

/// The one entity that outlives the pipeline; ownership passes to the
/// caller for persistence.
#[derive(Debug, Clone, Serialize)]
pub struct CompressedImageResult {
    pub character_id: u16,
    /// Base64 of the re-encoded image bytes.
    pub payload: String,
    pub mime_type: String,
    /// Byte length of the pre-recompression form.
    pub original_size: usize,
    /// Byte length of the re-encoded image (before base64).
    pub compressed_size: usize,
    /// Percent saved relative to `original_size`, one fractional digit.
    pub compression_ratio: f64,
}

/// `(1 - compressed/original) * 100`, rounded to one fractional digit.
/// A zero original size reports 0.0 rather than dividing by zero.
pub fn compression_ratio(original: usize, compressed: usize) -> f64 {
    if original == 0 {
        return 0.0;
    }
    let saved = 1.0 - compressed as f64 / original as f64;
    (saved * 1000.0).round() / 10.0
}

// ── Resize ───────────────────────────────────────────────────────────────────

/// Downscale so `width <= max_width`, preserving aspect ratio with a
/// 1px height floor.  A raster already within the cap passes through
/// untouched; this never upscales.
fn fit_width(raster: Raster, max_width: u32) -> Result<Raster, CodecError> {
    if raster.width <= max_width {
        return Ok(raster);
    }
    let target_height =
        ((raster.height as u64 * max_width as u64) / raster.width as u64).max(1) as u32;
    let img = RgbaImage::from_raw(raster.width, raster.height, raster.pixels).ok_or_else(|| {
        CodecError::Encode("pixel buffer does not match declared dimensions".to_string())
    })?;
    let resized = imageops::resize(&img, max_width, target_height, FilterType::Lanczos3);
    Ok(Raster {
        width: max_width,
        height: target_height,
        pixels: resized.into_raw(),
    })
}

// ── Recompression ────────────────────────────────────────────────────────────

/// Re-encode one decoded bitmap.
///
/// JPEG records are decoded through `codec`, downscaled, and re-encoded
/// as JPEG at `opts.quality`.  Raster records are downscaled and
/// encoded as PNG, with `opts.quality` driving compression effort only.
pub fn recompress(
    record: &BitmapRecord,
    codec: &dyn PixelCodec,
    opts: &RecompressOptions,
) -> Result<CompressedImageResult, CodecError> {
    let original_size = record.raw_len();
    let mime_type = record.mime_hint();

    let encoded = match &record.data {
        BitmapData::Jpeg { bytes } => {
            let raster = codec.decode_jpeg(bytes)?;
            let raster = fit_width(raster, opts.max_width)?;
            codec.encode_jpeg(&raster, opts.quality)?
        }
        BitmapData::Raster {
            width,
            height,
            pixels,
        } => {
            let raster = Raster {
                width: *width as u32,
                height: *height as u32,
                pixels: pixels.clone(),
            };
            let raster = fit_width(raster, opts.max_width)?;
            codec.encode_png(&raster, opts.quality)?
        }
    };

    let compressed_size = encoded.len();
    Ok(CompressedImageResult {
        character_id: record.character_id,
        payload: BASE64.encode(&encoded),
        mime_type: mime_type.to_string(),
        original_size,
        compressed_size,
        compression_ratio: compression_ratio(original_size, compressed_size),
    })
}

/// Re-encode a batch of records.
///
/// One result per record, in the input order.  With the `parallel`
/// feature enabled the work fans out over Rayon; the indexed collect
/// restores tag-discovery order regardless of completion order.
pub fn recompress_all(
    records: &[BitmapRecord],
    codec: &dyn PixelCodec,
    opts: &RecompressOptions,
) -> Vec<Result<CompressedImageResult, CodecError>> {
    #[cfg(feature = "parallel")]
    {
        use rayon::prelude::*;
        records
            .par_iter()
            .map(|record| recompress(record, codec, opts))
            .collect()
    }

    #[cfg(not(feature = "parallel"))]
    {
        records
            .iter()
            .map(|record| recompress(record, codec, opts))
            .collect()
    }
}
