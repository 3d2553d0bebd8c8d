//! Per-tag bitmap decoding.
//!
//! Two tag kinds carry embedded bitmaps: DefineBitsJPEG3 (35) holds a
//! self-contained JPEG stream plus a zlib alpha plane, and
//! DefineBitsLossless2 (36) holds a zlib stream of raw ARGB pixels.
//! Every other tag code is ignored.
//!
//! Nothing here is fatal.  A bitmap tag that cannot be decoded becomes
//! an explicit [`TagOutcome::Skipped`] with the reason attached, and
//! decoding continues with the remaining tags; the caller sees the full
//! per-tag picture instead of a side-channel log line.

use std::fmt;

use byteorder::{ByteOrder, LittleEndian};
use log::{debug, warn};

use crate::codec::Inflater;
use crate::tags::{Tag, TAG_DEFINE_BITS_JPEG3, TAG_DEFINE_BITS_LOSSLESS2};

/// 32-bit ARGB, the only DefineBitsLossless2 pixel format decoded here.
pub const BITMAP_FORMAT_ARGB32: u8 = 5;

// ── Records ──────────────────────────────────────────────────────────────────

#[derive(Debug, Clone)]
pub enum BitmapData {
    /// A self-contained JPEG byte stream, alpha plane dropped.
    Jpeg { bytes: Vec<u8> },
    /// Reconstructed raw pixels, row-major RGBA8.
    Raster {
        width: u16,
        height: u16,
        pixels: Vec<u8>,
    },
}

/// One decoded bitmap definition.  `character_id` is the format-level
/// asset id; it is NOT unique, neither across the two tag kinds nor
/// within one kind, and no deduplication happens here.
#[derive(Debug, Clone)]
pub struct BitmapRecord {
    pub character_id: u16,
    pub data: BitmapData,
}

impl BitmapRecord {
    pub fn mime_hint(&self) -> &'static str {
        match self.data {
            BitmapData::Jpeg { .. } => "image/jpeg",
            BitmapData::Raster { .. } => "image/png",
        }
    }

    /// Byte length of the pre-recompression form: the embedded JPEG
    /// stream, or the materialized RGBA pixel buffer.
    pub fn raw_len(&self) -> usize {
        match &self.data {
            BitmapData::Jpeg { bytes } => bytes.len(),
            BitmapData::Raster { pixels, .. } => pixels.len(),
        }
    }
}

// ── Outcomes ─────────────────────────────────────────────────────────────────

/// Why a bitmap tag (or its later recompression) yielded no image.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SkipReason {
    /// Payload shorter than the tag kind's fixed prefix.
    TruncatedTag,
    /// DefineBitsJPEG3 alpha offset points past the payload end.
    JpegOffsetOutOfBounds { offset: u32, payload_len: usize },
    /// DefineBitsLossless2 declares a pixel format this crate does not
    /// decode.
    UnsupportedBitmapFormat(u8),
    /// The zlib pixel stream failed to inflate.
    Decompression(String),
    /// The raster codec failed to decode or re-encode the record.
    Recompression(String),
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SkipReason::TruncatedTag => write!(f, "tag payload truncated"),
            SkipReason::JpegOffsetOutOfBounds { offset, payload_len } => write!(
                f,
                "alpha offset {offset} exceeds payload of {payload_len} bytes"
            ),
            SkipReason::UnsupportedBitmapFormat(code) => {
                write!(f, "unsupported pixel format {code}")
            }
            SkipReason::Decompression(e) => write!(f, "pixel stream inflate failed: {e}"),
            SkipReason::Recompression(e) => write!(f, "recompression failed: {e}"),
        }
    }
}

/// Decode-stage outcome for one bitmap tag.
#[derive(Debug)]
pub enum TagOutcome {
    Decoded(BitmapRecord),
    Skipped {
        character_id: Option<u16>,
        reason: SkipReason,
    },
}

// ── Decoding ─────────────────────────────────────────────────────────────────

/// Decode one tag.  Returns `None` for tag codes that carry no bitmap;
/// bitmap tags always produce an outcome, never an error.
pub fn decode_tag(tag: &Tag<'_>, inflater: &dyn Inflater) -> Option<TagOutcome> {
    match tag.code {
        TAG_DEFINE_BITS_JPEG3 => Some(decode_jpeg3(tag.payload)),
        TAG_DEFINE_BITS_LOSSLESS2 => Some(decode_lossless2(tag.payload, inflater)),
        _ => None,
    }
}

/// DefineBitsJPEG3 payload:
/// `[id u16][alpha_offset u32][JPEG stream; alpha_offset bytes][zlib alpha plane]`
/// (all little-endian).  The alpha plane is parsed past but never
/// composited; the record carries the opaque JPEG stream only.
fn decode_jpeg3(payload: &[u8]) -> TagOutcome {
    if payload.len() < 6 {
        return TagOutcome::Skipped {
            character_id: None,
            reason: SkipReason::TruncatedTag,
        };
    }
    let character_id = LittleEndian::read_u16(&payload[0..2]);
    let alpha_offset = LittleEndian::read_u32(&payload[2..6]);

    let jpeg_end = 6 + alpha_offset as usize;
    if jpeg_end > payload.len() {
        warn!(
            "bitmap {character_id}: alpha offset {alpha_offset} overruns {}-byte payload, skipping",
            payload.len()
        );
        return TagOutcome::Skipped {
            character_id: Some(character_id),
            reason: SkipReason::JpegOffsetOutOfBounds {
                offset: alpha_offset,
                payload_len: payload.len(),
            },
        };
    }

    TagOutcome::Decoded(BitmapRecord {
        character_id,
        data: BitmapData::Jpeg {
            bytes: payload[6..jpeg_end].to_vec(),
        },
    })
}

/// DefineBitsLossless2 payload:
/// `[id u16][format u8][width u16][height u16][zlib pixel stream]`
/// (little-endian).  Format 5 pixels are (A, R, G, B) tuples; the
/// record stores them reordered to RGBA.
fn decode_lossless2(payload: &[u8], inflater: &dyn Inflater) -> TagOutcome {
    if payload.len() < 7 {
        return TagOutcome::Skipped {
            character_id: None,
            reason: SkipReason::TruncatedTag,
        };
    }
    let character_id = LittleEndian::read_u16(&payload[0..2]);
    let format = payload[2];
    let width = LittleEndian::read_u16(&payload[3..5]);
    let height = LittleEndian::read_u16(&payload[5..7]);

    if format != BITMAP_FORMAT_ARGB32 {
        debug!("bitmap {character_id}: pixel format {format} not supported, skipping");
        return TagOutcome::Skipped {
            character_id: Some(character_id),
            reason: SkipReason::UnsupportedBitmapFormat(format),
        };
    }

    let inflated = match inflater.inflate(&payload[7..]) {
        Ok(v) => v,
        Err(e) => {
            warn!("bitmap {character_id}: pixel stream inflate failed: {e}");
            return TagOutcome::Skipped {
                character_id: Some(character_id),
                reason: SkipReason::Decompression(e.to_string()),
            };
        }
    };

    let pixel_count = width as usize * height as usize;
    let mut pixels = vec![0u8; pixel_count * 4];
    // A short stream stops at the last whole source tuple; the rest of
    // the buffer stays zeroed.  Surplus inflated bytes are ignored.
    for i in 0..pixel_count {
        let src = i * 4;
        if src + 4 > inflated.len() {
            debug!(
                "bitmap {character_id}: pixel stream ends after {} of {} pixels",
                i, pixel_count
            );
            break;
        }
        let dst = i * 4;
        pixels[dst] = inflated[src + 1];
        pixels[dst + 1] = inflated[src + 2];
        pixels[dst + 2] = inflated[src + 3];
        pixels[dst + 3] = inflated[src];
    }

    TagOutcome::Decoded(BitmapRecord {
        character_id,
        data: BitmapData::Raster {
            width,
            height,
            pixels,
        },
    })
}
