//! High-level extraction pipeline — the primary embedding surface.
//!
//! ```no_run
//! use swfbits::extract::Extractor;
//! use swfbits::recompress::RecompressOptions;
//!
//! let bytes = std::fs::read("movie.swf")?;
//! let report = Extractor::new(RecompressOptions::default()).extract(&bytes)?;
//! println!("{}", report.summary());
//! for image in report.images() {
//!     // hand off to the persistence layer
//!     let _ = (image.character_id, image.mime_type, image.payload);
//! }
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```
//!
//! # Failure model
//! Only a container that cannot be normalized fails the whole call
//! ([`MovieError`]).  Everything after that is encoded per item in the
//! report: each bitmap tag ends up as `Converted` or `Skipped` with its
//! reason, in tag-stream order.  A valid movie with nothing decodable
//! yields an empty, successful report.

use log::warn;

use crate::bitmap::{self, BitmapRecord, SkipReason, TagOutcome};
use crate::codec::{ImageCodec, Inflater, PixelCodec, ZlibInflater};
use crate::movie::{Movie, MovieError};
use crate::recompress::{self, CompressedImageResult, RecompressOptions};
use crate::tags::TagReader;

// ── Outcomes ─────────────────────────────────────────────────────────────────

/// Final per-bitmap-tag outcome, after recompression.
#[derive(Debug)]
pub enum ImageOutcome {
    Converted(CompressedImageResult),
    Skipped {
        character_id: Option<u16>,
        reason: SkipReason,
    },
}

/// Complete result of one extraction run.
#[derive(Debug, Default)]
pub struct ExtractReport {
    /// Tags framed from the body, bitmap-bearing or not.
    pub tags_scanned: usize,
    /// One entry per bitmap tag, in tag-stream order.
    pub outcomes: Vec<ImageOutcome>,
}

impl ExtractReport {
    pub fn converted_count(&self) -> usize {
        self.outcomes
            .iter()
            .filter(|o| matches!(o, ImageOutcome::Converted(_)))
            .count()
    }

    pub fn skipped_count(&self) -> usize {
        self.outcomes.len() - self.converted_count()
    }

    /// The successful results only, order preserved.
    pub fn images(self) -> Vec<CompressedImageResult> {
        self.outcomes
            .into_iter()
            .filter_map(|o| match o {
                ImageOutcome::Converted(image) => Some(image),
                ImageOutcome::Skipped { .. } => None,
            })
            .collect()
    }

    /// Summary line for display.
    pub fn summary(&self) -> String {
        format!(
            "{} tag(s) scanned, {} bitmap(s): {} converted, {} skipped",
            self.tags_scanned,
            self.outcomes.len(),
            self.converted_count(),
            self.skipped_count(),
        )
    }
}

// ── Extractor ────────────────────────────────────────────────────────────────

/// Owns the codec wiring and options for repeated extraction calls.
pub struct Extractor {
    options: RecompressOptions,
    inflater: Box<dyn Inflater>,
    codec: Box<dyn PixelCodec>,
}

// Decode-stage slot, kept so recompression results can be merged back
// into tag order.
enum Slot {
    Pending { character_id: u16 },
    Skipped {
        character_id: Option<u16>,
        reason: SkipReason,
    },
}

impl Extractor {
    pub fn new(options: RecompressOptions) -> Self {
        Self::with_codecs(options, Box::new(ZlibInflater), Box::new(ImageCodec))
    }

    /// Inject alternative codec implementations.  Tests pass fakes here
    /// to exercise the pipeline without real compression or rasters.
    pub fn with_codecs(
        options: RecompressOptions,
        inflater: Box<dyn Inflater>,
        codec: Box<dyn PixelCodec>,
    ) -> Self {
        Self {
            options,
            inflater,
            codec,
        }
    }

    /// Run the whole pipeline over one in-memory movie file.
    pub fn extract(&self, bytes: &[u8]) -> Result<ExtractReport, MovieError> {
        let movie = Movie::normalize(bytes)?;

        let mut tags_scanned = 0usize;
        let mut slots: Vec<Slot> = Vec::new();
        let mut records: Vec<BitmapRecord> = Vec::new();

        for tag in TagReader::new(movie.body()) {
            tags_scanned += 1;
            match bitmap::decode_tag(&tag, self.inflater.as_ref()) {
                None => {}
                Some(TagOutcome::Decoded(record)) => {
                    slots.push(Slot::Pending {
                        character_id: record.character_id,
                    });
                    records.push(record);
                }
                Some(TagOutcome::Skipped {
                    character_id,
                    reason,
                }) => slots.push(Slot::Skipped {
                    character_id,
                    reason,
                }),
            }
        }

        let mut compressed =
            recompress::recompress_all(&records, self.codec.as_ref(), &self.options).into_iter();

        // recompress_all returned exactly one result per pending record,
        // in the same order the records were pushed.
        let mut outcomes = Vec::with_capacity(slots.len());
        for slot in slots {
            match slot {
                Slot::Skipped {
                    character_id,
                    reason,
                } => outcomes.push(ImageOutcome::Skipped {
                    character_id,
                    reason,
                }),
                Slot::Pending { character_id } => match compressed.next() {
                    Some(Ok(image)) => outcomes.push(ImageOutcome::Converted(image)),
                    Some(Err(e)) => {
                        warn!("bitmap {character_id}: recompression failed: {e}");
                        outcomes.push(ImageOutcome::Skipped {
                            character_id: Some(character_id),
                            reason: SkipReason::Recompression(e.to_string()),
                        });
                    }
                    None => break,
                },
            }
        }

        Ok(ExtractReport {
            tags_scanned,
            outcomes,
        })
    }
}

/// One-shot convenience over [`Extractor`]: fatal errors propagate,
/// every soft skip is dropped, and the successful results come back in
/// tag-stream order.
pub fn extract_images(
    bytes: &[u8],
    options: RecompressOptions,
) -> Result<Vec<CompressedImageResult>, MovieError> {
    Ok(Extractor::new(options).extract(bytes)?.images())
}
