pub mod movie;
pub mod tags;
pub mod codec;
pub mod bitmap;
pub mod recompress;
pub mod extract;

pub use movie::{Movie, MovieError};
pub use tags::{Tag, TagReader};
pub use bitmap::{BitmapData, BitmapRecord, SkipReason};
pub use recompress::{CompressedImageResult, RecompressOptions};
pub use extract::{extract_images, ExtractReport, Extractor, ImageOutcome};
