use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine as _;
use clap::{Parser, Subcommand};
use std::fs;
use std::path::{Path, PathBuf};
use swfbits::bitmap::{self, BitmapData, TagOutcome};
use swfbits::codec::ZlibInflater;
use swfbits::extract::Extractor;
use swfbits::movie::Movie;
use swfbits::recompress::RecompressOptions;
use swfbits::tags::TagReader;

#[derive(Parser)]
#[command(name = "swfbits", about = "Extract and recompress embedded bitmaps from SWF movies")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Extract every embedded bitmap and write it as PNG/JPEG
    Extract {
        input: PathBuf,
        #[arg(short = 'C', long, default_value = ".")]
        output_dir: PathBuf,
        /// Re-encode quality (JPEG quality; PNG compression effort)
        #[arg(short, long, default_value = "100")]
        quality: u8,
        /// Downscale images wider than this many pixels
        #[arg(long, default_value = "1024")]
        max_width: u32,
        /// Print the result records as JSON instead of writing files
        #[arg(long)]
        json: bool,
    },
    /// List the decodable bitmap tags without recompressing
    Info {
        input: PathBuf,
    },
    /// Dump every framed tag in the movie body
    Tags {
        input: PathBuf,
    },
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init();
    match Cli::parse().command {

        // ── Extract ──────────────────────────────────────────────────────────
        Commands::Extract { input, output_dir, quality, max_width, json } => {
            let bytes = fs::read(&input)?;
            let opts = RecompressOptions {
                quality: quality.min(100),
                max_width,
            };
            let report = Extractor::new(opts).extract(&bytes)?;
            eprintln!("{}: {}", input.display(), report.summary());

            let images = report.images();
            if json {
                println!("{}", serde_json::to_string_pretty(&images)?);
            } else {
                if !output_dir.exists() {
                    fs::create_dir_all(&output_dir)?;
                }
                let stem = file_stem(&input);
                let indexed = images.len() > 1;
                for (i, image) in images.iter().enumerate() {
                    let ext = extension_for(&image.mime_type);
                    let name = if indexed {
                        format!("{stem}_{i}.{ext}")
                    } else {
                        format!("{stem}.{ext}")
                    };
                    let path = output_dir.join(&name);
                    fs::write(&path, BASE64.decode(&image.payload)?)?;
                    println!(
                        "  wrote  {:<24} id={:<5} {:>8} B  ({:.1}% saved)",
                        name, image.character_id, image.compressed_size, image.compression_ratio,
                    );
                }
            }
        }

        // ── Info ─────────────────────────────────────────────────────────────
        Commands::Info { input } => {
            let bytes = fs::read(&input)?;
            let movie = Movie::normalize(&bytes)?;
            println!("Movie: {}", input.display());
            println!("  Version        {}", movie.version());
            println!("  Declared size  {} B", movie.declared_len());
            println!("  Tag stream at  byte {}", movie.header_size());
            println!("{:<7} {:<10} {:<12} {:>10}", "Id", "Kind", "Dimensions", "Bytes");
            for tag in TagReader::new(movie.body()) {
                match bitmap::decode_tag(&tag, &ZlibInflater) {
                    None => {}
                    Some(TagOutcome::Decoded(record)) => {
                        let (kind, dims) = match &record.data {
                            BitmapData::Jpeg { .. } => ("jpeg".to_string(), "-".to_string()),
                            BitmapData::Raster { width, height, .. } => {
                                ("lossless".to_string(), format!("{width}x{height}"))
                            }
                        };
                        println!(
                            "{:<7} {:<10} {:<12} {:>10}",
                            record.character_id, kind, dims, record.raw_len(),
                        );
                    }
                    Some(TagOutcome::Skipped { character_id, reason }) => {
                        let id = character_id
                            .map(|id| id.to_string())
                            .unwrap_or_else(|| "?".into());
                        println!("{:<7} {:<10} {}", id, "skipped", reason);
                    }
                }
            }
        }

        // ── Tags ─────────────────────────────────────────────────────────────
        Commands::Tags { input } => {
            let bytes = fs::read(&input)?;
            let movie = Movie::normalize(&bytes)?;
            let mut count = 0usize;
            for tag in TagReader::new(movie.body()) {
                count += 1;
                println!("  code={:<4} len={}", tag.code, tag.payload.len());
            }
            println!("{count} tag(s) framed");
        }
    }

    Ok(())
}

// ── helpers ──────────────────────────────────────────────────────────────────

fn file_stem(path: &Path) -> String {
    path.file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "image".to_string())
}

fn extension_for(mime_type: &str) -> &'static str {
    match mime_type {
        "image/jpeg" => "jpg",
        _ => "png",
    }
}
