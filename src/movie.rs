use byteorder::{ByteOrder, LittleEndian};
use flate2::read::ZlibDecoder;
use std::io::Read;
use thiserror::Error;

pub const SIG_UNCOMPRESSED: &[u8; 3] = b"FWS";
pub const SIG_COMPRESSED: &[u8; 3] = b"CWS";

/// Fixed header prefix: signature (3) + version (1) + declared length (4).
pub const HEADER_PREFIX_LEN: usize = 8;

#[derive(Error, Debug)]
pub enum MovieError {
    #[error("Unrecognized container signature {signature:?}")]
    UnsupportedFormat { signature: [u8; 3] },
    #[error("Buffer too short for the movie header ({len} bytes)")]
    TruncatedHeader { len: usize },
    #[error("Movie body decompression failed: {0}")]
    BodyDecompression(String),
}

/// A canonical movie buffer.  Always uncompressed: `normalize` inflates
/// `CWS` input up front, so byte 0 is `F` from here on.
#[derive(Debug, Clone)]
pub struct Movie {
    data: Vec<u8>,
}

impl Movie {
    /// Normalize raw file bytes to the uncompressed layout.
    ///
    /// `CWS` keeps its first 8 header bytes verbatim except byte 0,
    /// which is rewritten to the uncompressed marker; the rest of the
    /// buffer is zlib-inflated and appended.  `FWS` passes through
    /// unchanged.  Any other signature aborts the whole file.
    pub fn normalize(bytes: &[u8]) -> Result<Self, MovieError> {
        if bytes.len() < HEADER_PREFIX_LEN {
            return Err(MovieError::TruncatedHeader { len: bytes.len() });
        }
        let signature = [bytes[0], bytes[1], bytes[2]];
        let data = match &signature {
            SIG_COMPRESSED => {
                let mut data = Vec::with_capacity(bytes.len());
                data.extend_from_slice(&bytes[..HEADER_PREFIX_LEN]);
                data[0] = SIG_UNCOMPRESSED[0];
                ZlibDecoder::new(&bytes[HEADER_PREFIX_LEN..])
                    .read_to_end(&mut data)
                    .map_err(|e| MovieError::BodyDecompression(e.to_string()))?;
                data
            }
            SIG_UNCOMPRESSED => bytes.to_vec(),
            _ => return Err(MovieError::UnsupportedFormat { signature }),
        };
        // header_size() reads the RECT byte at offset 8.
        if data.len() < HEADER_PREFIX_LEN + 1 {
            return Err(MovieError::TruncatedHeader { len: data.len() });
        }
        Ok(Self { data })
    }

    pub fn version(&self) -> u8 {
        self.data[3]
    }

    /// File length declared in the header (counts the uncompressed layout).
    pub fn declared_len(&self) -> u32 {
        LittleEndian::read_u32(&self.data[4..8])
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.data
    }

    /// Byte offset where the tag stream begins.
    ///
    /// The display-bounds RECT at offset 8 stores `nbits` in its top 5
    /// bits and packs 4 fields of `nbits` bits each; it is followed by
    /// the 2-byte frame rate and 2-byte frame count.
    pub fn header_size(&self) -> usize {
        let nbits = (self.data[HEADER_PREFIX_LEN] >> 3) as usize;
        let rect_bits = 5 + nbits * 4;
        let rect_bytes = (rect_bits + 7) / 8;
        HEADER_PREFIX_LEN + rect_bytes + 4
    }

    /// The tag stream.  Empty when the buffer ends inside the fixed
    /// fields after the RECT.
    pub fn body(&self) -> &[u8] {
        let start = self.header_size().min(self.data.len());
        &self.data[start..]
    }
}
