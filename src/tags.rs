use byteorder::{ByteOrder, LittleEndian};

pub const TAG_END: u16 = 0;
pub const TAG_DEFINE_BITS_JPEG3: u16 = 35;
pub const TAG_DEFINE_BITS_LOSSLESS2: u16 = 36;

/// Reserved 6-bit length value meaning "a 32-bit length follows".
const LONG_LENGTH_SENTINEL: u16 = 0x3F;

/// One length-framed record from the movie body.  Borrows the body;
/// nothing is retained after decoding.
#[derive(Debug, Clone, Copy)]
pub struct Tag<'a> {
    pub code: u16,
    pub payload: &'a [u8],
}

/// Sequential tag framing over a movie body.
///
/// Each record starts with a LE u16 whose top 10 bits are the tag code
/// and low 6 bits the payload length; the all-ones length value means a
/// LE u32 extended length follows.  The walk stops cleanly, not with an
/// error, when fewer than 2 bytes remain for a length word or a declared
/// payload would overrun the buffer.  Only two tag codes matter
/// downstream, so a body that ends mid-stream still yields everything
/// framed before the cut.
pub struct TagReader<'a> {
    data: &'a [u8],
    pos: usize,
}

impl<'a> TagReader<'a> {
    pub fn new(body: &'a [u8]) -> Self {
        Self { data: body, pos: 0 }
    }
}

impl<'a> Iterator for TagReader<'a> {
    type Item = Tag<'a>;

    fn next(&mut self) -> Option<Tag<'a>> {
        if self.pos + 2 > self.data.len() {
            return None;
        }
        let word = LittleEndian::read_u16(&self.data[self.pos..]);
        self.pos += 2;

        let code = word >> 6;
        let mut length = (word & LONG_LENGTH_SENTINEL) as usize;
        if length == LONG_LENGTH_SENTINEL as usize {
            if self.pos + 4 > self.data.len() {
                return None;
            }
            length = LittleEndian::read_u32(&self.data[self.pos..]) as usize;
            self.pos += 4;
        }

        if self.data.len() - self.pos < length {
            return None;
        }
        let payload = &self.data[self.pos..self.pos + length];
        self.pos += length;
        Some(Tag { code, payload })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn short_tag(code: u16, payload: &[u8]) -> Vec<u8> {
        assert!(payload.len() < 0x3F);
        let word = (code << 6) | payload.len() as u16;
        let mut out = word.to_le_bytes().to_vec();
        out.extend_from_slice(payload);
        out
    }

    fn long_tag(code: u16, payload: &[u8]) -> Vec<u8> {
        let word = (code << 6) | 0x3F;
        let mut out = word.to_le_bytes().to_vec();
        out.extend((payload.len() as u32).to_le_bytes());
        out.extend_from_slice(payload);
        out
    }

    #[test]
    fn frames_short_tags_in_order() {
        let mut body = short_tag(9, &[1, 2, 3]);
        body.extend(short_tag(43, &[]));
        body.extend(short_tag(TAG_END, &[]));

        let tags: Vec<_> = TagReader::new(&body).collect();
        assert_eq!(tags.len(), 3);
        assert_eq!(tags[0].code, 9);
        assert_eq!(tags[0].payload, &[1, 2, 3]);
        assert_eq!(tags[1].code, 43);
        assert_eq!(tags[2].code, TAG_END);
    }

    #[test]
    fn extended_length_form() {
        // 6-bit length at its sentinel value, true length 1000 in the
        // following u32.
        let payload = vec![0xABu8; 1000];
        let body = long_tag(36, &payload);

        let tags: Vec<_> = TagReader::new(&body).collect();
        assert_eq!(tags.len(), 1);
        assert_eq!(tags[0].code, 36);
        assert_eq!(tags[0].payload.len(), 1000);
    }

    #[test]
    fn long_form_even_when_short_would_fit() {
        // Writers may use the extended form for small payloads too.
        let body = long_tag(21, &[7, 7]);
        let tags: Vec<_> = TagReader::new(&body).collect();
        assert_eq!(tags.len(), 1);
        assert_eq!(tags[0].payload, &[7, 7]);
    }

    #[test]
    fn overrunning_tag_truncates_silently() {
        let mut body = short_tag(9, &[1, 2, 3]);
        // Declares 20 payload bytes but only 4 follow.
        body.extend((5u16 << 6 | 20).to_le_bytes());
        body.extend([0u8; 4]);

        let tags: Vec<_> = TagReader::new(&body).collect();
        assert_eq!(tags.len(), 1);
        assert_eq!(tags[0].code, 9);
    }

    #[test]
    fn dangling_length_word_stops_cleanly() {
        let mut body = short_tag(1, &[]);
        body.push(0x55); // lone byte, not enough for a length word
        assert_eq!(TagReader::new(&body).count(), 1);

        // Extended sentinel with fewer than 4 length bytes behind it.
        let mut body = short_tag(1, &[]);
        body.extend((2u16 << 6 | 0x3F).to_le_bytes());
        body.extend([0u8; 3]);
        assert_eq!(TagReader::new(&body).count(), 1);
    }

    #[test]
    fn empty_body_yields_nothing() {
        assert_eq!(TagReader::new(&[]).count(), 0);
    }

    proptest! {
        #[test]
        fn framing_never_panics(body in proptest::collection::vec(any::<u8>(), 0..512)) {
            for tag in TagReader::new(&body) {
                prop_assert!(tag.payload.len() <= body.len());
            }
        }
    }
}
