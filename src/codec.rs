//! Charset decode/encode transforms backed by `encoding_rs`.
//!
//! Decoders turn native bytes into UTF-8 and replace malformed sequences with
//! U+FFFD. Encoders turn UTF-8 into native bytes and fail on characters the
//! target cannot represent.

use encoding_rs::{CoderResult, EncoderResult};

use crate::error::{Error, Result};
use crate::format::Encoding;
use crate::transform::{Progress, Transform};

/// Native bytes to UTF-8.
pub struct DecodeTransform {
    encoding: Encoding,
    decoder: encoding_rs::Decoder,
}

impl DecodeTransform {
    /// Returns `None` for [`Encoding::Binary`].
    pub fn new(encoding: Encoding) -> Option<Self> {
        let codec = encoding.codec()?;
        Some(Self {
            encoding,
            decoder: codec.new_decoder_with_bom_removal(),
        })
    }
}

impl Transform for DecodeTransform {
    fn transform(&mut self, src: &[u8], dst: &mut [u8], last: bool) -> Result<Progress> {
        let (result, read, written, _replaced) = self.decoder.decode_to_utf8(src, dst, last);
        Ok(match result {
            CoderResult::InputEmpty => Progress::input_empty(read, written),
            CoderResult::OutputFull => Progress::output_full(read, written),
        })
    }

    fn reset(&mut self) {
        if let Some(codec) = self.encoding.codec() {
            self.decoder = codec.new_decoder_with_bom_removal();
        }
    }
}

/// UTF-8 to native bytes.
///
/// Input chunks may split a multi-byte character; the leading bytes are kept
/// until the rest arrives.
pub struct EncodeTransform {
    encoding: Encoding,
    encoder: encoding_rs::Encoder,
    partial: [u8; 4],
    partial_len: usize,
}

impl EncodeTransform {
    /// Returns `None` for [`Encoding::Binary`].
    pub fn new(encoding: Encoding) -> Option<Self> {
        let codec = encoding.codec()?;
        Some(Self {
            encoding,
            encoder: codec.new_encoder(),
            partial: [0; 4],
            partial_len: 0,
        })
    }

    fn malformed(&self) -> Error {
        Error::MalformedInput {
            encoding: self.encoding,
        }
    }

    fn encode(
        &mut self,
        text: &str,
        dst: &mut [u8],
        last: bool,
    ) -> Result<(EncoderResult, usize, usize)> {
        let (result, read, written) = self
            .encoder
            .encode_from_utf8_without_replacement(text, dst, last);
        if let EncoderResult::Unmappable(ch) = result {
            return Err(Error::Unmappable {
                ch,
                encoding: self.encoding,
            });
        }
        Ok((result, read, written))
    }

    /// Complete the character carried over from the previous call.
    ///
    /// Returns the input consumed and output produced, or `None` when the
    /// output region can't take the character yet.
    fn finish_partial(&mut self, src: &[u8], dst: &mut [u8]) -> Result<Option<(usize, usize)>> {
        let width = utf8_width(self.partial[0]).ok_or_else(|| self.malformed())?;
        let take = (width - self.partial_len).min(src.len());
        let mut bytes = self.partial;
        bytes[self.partial_len..self.partial_len + take].copy_from_slice(&src[..take]);

        if self.partial_len + take < width {
            self.partial = bytes;
            self.partial_len += take;
            return Ok(Some((take, 0)));
        }

        let text = std::str::from_utf8(&bytes[..width]).map_err(|_| self.malformed())?;
        let (result, read, written) = self.encode(text, dst, false)?;
        if result == EncoderResult::OutputFull || read < text.len() {
            return Ok(None);
        }
        self.partial_len = 0;
        Ok(Some((take, written)))
    }
}

impl Transform for EncodeTransform {
    fn transform(&mut self, src: &[u8], dst: &mut [u8], last: bool) -> Result<Progress> {
        let mut read = 0;
        let mut written = 0;

        if self.partial_len > 0 {
            match self.finish_partial(src, dst)? {
                Some((r, w)) => {
                    read = r;
                    written = w;
                }
                None => return Ok(Progress::output_full(0, 0)),
            }
            if self.partial_len > 0 {
                // Still waiting for the rest of the character.
                if last {
                    return Err(self.malformed());
                }
                return Ok(Progress::input_empty(read, written));
            }
        }

        let rest = &src[read..];
        let (valid, tail) = match std::str::from_utf8(rest) {
            Ok(text) => (text, &[][..]),
            Err(e) if e.error_len().is_none() => {
                let (head, tail) = rest.split_at(e.valid_up_to());
                let text = std::str::from_utf8(head).map_err(|_| self.malformed())?;
                (text, tail)
            }
            Err(_) => return Err(self.malformed()),
        };

        let (result, r, w) = self.encode(valid, &mut dst[written..], last && tail.is_empty())?;
        read += r;
        written += w;
        if result == EncoderResult::OutputFull {
            return Ok(Progress::output_full(read, written));
        }

        if !tail.is_empty() {
            if last {
                return Err(self.malformed());
            }
            self.partial[..tail.len()].copy_from_slice(tail);
            self.partial_len = tail.len();
            read += tail.len();
        }
        Ok(Progress::input_empty(read, written))
    }

    fn reset(&mut self) {
        if let Some(codec) = self.encoding.codec() {
            self.encoder = codec.new_encoder();
        }
        self.partial_len = 0;
    }
}

/// Length of the UTF-8 sequence introduced by `lead`.
fn utf8_width(lead: u8) -> Option<usize> {
    match lead {
        0x00..=0x7F => Some(1),
        0xC2..=0xDF => Some(2),
        0xE0..=0xEF => Some(3),
        0xF0..=0xF4 => Some(4),
        _ => None,
    }
}
