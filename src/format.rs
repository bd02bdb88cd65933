//! Text format descriptors and conversion planning.
//!
//! A [`FormatInfo`] pairs a character encoding with a line-ending style. The
//! descriptor of a scanned file is compared with the requested target to
//! decide which conversion steps are actually needed.

use std::fmt;
use std::str::FromStr;

use crate::codec::{DecodeTransform, EncodeTransform};
use crate::eol::LineEndingRewriter;
use crate::transform::{DEFAULT_BUFFER_SIZE, Transform, TransformChain};

/// Character encoding of a text file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Encoding {
    /// Unknown or binary content. Never transcoded.
    #[default]
    Binary,
    Utf8,
    EucJp,
    /// ISO-2022-JP ("JIS").
    Iso2022Jp,
    /// Shift_JIS / CP932.
    ShiftJis,
}

impl Encoding {
    pub fn name(self) -> &'static str {
        match self {
            Encoding::Binary => "binary",
            Encoding::Utf8 => "UTF-8",
            Encoding::EucJp => "EUC-JP",
            Encoding::Iso2022Jp => "ISO-2022-JP",
            Encoding::ShiftJis => "Shift_JIS",
        }
    }

    /// The `encoding_rs` codec backing this encoding, if any.
    pub(crate) fn codec(self) -> Option<&'static encoding_rs::Encoding> {
        match self {
            Encoding::Binary => None,
            Encoding::Utf8 => Some(encoding_rs::UTF_8),
            Encoding::EucJp => Some(encoding_rs::EUC_JP),
            Encoding::Iso2022Jp => Some(encoding_rs::ISO_2022_JP),
            Encoding::ShiftJis => Some(encoding_rs::SHIFT_JIS),
        }
    }
}

impl fmt::Display for Encoding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Encoding {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_uppercase().as_str() {
            "" | "BIN" | "BINARY" | "KEEP" => Ok(Encoding::Binary),
            "UTF8" | "UTF-8" | "U" => Ok(Encoding::Utf8),
            // "EUC" alone may stop meaning Japanese some day.
            "EUCJP" | "EUC-JP" | "EUC_JP" | "EUC" | "E" => Ok(Encoding::EucJp),
            "JIS" | "ISO2022JP" | "ISO-2022-JP" | "J" => Ok(Encoding::Iso2022Jp),
            "CP932" | "SJIS" | "SHIFT_JIS" | "SHIFT-JIS" | "WIN31J" | "S" => {
                Ok(Encoding::ShiftJis)
            }
            _ => Err(format!(
                "unknown encoding '{s}' (expected UTF8, EUC, JIS or CP932)"
            )),
        }
    }
}

/// Line terminator convention of a text file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum LineEnding {
    /// Inconsistent or undecided. Never forces a rewrite.
    #[default]
    Mixed,
    Lf,
    Crlf,
    Cr,
}

impl LineEnding {
    pub fn name(self) -> &'static str {
        match self {
            LineEnding::Mixed => "mixed",
            LineEnding::Lf => "LF",
            LineEnding::Crlf => "CR+LF",
            LineEnding::Cr => "CR",
        }
    }

    /// Bytes written for one line break, `None` for [`LineEnding::Mixed`].
    pub fn terminator(self) -> Option<&'static [u8]> {
        match self {
            LineEnding::Mixed => None,
            LineEnding::Lf => Some(b"\n"),
            LineEnding::Crlf => Some(b"\r\n"),
            LineEnding::Cr => Some(b"\r"),
        }
    }
}

impl fmt::Display for LineEnding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for LineEnding {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_uppercase().as_str() {
            "" | "MIXED" | "KEEP" => Ok(LineEnding::Mixed),
            "LF" | "UNIX" | "OSX" | "U" => Ok(LineEnding::Lf),
            "CRLF" | "CR+LF" | "WIN" | "DOS" | "W" | "D" => Ok(LineEnding::Crlf),
            "CR" | "MAC" | "M" => Ok(LineEnding::Cr),
            _ => Err(format!("unknown eol '{s}' (expected LF, CRLF or CR)")),
        }
    }
}

/// One conversion step, in the order it runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Step {
    /// Native bytes of the encoding to UTF-8.
    Decode(Encoding),
    /// Rewrite every line break to the given style.
    Rewrite(LineEnding),
    /// UTF-8 to native bytes of the encoding.
    Encode(Encoding),
}

impl Step {
    fn build(self) -> Option<Box<dyn Transform>> {
        match self {
            Step::Decode(encoding) => {
                DecodeTransform::new(encoding).map(|t| Box::new(t) as Box<dyn Transform>)
            }
            Step::Rewrite(eol) => {
                LineEndingRewriter::new(eol).map(|t| Box::new(t) as Box<dyn Transform>)
            }
            Step::Encode(encoding) => {
                EncodeTransform::new(encoding).map(|t| Box::new(t) as Box<dyn Transform>)
            }
        }
    }
}

impl fmt::Display for Step {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Step::Decode(e) => write!(f, "decode {e}"),
            Step::Rewrite(eol) => write!(f, "rewrite to {eol}"),
            Step::Encode(e) => write!(f, "encode {e}"),
        }
    }
}

/// Encoding and line-ending of a text file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct FormatInfo {
    pub encoding: Encoding,
    pub line_ending: LineEnding,
}

impl FormatInfo {
    pub const fn new(encoding: Encoding, line_ending: LineEnding) -> Self {
        Self {
            encoding,
            line_ending,
        }
    }

    /// Human readable summary, e.g. `UTF-8, CR+LF` or `binary file`.
    pub fn describe(&self) -> String {
        self.to_string()
    }

    /// Steps needed to turn content in this format into `target`.
    ///
    /// An empty plan means the content already conforms.
    pub fn plan(&self, target: &FormatInfo) -> Vec<Step> {
        let mut steps = Vec::with_capacity(3);
        let transcode = target.encoding != Encoding::Binary
            && self.encoding != Encoding::Binary
            && self.encoding != target.encoding;
        let rewrite = target.line_ending != LineEnding::Mixed
            && self.line_ending != LineEnding::Mixed
            && self.line_ending != target.line_ending;

        if transcode {
            steps.push(Step::Decode(self.encoding));
        }
        if rewrite {
            steps.push(Step::Rewrite(target.line_ending));
        }
        if transcode {
            steps.push(Step::Encode(target.encoding));
        }
        steps
    }

    /// Build the transform chain converting this format into `target`.
    ///
    /// Returns `None` when nothing needs to change.
    pub fn transformer(&self, target: &FormatInfo) -> Option<TransformChain> {
        self.transformer_with_buffer_size(target, DEFAULT_BUFFER_SIZE)
    }

    pub fn transformer_with_buffer_size(
        &self,
        target: &FormatInfo,
        buffer_size: usize,
    ) -> Option<TransformChain> {
        let stages: Vec<Box<dyn Transform>> =
            self.plan(target).into_iter().filter_map(Step::build).collect();
        if stages.is_empty() {
            None
        } else {
            Some(TransformChain::with_buffer_size(stages, buffer_size))
        }
    }
}

impl fmt::Display for FormatInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.encoding == Encoding::Binary {
            return f.write_str("binary file");
        }
        write!(f, "{}, {}", self.encoding, self.line_ending)
    }
}
