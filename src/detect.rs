//! Format detection.
//!
//! Detection reads a file once and feeds every chunk to a set of independent
//! [`Detector`]s. Reading stops early once all of them have reached a
//! conclusion.

use std::fs::File;
use std::io::{self, Read};
use std::path::Path;

use memchr::memchr2;
use tracing::debug;

use crate::error::Result;
use crate::format::{Encoding, FormatInfo, LineEnding};
use crate::transform::DEFAULT_BUFFER_SIZE;

/// An incremental scanner over a byte stream.
///
/// A detector starts active and may become inactive once its answer can no
/// longer change. It never becomes active again, and ignores data fed to it
/// while inactive.
pub trait Detector {
    fn is_active(&self) -> bool;

    /// Scan the next chunk. `at_end` marks the end of the stream; `chunk` may
    /// be empty in that case.
    fn ingest(&mut self, chunk: &[u8], at_end: bool);
}

/// Pluggable encoding sniffing strategy.
pub trait EncodingDetector: Detector {
    fn encoding(&self) -> Encoding;
}

/// Runs several detectors in lock-step over the same stream.
#[derive(Default)]
pub struct DetectorSet<'a> {
    members: Vec<&'a mut dyn Detector>,
}

impl<'a> DetectorSet<'a> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, detector: &'a mut dyn Detector) -> Self {
        self.members.push(detector);
        self
    }

    pub fn push(&mut self, detector: &'a mut dyn Detector) {
        self.members.push(detector);
    }
}

impl Detector for DetectorSet<'_> {
    fn is_active(&self) -> bool {
        self.members.iter().any(|d| d.is_active())
    }

    fn ingest(&mut self, chunk: &[u8], at_end: bool) {
        for detector in self.members.iter_mut().filter(|d| d.is_active()) {
            detector.ingest(chunk, at_end);
        }
    }
}

/// Classifies the line terminator style of a stream.
///
/// The first terminator sets the hypothesis. The first one that disagrees
/// turns the answer into [`LineEnding::Mixed`] for good and stops the scan.
/// A stream without terminators stays `Mixed`.
#[derive(Debug, Clone)]
pub struct LineEndingDetector {
    hypothesis: LineEnding,
    pending_cr: bool,
    active: bool,
}

impl Default for LineEndingDetector {
    fn default() -> Self {
        Self {
            hypothesis: LineEnding::Mixed,
            pending_cr: false,
            active: true,
        }
    }
}

impl LineEndingDetector {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn line_ending(&self) -> LineEnding {
        self.hypothesis
    }

    fn emit(&mut self, seen: LineEnding) {
        if !self.active {
            return;
        }
        if self.hypothesis == LineEnding::Mixed {
            self.hypothesis = seen;
        } else if self.hypothesis != seen {
            self.hypothesis = LineEnding::Mixed;
            self.active = false;
        }
    }

    /// Classify a deferred `\r` that turned out not to start a CRLF.
    fn flush_cr(&mut self) {
        if self.pending_cr {
            self.pending_cr = false;
            self.emit(LineEnding::Cr);
        }
    }
}

impl Detector for LineEndingDetector {
    fn is_active(&self) -> bool {
        self.active
    }

    fn ingest(&mut self, chunk: &[u8], at_end: bool) {
        if !self.active {
            return;
        }
        let mut rest = chunk;
        while self.active {
            let Some(pos) = memchr2(b'\r', b'\n', rest) else {
                if !rest.is_empty() {
                    self.flush_cr();
                }
                break;
            };
            if pos > 0 {
                self.flush_cr();
            }
            if rest[pos] == b'\n' {
                if self.pending_cr {
                    self.pending_cr = false;
                    self.emit(LineEnding::Crlf);
                } else {
                    self.emit(LineEnding::Lf);
                }
            } else {
                self.flush_cr();
                self.pending_cr = true;
            }
            rest = &rest[pos + 1..];
        }

        if at_end {
            self.flush_cr();
        }
    }
}

/// Encoding detector placeholder: always answers [`Encoding::Binary`].
///
/// It stays active forever, which is harmless since its answer never
/// changes. Real sniffing (byte-validity scoring for UTF-8, Shift_JIS and
/// EUC-JP, escape sequences for ISO-2022-JP) plugs in through
/// [`EncodingDetector`].
#[derive(Debug, Default, Clone)]
pub struct BinaryEncodingDetector;

impl Detector for BinaryEncodingDetector {
    fn is_active(&self) -> bool {
        true
    }

    fn ingest(&mut self, _chunk: &[u8], _at_end: bool) {}
}

impl EncodingDetector for BinaryEncodingDetector {
    fn encoding(&self) -> Encoding {
        Encoding::Binary
    }
}

/// Detect the format of the file at `path`. The file is not modified.
pub fn detect(path: &Path) -> Result<FormatInfo> {
    let mut file = File::open(path)?;
    let info = detect_with(&mut file, &mut BinaryEncodingDetector, DEFAULT_BUFFER_SIZE)?;
    debug!(path = %path.display(), format = %info, "detected");
    Ok(info)
}

/// Detect the format of a stream using the given encoding strategy.
pub fn detect_with<R, E>(reader: &mut R, encoding: &mut E, buffer_size: usize) -> Result<FormatInfo>
where
    R: Read + ?Sized,
    E: EncodingDetector,
{
    let mut eol = LineEndingDetector::new();
    {
        let mut set = DetectorSet::new().with(&mut eol).with(&mut *encoding);
        scan(reader, &mut set, buffer_size)?;
    }
    Ok(FormatInfo::new(encoding.encoding(), eol.line_ending()))
}

/// Feed `reader` to `detector` until the stream ends or the detector has
/// concluded. Returns the number of bytes read.
pub fn scan<R, D>(reader: &mut R, detector: &mut D, buffer_size: usize) -> Result<u64>
where
    R: Read + ?Sized,
    D: Detector + ?Sized,
{
    let mut buf = vec![0u8; buffer_size.max(1)];
    let mut total = 0u64;
    while detector.is_active() {
        let n = match reader.read(&mut buf) {
            Ok(n) => n,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(e.into()),
        };
        total += n as u64;
        detector.ingest(&buf[..n], n == 0);
        if n == 0 {
            break;
        }
    }
    Ok(total)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn classify(input: &[u8]) -> LineEnding {
        let mut detector = LineEndingDetector::new();
        detector.ingest(input, true);
        detector.line_ending()
    }

    fn classify_bytewise(input: &[u8]) -> LineEnding {
        let mut detector = LineEndingDetector::new();
        for byte in input.chunks(1) {
            detector.ingest(byte, false);
        }
        detector.ingest(&[], true);
        detector.line_ending()
    }

    #[test]
    fn test_uniform_streams() {
        assert_eq!(classify(b"a\nb\nc\n"), LineEnding::Lf);
        assert_eq!(classify(b"a\r\nb\r\n"), LineEnding::Crlf);
        assert_eq!(classify(b"a\rb\rc"), LineEnding::Cr);
        assert_eq!(classify(b"\n\n\n"), LineEnding::Lf);
        assert_eq!(classify(b"\r\r"), LineEnding::Cr);
    }

    #[test]
    fn test_trailing_cr_at_end_of_stream() {
        assert_eq!(classify(b"\r"), LineEnding::Cr);
        assert_eq!(classify_bytewise(b"line\r"), LineEnding::Cr);
    }

    #[test]
    fn test_no_terminators_is_mixed() {
        assert_eq!(classify(b""), LineEnding::Mixed);
        assert_eq!(classify(b"just text"), LineEnding::Mixed);
    }

    #[test]
    fn test_mixed_deactivates_on_disagreement() {
        let mut detector = LineEndingDetector::new();
        detector.ingest(b"a\nb", false);
        assert!(detector.is_active());
        assert_eq!(detector.line_ending(), LineEnding::Lf);

        detector.ingest(b"\r\n", false);
        assert!(!detector.is_active());
        assert_eq!(detector.line_ending(), LineEnding::Mixed);

        detector.ingest(b"\n\n\n", true);
        assert_eq!(detector.line_ending(), LineEnding::Mixed);
    }

    #[test]
    fn test_cr_then_lf_with_text_between() {
        assert_eq!(classify(b"a\rb\n"), LineEnding::Mixed);
        assert_eq!(classify(b"\r\r\n"), LineEnding::Mixed);
    }

    #[test]
    fn test_crlf_across_chunk_boundary() {
        let mut detector = LineEndingDetector::new();
        detector.ingest(b"one\r", false);
        detector.ingest(b"\ntwo\r", false);
        detector.ingest(b"\n", false);
        detector.ingest(b"", true);
        assert_eq!(detector.line_ending(), LineEnding::Crlf);
    }

    #[test]
    fn test_bytewise_matches_whole_buffer() {
        let samples: &[&[u8]] = &[
            b"a\r\nb\r\nc",
            b"a\rb\rc\r",
            b"a\nb\r\n",
            b"\r\n\r",
            b"x\r\ry",
            b"plain",
        ];
        for sample in samples {
            assert_eq!(classify(sample), classify_bytewise(sample), "{sample:?}");
        }
    }

    #[test]
    fn test_detector_set_forwards_only_to_active_members() {
        let mut first = LineEndingDetector::new();
        let mut second = LineEndingDetector::new();
        {
            let mut set = DetectorSet::new().with(&mut first).with(&mut second);
            set.ingest(b"a\nb\r\n", false);
            assert!(!set.is_active());
        }
        assert_eq!(first.line_ending(), LineEnding::Mixed);
        assert_eq!(second.line_ending(), LineEnding::Mixed);
    }

    #[test]
    fn test_scan_stops_when_detectors_conclude() {
        let mut eol = LineEndingDetector::new();
        let mut input: &[u8] = b"a\nb\r\nrest of a long file";
        let read = scan(&mut input, &mut eol, 4).unwrap();
        assert_eq!(read, 8);
        assert_eq!(eol.line_ending(), LineEnding::Mixed);
    }

    #[test]
    fn test_scan_delivers_end_of_stream() {
        let mut eol = LineEndingDetector::new();
        let mut input: &[u8] = b"abc\r";
        scan(&mut input, &mut eol, 4).unwrap();
        assert_eq!(eol.line_ending(), LineEnding::Cr);
    }

    #[test]
    fn test_detect_with_stub_reports_binary() {
        let mut input: &[u8] = b"line\r\nline\r\n";
        let info = detect_with(&mut input, &mut BinaryEncodingDetector, 3).unwrap();
        assert_eq!(info, FormatInfo::new(Encoding::Binary, LineEnding::Crlf));
        assert_eq!(info.describe(), "binary file");
    }

    #[test]
    fn test_detect_with_custom_strategy() {
        struct AlwaysUtf8;
        impl Detector for AlwaysUtf8 {
            fn is_active(&self) -> bool {
                false
            }
            fn ingest(&mut self, _chunk: &[u8], _at_end: bool) {}
        }
        impl EncodingDetector for AlwaysUtf8 {
            fn encoding(&self) -> Encoding {
                Encoding::Utf8
            }
        }

        let mut input: &[u8] = b"a\nb\n";
        let info = detect_with(&mut input, &mut AlwaysUtf8, 2).unwrap();
        assert_eq!(info, FormatInfo::new(Encoding::Utf8, LineEnding::Lf));
    }
}
