//! Streaming line-ending rewriter.

use memchr::memchr2;

use crate::error::Result;
use crate::format::LineEnding;
use crate::transform::{Progress, Transform};

/// Rewrites `\n`, `\r\n` and `\r` to a single target terminator.
///
/// A `\r` is replaced as soon as it is seen. If the very next input byte
/// (possibly in the next chunk) is `\n`, that byte is absorbed so the pair
/// yields exactly one replacement.
#[derive(Debug, Clone)]
pub struct LineEndingRewriter {
    terminator: &'static [u8],
    pending_cr: bool,
}

impl LineEndingRewriter {
    /// Returns `None` for [`LineEnding::Mixed`], which has no terminator.
    pub fn new(target: LineEnding) -> Option<Self> {
        Some(Self {
            terminator: target.terminator()?,
            pending_cr: false,
        })
    }
}

impl Transform for LineEndingRewriter {
    fn transform(&mut self, src: &[u8], dst: &mut [u8], last: bool) -> Result<Progress> {
        let mut read = 0;
        let mut written = 0;

        while read < src.len() {
            if self.pending_cr {
                self.pending_cr = false;
                if src[read] == b'\n' {
                    read += 1;
                    continue;
                }
            }

            let rest = &src[read..];
            let literal = memchr2(b'\r', b'\n', rest).unwrap_or(rest.len());
            if literal > 0 {
                let n = literal.min(dst.len() - written);
                dst[written..written + n].copy_from_slice(&rest[..n]);
                read += n;
                written += n;
                if n < literal {
                    return Ok(Progress::output_full(read, written));
                }
                continue;
            }

            let eol = self.terminator;
            if dst.len() - written < eol.len() {
                return Ok(Progress::output_full(read, written));
            }
            dst[written..written + eol.len()].copy_from_slice(eol);
            written += eol.len();
            self.pending_cr = rest[0] == b'\r';
            read += 1;
        }

        if last {
            self.pending_cr = false;
        }
        Ok(Progress::input_empty(read, written))
    }

    fn reset(&mut self) {
        self.pending_cr = false;
    }
}
