//! Streaming byte transforms and transform chains.
//!
//! A [`Transform`] consumes a chunk of input and fills a bounded output
//! region. It tells the caller whether it stopped because the output region
//! is full (call again with the unconsumed input after draining the output)
//! or because the input is exhausted (feed the next chunk). Any incomplete
//! sequence at the end of a chunk is carried inside the transform, so
//! `InputEmpty` always means every input byte was consumed.

use std::io::{self, Read, Write};

use crate::error::{Error, Result};

/// Size of the read buffer and of each intermediate stage buffer.
pub const DEFAULT_BUFFER_SIZE: usize = 8 * 1024;

/// Why a [`Transform::transform`] call returned.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Status {
    /// All input was consumed; feed more (or finish when `last` was set).
    InputEmpty,
    /// The output region is full; drain it and call again with the rest.
    OutputFull,
}

/// Outcome of one [`Transform::transform`] call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Progress {
    /// Input bytes consumed.
    pub read: usize,
    /// Output bytes produced.
    pub written: usize,
    pub status: Status,
}

impl Progress {
    pub fn input_empty(read: usize, written: usize) -> Self {
        Self {
            read,
            written,
            status: Status::InputEmpty,
        }
    }

    pub fn output_full(read: usize, written: usize) -> Self {
        Self {
            read,
            written,
            status: Status::OutputFull,
        }
    }
}

/// A resumable byte-to-byte conversion.
pub trait Transform {
    /// Convert as much of `src` into `dst` as fits.
    ///
    /// `last` marks the final chunk of the stream; state carried across calls
    /// is flushed once the call returns [`Status::InputEmpty`] with it set.
    fn transform(&mut self, src: &[u8], dst: &mut [u8], last: bool) -> Result<Progress>;

    /// Forget carried state so the transform can start an unrelated stream.
    fn reset(&mut self);
}

/// Ordered transforms applied one after the other.
pub struct TransformChain {
    stages: Vec<Box<dyn Transform>>,
    buffers: Vec<Vec<u8>>,
    buffer_size: usize,
}

impl TransformChain {
    pub fn new(stages: Vec<Box<dyn Transform>>) -> Self {
        Self::with_buffer_size(stages, DEFAULT_BUFFER_SIZE)
    }

    pub fn with_buffer_size(stages: Vec<Box<dyn Transform>>, buffer_size: usize) -> Self {
        let buffers = stages.iter().map(|_| vec![0u8; buffer_size]).collect();
        Self {
            stages,
            buffers,
            buffer_size,
        }
    }

    pub fn len(&self) -> usize {
        self.stages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.stages.is_empty()
    }

    pub fn reset(&mut self) {
        for stage in &mut self.stages {
            stage.reset();
        }
    }

    /// Push one chunk through every stage, writing the final output to `out`.
    pub fn feed<W: Write + ?Sized>(&mut self, src: &[u8], last: bool, out: &mut W) -> Result<()> {
        pump(&mut self.stages, &mut self.buffers, src, last, out)
    }

    /// Stream `reader` to the end through the chain into `writer`.
    ///
    /// Returns the number of input bytes read.
    pub fn run<R, W>(&mut self, reader: &mut R, writer: &mut W) -> Result<u64>
    where
        R: Read + ?Sized,
        W: Write + ?Sized,
    {
        let mut input = vec![0u8; self.buffer_size];
        let mut total = 0u64;
        loop {
            let n = match reader.read(&mut input) {
                Ok(0) => break,
                Ok(n) => n,
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) => return Err(e.into()),
            };
            total += n as u64;
            self.feed(&input[..n], false, writer)?;
        }
        self.feed(&[], true, writer)?;
        Ok(total)
    }

    /// Convert a complete in-memory buffer.
    pub fn apply(&mut self, input: &[u8]) -> Result<Vec<u8>> {
        let mut out = Vec::with_capacity(input.len());
        self.feed(input, true, &mut out)?;
        Ok(out)
    }
}

impl std::fmt::Debug for TransformChain {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TransformChain")
            .field("stages", &self.stages.len())
            .field("buffer_size", &self.buffer_size)
            .finish()
    }
}

/// Run `src` through the first stage and hand everything it produces to the
/// remaining stages. Downstream stages see `last` only once the upstream
/// stage has flushed its own carried state.
fn pump<W: Write + ?Sized>(
    stages: &mut [Box<dyn Transform>],
    buffers: &mut [Vec<u8>],
    mut src: &[u8],
    last: bool,
    out: &mut W,
) -> Result<()> {
    let (Some((stage, rest)), Some((buf, rest_buffers))) =
        (stages.split_first_mut(), buffers.split_first_mut())
    else {
        out.write_all(src)?;
        return Ok(());
    };

    loop {
        let progress = stage.transform(src, buf, last)?;
        src = &src[progress.read..];
        let done = progress.status == Status::InputEmpty;
        debug_assert!(!done || src.is_empty(), "InputEmpty with unread input");

        if progress.written > 0 || (done && last) {
            pump(rest, rest_buffers, &buf[..progress.written], last && done, out)?;
        }
        if done {
            return Ok(());
        }
        if progress.read == 0 && progress.written == 0 {
            return Err(Error::Stalled(buf.len()));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Upper-cases ASCII and emits at most `limit` bytes per call.
    struct Upper {
        limit: usize,
    }

    impl Transform for Upper {
        fn transform(&mut self, src: &[u8], dst: &mut [u8], _last: bool) -> Result<Progress> {
            let n = src.len().min(dst.len()).min(self.limit);
            for (d, s) in dst.iter_mut().zip(&src[..n]) {
                *d = s.to_ascii_uppercase();
            }
            if n < src.len() {
                Ok(Progress::output_full(n, n))
            } else {
                Ok(Progress::input_empty(n, n))
            }
        }

        fn reset(&mut self) {}
    }

    /// Appends a marker when it sees the end of the stream.
    struct Trailer {
        done: bool,
    }

    impl Transform for Trailer {
        fn transform(&mut self, src: &[u8], dst: &mut [u8], last: bool) -> Result<Progress> {
            let n = src.len().min(dst.len());
            dst[..n].copy_from_slice(&src[..n]);
            if n < src.len() {
                return Ok(Progress::output_full(n, n));
            }
            if last && !self.done {
                if dst.len() == n {
                    return Ok(Progress::output_full(n, n));
                }
                dst[n] = b'$';
                self.done = true;
                return Ok(Progress::input_empty(n, n + 1));
            }
            Ok(Progress::input_empty(n, n))
        }

        fn reset(&mut self) {
            self.done = false;
        }
    }

    /// Never makes progress.
    struct Stuck;

    impl Transform for Stuck {
        fn transform(&mut self, _src: &[u8], _dst: &mut [u8], _last: bool) -> Result<Progress> {
            Ok(Progress::output_full(0, 0))
        }

        fn reset(&mut self) {}
    }

    #[test]
    fn test_chain_handles_small_buffers() {
        let mut chain = TransformChain::with_buffer_size(
            vec![Box::new(Upper { limit: 3 }), Box::new(Trailer { done: false })],
            2,
        );
        let out = chain.apply(b"hello world").unwrap();
        assert_eq!(out, b"HELLO WORLD$");
    }

    #[test]
    fn test_last_reaches_every_stage_once() {
        let mut chain = TransformChain::new(vec![
            Box::new(Trailer { done: false }),
            Box::new(Trailer { done: false }),
        ]);
        let mut out = Vec::new();
        chain.feed(b"ab", false, &mut out).unwrap();
        chain.feed(b"", true, &mut out).unwrap();
        assert_eq!(out, b"ab$$");
    }

    #[test]
    fn test_run_streams_reader() {
        let mut chain = TransformChain::with_buffer_size(vec![Box::new(Upper { limit: 5 })], 4);
        let mut reader: &[u8] = b"streaming input";
        let mut out = Vec::new();
        let read = chain.run(&mut reader, &mut out).unwrap();
        assert_eq!(read, 15);
        assert_eq!(out, b"STREAMING INPUT");
    }

    #[test]
    fn test_stalled_stage_is_an_error() {
        let mut chain = TransformChain::new(vec![Box::new(Stuck)]);
        assert!(matches!(chain.apply(b"x"), Err(Error::Stalled(_))));
    }

    #[test]
    fn test_reset_clears_stage_state() {
        let mut chain = TransformChain::new(vec![Box::new(Trailer { done: false })]);
        assert_eq!(chain.apply(b"a").unwrap(), b"a$");
        chain.reset();
        assert_eq!(chain.apply(b"b").unwrap(), b"b$");
    }
}
