//! Property-based tests for textfmt
//!
//! Detection and conversion work on arbitrary chunk boundaries; these tests
//! check that the answers never depend on how the input was split.

use proptest::prelude::*;

use textfmt::{
    Detector, EncodeTransform, Encoding, LineEnding, LineEndingDetector, LineEndingRewriter,
    TransformChain,
};

/// Text made of letters and every kind of line break.
fn text_with_breaks() -> impl Strategy<Value = Vec<u8>> {
    prop::collection::vec(
        prop_oneof![
            3 => Just(b'a'),
            1 => Just(b'\r'),
            1 => Just(b'\n'),
        ],
        0..200,
    )
}

fn target_eol() -> impl Strategy<Value = LineEnding> {
    prop_oneof![
        Just(LineEnding::Lf),
        Just(LineEnding::Crlf),
        Just(LineEnding::Cr),
    ]
}

fn detect_chunked(input: &[u8], chunk: usize) -> LineEnding {
    let mut detector = LineEndingDetector::new();
    for piece in input.chunks(chunk) {
        detector.ingest(piece, false);
    }
    detector.ingest(&[], true);
    detector.line_ending()
}

fn rewrite_chunked(input: &[u8], target: LineEnding, chunk: usize, buffer: usize) -> Vec<u8> {
    let rewriter = LineEndingRewriter::new(target).unwrap();
    let mut chain = TransformChain::with_buffer_size(vec![Box::new(rewriter)], buffer);
    let mut out = Vec::new();
    for piece in input.chunks(chunk) {
        chain.feed(piece, false, &mut out).unwrap();
    }
    chain.feed(&[], true, &mut out).unwrap();
    out
}

/// Reference rewrite: every `\r\n`, `\r` or `\n` becomes `eol`.
fn rewrite_reference(input: &[u8], eol: &[u8]) -> Vec<u8> {
    let mut out = Vec::new();
    let mut i = 0;
    while i < input.len() {
        match input[i] {
            b'\r' if input.get(i + 1) == Some(&b'\n') => {
                out.extend_from_slice(eol);
                i += 2;
            }
            b'\r' | b'\n' => {
                out.extend_from_slice(eol);
                i += 1;
            }
            b => {
                out.push(b);
                i += 1;
            }
        }
    }
    out
}

// ============================================================================
// Detection
// ============================================================================

proptest! {
    /// Feeding the detector one byte at a time or in random chunks gives the
    /// same answer as feeding the whole buffer.
    #[test]
    fn prop_detection_is_chunk_independent(
        input in text_with_breaks(),
        chunk in 1usize..32,
    ) {
        let whole = detect_chunked(&input, input.len().max(1));
        prop_assert_eq!(detect_chunked(&input, 1), whole);
        prop_assert_eq!(detect_chunked(&input, chunk), whole);
    }

    /// Uniform text is classified by its terminator.
    #[test]
    fn prop_uniform_text_is_detected(
        lines in prop::collection::vec("[a-z]{0,10}", 1..20),
        eol in target_eol(),
    ) {
        let terminator = std::str::from_utf8(eol.terminator().unwrap()).unwrap();
        let text: String = lines.iter().map(|l| format!("{l}{terminator}")).collect();
        prop_assert_eq!(detect_chunked(text.as_bytes(), 7), eol);
    }
}

// ============================================================================
// Line-ending rewriting
// ============================================================================

proptest! {
    /// Output does not depend on input chunking or the stage buffer size.
    #[test]
    fn prop_rewrite_is_chunk_independent(
        input in text_with_breaks(),
        target in target_eol(),
        chunk in 1usize..32,
        buffer in 2usize..64,
    ) {
        let expected = rewrite_reference(&input, target.terminator().unwrap());
        prop_assert_eq!(rewrite_chunked(&input, target, chunk, buffer), expected.clone());
        prop_assert_eq!(rewrite_chunked(&input, target, 1, 2), expected);
    }

    /// Rewritten text is detected as the target style, or as mixed when it
    /// has no line breaks at all.
    #[test]
    fn prop_rewrite_then_detect_yields_target(
        input in text_with_breaks(),
        target in target_eol(),
    ) {
        let output = rewrite_chunked(&input, target, 16, 64);
        let has_breaks = input.iter().any(|&b| b == b'\r' || b == b'\n');
        let expected = if has_breaks { target } else { LineEnding::Mixed };
        prop_assert_eq!(detect_chunked(&output, output.len().max(1)), expected);
    }

    /// Rewriting twice changes nothing the second time.
    #[test]
    fn prop_rewrite_is_idempotent(
        input in text_with_breaks(),
        target in target_eol(),
    ) {
        let once = rewrite_chunked(&input, target, 16, 64);
        let twice = rewrite_chunked(&once, target, 5, 8);
        prop_assert_eq!(once, twice);
    }
}

// ============================================================================
// Encoding
// ============================================================================

proptest! {
    /// Chunked encoding matches encoding the whole string at once, even when
    /// chunks split multi-byte characters.
    #[test]
    fn prop_encode_is_chunk_independent(
        text in "[ぁ-ん\n a-z]{0,60}",
        chunk in 1usize..8,
    ) {
        let mut chain = TransformChain::with_buffer_size(
            vec![Box::new(EncodeTransform::new(Encoding::ShiftJis).unwrap())],
            16,
        );
        let mut out = Vec::new();
        for piece in text.as_bytes().chunks(chunk) {
            chain.feed(piece, false, &mut out).unwrap();
        }
        chain.feed(&[], true, &mut out).unwrap();

        let (expected, _, had_errors) = encoding_rs::SHIFT_JIS.encode(&text);
        prop_assert!(!had_errors);
        prop_assert_eq!(out, expected.into_owned());
    }
}
