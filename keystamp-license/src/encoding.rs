//! Text-safe transport of raw bytes using the standard base64 alphabet.
//!
//! Encoding is canonical padded base64. Decoding is deliberately lenient: the
//! first character outside `A–Z a–z 0–9 + /` (padding and whitespace
//! included) ends the stream, and trailing bits that cannot complete a byte
//! are dropped. [`decode_canonical`] is the strict variant the token layer
//! uses, so one token text maps to one byte string.

use base64::{
    alphabet,
    engine::{
        general_purpose::{GeneralPurpose, GeneralPurposeConfig, STANDARD},
        DecodePaddingMode,
    },
    Engine,
};

/// Decoder for an alphabet-only prefix: padding optional, non-zero trailing
/// bits accepted.
const LENIENT: GeneralPurpose = GeneralPurpose::new(
    &alphabet::STANDARD,
    GeneralPurposeConfig::new()
        .with_decode_padding_mode(DecodePaddingMode::Indifferent)
        .with_decode_allow_trailing_bits(true),
);

/// Encodes bytes as padded standard base64.
#[must_use]
pub fn encode(bytes: &[u8]) -> String {
    STANDARD.encode(bytes)
}

/// Decodes the longest alphabet-only prefix of `text`.
///
/// Never fails; anything after the first non-alphabet character is ignored.
#[must_use]
pub fn decode(text: &str) -> Vec<u8> {
    let bytes = text.as_bytes();
    let mut end = bytes
        .iter()
        .position(|b| !is_alphabet(*b))
        .unwrap_or(bytes.len());

    // A lone trailing sextet carries fewer than 8 bits and yields no byte.
    if end % 4 == 1 {
        end -= 1;
    }

    // Only alphabet characters remain and the length is never 1 mod 4, which
    // the lenient engine always accepts.
    LENIENT.decode(&bytes[..end]).unwrap_or_else(|e| {
        debug_assert!(false, "alphabet-only input rejected: {e}");
        Vec::new()
    })
}

/// Decodes `text` only if it is the canonical encoding of the result.
///
/// The leading alphabet run of `text` plus any `=` directly after it must be
/// exactly what [`encode`] produces for the decoded bytes. Anything after that
/// run is ignored as in [`decode`]. Returns `None` for non-zero trailing bits,
/// a dangling sextet, or missing or extra padding.
#[must_use]
pub fn decode_canonical(text: &str) -> Option<Vec<u8>> {
    let bytes = text.as_bytes();
    let data_end = bytes
        .iter()
        .position(|b| !is_alphabet(*b))
        .unwrap_or(bytes.len());
    let padding = bytes[data_end..].iter().take_while(|b| **b == b'=').count();

    let decoded = decode(text);
    (encode(&decoded) == text[..data_end + padding]).then_some(decoded)
}

fn is_alphabet(b: u8) -> bool {
    b.is_ascii_alphanumeric() || b == b'+' || b == b'/'
}
