//! Joining payload and signature bytes into a single token string.

use crate::encoding;
use crate::error::{LicenseError, LicenseResult};

/// Separator between the payload and signature segments.
///
/// Never produced by the base64 alphabet, so it cannot appear inside a segment.
pub const TOKEN_SEPARATOR: char = '|';

/// Packs payload and signature bytes into `base64(payload)|base64(signature)`.
#[must_use]
pub fn pack(payload: &[u8], signature: &[u8]) -> String {
    let payload_b64 = encoding::encode(payload);
    let signature_b64 = encoding::encode(signature);
    format!("{payload_b64}{TOKEN_SEPARATOR}{signature_b64}")
}

/// Splits a token into its payload and signature bytes.
///
/// Surrounding whitespace is trimmed first, so a token read from a file with a
/// trailing newline still unpacks. Each segment must be exactly what [`pack`]
/// would have written for its bytes.
///
/// # Errors
///
/// Returns [`LicenseError::MalformedToken`] unless the token has exactly two
/// `|`-separated segments, and [`LicenseError::NonCanonicalSegment`] if a
/// segment is an alternative spelling of its bytes.
pub fn unpack(token: &str) -> LicenseResult<(Vec<u8>, Vec<u8>)> {
    let token = token.trim();
    let parts: Vec<&str> = token.split(TOKEN_SEPARATOR).collect();
    if parts.len() != 2 {
        return Err(LicenseError::MalformedToken(format!(
            "expected 2 segments separated by '{TOKEN_SEPARATOR}', found {}",
            parts.len()
        )));
    }

    Ok((segment(parts[0], "payload")?, segment(parts[1], "signature")?))
}

fn segment(text: &str, name: &'static str) -> LicenseResult<Vec<u8>> {
    encoding::decode_canonical(text).ok_or(LicenseError::NonCanonicalSegment(name))
}
