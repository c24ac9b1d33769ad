//! Error types for the licensing module.

use std::path::PathBuf;

use thiserror::Error;

use crate::verifier::Stage;

/// Licensing-specific errors.
#[derive(Debug, Error)]
pub enum LicenseError {
    /// Signing was requested before a private key was loaded.
    #[error("no private key loaded")]
    NoPrivateKeyLoaded,

    /// Verification was requested before a public key was loaded.
    #[error("no public key loaded")]
    NoPublicKeyLoaded,

    /// The signature backend failed to produce a signature.
    #[error("signature generation failed: {0}")]
    SignatureFailure(String),

    /// PEM key material could not be parsed.
    #[error("invalid key material: {0}")]
    InvalidKeyMaterial(String),

    /// Token does not have exactly two segments.
    #[error("malformed license token: {0}")]
    MalformedToken(String),

    /// A token segment is not the canonical encoding of its bytes.
    #[error("non-canonical {0} segment")]
    NonCanonicalSegment(&'static str),

    /// Payload bytes are truncated or otherwise undecodable.
    #[error("malformed license payload: {0}")]
    MalformedPayload(String),

    /// Issuance was asked to sign a window that ends before it starts.
    #[error("invalid validity window: start {start} is after end {end}")]
    InvalidWindow {
        /// Requested start, ms since epoch.
        start: i64,
        /// Requested end, ms since epoch.
        end: i64,
    },

    /// License file does not exist.
    #[error("license file not found: {}", .0.display())]
    NotFound(PathBuf),

    /// Storage error.
    #[error("storage error: {0}")]
    Storage(String),

    /// I/O error while reading key material.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// A token was read successfully but did not verify.
    #[error(transparent)]
    Rejected(#[from] Rejection),
}

/// Result type for license operations.
pub type LicenseResult<T> = Result<T, LicenseError>;

/// Terminal reason a verification attempt did not accept a token.
///
/// A rejection never carries payload data, so nothing unauthenticated can leak
/// through it.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Rejection {
    /// Token structure is wrong.
    #[error("license token is malformed: {0}")]
    MalformedToken(String),

    /// Signature did not match, or no verification key was available.
    #[error("license signature invalid")]
    InvalidSignature,

    /// Signed payload could not be decoded.
    #[error("license payload is malformed: {0}")]
    MalformedPayload(String),

    /// License is bound to a different device.
    #[error("license is bound to a different device")]
    DeviceMismatch,

    /// Verification time precedes the validity window.
    #[error("license not valid until {valid_start} (now {now})")]
    NotYetValid {
        /// Window start, ms since epoch.
        valid_start: i64,
        /// Instant checked, ms since epoch.
        now: i64,
    },

    /// Verification time is past the validity window.
    #[error("license expired at {valid_end} (now {now})")]
    Expired {
        /// Window end, ms since epoch.
        valid_end: i64,
        /// Instant checked, ms since epoch.
        now: i64,
    },
}

impl Rejection {
    /// Stable snake_case label, used as a structured log field.
    #[must_use]
    pub fn kind(&self) -> &'static str {
        match self {
            Self::MalformedToken(_) => "malformed_token",
            Self::InvalidSignature => "invalid_signature",
            Self::MalformedPayload(_) => "malformed_payload",
            Self::DeviceMismatch => "device_mismatch",
            Self::NotYetValid { .. } => "not_yet_valid",
            Self::Expired { .. } => "expired",
        }
    }

    /// Verification stage that produced this rejection.
    #[must_use]
    pub fn stage(&self) -> Stage {
        match self {
            Self::MalformedToken(_) => Stage::TokenParse,
            Self::InvalidSignature => Stage::SignatureCheck,
            Self::MalformedPayload(_) => Stage::PayloadDecode,
            Self::DeviceMismatch => Stage::BindingCheck,
            Self::NotYetValid { .. } | Self::Expired { .. } => Stage::TemporalCheck,
        }
    }
}
