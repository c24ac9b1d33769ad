//! Token verification.
//!
//! Each attempt walks the stages below in order and stops at the first
//! failure. The payload is only decoded once its signature has checked out,
//! and binding and window checks only ever see an authenticated payload.

use std::fmt;

use tracing::{debug, info, warn};

use crate::error::{LicenseError, Rejection};
use crate::payload::LicensePayload;
use crate::signature::{SignatureBackend, SignatureEngine};
use crate::token;

/// A verification stage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Stage {
    /// Splitting the token into payload and signature bytes.
    TokenParse,
    /// Checking the signature over the payload bytes.
    SignatureCheck,
    /// Decoding the signed payload.
    PayloadDecode,
    /// Comparing the bound fingerprint with the current one.
    BindingCheck,
    /// Checking the current time against the validity window.
    TemporalCheck,
}

impl Stage {
    /// Stable snake_case name.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::TokenParse => "token_parse",
            Self::SignatureCheck => "signature_check",
            Self::PayloadDecode => "payload_decode",
            Self::BindingCheck => "binding_check",
            Self::TemporalCheck => "temporal_check",
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Verifies `token` for the machine identified by `current_fingerprint` at
/// `now_ms` (ms since epoch).
///
/// # Errors
///
/// Returns the [`Rejection`] of the first stage that fails.
pub fn verify_token<B: SignatureBackend>(
    engine: &SignatureEngine<B>,
    token: &str,
    current_fingerprint: &str,
    now_ms: i64,
) -> Result<LicensePayload, Rejection> {
    match run_stages(engine, token, current_fingerprint, now_ms) {
        Ok(payload) => {
            info!(
                features = ?payload.allowed_features,
                valid_end = payload.valid_end,
                "License accepted"
            );
            Ok(payload)
        }
        Err(rejection) => {
            warn!(
                stage = %rejection.stage(),
                reason = rejection.kind(),
                "License rejected: {}",
                rejection
            );
            Err(rejection)
        }
    }
}

fn run_stages<B: SignatureBackend>(
    engine: &SignatureEngine<B>,
    token: &str,
    current_fingerprint: &str,
    now_ms: i64,
) -> Result<LicensePayload, Rejection> {
    let (payload_bytes, signature_bytes) = token::unpack(token).map_err(|e| match e {
        // The signature only covers one spelling of the payload bytes.
        LicenseError::NonCanonicalSegment(segment) => {
            debug!(segment, "Token segment is not canonically encoded");
            Rejection::InvalidSignature
        }
        other => Rejection::MalformedToken(detail(other)),
    })?;

    match engine.verify(&payload_bytes, &signature_bytes) {
        Ok(true) => {}
        Ok(false) => return Err(Rejection::InvalidSignature),
        Err(e) => {
            warn!(error = %e, "Signature could not be checked");
            return Err(Rejection::InvalidSignature);
        }
    }

    let payload = LicensePayload::decode(&payload_bytes)
        .map_err(|e| Rejection::MalformedPayload(detail(e)))?;

    check_binding(&payload, current_fingerprint)?;
    check_window(&payload, now_ms)?;

    Ok(payload)
}

/// Message of a codec error without its own variant prefix.
fn detail(err: LicenseError) -> String {
    match err {
        LicenseError::MalformedToken(msg) | LicenseError::MalformedPayload(msg) => msg,
        other => other.to_string(),
    }
}

fn check_binding(payload: &LicensePayload, current_fingerprint: &str) -> Result<(), Rejection> {
    if payload.device_fingerprint == current_fingerprint {
        Ok(())
    } else {
        Err(Rejection::DeviceMismatch)
    }
}

fn check_window(payload: &LicensePayload, now_ms: i64) -> Result<(), Rejection> {
    if now_ms < payload.valid_start {
        return Err(Rejection::NotYetValid {
            valid_start: payload.valid_start,
            now: now_ms,
        });
    }
    if now_ms > payload.valid_end {
        return Err(Rejection::Expired {
            valid_end: payload.valid_end,
            now: now_ms,
        });
    }
    Ok(())
}
