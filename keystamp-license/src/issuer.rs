//! License issuance: encode, sign, pack.

use tracing::info;

use crate::error::{LicenseError, LicenseResult};
use crate::payload::LicensePayload;
use crate::signature::{SignatureBackend, SignatureEngine};
use crate::token;

/// Issues a signed token for `payload`.
///
/// # Errors
///
/// - [`LicenseError::InvalidWindow`] if `valid_start > valid_end`
/// - [`LicenseError::NoPrivateKeyLoaded`] if the engine has no private key
/// - [`LicenseError::SignatureFailure`] if signing fails
pub fn issue_token<B: SignatureBackend>(
    engine: &SignatureEngine<B>,
    payload: &LicensePayload,
) -> LicenseResult<String> {
    if payload.valid_start > payload.valid_end {
        return Err(LicenseError::InvalidWindow {
            start: payload.valid_start,
            end: payload.valid_end,
        });
    }

    let payload_bytes = payload.encode()?;
    let signature = engine.sign(&payload_bytes)?;
    let token = token::pack(&payload_bytes, &signature);

    info!(
        valid_start = payload.valid_start,
        valid_end = payload.valid_end,
        features = payload.allowed_features.len(),
        "License issued"
    );
    Ok(token)
}
