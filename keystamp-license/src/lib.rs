//! Signed, machine-bound software licenses.
//!
//! This crate handles:
//! - Binary encoding of license payloads (device binding, validity window, features)
//! - Signing payloads and packing them into portable text tokens
//! - Verifying tokens against a trusted public key
//! - Device binding and validity-window enforcement
//!
//! # Token Format
//!
//! Tokens are formatted as: `base64(payload)|base64(signature)` using the
//! standard padded alphabet. The signature covers the
//! raw payload bytes, not their base64 text.
//!
//! # Payload Format
//!
//! All integers are little-endian; every string is a `u32` length prefix
//! followed by that many bytes:
//!
//! ```text
//! [u32 fpLen][fingerprint][i64 validStart][i64 validEnd]
//! [u32 featureCount] ([u32 len][feature])*
//! ```
//!
//! # Verification
//!
//! A token passes through parse, signature check, payload decode, device
//! binding and the validity window, in that order. The first failing stage
//! ends the attempt with a [`Rejection`]; nothing from an unverified payload
//! is ever handed back.

mod device;
mod encoding;
mod error;
mod issuer;
mod manager;
mod payload;
mod signature;
mod store;
mod token;
mod verifier;

pub use device::{FingerprintSource, HostFingerprint, StaticFingerprint};
pub use encoding::{
    decode as decode_base64, decode_canonical as decode_base64_canonical,
    encode as encode_base64,
};
pub use error::{LicenseError, LicenseResult, Rejection};
pub use issuer::issue_token;
pub use manager::LicenseManager;
pub use payload::LicensePayload;
pub use signature::{
    Ed25519Backend, GeneratedKeyPair, SignatureBackend, SignatureEngine, ED25519_SIGNATURE_LEN,
};
pub use store::{FsLicenseStore, LicenseStore, DEFAULT_LICENSE_DIR};
pub use token::{pack, unpack, TOKEN_SEPARATOR};
pub use verifier::{verify_token, Stage};
