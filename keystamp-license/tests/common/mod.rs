//! Shared test helpers for license tests.

#![allow(dead_code)]

use ed25519_dalek::SigningKey;
use keystamp_license::{
    Ed25519Backend, FsLicenseStore, LicenseManager, LicensePayload, SignatureEngine,
    StaticFingerprint,
};

/// Returns a deterministic Ed25519 key pair from a fixed seed.
pub fn test_keypair() -> SigningKey {
    let seed: [u8; 32] = [
        1, 2, 3, 4, 5, 6, 7, 8, 9, 10, 11, 12, 13, 14, 15, 16, 17, 18, 19, 20, 21, 22, 23, 24,
        25, 26, 27, 28, 29, 30, 31, 32,
    ];
    SigningKey::from_bytes(&seed)
}

/// A second, unrelated key pair.
pub fn other_keypair() -> SigningKey {
    SigningKey::from_bytes(&[0xA5; 32])
}

/// Returns `(private_pem, public_pem)` for a signing key.
pub fn pem_pair(signing_key: &SigningKey) -> (String, String) {
    let pair = Ed25519Backend::keypair_pem(signing_key).unwrap();
    (pair.private_pem, pair.public_pem)
}

/// An engine with both halves of the test key pair loaded from PEM.
pub fn keyed_engine() -> SignatureEngine {
    let (private_pem, public_pem) = pem_pair(&test_keypair());
    let engine = SignatureEngine::new();
    engine.load_private_key_pem(&private_pem).unwrap();
    engine.load_public_key_pem(&public_pem).unwrap();
    engine
}

/// A manager bound to `fingerprint`, storing under `dir`, with test keys loaded.
pub fn keyed_manager(fingerprint: &str, dir: &std::path::Path) -> LicenseManager {
    let (private_pem, public_pem) = pem_pair(&test_keypair());
    let manager = LicenseManager::new(StaticFingerprint::new(fingerprint), FsLicenseStore::new(dir));
    manager.load_private_key_pem(&private_pem).unwrap();
    manager.load_public_key_pem(&public_pem).unwrap();
    manager
}

/// The reference payload used by end-to-end scenarios.
pub fn reference_payload() -> LicensePayload {
    LicensePayload::new("ABC123", 1_700_000_000_000, 1_800_000_000_000)
        .with_feature("pro")
        .with_feature("export")
}
