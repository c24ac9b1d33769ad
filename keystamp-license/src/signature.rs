//! Signing and verification over payload bytes.
//!
//! [`SignatureEngine`] owns at most one private and one public key. The
//! asymmetric primitive itself sits behind [`SignatureBackend`]; the shipped
//! backend is Ed25519 with PKCS#8 / SPKI PEM key material.

use std::fmt;
use std::path::Path;
use std::sync::{Arc, PoisonError, RwLock};

use ed25519_dalek::pkcs8::spki::der::pem::LineEnding;
use ed25519_dalek::pkcs8::{DecodePrivateKey, DecodePublicKey, EncodePrivateKey, EncodePublicKey};
use ed25519_dalek::{Signature, Signer, SigningKey, VerifyingKey};
use tracing::{debug, info};

use crate::error::{LicenseError, LicenseResult};

/// Length of an Ed25519 signature in bytes.
pub const ED25519_SIGNATURE_LEN: usize = 64;

/// An asymmetric signature primitive.
pub trait SignatureBackend {
    /// Parsed private key.
    type PrivateKey;
    /// Parsed public key.
    type PublicKey;

    /// Parses a PEM-encoded private key.
    fn parse_private_pem(&self, pem: &str) -> LicenseResult<Self::PrivateKey>;

    /// Parses a PEM-encoded public key.
    fn parse_public_pem(&self, pem: &str) -> LicenseResult<Self::PublicKey>;

    /// Signs `data`. Failures map to [`LicenseError::SignatureFailure`].
    fn sign(&self, key: &Self::PrivateKey, data: &[u8]) -> LicenseResult<Vec<u8>>;

    /// Returns true if `signature` is valid for `data` under `key`.
    fn verify(&self, key: &Self::PublicKey, data: &[u8], signature: &[u8]) -> bool;
}

/// Ed25519 via `ed25519-dalek`.
#[derive(Debug, Clone, Copy, Default)]
pub struct Ed25519Backend;

/// A freshly generated key pair in PEM form.
#[derive(Clone)]
pub struct GeneratedKeyPair {
    /// PKCS#8 private key.
    pub private_pem: String,
    /// SPKI public key.
    pub public_pem: String,
}

impl fmt::Debug for GeneratedKeyPair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GeneratedKeyPair")
            .field("private_pem", &"[REDACTED]")
            .field("public_pem", &self.public_pem)
            .finish()
    }
}

impl Ed25519Backend {
    /// Generates a new key pair from the OS random source.
    ///
    /// # Errors
    ///
    /// Returns [`LicenseError::InvalidKeyMaterial`] if PEM encoding fails.
    pub fn generate_keypair_pem() -> LicenseResult<GeneratedKeyPair> {
        let signing_key = SigningKey::generate(&mut rand::rngs::OsRng);
        Self::keypair_pem(&signing_key)
    }

    /// Encodes an existing signing key and its verifying key as PEM.
    ///
    /// # Errors
    ///
    /// Returns [`LicenseError::InvalidKeyMaterial`] if PEM encoding fails.
    pub fn keypair_pem(signing_key: &SigningKey) -> LicenseResult<GeneratedKeyPair> {
        let private_pem = signing_key
            .to_pkcs8_pem(LineEnding::LF)
            .map_err(|e| LicenseError::InvalidKeyMaterial(format!("private key encoding: {e}")))?;
        let public_pem = signing_key
            .verifying_key()
            .to_public_key_pem(LineEnding::LF)
            .map_err(|e| LicenseError::InvalidKeyMaterial(format!("public key encoding: {e}")))?;

        Ok(GeneratedKeyPair {
            private_pem: private_pem.to_string(),
            public_pem,
        })
    }
}

impl SignatureBackend for Ed25519Backend {
    type PrivateKey = SigningKey;
    type PublicKey = VerifyingKey;

    fn parse_private_pem(&self, pem: &str) -> LicenseResult<SigningKey> {
        SigningKey::from_pkcs8_pem(pem)
            .map_err(|e| LicenseError::InvalidKeyMaterial(format!("private key: {e}")))
    }

    fn parse_public_pem(&self, pem: &str) -> LicenseResult<VerifyingKey> {
        VerifyingKey::from_public_key_pem(pem)
            .map_err(|e| LicenseError::InvalidKeyMaterial(format!("public key: {e}")))
    }

    fn sign(&self, key: &SigningKey, data: &[u8]) -> LicenseResult<Vec<u8>> {
        key.try_sign(data)
            .map(|sig| sig.to_bytes().to_vec())
            .map_err(|e| LicenseError::SignatureFailure(e.to_string()))
    }

    fn verify(&self, key: &VerifyingKey, data: &[u8], signature: &[u8]) -> bool {
        let Ok(signature) = Signature::from_slice(signature) else {
            return false;
        };
        key.verify_strict(data, &signature).is_ok()
    }
}

/// Key slots plus sign/verify over a [`SignatureBackend`].
///
/// Loading a key swaps it in whole under a write lock. Sign and verify take a
/// reference-counted handle under the read lock, so each call works with
/// exactly one key, either the one before a reload or the one after it.
pub struct SignatureEngine<B: SignatureBackend = Ed25519Backend> {
    backend: B,
    private_key: RwLock<Option<Arc<B::PrivateKey>>>,
    public_key: RwLock<Option<Arc<B::PublicKey>>>,
}

impl SignatureEngine<Ed25519Backend> {
    /// Creates an Ed25519 engine with no keys loaded.
    #[must_use]
    pub fn new() -> Self {
        Self::with_backend(Ed25519Backend)
    }
}

impl Default for SignatureEngine<Ed25519Backend> {
    fn default() -> Self {
        Self::new()
    }
}

impl<B: SignatureBackend> fmt::Debug for SignatureEngine<B> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SignatureEngine")
            .field("has_private_key", &self.has_private_key())
            .field("has_public_key", &self.has_public_key())
            .finish()
    }
}

impl<B: SignatureBackend> SignatureEngine<B> {
    /// Creates an engine over a custom backend with no keys loaded.
    pub fn with_backend(backend: B) -> Self {
        Self {
            backend,
            private_key: RwLock::new(None),
            public_key: RwLock::new(None),
        }
    }

    /// Parses and installs a private key, replacing any previous one.
    ///
    /// On a parse failure the previous key stays installed.
    pub fn load_private_key_pem(&self, pem: &str) -> LicenseResult<()> {
        let key = self.backend.parse_private_pem(pem)?;
        self.install_private_key(key);
        info!("Private key loaded");
        Ok(())
    }

    /// Parses and installs a public key, replacing any previous one.
    ///
    /// On a parse failure the previous key stays installed.
    pub fn load_public_key_pem(&self, pem: &str) -> LicenseResult<()> {
        let key = self.backend.parse_public_pem(pem)?;
        self.install_public_key(key);
        info!("Public key loaded");
        Ok(())
    }

    /// Reads a PEM private key from disk and installs it.
    pub fn load_private_key_file(&self, path: &Path) -> LicenseResult<()> {
        debug!(path = %path.display(), "Reading private key file");
        let pem = std::fs::read_to_string(path)?;
        self.load_private_key_pem(&pem)
    }

    /// Reads a PEM public key from disk and installs it.
    pub fn load_public_key_file(&self, path: &Path) -> LicenseResult<()> {
        debug!(path = %path.display(), "Reading public key file");
        let pem = std::fs::read_to_string(path)?;
        self.load_public_key_pem(&pem)
    }

    /// Installs an already parsed private key.
    pub fn install_private_key(&self, key: B::PrivateKey) {
        replace_slot(&self.private_key, key);
    }

    /// Installs an already parsed public key.
    pub fn install_public_key(&self, key: B::PublicKey) {
        replace_slot(&self.public_key, key);
    }

    /// Returns true if a private key is installed.
    #[must_use]
    pub fn has_private_key(&self) -> bool {
        read_slot(&self.private_key).is_some()
    }

    /// Returns true if a public key is installed.
    #[must_use]
    pub fn has_public_key(&self) -> bool {
        read_slot(&self.public_key).is_some()
    }

    /// Signs `data` with the installed private key.
    ///
    /// # Errors
    ///
    /// [`LicenseError::NoPrivateKeyLoaded`] without a key,
    /// [`LicenseError::SignatureFailure`] if the backend fails.
    pub fn sign(&self, data: &[u8]) -> LicenseResult<Vec<u8>> {
        let key = read_slot(&self.private_key).ok_or(LicenseError::NoPrivateKeyLoaded)?;
        let signature = self.backend.sign(&key, data)?;
        debug!(data_len = data.len(), signature_len = signature.len(), "Payload signed");
        Ok(signature)
    }

    /// Checks `signature` over `data` with the installed public key.
    ///
    /// A mismatch is `Ok(false)`, not an error.
    ///
    /// # Errors
    ///
    /// [`LicenseError::NoPublicKeyLoaded`] without a key.
    pub fn verify(&self, data: &[u8], signature: &[u8]) -> LicenseResult<bool> {
        let key = read_slot(&self.public_key).ok_or(LicenseError::NoPublicKeyLoaded)?;
        Ok(self.backend.verify(&key, data, signature))
    }
}

// A slot only ever holds a complete value, so a poisoned lock is still usable.
fn read_slot<K>(slot: &RwLock<Option<Arc<K>>>) -> Option<Arc<K>> {
    slot.read().unwrap_or_else(PoisonError::into_inner).clone()
}

fn replace_slot<K>(slot: &RwLock<Option<Arc<K>>>, key: K) {
    let previous = {
        let mut guard = slot.write().unwrap_or_else(PoisonError::into_inner);
        guard.replace(Arc::new(key))
    };
    drop(previous);
}
