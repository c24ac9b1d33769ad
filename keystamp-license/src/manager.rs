//! Caller-owned entry point tying keys, fingerprints and storage together.

use std::fmt;
use std::path::Path;

use tracing::info;

use crate::device::{FingerprintSource, HostFingerprint};
use crate::error::{LicenseResult, Rejection};
use crate::issuer::issue_token;
use crate::payload::LicensePayload;
use crate::signature::{Ed25519Backend, SignatureBackend, SignatureEngine};
use crate::store::{FsLicenseStore, LicenseStore};
use crate::verifier::verify_token;

/// Issues and verifies licenses with its own keys and collaborators.
///
/// Independent managers share nothing, so tests and multi-tenant hosts can
/// run several side by side.
pub struct LicenseManager<B: SignatureBackend = Ed25519Backend> {
    engine: SignatureEngine<B>,
    fingerprint: Box<dyn FingerprintSource>,
    store: Box<dyn LicenseStore>,
}

impl LicenseManager<Ed25519Backend> {
    /// Creates an Ed25519 manager with the given collaborators and no keys.
    pub fn new(
        fingerprint: impl FingerprintSource + 'static,
        store: impl LicenseStore + 'static,
    ) -> Self {
        Self::with_backend(Ed25519Backend, fingerprint, store)
    }
}

impl Default for LicenseManager<Ed25519Backend> {
    /// Host fingerprint and a store under [`crate::DEFAULT_LICENSE_DIR`].
    fn default() -> Self {
        Self::new(HostFingerprint, FsLicenseStore::default())
    }
}

impl<B: SignatureBackend> fmt::Debug for LicenseManager<B> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LicenseManager")
            .field("engine", &self.engine)
            .finish_non_exhaustive()
    }
}

impl<B: SignatureBackend> LicenseManager<B> {
    /// Creates a manager over a custom signature backend.
    pub fn with_backend(
        backend: B,
        fingerprint: impl FingerprintSource + 'static,
        store: impl LicenseStore + 'static,
    ) -> Self {
        Self {
            engine: SignatureEngine::with_backend(backend),
            fingerprint: Box::new(fingerprint),
            store: Box::new(store),
        }
    }

    /// Returns the underlying signature engine.
    #[must_use]
    pub fn engine(&self) -> &SignatureEngine<B> {
        &self.engine
    }

    /// Loads a PEM private key, replacing the current one.
    pub fn load_private_key_pem(&self, pem: &str) -> LicenseResult<()> {
        self.engine.load_private_key_pem(pem)
    }

    /// Loads a PEM public key, replacing the current one.
    pub fn load_public_key_pem(&self, pem: &str) -> LicenseResult<()> {
        self.engine.load_public_key_pem(pem)
    }

    /// Loads a PEM private key from a file.
    pub fn load_private_key_file(&self, path: &Path) -> LicenseResult<()> {
        self.engine.load_private_key_file(path)
    }

    /// Loads a PEM public key from a file.
    pub fn load_public_key_file(&self, path: &Path) -> LicenseResult<()> {
        self.engine.load_public_key_file(path)
    }

    /// Returns the fingerprint of the current device.
    #[must_use]
    pub fn current_fingerprint(&self) -> String {
        self.fingerprint.current_fingerprint()
    }

    /// Issues a token for `payload`. See [`issue_token`].
    pub fn issue(&self, payload: &LicensePayload) -> LicenseResult<String> {
        issue_token(&self.engine, payload)
    }

    /// Verifies `token` for an explicit fingerprint and instant.
    pub fn verify(
        &self,
        token: &str,
        current_fingerprint: &str,
        now_ms: i64,
    ) -> Result<LicensePayload, Rejection> {
        verify_token(&self.engine, token, current_fingerprint, now_ms)
    }

    /// Verifies `token` for this device at the current time.
    pub fn verify_now(&self, token: &str) -> Result<LicensePayload, Rejection> {
        let fingerprint = self.current_fingerprint();
        self.verify(token, &fingerprint, now_millis())
    }

    /// Writes `token` to the store under `file_name`.
    pub fn save_license(&self, file_name: &str, token: &str) -> LicenseResult<()> {
        self.store.write_license(file_name, token.as_bytes())
    }

    /// Reads the token stored under `file_name` and verifies it now.
    ///
    /// Without an explicit `fingerprint` the configured source is asked.
    ///
    /// # Errors
    ///
    /// [`crate::LicenseError::NotFound`] or [`crate::LicenseError::Storage`]
    /// from the store, [`crate::LicenseError::Rejected`] if the token does not
    /// verify.
    pub fn load_and_verify(
        &self,
        file_name: &str,
        fingerprint: Option<&str>,
    ) -> LicenseResult<LicensePayload> {
        let fingerprint = match fingerprint {
            Some(fp) => fp.to_string(),
            None => self.current_fingerprint(),
        };
        self.load_and_verify_at(file_name, &fingerprint, now_millis())
    }

    /// Reads the token stored under `file_name` and verifies it for an
    /// explicit fingerprint and instant.
    ///
    /// # Errors
    ///
    /// As [`Self::load_and_verify`].
    pub fn load_and_verify_at(
        &self,
        file_name: &str,
        current_fingerprint: &str,
        now_ms: i64,
    ) -> LicenseResult<LicensePayload> {
        let bytes = self.store.read_license(file_name)?;
        let token = String::from_utf8(bytes).map_err(|_| {
            Rejection::MalformedToken("license file is not valid UTF-8".to_string())
        })?;

        let payload = self.verify(&token, current_fingerprint, now_ms)?;
        info!(file = file_name, "Stored license verified");
        Ok(payload)
    }
}

fn now_millis() -> i64 {
    chrono::Utc::now().timestamp_millis()
}
