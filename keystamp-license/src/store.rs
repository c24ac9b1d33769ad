//! Persistence of license tokens.

use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use tracing::{debug, info};

use crate::error::{LicenseError, LicenseResult};

/// Directory license files live in unless configured otherwise.
pub const DEFAULT_LICENSE_DIR: &str = "./license";

/// Reads and writes license files by name.
pub trait LicenseStore: Send + Sync {
    /// Returns the stored bytes for `name`.
    ///
    /// # Errors
    ///
    /// [`LicenseError::NotFound`] if nothing is stored under `name`.
    fn read_license(&self, name: &str) -> LicenseResult<Vec<u8>>;

    /// Stores `bytes` under `name`, replacing any previous content.
    fn write_license(&self, name: &str, bytes: &[u8]) -> LicenseResult<()>;
}

/// A [`LicenseStore`] backed by one directory on disk.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FsLicenseStore {
    dir: PathBuf,
}

impl Default for FsLicenseStore {
    fn default() -> Self {
        Self::new(DEFAULT_LICENSE_DIR)
    }
}

impl FsLicenseStore {
    /// Creates a store rooted at `dir`. The directory is created on first write.
    #[must_use]
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// Returns the root directory.
    #[must_use]
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Returns the full path for a license file name.
    #[must_use]
    pub fn path_for(&self, name: &str) -> PathBuf {
        self.dir.join(name)
    }
}

impl LicenseStore for FsLicenseStore {
    fn read_license(&self, name: &str) -> LicenseResult<Vec<u8>> {
        let path = self.path_for(name);
        debug!(path = %path.display(), "Reading license file");
        fs::read(&path).map_err(|e| match e.kind() {
            ErrorKind::NotFound => LicenseError::NotFound(path),
            _ => LicenseError::Storage(format!("failed to read {}: {e}", path.display())),
        })
    }

    fn write_license(&self, name: &str, bytes: &[u8]) -> LicenseResult<()> {
        fs::create_dir_all(&self.dir).map_err(|e| {
            LicenseError::Storage(format!(
                "failed to create directory {}: {e}",
                self.dir.display()
            ))
        })?;

        let path = self.path_for(name);
        fs::write(&path, bytes).map_err(|e| {
            LicenseError::Storage(format!("failed to write {}: {e}", path.display()))
        })?;

        info!(path = %path.display(), size_bytes = bytes.len(), "License file written");
        Ok(())
    }
}
