//! License payload and its binary encoding.
//!
//! The encoding is positional with no tags or padding, so encoding the same
//! payload twice always produces identical bytes. All integers are
//! little-endian regardless of host byte order.

use chrono::{DateTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{LicenseError, LicenseResult};

/// The signed unit of a license.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct LicensePayload {
    /// Fingerprint of the machine this license is bound to.
    pub device_fingerprint: String,
    /// Start of the validity window, ms since epoch (inclusive).
    pub valid_start: i64,
    /// End of the validity window, ms since epoch (inclusive).
    pub valid_end: i64,
    /// Granted features, in issuance order.
    pub allowed_features: Vec<String>,
}

impl LicensePayload {
    /// Creates a payload with no features.
    #[must_use]
    pub fn new(device_fingerprint: impl Into<String>, valid_start: i64, valid_end: i64) -> Self {
        Self {
            device_fingerprint: device_fingerprint.into(),
            valid_start,
            valid_end,
            allowed_features: Vec::new(),
        }
    }

    /// Appends a feature grant.
    #[must_use]
    pub fn with_feature(mut self, feature: impl Into<String>) -> Self {
        self.allowed_features.push(feature.into());
        self
    }

    /// Returns true if `feature` was granted.
    #[must_use]
    pub fn allows(&self, feature: &str) -> bool {
        self.allowed_features.iter().any(|f| f == feature)
    }

    /// Returns true if `now_ms` lies inside the validity window.
    #[must_use]
    pub fn contains_instant(&self, now_ms: i64) -> bool {
        self.valid_start <= now_ms && now_ms <= self.valid_end
    }

    /// Start of the window as a UTC timestamp, if representable.
    #[must_use]
    pub fn valid_from(&self) -> Option<DateTime<Utc>> {
        Utc.timestamp_millis_opt(self.valid_start).single()
    }

    /// End of the window as a UTC timestamp, if representable.
    #[must_use]
    pub fn valid_until(&self) -> Option<DateTime<Utc>> {
        Utc.timestamp_millis_opt(self.valid_end).single()
    }

    /// Serializes the payload.
    ///
    /// # Errors
    ///
    /// Returns [`LicenseError::MalformedPayload`] if a string or the feature
    /// list is longer than a `u32` length prefix can describe.
    pub fn encode(&self) -> LicenseResult<Vec<u8>> {
        let features_len: usize = self.allowed_features.iter().map(|f| 4 + f.len()).sum();
        let mut out = Vec::with_capacity(4 + self.device_fingerprint.len() + 16 + 4 + features_len);

        put_bytes(&mut out, self.device_fingerprint.as_bytes())?;
        out.extend_from_slice(&self.valid_start.to_le_bytes());
        out.extend_from_slice(&self.valid_end.to_le_bytes());
        out.extend_from_slice(&length_prefix(self.allowed_features.len())?.to_le_bytes());
        for feature in &self.allowed_features {
            put_bytes(&mut out, feature.as_bytes())?;
        }

        Ok(out)
    }

    /// Deserializes a payload.
    ///
    /// Bytes after the last feature are ignored.
    ///
    /// # Errors
    ///
    /// Returns [`LicenseError::MalformedPayload`] if the input is truncated, a
    /// length prefix runs past the end, or a string is not valid UTF-8.
    pub fn decode(bytes: &[u8]) -> LicenseResult<Self> {
        let mut reader = Reader::new(bytes);

        let device_fingerprint = reader.string("device fingerprint")?;
        let valid_start = reader.i64("valid start")?;
        let valid_end = reader.i64("valid end")?;
        let count = reader.u32("feature count")? as usize;

        // Every feature needs at least its 4-byte prefix.
        let mut allowed_features = Vec::with_capacity(count.min(reader.remaining() / 4));
        for index in 0..count {
            allowed_features.push(reader.string(&format!("feature {index}"))?);
        }

        Ok(Self {
            device_fingerprint,
            valid_start,
            valid_end,
            allowed_features,
        })
    }
}

fn length_prefix(len: usize) -> LicenseResult<u32> {
    u32::try_from(len)
        .map_err(|_| LicenseError::MalformedPayload(format!("length {len} exceeds u32 prefix")))
}

fn put_bytes(out: &mut Vec<u8>, bytes: &[u8]) -> LicenseResult<()> {
    out.extend_from_slice(&length_prefix(bytes.len())?.to_le_bytes());
    out.extend_from_slice(bytes);
    Ok(())
}

/// Bounds-checked cursor over payload bytes.
struct Reader<'a> {
    buf: &'a [u8],
    pos: usize,
}

impl<'a> Reader<'a> {
    fn new(buf: &'a [u8]) -> Self {
        Self { buf, pos: 0 }
    }

    fn remaining(&self) -> usize {
        self.buf.len() - self.pos
    }

    fn take(&mut self, len: usize, field: &str) -> LicenseResult<&'a [u8]> {
        if len > self.remaining() {
            return Err(LicenseError::MalformedPayload(format!(
                "{field}: need {len} bytes at offset {}, {} available",
                self.pos,
                self.remaining()
            )));
        }
        let slice = &self.buf[self.pos..self.pos + len];
        self.pos += len;
        Ok(slice)
    }

    fn array<const N: usize>(&mut self, field: &str) -> LicenseResult<[u8; N]> {
        let mut out = [0u8; N];
        out.copy_from_slice(self.take(N, field)?);
        Ok(out)
    }

    fn u32(&mut self, field: &str) -> LicenseResult<u32> {
        self.array::<4>(field).map(u32::from_le_bytes)
    }

    fn i64(&mut self, field: &str) -> LicenseResult<i64> {
        self.array::<8>(field).map(i64::from_le_bytes)
    }

    fn string(&mut self, field: &str) -> LicenseResult<String> {
        let len = self.u32(field)? as usize;
        let bytes = self.take(len, field)?;
        String::from_utf8(bytes.to_vec())
            .map_err(|e| LicenseError::MalformedPayload(format!("{field}: {e}")))
    }
}
