use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum LicenseError {
    #[error("license key cannot be empty")]
    EmptyKey,

    #[error("device id cannot be empty")]
    EmptyDevice,
}

/// A license key as typed by the user.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct LicenseKey(String);

impl LicenseKey {
    /// # Errors
    ///
    /// Returns `LicenseError::EmptyKey` if the key is blank.
    pub fn new(raw: impl Into<String>) -> Result<Self, LicenseError> {
        let raw = raw.into().trim().to_owned();
        if raw.is_empty() {
            return Err(LicenseError::EmptyKey);
        }
        Ok(Self(raw))
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for LicenseKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Identifier of the device a license is bound to.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct DeviceId(String);

impl DeviceId {
    /// # Errors
    ///
    /// Returns `LicenseError::EmptyDevice` if the id is blank.
    pub fn new(raw: impl Into<String>) -> Result<Self, LicenseError> {
        let raw = raw.into().trim().to_owned();
        if raw.is_empty() {
            return Err(LicenseError::EmptyDevice);
        }
        Ok(Self(raw))
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for DeviceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn keys_are_trimmed_and_required() {
        assert_eq!(LicenseKey::new(" A1B2 ").unwrap().as_str(), "A1B2");
        assert_eq!(LicenseKey::new("   "), Err(LicenseError::EmptyKey));
        assert_eq!(DeviceId::new(""), Err(LicenseError::EmptyDevice));
    }
}
