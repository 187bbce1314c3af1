use std::sync::Arc;

use log::{info, warn};
use rand::{Rng, rng};
use serde::{Deserialize, Serialize};

use study_core::Clock;
use study_core::model::{DeviceId, LicenseKey};
use storage::repository::{LicenseRepository, StorageError};

use crate::error::LicenseServiceError;

pub const MISSING_DATA: &str = "Missing data";
pub const INVALID_LICENSE: &str = "Invalid license";
pub const LICENSE_IN_USE: &str = "License already used on another device";

/// Activation request as sent by a client.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LicenseRequest {
    #[serde(default)]
    pub license_key: Option<String>,
    #[serde(default)]
    pub device_id: Option<String>,
}

impl LicenseRequest {
    #[must_use]
    pub fn new(license_key: impl Into<String>, device_id: impl Into<String>) -> Self {
        Self {
            license_key: Some(license_key.into()),
            device_id: Some(device_id.into()),
        }
    }
}

/// `valid` plus either a denial message or an activation token.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LicenseResponse {
    pub valid: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub token: Option<String>,
}

impl LicenseResponse {
    #[must_use]
    pub fn granted(token: impl Into<String>) -> Self {
        Self {
            valid: true,
            message: None,
            token: Some(token.into()),
        }
    }

    #[must_use]
    pub fn denied(message: impl Into<String>) -> Self {
        Self {
            valid: false,
            message: Some(message.into()),
            token: None,
        }
    }
}

/// Binds license keys to the first device that activates them.
///
/// No expiry and no revocation.
#[derive(Clone)]
pub struct LicenseService {
    clock: Clock,
    licenses: Arc<dyn LicenseRepository>,
}

impl LicenseService {
    #[must_use]
    pub fn new(licenses: Arc<dyn LicenseRepository>) -> Self {
        Self {
            clock: Clock::default(),
            licenses,
        }
    }

    #[must_use]
    pub fn with_clock(mut self, clock: Clock) -> Self {
        self.clock = clock;
        self
    }

    /// Add keys to the catalog of valid licenses.
    ///
    /// # Errors
    ///
    /// Returns `LicenseServiceError` for blank keys or storage failures.
    pub async fn register_keys<I, K>(&self, keys: I) -> Result<usize, LicenseServiceError>
    where
        I: IntoIterator<Item = K>,
        K: Into<String>,
    {
        let mut count = 0;
        for raw in keys {
            let key = LicenseKey::new(raw)?;
            self.licenses.register_key(&key).await?;
            count += 1;
        }
        Ok(count)
    }

    /// Check a key and bind it to the requesting device on first use.
    ///
    /// Denials are ordinary responses; only storage failures are errors.
    ///
    /// # Errors
    ///
    /// Returns `LicenseServiceError::Storage` if the repository fails.
    pub async fn activate(
        &self,
        request: LicenseRequest,
    ) -> Result<LicenseResponse, LicenseServiceError> {
        let key = request.license_key.and_then(|k| LicenseKey::new(k).ok());
        let device = request.device_id.and_then(|d| DeviceId::new(d).ok());
        let (Some(key), Some(device)) = (key, device) else {
            return Ok(LicenseResponse::denied(MISSING_DATA));
        };

        match self
            .licenses
            .bind_device(&key, &device, self.clock.now())
            .await
        {
            Ok(_) => {
                info!("license {key} active on device {device}");
                Ok(LicenseResponse::granted(activation_token()))
            }
            Err(StorageError::NotFound) => {
                warn!("unknown license key {key}");
                Ok(LicenseResponse::denied(INVALID_LICENSE))
            }
            Err(StorageError::Conflict) => {
                warn!("license {key} already bound to another device");
                Ok(LicenseResponse::denied(LICENSE_IN_USE))
            }
            Err(err) => Err(err.into()),
        }
    }
}

fn activation_token() -> String {
    format!("{:032x}", rng().random::<u128>())
}

#[cfg(test)]
mod tests {
    use super::*;
    use storage::repository::InMemoryRepository;
    use study_core::time::fixed_clock;

    async fn service() -> LicenseService {
        let service =
            LicenseService::new(Arc::new(InMemoryRepository::new())).with_clock(fixed_clock());
        service.register_keys(["A1B2C3D4E5F6"]).await.unwrap();
        service
    }

    #[tokio::test]
    async fn first_device_gets_a_token() {
        let service = service().await;
        let response = service
            .activate(LicenseRequest::new("A1B2C3D4E5F6", "laptop"))
            .await
            .unwrap();
        assert!(response.valid);
        assert_eq!(response.token.as_deref().map(str::len), Some(32));
        assert_eq!(response.message, None);

        let again = service
            .activate(LicenseRequest::new("A1B2C3D4E5F6", "laptop"))
            .await
            .unwrap();
        assert!(again.valid);
    }

    #[tokio::test]
    async fn second_device_is_refused() {
        let service = service().await;
        service
            .activate(LicenseRequest::new("A1B2C3D4E5F6", "laptop"))
            .await
            .unwrap();
        let response = service
            .activate(LicenseRequest::new("A1B2C3D4E5F6", "phone"))
            .await
            .unwrap();
        assert_eq!(response, LicenseResponse::denied(LICENSE_IN_USE));
    }

    #[tokio::test]
    async fn unknown_and_incomplete_requests_are_refused() {
        let service = service().await;
        let unknown = service
            .activate(LicenseRequest::new("ZZZ", "laptop"))
            .await
            .unwrap();
        assert_eq!(unknown, LicenseResponse::denied(INVALID_LICENSE));

        let missing = service
            .activate(LicenseRequest {
                license_key: Some("A1B2C3D4E5F6".into()),
                device_id: Some("  ".into()),
            })
            .await
            .unwrap();
        assert_eq!(missing, LicenseResponse::denied(MISSING_DATA));
    }

    #[test]
    fn request_uses_camel_case_fields() {
        let json = r#"{"licenseKey":"K","deviceId":"D"}"#;
        let request: LicenseRequest = serde_json::from_str(json).unwrap();
        assert_eq!(request, LicenseRequest::new("K", "D"));
    }
}
