use chrono::{DateTime, Utc};
use study_core::model::{DeviceId, LicenseKey};

use super::{SqliteRepository, mapping::map_license_row};
use crate::repository::{LicenseRecord, LicenseRepository, StorageError};

impl SqliteRepository {
    async fn fetch_license(&self, key: &LicenseKey) -> Result<LicenseRecord, StorageError> {
        let row = sqlx::query(
            r"
                SELECT license_key, device_id, activated_at
                FROM licenses
                WHERE license_key = ?1
            ",
        )
        .bind(key.as_str())
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| StorageError::Connection(e.to_string()))?
        .ok_or(StorageError::NotFound)?;

        map_license_row(&row)
    }
}

#[async_trait::async_trait]
impl LicenseRepository for SqliteRepository {
    async fn register_key(&self, key: &LicenseKey) -> Result<(), StorageError> {
        sqlx::query(
            r"
                INSERT INTO licenses (license_key)
                VALUES (?1)
                ON CONFLICT(license_key) DO NOTHING
            ",
        )
        .bind(key.as_str())
        .execute(&self.pool)
        .await
        .map_err(|e| StorageError::Connection(e.to_string()))?;
        Ok(())
    }

    async fn get_license(&self, key: &LicenseKey) -> Result<LicenseRecord, StorageError> {
        self.fetch_license(key).await
    }

    async fn bind_device(
        &self,
        key: &LicenseKey,
        device: &DeviceId,
        at: DateTime<Utc>,
    ) -> Result<LicenseRecord, StorageError> {
        // Only an unbound key is updated, so two racing activations cannot both win.
        sqlx::query(
            r"
                UPDATE licenses
                SET device_id = ?2, activated_at = ?3
                WHERE license_key = ?1 AND device_id IS NULL
            ",
        )
        .bind(key.as_str())
        .bind(device.as_str())
        .bind(at)
        .execute(&self.pool)
        .await
        .map_err(|e| StorageError::Connection(e.to_string()))?;

        let record = self.fetch_license(key).await?;
        if record.is_bound_to(device) {
            Ok(record)
        } else {
            Err(StorageError::Conflict)
        }
    }
}
