use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::BTreeMap;
use std::sync::{Arc, Mutex};
use thiserror::Error;

use study_core::model::{DeviceId, LicenseKey, TestSummary};

/// Errors surfaced by storage adapters.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum StorageError {
    #[error("not found")]
    NotFound,

    #[error("conflict")]
    Conflict,

    #[error("connection error: {0}")]
    Connection(String),

    #[error("serialization error: {0}")]
    Serialization(String),
}

//
// ─── LICENSES ──────────────────────────────────────────────────────────────────
//

/// A known license key and, once activated, the device it is bound to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LicenseRecord {
    pub key: LicenseKey,
    pub device: Option<DeviceId>,
    pub activated_at: Option<DateTime<Utc>>,
}

impl LicenseRecord {
    #[must_use]
    pub fn unbound(key: LicenseKey) -> Self {
        Self {
            key,
            device: None,
            activated_at: None,
        }
    }

    #[must_use]
    pub fn is_bound_to(&self, device: &DeviceId) -> bool {
        self.device.as_ref() == Some(device)
    }
}

#[async_trait]
pub trait LicenseRepository: Send + Sync {
    /// Add a key to the catalog. Registering an existing key is a no-op.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the key cannot be stored.
    async fn register_key(&self, key: &LicenseKey) -> Result<(), StorageError>;

    /// Fetch a license by key.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::NotFound` if the key was never registered.
    async fn get_license(&self, key: &LicenseKey) -> Result<LicenseRecord, StorageError>;

    /// Bind a key to a device on first activation.
    ///
    /// Re-binding to the same device returns the existing record unchanged.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::NotFound` for unknown keys and
    /// `StorageError::Conflict` if the key is bound to a different device.
    async fn bind_device(
        &self,
        key: &LicenseKey,
        device: &DeviceId,
        at: DateTime<Utc>,
    ) -> Result<LicenseRecord, StorageError>;
}

//
// ─── TEST SUMMARIES ────────────────────────────────────────────────────────────
//

/// Stored summary with its row id.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TestSummaryRow {
    pub id: i64,
    pub summary: TestSummary,
}

impl TestSummaryRow {
    #[must_use]
    pub fn new(id: i64, summary: TestSummary) -> Self {
        Self { id, summary }
    }
}

#[async_trait]
pub trait TestSummaryRepository: Send + Sync {
    /// Persist a summary and return its id.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the summary cannot be stored.
    async fn append_summary(&self, summary: &TestSummary) -> Result<i64, StorageError>;

    /// # Errors
    ///
    /// Returns `StorageError::NotFound` if missing, or other storage errors.
    async fn get_summary(&self, id: i64) -> Result<TestSummary, StorageError>;

    /// Most recent summaries first, optionally for one roll number.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` on query or mapping failures.
    async fn list_summaries(
        &self,
        roll_no: Option<&str>,
        limit: u32,
    ) -> Result<Vec<TestSummaryRow>, StorageError>;
}

//
// ─── IN-MEMORY ─────────────────────────────────────────────────────────────────
//

/// Simple in-memory repository implementation for testing and prototyping.
#[derive(Clone, Default)]
pub struct InMemoryRepository {
    licenses: Arc<Mutex<BTreeMap<LicenseKey, LicenseRecord>>>,
    summaries: Arc<Mutex<Vec<TestSummary>>>,
}

impl InMemoryRepository {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl LicenseRepository for InMemoryRepository {
    async fn register_key(&self, key: &LicenseKey) -> Result<(), StorageError> {
        let mut guard = self
            .licenses
            .lock()
            .map_err(|e| StorageError::Connection(e.to_string()))?;
        guard
            .entry(key.clone())
            .or_insert_with(|| LicenseRecord::unbound(key.clone()));
        Ok(())
    }

    async fn get_license(&self, key: &LicenseKey) -> Result<LicenseRecord, StorageError> {
        let guard = self
            .licenses
            .lock()
            .map_err(|e| StorageError::Connection(e.to_string()))?;
        guard.get(key).cloned().ok_or(StorageError::NotFound)
    }

    async fn bind_device(
        &self,
        key: &LicenseKey,
        device: &DeviceId,
        at: DateTime<Utc>,
    ) -> Result<LicenseRecord, StorageError> {
        let mut guard = self
            .licenses
            .lock()
            .map_err(|e| StorageError::Connection(e.to_string()))?;
        let record = guard.get_mut(key).ok_or(StorageError::NotFound)?;
        match &record.device {
            Some(bound) if bound == device => {}
            Some(_) => return Err(StorageError::Conflict),
            None => {
                record.device = Some(device.clone());
                record.activated_at = Some(at);
            }
        }
        Ok(record.clone())
    }
}

#[async_trait]
impl TestSummaryRepository for InMemoryRepository {
    async fn append_summary(&self, summary: &TestSummary) -> Result<i64, StorageError> {
        let mut guard = self
            .summaries
            .lock()
            .map_err(|e| StorageError::Connection(e.to_string()))?;
        guard.push(summary.clone());
        i64::try_from(guard.len()).map_err(|_| StorageError::Serialization("id overflow".into()))
    }

    async fn get_summary(&self, id: i64) -> Result<TestSummary, StorageError> {
        let guard = self
            .summaries
            .lock()
            .map_err(|e| StorageError::Connection(e.to_string()))?;
        usize::try_from(id)
            .ok()
            .and_then(|i| i.checked_sub(1))
            .and_then(|i| guard.get(i))
            .cloned()
            .ok_or(StorageError::NotFound)
    }

    async fn list_summaries(
        &self,
        roll_no: Option<&str>,
        limit: u32,
    ) -> Result<Vec<TestSummaryRow>, StorageError> {
        let guard = self
            .summaries
            .lock()
            .map_err(|e| StorageError::Connection(e.to_string()))?;
        let limit = usize::try_from(limit).unwrap_or(usize::MAX);
        guard
            .iter()
            .enumerate()
            .rev()
            .filter(|(_, summary)| roll_no.is_none_or(|r| r == summary.roll_no()))
            .take(limit)
            .map(|(i, summary)| {
                let id = i64::try_from(i + 1)
                    .map_err(|_| StorageError::Serialization("id overflow".into()))?;
                Ok(TestSummaryRow::new(id, summary.clone()))
            })
            .collect()
    }
}

/// Aggregates repositories behind trait objects for easy backend swapping.
#[derive(Clone)]
pub struct Storage {
    pub licenses: Arc<dyn LicenseRepository>,
    pub summaries: Arc<dyn TestSummaryRepository>,
}

impl Storage {
    #[must_use]
    pub fn in_memory() -> Self {
        let repo = InMemoryRepository::new();
        let licenses: Arc<dyn LicenseRepository> = Arc::new(repo.clone());
        let summaries: Arc<dyn TestSummaryRepository> = Arc::new(repo);
        Self {
            licenses,
            summaries,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use study_core::time::fixed_now;

    fn key(raw: &str) -> LicenseKey {
        LicenseKey::new(raw).unwrap()
    }

    fn device(raw: &str) -> DeviceId {
        DeviceId::new(raw).unwrap()
    }

    fn summary(roll_no: &str, correct: u32) -> TestSummary {
        let now = fixed_now();
        TestSummary::from_persisted(roll_no, "Student", now, now, 5, correct, 0, 0, false, false)
            .unwrap()
    }

    #[tokio::test]
    async fn first_device_wins_the_key() {
        let repo = InMemoryRepository::new();
        repo.register_key(&key("A1B2C3D4E5F6")).await.unwrap();

        let bound = repo
            .bind_device(&key("A1B2C3D4E5F6"), &device("laptop"), fixed_now())
            .await
            .unwrap();
        assert!(bound.is_bound_to(&device("laptop")));

        let again = repo
            .bind_device(&key("A1B2C3D4E5F6"), &device("laptop"), fixed_now())
            .await
            .unwrap();
        assert_eq!(again, bound);

        let err = repo
            .bind_device(&key("A1B2C3D4E5F6"), &device("phone"), fixed_now())
            .await
            .unwrap_err();
        assert!(matches!(err, StorageError::Conflict));
    }

    #[tokio::test]
    async fn unknown_key_is_not_found() {
        let repo = InMemoryRepository::new();
        let err = repo
            .bind_device(&key("NOPE"), &device("laptop"), fixed_now())
            .await
            .unwrap_err();
        assert!(matches!(err, StorageError::NotFound));
    }

    #[tokio::test]
    async fn lists_latest_summaries_first() {
        let repo = InMemoryRepository::new();
        repo.append_summary(&summary("7", 1)).await.unwrap();
        repo.append_summary(&summary("8", 2)).await.unwrap();
        let id = repo.append_summary(&summary("7", 3)).await.unwrap();

        let rows = repo.list_summaries(Some("7"), 10).await.unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].id, id);
        assert_eq!(rows[0].summary.correct(), 3);

        let fetched = repo.get_summary(2).await.unwrap();
        assert_eq!(fetched.roll_no(), "8");

        assert!(repo.list_summaries(None, 0).await.unwrap().is_empty());
        assert_eq!(repo.list_summaries(None, 1).await.unwrap()[0].id, id);
    }
}
