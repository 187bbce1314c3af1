use sqlx::Row;
use study_core::model::{DeviceId, LicenseKey, TestSummary};

use crate::repository::{LicenseRecord, StorageError, TestSummaryRow};

pub(crate) fn ser<E: core::fmt::Display>(e: E) -> StorageError {
    StorageError::Serialization(e.to_string())
}

fn u32_from_i64(field: &'static str, v: i64) -> Result<u32, StorageError> {
    u32::try_from(v).map_err(|_| StorageError::Serialization(format!("invalid {field}: {v}")))
}

fn u8_from_i64(field: &'static str, v: i64) -> Result<u8, StorageError> {
    u8::try_from(v).map_err(|_| StorageError::Serialization(format!("invalid {field}: {v}")))
}

pub(crate) fn map_license_row(row: &sqlx::sqlite::SqliteRow) -> Result<LicenseRecord, StorageError> {
    let key = LicenseKey::new(row.try_get::<String, _>("license_key").map_err(ser)?).map_err(ser)?;
    let device = row
        .try_get::<Option<String>, _>("device_id")
        .map_err(ser)?
        .map(DeviceId::new)
        .transpose()
        .map_err(ser)?;
    let activated_at = row.try_get("activated_at").map_err(ser)?;
    Ok(LicenseRecord {
        key,
        device,
        activated_at,
    })
}

pub(crate) fn map_summary_row(row: &sqlx::sqlite::SqliteRow) -> Result<TestSummary, StorageError> {
    let roll_no: String = row.try_get("roll_no").map_err(ser)?;
    let name: String = row.try_get("name").map_err(ser)?;
    let started_at = row.try_get("started_at").map_err(ser)?;
    let completed_at = row.try_get("completed_at").map_err(ser)?;
    let total = u32_from_i64("total", row.try_get::<i64, _>("total").map_err(ser)?)?;
    let correct = u32_from_i64("correct", row.try_get::<i64, _>("correct").map_err(ser)?)?;
    let incorrect = u32_from_i64("incorrect", row.try_get::<i64, _>("incorrect").map_err(ser)?)?;
    let score = u8_from_i64(
        "score_percentage",
        row.try_get::<i64, _>("score_percentage").map_err(ser)?,
    )?;
    let passed: bool = row.try_get("passed").map_err(ser)?;
    let timed_out: bool = row.try_get("timed_out").map_err(ser)?;

    TestSummary::from_persisted(
        roll_no,
        name,
        started_at,
        completed_at,
        total,
        correct,
        incorrect,
        score,
        passed,
        timed_out,
    )
    .map_err(ser)
}

pub(crate) fn map_summary_row_with_id(
    row: &sqlx::sqlite::SqliteRow,
) -> Result<TestSummaryRow, StorageError> {
    let id: i64 = row.try_get("id").map_err(ser)?;
    let summary = map_summary_row(row)?;
    Ok(TestSummaryRow::new(id, summary))
}
