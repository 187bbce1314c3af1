use study_core::model::TestSummary;

use super::{
    SqliteRepository,
    mapping::{map_summary_row, map_summary_row_with_id},
};
use crate::repository::{StorageError, TestSummaryRepository, TestSummaryRow};

#[async_trait::async_trait]
impl TestSummaryRepository for SqliteRepository {
    async fn append_summary(&self, summary: &TestSummary) -> Result<i64, StorageError> {
        let res = sqlx::query(
            r"
                INSERT INTO test_summaries (
                    roll_no, name, started_at, completed_at, total,
                    correct, incorrect, score_percentage, passed, timed_out
                )
                VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)
            ",
        )
        .bind(summary.roll_no())
        .bind(summary.name())
        .bind(summary.started_at())
        .bind(summary.completed_at())
        .bind(i64::from(summary.total()))
        .bind(i64::from(summary.correct()))
        .bind(i64::from(summary.incorrect()))
        .bind(i64::from(summary.score_percentage()))
        .bind(summary.passed())
        .bind(summary.timed_out())
        .execute(&self.pool)
        .await
        .map_err(|e| StorageError::Connection(e.to_string()))?;

        Ok(res.last_insert_rowid())
    }

    async fn get_summary(&self, id: i64) -> Result<TestSummary, StorageError> {
        let row = sqlx::query(
            r"
                SELECT
                    roll_no, name, started_at, completed_at, total,
                    correct, incorrect, score_percentage, passed, timed_out
                FROM test_summaries
                WHERE id = ?1
            ",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| StorageError::Connection(e.to_string()))?
        .ok_or(StorageError::NotFound)?;

        map_summary_row(&row)
    }

    async fn list_summaries(
        &self,
        roll_no: Option<&str>,
        limit: u32,
    ) -> Result<Vec<TestSummaryRow>, StorageError> {
        let mut sql = String::from(
            r"
                SELECT
                    id, roll_no, name, started_at, completed_at, total,
                    correct, incorrect, score_percentage, passed, timed_out
                FROM test_summaries
            ",
        );

        let mut bind_index = 1;
        if roll_no.is_some() {
            sql.push_str(" WHERE roll_no = ?");
            sql.push_str(&bind_index.to_string());
            bind_index += 1;
        }
        sql.push_str(" ORDER BY completed_at DESC, id DESC");
        sql.push_str(" LIMIT ?");
        sql.push_str(&bind_index.to_string());

        let mut query = sqlx::query(&sql);
        if let Some(roll_no) = roll_no {
            query = query.bind(roll_no);
        }
        query = query.bind(i64::from(limit));

        let rows = query
            .fetch_all(&self.pool)
            .await
            .map_err(|e| StorageError::Connection(e.to_string()))?;

        let mut out = Vec::with_capacity(rows.len());
        for row in rows {
            out.push(map_summary_row_with_id(&row)?);
        }

        Ok(out)
    }
}
