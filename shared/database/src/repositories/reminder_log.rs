//! Reminder Log Repository
//!
//! Append-only. Nothing here updates or deletes a log row.

use anyhow::{Context, Result};
use chrono::{DateTime, NaiveDate, Utc};
use sqlx::{FromRow, PgPool};
use uuid::Uuid;

use vtrack_models::{local_day_bounds, ReminderChannel, ReminderLogEntry};

#[derive(Clone)]
pub struct ReminderLogRepository {
    pool: PgPool,
}

impl ReminderLogRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Whether a reminder on `channel` was logged for the document on the
    /// given local calendar day.
    pub async fn exists_on_day(
        &self,
        document_id: Uuid,
        channel: ReminderChannel,
        day: NaiveDate,
    ) -> Result<bool> {
        let (start, end) = local_day_bounds(day);

        let exists: bool = sqlx::query_scalar(
            r#"
            SELECT EXISTS (
                SELECT 1 FROM reminder_logs
                WHERE document_id = $1
                  AND reminder_type = $2
                  AND sent_at >= $3
                  AND sent_at < $4
            )
            "#,
        )
        .bind(document_id)
        .bind(channel.as_str())
        .bind(start)
        .bind(end)
        .fetch_one(&self.pool)
        .await
        .context("Failed to check reminder log")?;

        Ok(exists)
    }

    /// Insert all entries in one transaction: either every row lands or none.
    pub async fn insert_batch(&self, entries: &[ReminderLogEntry]) -> Result<u64> {
        let mut tx = self
            .pool
            .begin()
            .await
            .context("Failed to open reminder log transaction")?;

        let mut inserted = 0;
        for entry in entries {
            let result = sqlx::query(
                r#"
                INSERT INTO reminder_logs (id, document_id, reminder_type, sent_at, message)
                VALUES ($1, $2, $3, $4, $5)
                "#,
            )
            .bind(entry.id)
            .bind(entry.document_id)
            .bind(entry.channel.as_str())
            .bind(entry.sent_at)
            .bind(entry.message.as_deref())
            .execute(&mut *tx)
            .await
            .context("Failed to insert reminder log")?;
            inserted += result.rows_affected();
        }

        tx.commit()
            .await
            .context("Failed to commit reminder log transaction")?;

        Ok(inserted)
    }

    /// Reminder history of a document, newest first
    pub async fn find_by_document(&self, document_id: Uuid) -> Result<Vec<ReminderLogEntry>> {
        let rows: Vec<ReminderLogRow> = sqlx::query_as(
            r#"
            SELECT id, document_id, reminder_type, sent_at, message
            FROM reminder_logs
            WHERE document_id = $1
            ORDER BY sent_at DESC
            "#,
        )
        .bind(document_id)
        .fetch_all(&self.pool)
        .await
        .context("Failed to fetch reminder logs by document")?;

        rows.into_iter().map(ReminderLogEntry::try_from).collect()
    }
}

#[derive(Debug, FromRow)]
struct ReminderLogRow {
    id: Uuid,
    document_id: Uuid,
    reminder_type: String,
    sent_at: DateTime<Utc>,
    message: Option<String>,
}

impl TryFrom<ReminderLogRow> for ReminderLogEntry {
    type Error = anyhow::Error;

    fn try_from(row: ReminderLogRow) -> Result<Self> {
        Ok(Self {
            id: row.id,
            document_id: row.document_id,
            channel: row.reminder_type.parse()?,
            sent_at: row.sent_at,
            message: row.message,
        })
    }
}
