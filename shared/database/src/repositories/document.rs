//! Document Repository
//!
//! Read side of compliance documents as needed by reminders and summaries.
//!
//! Rows whose `doc_type` or `status` no longer maps onto the model are
//! skipped with a warning, so one bad row never hides a user's other
//! documents.

use anyhow::{Context, Result};
use chrono::{DateTime, NaiveDate, Utc};
use sqlx::{FromRow, PgPool};
use tracing::warn;
use uuid::Uuid;

use vtrack_models::{Document, ReminderCandidate};

const DOCUMENT_COLUMNS: &str = r#"
    d.id, d.vehicle_id, d.doc_type, d.doc_number, d.issuer, d.issue_date,
    d.expiry_date, d.file_path, d.file_type, d.ocr_extracted_date,
    d.reminder_days, d.status, d.notes, d.created_at, d.updated_at
"#;

#[derive(Clone)]
pub struct DocumentRepository {
    pool: PgPool,
}

impl DocumentRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Find document by ID
    pub async fn find_by_id(&self, id: Uuid) -> Result<Option<Document>> {
        let query = format!("SELECT {} FROM documents d WHERE d.id = $1", DOCUMENT_COLUMNS);
        let row: Option<DocumentRow> = sqlx::query_as(&query)
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .context("Failed to fetch document by ID")?;

        row.map(Document::try_from).transpose()
    }

    /// Active, dated documents on a user's active vehicles, soonest expiry
    /// first, each paired with its vehicle's registration number.
    pub async fn find_reminder_candidates(&self, user_id: Uuid) -> Result<Vec<ReminderCandidate>> {
        let query = format!(
            r#"
            SELECT {}, v.registration_number
            FROM documents d
            JOIN vehicles v ON v.id = d.vehicle_id
            WHERE v.user_id = $1
              AND v.is_active = TRUE
              AND d.status = 'active'
              AND d.expiry_date IS NOT NULL
            ORDER BY d.expiry_date ASC
            "#,
            DOCUMENT_COLUMNS
        );
        let rows: Vec<CandidateRow> = sqlx::query_as(&query)
            .bind(user_id)
            .fetch_all(&self.pool)
            .await
            .context("Failed to fetch reminder candidates")?;

        Ok(candidates_from_rows(rows))
    }

    /// Active, dated documents on a user's active vehicles, soonest expiry
    /// first. Feeds the expiry summary.
    pub async fn find_active_with_expiry_by_user(&self, user_id: Uuid) -> Result<Vec<Document>> {
        let query = format!(
            r#"
            SELECT {}
            FROM documents d
            JOIN vehicles v ON v.id = d.vehicle_id
            WHERE v.user_id = $1
              AND v.is_active = TRUE
              AND d.status = 'active'
              AND d.expiry_date IS NOT NULL
            ORDER BY d.expiry_date ASC
            "#,
            DOCUMENT_COLUMNS
        );
        let rows: Vec<DocumentRow> = sqlx::query_as(&query)
            .bind(user_id)
            .fetch_all(&self.pool)
            .await
            .context("Failed to fetch dated documents for user")?;

        Ok(rows.into_iter().filter_map(readable_document).collect())
    }
}

fn readable_document(row: DocumentRow) -> Option<Document> {
    let id = row.id;
    match Document::try_from(row) {
        Ok(document) => Some(document),
        Err(e) => {
            warn!(document_id = %id, error = %e, "Skipping unreadable document row");
            None
        }
    }
}

fn candidates_from_rows(rows: Vec<CandidateRow>) -> Vec<ReminderCandidate> {
    rows.into_iter()
        .filter_map(|row| {
            readable_document(row.document)
                .map(|document| ReminderCandidate::new(document, row.registration_number))
        })
        .collect()
}

#[derive(Debug, FromRow)]
struct DocumentRow {
    id: Uuid,
    vehicle_id: Uuid,
    doc_type: String,
    doc_number: Option<String>,
    issuer: Option<String>,
    issue_date: Option<NaiveDate>,
    expiry_date: Option<NaiveDate>,
    file_path: Option<String>,
    file_type: Option<String>,
    ocr_extracted_date: Option<String>,
    reminder_days: i32,
    status: String,
    notes: Option<String>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

#[derive(Debug, FromRow)]
struct CandidateRow {
    #[sqlx(flatten)]
    document: DocumentRow,
    registration_number: String,
}

impl TryFrom<DocumentRow> for Document {
    type Error = anyhow::Error;

    fn try_from(row: DocumentRow) -> Result<Self> {
        Ok(Self {
            id: row.id,
            vehicle_id: row.vehicle_id,
            doc_type: row.doc_type.parse()?,
            doc_number: row.doc_number,
            issuer: row.issuer,
            issue_date: row.issue_date,
            expiry_date: row.expiry_date,
            file_path: row.file_path,
            file_type: row.file_type,
            ocr_extracted_date: row.ocr_extracted_date,
            reminder_days: row.reminder_days,
            status: row.status.parse()?,
            notes: row.notes,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}
