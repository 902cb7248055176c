//! Reminder Store
//!
//! Persistence capability used by the reminder sweep.

use anyhow::Result;
use async_trait::async_trait;
use chrono::NaiveDate;
use uuid::Uuid;

use vtrack_database::{DocumentRepository, PostgresPool, ReminderLogRepository, UserRepository};
use vtrack_models::{ReminderCandidate, ReminderChannel, ReminderLogEntry, User};

#[async_trait]
pub trait ReminderStore: Send + Sync {
    async fn list_users(&self) -> Result<Vec<User>>;

    /// Active dated documents on the user's active vehicles.
    async fn reminder_candidates(&self, user_id: Uuid) -> Result<Vec<ReminderCandidate>>;

    /// Whether an e-mail reminder for the document is logged on `day`.
    async fn email_sent_on(&self, document_id: Uuid, day: NaiveDate) -> Result<bool>;

    /// Writes every entry or none of them.
    async fn record_email_reminders(&self, entries: &[ReminderLogEntry]) -> Result<()>;
}

pub struct PgReminderStore {
    users: UserRepository,
    documents: DocumentRepository,
    logs: ReminderLogRepository,
}

impl PgReminderStore {
    pub fn new(pool: PostgresPool) -> Self {
        Self {
            users: UserRepository::new(pool.clone()),
            documents: DocumentRepository::new(pool.clone()),
            logs: ReminderLogRepository::new(pool),
        }
    }
}

#[async_trait]
impl ReminderStore for PgReminderStore {
    async fn list_users(&self) -> Result<Vec<User>> {
        self.users.find_all().await
    }

    async fn reminder_candidates(&self, user_id: Uuid) -> Result<Vec<ReminderCandidate>> {
        self.documents.find_reminder_candidates(user_id).await
    }

    async fn email_sent_on(&self, document_id: Uuid, day: NaiveDate) -> Result<bool> {
        self.logs
            .exists_on_day(document_id, ReminderChannel::Email, day)
            .await
    }

    async fn record_email_reminders(&self, entries: &[ReminderLogEntry]) -> Result<()> {
        self.logs.insert_batch(entries).await?;
        Ok(())
    }
}
