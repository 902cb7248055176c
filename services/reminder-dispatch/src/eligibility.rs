//! Reminder Eligibility
//!
//! A document is due for today's e-mail when it is inside its reminder
//! window and no e-mail reminder has been logged for it today.

use anyhow::Result;
use chrono::NaiveDate;
use std::sync::Arc;

use vtrack_models::Document;

use crate::store::ReminderStore;

#[derive(Clone)]
pub struct ReminderEligibility {
    store: Arc<dyn ReminderStore>,
}

impl ReminderEligibility {
    pub fn new(store: Arc<dyn ReminderStore>) -> Self {
        Self { store }
    }

    pub async fn is_eligible(&self, document: &Document, today: NaiveDate) -> Result<bool> {
        if !document.is_within_reminder_window(today) {
            return Ok(false);
        }
        let already_sent = self.store.email_sent_on(document.id, today).await?;
        Ok(!already_sent)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{local_noon, MemoryStore};
    use chrono::Duration;
    use uuid::Uuid;
    use vtrack_models::{DocumentStatus, DocumentType, ReminderChannel, ReminderLogEntry};

    fn expiring_document(today: NaiveDate) -> Document {
        Document::new(Uuid::new_v4(), DocumentType::Insurance).with_expiry(today + Duration::days(10))
    }

    #[tokio::test]
    async fn test_eligible_without_log_entry() {
        let today = NaiveDate::from_ymd_opt(2025, 6, 1).unwrap();
        let store = Arc::new(MemoryStore::default());
        let eligibility = ReminderEligibility::new(store);

        assert!(eligibility.is_eligible(&expiring_document(today), today).await.unwrap());
    }

    #[tokio::test]
    async fn test_email_logged_today_blocks() {
        let today = NaiveDate::from_ymd_opt(2025, 6, 1).unwrap();
        let doc = expiring_document(today);
        let store = Arc::new(MemoryStore::default());
        store.push_log(ReminderLogEntry::email(doc.id, 10, local_noon(today)));
        let eligibility = ReminderEligibility::new(store);

        assert!(!eligibility.is_eligible(&doc, today).await.unwrap());
    }

    #[tokio::test]
    async fn test_email_logged_yesterday_does_not_block() {
        let today = NaiveDate::from_ymd_opt(2025, 6, 1).unwrap();
        let doc = expiring_document(today);
        let store = Arc::new(MemoryStore::default());
        let yesterday = today - Duration::days(1);
        store.push_log(ReminderLogEntry::email(doc.id, 11, local_noon(yesterday)));
        let eligibility = ReminderEligibility::new(store);

        assert!(eligibility.is_eligible(&doc, today).await.unwrap());
    }

    #[tokio::test]
    async fn test_dashboard_entry_is_not_a_dedup_signal() {
        let today = NaiveDate::from_ymd_opt(2025, 6, 1).unwrap();
        let doc = expiring_document(today);
        let store = Arc::new(MemoryStore::default());
        let mut entry = ReminderLogEntry::email(doc.id, 10, local_noon(today));
        entry.channel = ReminderChannel::Dashboard;
        store.push_log(entry);
        let eligibility = ReminderEligibility::new(store);

        assert!(eligibility.is_eligible(&doc, today).await.unwrap());
    }

    #[tokio::test]
    async fn test_window_and_status_rules() {
        let today = NaiveDate::from_ymd_opt(2025, 6, 1).unwrap();
        let eligibility = ReminderEligibility::new(Arc::new(MemoryStore::default()));

        let far = Document::new(Uuid::new_v4(), DocumentType::Tax).with_expiry(today + Duration::days(31));
        assert!(!eligibility.is_eligible(&far, today).await.unwrap());

        let long_expired =
            Document::new(Uuid::new_v4(), DocumentType::Tax).with_expiry(today - Duration::days(365));
        assert!(eligibility.is_eligible(&long_expired, today).await.unwrap());

        let mut renewed = expiring_document(today);
        renewed.status = DocumentStatus::Renewed;
        assert!(!eligibility.is_eligible(&renewed, today).await.unwrap());
    }
}
