//! Reminder Batch Processor
//!
//! Turns one user's candidate documents into at most one e-mail. Log rows
//! are only written after the transport accepted the message, and then all
//! of them in one transaction.

use anyhow::Result;
use chrono::{NaiveDate, Utc};
use std::sync::Arc;
use tracing::{debug, info, warn};

use vtrack_models::{ReminderCandidate, ReminderLogEntry, User, EXPIRY_DISPLAY_FORMAT};
use vtrack_utils::validate_model;

use crate::eligibility::ReminderEligibility;
use crate::smtp_client::MailTransport;
use crate::store::ReminderStore;
use crate::template_engine::{ReminderLine, ReminderTemplates};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BatchOutcome {
    NothingDue,
    Sent { documents: usize },
    /// Nothing was logged; the same documents stay eligible for the next run.
    DeliveryFailed { reason: String },
}

/// Status phrase for a document line.
pub fn status_phrase(days_remaining: i64) -> String {
    match days_remaining {
        d if d < 0 => format!("EXPIRED ({} days ago)", d.abs()),
        0 => "EXPIRES TODAY".to_string(),
        d => format!("Expires in {} days", d),
    }
}

#[derive(Clone)]
pub struct ReminderBatchProcessor {
    store: Arc<dyn ReminderStore>,
    transport: Arc<dyn MailTransport>,
    templates: Arc<ReminderTemplates>,
    eligibility: ReminderEligibility,
}

impl ReminderBatchProcessor {
    pub fn new(
        store: Arc<dyn ReminderStore>,
        transport: Arc<dyn MailTransport>,
        templates: Arc<ReminderTemplates>,
    ) -> Self {
        Self {
            eligibility: ReminderEligibility::new(store.clone()),
            store,
            transport,
            templates,
        }
    }

    pub async fn process(
        &self,
        user: &User,
        candidates: &[ReminderCandidate],
        today: NaiveDate,
    ) -> Result<BatchOutcome> {
        let mut due = Vec::new();
        for candidate in candidates {
            if self.eligibility.is_eligible(&candidate.document, today).await? {
                due.push(candidate);
            }
        }

        if due.is_empty() {
            debug!(user_id = %user.id, "No documents due for reminder");
            return Ok(BatchOutcome::NothingDue);
        }

        // an address the relay would reject anyway is reported without a send
        if let Err(e) = validate_model(user) {
            warn!(user_id = %user.id, recipient = %user.email, error = %e, "Reminder recipient is invalid");
            return Ok(BatchOutcome::DeliveryFailed {
                reason: e.to_string(),
            });
        }

        let mut lines = Vec::with_capacity(due.len());
        let mut entries = Vec::with_capacity(due.len());
        for candidate in &due {
            let document = &candidate.document;
            // eligibility guarantees an expiry date
            let (Some(expiry), Some(days)) = (document.expiry_date, document.days_remaining(today))
            else {
                continue;
            };
            lines.push(ReminderLine {
                registration_number: candidate.registration_number.clone(),
                document_label: document.label().to_string(),
                expiry: expiry.format(EXPIRY_DISPLAY_FORMAT).to_string(),
                status: status_phrase(days),
            });
            entries.push((document.id, days));
        }

        let rendered = self.templates.render(&user.name, &lines)?;

        if let Err(e) = self
            .transport
            .send(&user.email, &rendered.subject, &rendered.body)
            .await
        {
            warn!(
                user_id = %user.id,
                recipient = %user.email,
                documents = lines.len(),
                error = %e,
                "Reminder delivery failed"
            );
            return Ok(BatchOutcome::DeliveryFailed {
                reason: format!("{:#}", e),
            });
        }

        let sent_at = Utc::now();
        let entries: Vec<ReminderLogEntry> = entries
            .into_iter()
            .map(|(document_id, days)| ReminderLogEntry::email(document_id, days, sent_at))
            .collect();
        self.store.record_email_reminders(&entries).await?;

        info!(
            user_id = %user.id,
            recipient = %user.email,
            documents = entries.len(),
            "Reminder e-mail sent"
        );
        Ok(BatchOutcome::Sent {
            documents: entries.len(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{MemoryMailer, MemoryStore};
    use chrono::Duration;
    use uuid::Uuid;
    use vtrack_models::{Document, DocumentType};

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 12, 31).unwrap()
    }

    fn candidate(doc_type: DocumentType, offset: i64) -> ReminderCandidate {
        let document =
            Document::new(Uuid::new_v4(), doc_type).with_expiry(today() + Duration::days(offset));
        ReminderCandidate::new(document, "KA01AB1234")
    }

    fn processor(store: Arc<MemoryStore>, mailer: Arc<MemoryMailer>) -> ReminderBatchProcessor {
        ReminderBatchProcessor::new(store, mailer, Arc::new(ReminderTemplates::default()))
    }

    #[test]
    fn test_status_phrases() {
        assert_eq!(status_phrase(-3), "EXPIRED (3 days ago)");
        assert_eq!(status_phrase(0), "EXPIRES TODAY");
        assert_eq!(status_phrase(12), "Expires in 12 days");
    }

    #[tokio::test]
    async fn test_one_email_and_one_log_per_document() {
        let store = Arc::new(MemoryStore::default());
        let mailer = Arc::new(MemoryMailer::default());
        let user = User::new("Asha", "asha@example.com");
        let candidates = vec![
            candidate(DocumentType::Insurance, 10),
            candidate(DocumentType::Puc, -1),
            candidate(DocumentType::Rc, 0),
        ];

        let outcome = processor(store.clone(), mailer.clone())
            .process(&user, &candidates, today())
            .await
            .unwrap();

        assert_eq!(outcome, BatchOutcome::Sent { documents: 3 });
        let sent = mailer.sent();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].recipient, "asha@example.com");
        assert!(sent[0]
            .body
            .contains("- KA01AB1234 | Insurance | Expiry: 10 Jan 2026 | Expires in 10 days"));
        assert!(sent[0]
            .body
            .contains("- KA01AB1234 | PUC Certificate | Expiry: 30 Dec 2025 | EXPIRED (1 days ago)"));
        assert!(sent[0].body.contains("EXPIRES TODAY"));

        let logs = store.logs();
        assert_eq!(logs.len(), 3);
        assert!(logs.iter().all(|l| l.channel == vtrack_models::ReminderChannel::Email));
    }

    #[tokio::test]
    async fn test_second_run_same_day_sends_nothing() {
        let store = Arc::new(MemoryStore::default());
        let mailer = Arc::new(MemoryMailer::default());
        let user = User::new("Asha", "asha@example.com");
        let candidates = vec![candidate(DocumentType::Insurance, 5)];
        let processor = processor(store.clone(), mailer.clone());

        // logs are stamped with the real clock, so dedup against the real local day
        let today = chrono::Local::now().date_naive();
        let first = processor.process(&user, &candidates, today).await.unwrap();
        let second = processor.process(&user, &candidates, today).await.unwrap();

        assert!(matches!(first, BatchOutcome::Sent { documents: 1 }));
        assert_eq!(second, BatchOutcome::NothingDue);
        assert_eq!(mailer.sent().len(), 1);
        assert_eq!(store.logs().len(), 1);
    }

    #[tokio::test]
    async fn test_delivery_failure_writes_no_logs() {
        let store = Arc::new(MemoryStore::default());
        let mailer = Arc::new(MemoryMailer::default());
        mailer.fail_for("asha@example.com");
        let user = User::new("Asha", "asha@example.com");
        let candidates = vec![
            candidate(DocumentType::Insurance, 3),
            candidate(DocumentType::Permit, 7),
        ];

        let outcome = processor(store.clone(), mailer)
            .process(&user, &candidates, today())
            .await
            .unwrap();

        assert!(matches!(outcome, BatchOutcome::DeliveryFailed { .. }));
        assert!(store.logs().is_empty());
    }

    #[tokio::test]
    async fn test_nothing_due_sends_nothing() {
        let store = Arc::new(MemoryStore::default());
        let mailer = Arc::new(MemoryMailer::default());
        let user = User::new("Asha", "asha@example.com");
        let candidates = vec![candidate(DocumentType::Fitness, 90)];

        let outcome = processor(store.clone(), mailer.clone())
            .process(&user, &candidates, today())
            .await
            .unwrap();

        assert_eq!(outcome, BatchOutcome::NothingDue);
        assert!(mailer.sent().is_empty());
        assert!(store.logs().is_empty());
    }

    #[tokio::test]
    async fn test_log_write_failure_surfaces_as_error() {
        let store = Arc::new(MemoryStore::default());
        store.fail_writes();
        let mailer = Arc::new(MemoryMailer::default());
        let user = User::new("Asha", "asha@example.com");

        let result = processor(store.clone(), mailer)
            .process(&user, &[candidate(DocumentType::Tax, 1)], today())
            .await;

        assert!(result.is_err());
        assert!(store.logs().is_empty());
    }

    #[tokio::test]
    async fn test_invalid_recipient_is_not_mailed() {
        let store = Arc::new(MemoryStore::default());
        let mailer = Arc::new(MemoryMailer::default());
        let user = User::new("Asha", "asha-at-example");

        let outcome = processor(store.clone(), mailer.clone())
            .process(&user, &[candidate(DocumentType::Permit, 3)], today())
            .await
            .unwrap();

        let BatchOutcome::DeliveryFailed { reason } = outcome else {
            panic!("expected a delivery failure, got {:?}", outcome);
        };
        assert!(reason.contains("Invalid email format"));
        assert!(mailer.sent().is_empty());
        assert!(store.logs().is_empty());
    }
}
