//! Reminder Service
//!
//! One sweep over every user. Users are independent: each gets its own
//! batch, and a failing batch is reported without stopping the others.

use anyhow::Result;
use chrono::NaiveDate;
use serde::Serialize;
use std::sync::Arc;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tracing::{error, info};
use uuid::Uuid;

use vtrack_models::User;

use crate::batch::{BatchOutcome, ReminderBatchProcessor};
use crate::smtp_client::MailTransport;
use crate::store::ReminderStore;
use crate::template_engine::ReminderTemplates;

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct UserFailure {
    pub user_id: Uuid,
    pub email: String,
    pub reason: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct SweepReport {
    pub run_id: Uuid,
    pub day: NaiveDate,
    pub users_processed: usize,
    pub emails_sent: usize,
    pub documents_logged: usize,
    pub failures: Vec<UserFailure>,
}

impl SweepReport {
    fn new(day: NaiveDate) -> Self {
        Self {
            run_id: Uuid::new_v4(),
            day,
            users_processed: 0,
            emails_sent: 0,
            documents_logged: 0,
            failures: Vec::new(),
        }
    }

    fn record(&mut self, user: &User, result: Result<BatchOutcome>) {
        self.users_processed += 1;
        match result {
            Ok(BatchOutcome::NothingDue) => {}
            Ok(BatchOutcome::Sent { documents }) => {
                self.emails_sent += 1;
                self.documents_logged += documents;
            }
            Ok(BatchOutcome::DeliveryFailed { reason }) => self.failures.push(UserFailure {
                user_id: user.id,
                email: user.email.clone(),
                reason,
            }),
            Err(e) => {
                error!(user_id = %user.id, error = %e, "Reminder batch failed");
                self.failures.push(UserFailure {
                    user_id: user.id,
                    email: user.email.clone(),
                    reason: format!("{:#}", e),
                });
            }
        }
    }
}

#[derive(Clone)]
pub struct ReminderService {
    store: Arc<dyn ReminderStore>,
    processor: ReminderBatchProcessor,
    max_concurrent_batches: usize,
}

impl ReminderService {
    pub fn new(
        store: Arc<dyn ReminderStore>,
        transport: Arc<dyn MailTransport>,
        templates: ReminderTemplates,
        max_concurrent_batches: usize,
    ) -> Self {
        Self {
            processor: ReminderBatchProcessor::new(store.clone(), transport, Arc::new(templates)),
            store,
            max_concurrent_batches: max_concurrent_batches.max(1),
        }
    }

    /// Runs one reminder sweep for `today`.
    ///
    /// Only the user enumeration can fail the sweep as a whole.
    pub async fn run_sweep(&self, today: NaiveDate) -> Result<SweepReport> {
        let users = self.store.list_users().await?;
        let mut report = SweepReport::new(today);
        info!(run_id = %report.run_id, %today, users = users.len(), "Reminder sweep started");

        let limiter = Arc::new(Semaphore::new(self.max_concurrent_batches));
        let mut batches = JoinSet::new();

        for user in users {
            let permit = limiter.clone().acquire_owned().await?;
            let store = self.store.clone();
            let processor = self.processor.clone();

            batches.spawn(async move {
                let _permit = permit;
                let result = match store.reminder_candidates(user.id).await {
                    Ok(candidates) => processor.process(&user, &candidates, today).await,
                    Err(e) => Err(e),
                };
                (user, result)
            });
        }

        while let Some(joined) = batches.join_next().await {
            match joined {
                Ok((user, result)) => report.record(&user, result),
                Err(e) => error!(error = %e, "Reminder batch task aborted"),
            }
        }

        info!(
            run_id = %report.run_id,
            users = report.users_processed,
            emails = report.emails_sent,
            documents = report.documents_logged,
            failures = report.failures.len(),
            "Reminder sweep finished"
        );
        Ok(report)
    }
}
