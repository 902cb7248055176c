//! In-memory store and mailer used by the unit tests.

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use chrono::{DateTime, Local, NaiveDate, TimeZone, Utc};
use std::collections::{HashMap, HashSet};
use std::sync::Mutex;
use tokio::sync::Notify;
use uuid::Uuid;

use vtrack_models::{ReminderCandidate, ReminderChannel, ReminderLogEntry, User};

use crate::smtp_client::MailTransport;
use crate::store::ReminderStore;

pub fn local_noon(day: NaiveDate) -> DateTime<Utc> {
    let noon = day.and_hms_opt(12, 0, 0).unwrap();
    Local.from_local_datetime(&noon).unwrap().with_timezone(&Utc)
}

#[derive(Default)]
pub struct MemoryStore {
    users: Mutex<Vec<User>>,
    candidates: Mutex<HashMap<Uuid, Vec<ReminderCandidate>>>,
    logs: Mutex<Vec<ReminderLogEntry>>,
    fail_writes: Mutex<bool>,
    failing_reads: Mutex<HashSet<Uuid>>,
    /// (failures still to inject, failures injected so far)
    list_failures: Mutex<(usize, usize)>,
}

impl MemoryStore {
    pub fn add_user(&self, user: User, candidates: Vec<ReminderCandidate>) {
        self.candidates.lock().unwrap().insert(user.id, candidates);
        self.users.lock().unwrap().push(user);
    }

    pub fn push_log(&self, entry: ReminderLogEntry) {
        self.logs.lock().unwrap().push(entry);
    }

    pub fn logs(&self) -> Vec<ReminderLogEntry> {
        self.logs.lock().unwrap().clone()
    }

    pub fn fail_writes(&self) {
        *self.fail_writes.lock().unwrap() = true;
    }

    pub fn fail_reads_for(&self, user_id: Uuid) {
        self.failing_reads.lock().unwrap().insert(user_id);
    }

    /// The next `times` calls to `list_users` fail.
    pub fn fail_list_users(&self, times: usize) {
        self.list_failures.lock().unwrap().0 = times;
    }

    pub fn list_users_failures(&self) -> usize {
        self.list_failures.lock().unwrap().1
    }
}

#[async_trait]
impl ReminderStore for MemoryStore {
    async fn list_users(&self) -> Result<Vec<User>> {
        {
            let mut failures = self.list_failures.lock().unwrap();
            if failures.0 > 0 {
                failures.0 -= 1;
                failures.1 += 1;
                return Err(anyhow!("user table unavailable"));
            }
        }
        Ok(self.users.lock().unwrap().clone())
    }

    async fn reminder_candidates(&self, user_id: Uuid) -> Result<Vec<ReminderCandidate>> {
        if self.failing_reads.lock().unwrap().contains(&user_id) {
            return Err(anyhow!("documents unavailable for user {}", user_id));
        }
        Ok(self
            .candidates
            .lock()
            .unwrap()
            .get(&user_id)
            .cloned()
            .unwrap_or_default())
    }

    async fn email_sent_on(&self, document_id: Uuid, day: NaiveDate) -> Result<bool> {
        Ok(self.logs.lock().unwrap().iter().any(|entry| {
            entry.document_id == document_id
                && entry.channel == ReminderChannel::Email
                && entry.sent_on() == day
        }))
    }

    async fn record_email_reminders(&self, entries: &[ReminderLogEntry]) -> Result<()> {
        if *self.fail_writes.lock().unwrap() {
            return Err(anyhow!("reminder log unavailable"));
        }
        self.logs.lock().unwrap().extend_from_slice(entries);
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct SentMail {
    pub recipient: String,
    pub subject: String,
    pub body: String,
}

/// Records every message; refuses recipients listed as failing.
#[derive(Default)]
pub struct MemoryMailer {
    sent: Mutex<Vec<SentMail>>,
    failing: Mutex<HashSet<String>>,
}

impl MemoryMailer {
    pub fn fail_for(&self, recipient: &str) {
        self.failing.lock().unwrap().insert(recipient.to_string());
    }

    pub fn sent(&self) -> Vec<SentMail> {
        self.sent.lock().unwrap().clone()
    }
}

#[async_trait]
impl MailTransport for MemoryMailer {
    async fn send(&self, recipient: &str, subject: &str, body: &str) -> Result<()> {
        if self.failing.lock().unwrap().contains(recipient) {
            return Err(anyhow!("mailbox unavailable: {}", recipient));
        }
        self.sent.lock().unwrap().push(SentMail {
            recipient: recipient.to_string(),
            subject: subject.to_string(),
            body: body.to_string(),
        });
        Ok(())
    }
}

/// Holds every send until released.
#[derive(Default)]
pub struct GatedMailer {
    pub release: Notify,
}

#[async_trait]
impl MailTransport for GatedMailer {
    async fn send(&self, _recipient: &str, _subject: &str, _body: &str) -> Result<()> {
        self.release.notified().await;
        Ok(())
    }
}
