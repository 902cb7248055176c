//! Reminder log models.
//!
//! Log entries are append-only. An `email` entry whose local send date equals
//! a given day is what marks a document as already reminded for that day.

use chrono::{DateTime, Local, NaiveDate, NaiveTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

use crate::document::Document;
use crate::error::UnknownVariant;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReminderChannel {
    Dashboard,
    Email,
}

impl ReminderChannel {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Dashboard => "dashboard",
            Self::Email => "email",
        }
    }
}

impl fmt::Display for ReminderChannel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ReminderChannel {
    type Err = UnknownVariant;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "dashboard" => Ok(Self::Dashboard),
            "email" => Ok(Self::Email),
            _ => Err(UnknownVariant::new("reminder channel", s)),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReminderLogEntry {
    pub id: Uuid,
    pub document_id: Uuid,
    pub channel: ReminderChannel,
    pub sent_at: DateTime<Utc>,
    pub message: Option<String>,
}

impl ReminderLogEntry {
    pub fn email(document_id: Uuid, days_remaining: i64, sent_at: DateTime<Utc>) -> Self {
        Self {
            id: Uuid::new_v4(),
            document_id,
            channel: ReminderChannel::Email,
            sent_at,
            message: Some(format!("Expiry reminder sent. {} days remaining.", days_remaining)),
        }
    }

    /// Calendar day of the send in server-local time.
    pub fn sent_on(&self) -> NaiveDate {
        self.sent_at.with_timezone(&Local).date_naive()
    }
}

/// UTC half-open range `[start, end)` covering one local calendar day.
pub fn local_day_bounds(day: NaiveDate) -> (DateTime<Utc>, DateTime<Utc>) {
    let start_of = |d: NaiveDate| {
        let naive = d.and_time(NaiveTime::MIN);
        Local
            .from_local_datetime(&naive)
            .earliest()
            .map(|t| t.with_timezone(&Utc))
            .unwrap_or_else(|| Utc.from_utc_datetime(&naive))
    };
    let next = day.succ_opt().unwrap_or(day);
    (start_of(day), start_of(next))
}

/// A document together with the vehicle registration it is printed against.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReminderCandidate {
    pub document: Document,
    pub registration_number: String,
}

impl ReminderCandidate {
    pub fn new(document: Document, registration_number: impl Into<String>) -> Self {
        Self {
            document,
            registration_number: registration_number.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_email_entry_message() {
        let entry = ReminderLogEntry::email(Uuid::new_v4(), 10, Utc::now());
        assert_eq!(entry.channel, ReminderChannel::Email);
        assert_eq!(entry.message.as_deref(), Some("Expiry reminder sent. 10 days remaining."));
    }

    #[test]
    fn test_day_bounds_contain_local_noon() {
        let day = NaiveDate::from_ymd_opt(2025, 3, 14).unwrap();
        let noon = Local
            .from_local_datetime(&day.and_hms_opt(12, 0, 0).unwrap())
            .unwrap()
            .with_timezone(&Utc);
        let (start, end) = local_day_bounds(day);
        assert!(start <= noon && noon < end);

        let entry = ReminderLogEntry::email(Uuid::new_v4(), 3, noon);
        assert_eq!(entry.sent_on(), day);
    }

    #[test]
    fn test_channel_round_trip() {
        assert_eq!("email".parse::<ReminderChannel>(), Ok(ReminderChannel::Email));
        assert_eq!(ReminderChannel::Dashboard.to_string(), "dashboard");
        assert!("sms".parse::<ReminderChannel>().is_err());
    }
}
