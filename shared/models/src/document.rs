//! Compliance document models.
//!
//! A document belongs to exactly one vehicle and carries an optional expiry
//! date. Everything time-dependent (days remaining, urgency, reminder window)
//! is derived from the expiry date and a caller-supplied `today`.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;
use validator::Validate;

use crate::error::UnknownVariant;

/// Reminder window used when the owner does not pick one.
pub const DEFAULT_REMINDER_DAYS: i32 = 30;

/// Documents expiring within this many days are flagged as `Warning`.
pub const WARNING_THRESHOLD_DAYS: i64 = 30;

/// Display format for expiry dates in notifications (`31 Dec 2025`).
pub const EXPIRY_DISPLAY_FORMAT: &str = "%d %b %Y";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DocumentType {
    Rc,
    Insurance,
    Puc,
    Fitness,
    Permit,
    Tax,
    Dl,
}

impl DocumentType {
    pub const ALL: [DocumentType; 7] = [
        Self::Rc,
        Self::Insurance,
        Self::Puc,
        Self::Fitness,
        Self::Permit,
        Self::Tax,
        Self::Dl,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Rc => "rc",
            Self::Insurance => "insurance",
            Self::Puc => "puc",
            Self::Fitness => "fitness",
            Self::Permit => "permit",
            Self::Tax => "tax",
            Self::Dl => "dl",
        }
    }

    /// Human readable label used in reminder e-mails.
    pub fn label(&self) -> &'static str {
        match self {
            Self::Rc => "Registration Certificate",
            Self::Insurance => "Insurance",
            Self::Puc => "PUC Certificate",
            Self::Fitness => "Fitness Certificate",
            Self::Permit => "Permit",
            Self::Tax => "Road Tax",
            Self::Dl => "Driving License",
        }
    }
}

impl fmt::Display for DocumentType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DocumentType {
    type Err = UnknownVariant;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|t| t.as_str() == s.trim().to_lowercase())
            .ok_or_else(|| UnknownVariant::new("document type", s))
    }
}

/// Lifecycle status. Only `Active` documents take part in reminders.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum DocumentStatus {
    #[default]
    Active,
    Expired,
    Renewed,
}

impl DocumentStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Active => "active",
            Self::Expired => "expired",
            Self::Renewed => "renewed",
        }
    }
}

impl fmt::Display for DocumentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DocumentStatus {
    type Err = UnknownVariant;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "active" => Ok(Self::Active),
            "expired" => Ok(Self::Expired),
            "renewed" => Ok(Self::Renewed),
            _ => Err(UnknownVariant::new("document status", s)),
        }
    }
}

/// Derived classification of time-to-expiry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Urgency {
    Unknown,
    Expired,
    Warning,
    Valid,
}

impl Urgency {
    pub fn classify(days_remaining: Option<i64>) -> Self {
        match days_remaining {
            None => Self::Unknown,
            Some(days) if days < 0 => Self::Expired,
            Some(days) if days <= WARNING_THRESHOLD_DAYS => Self::Warning,
            Some(_) => Self::Valid,
        }
    }
}

impl fmt::Display for Urgency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Unknown => write!(f, "unknown"),
            Self::Expired => write!(f, "expired"),
            Self::Warning => write!(f, "warning"),
            Self::Valid => write!(f, "valid"),
        }
    }
}

/// A compliance document attached to a vehicle.
#[derive(Debug, Clone, Serialize, Deserialize, Validate, PartialEq)]
pub struct Document {
    pub id: Uuid,
    pub vehicle_id: Uuid,
    pub doc_type: DocumentType,
    #[validate(length(max = 50, message = "Document number must be at most 50 characters"))]
    pub doc_number: Option<String>,
    #[validate(length(max = 100, message = "Issuer must be at most 100 characters"))]
    pub issuer: Option<String>,
    pub issue_date: Option<NaiveDate>,
    pub expiry_date: Option<NaiveDate>,
    pub file_path: Option<String>,
    pub file_type: Option<String>,
    /// Expiry date suggested by text inference, `dd/mm/YYYY`.
    pub ocr_extracted_date: Option<String>,
    #[validate(range(min = 0, max = 3650, message = "Reminder window must be between 0 and 3650 days"))]
    pub reminder_days: i32,
    pub status: DocumentStatus,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Document {
    pub fn new(vehicle_id: Uuid, doc_type: DocumentType) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            vehicle_id,
            doc_type,
            doc_number: None,
            issuer: None,
            issue_date: None,
            expiry_date: None,
            file_path: None,
            file_type: None,
            ocr_extracted_date: None,
            reminder_days: DEFAULT_REMINDER_DAYS,
            status: DocumentStatus::Active,
            notes: None,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn with_expiry(mut self, expiry_date: NaiveDate) -> Self {
        self.expiry_date = Some(expiry_date);
        self
    }

    /// `expiry_date - today` in whole days; `None` without an expiry date.
    pub fn days_remaining(&self, today: NaiveDate) -> Option<i64> {
        self.expiry_date.map(|expiry| (expiry - today).num_days())
    }

    pub fn urgency(&self, today: NaiveDate) -> Urgency {
        Urgency::classify(self.days_remaining(today))
    }

    /// Active, dated, and no more than `reminder_days` away from expiry.
    ///
    /// There is no lower bound: a document that expired long ago stays inside
    /// the window for as long as it remains `Active`.
    pub fn is_within_reminder_window(&self, today: NaiveDate) -> bool {
        if self.status != DocumentStatus::Active {
            return false;
        }
        self.days_remaining(today)
            .is_some_and(|days| days <= i64::from(self.reminder_days))
    }

    pub fn label(&self) -> &'static str {
        self.doc_type.label()
    }
}

/// Expiry date guessed from scanned text. Only ever used as a suggestion.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InferredExpiry {
    pub date: NaiveDate,
    pub raw_text: String,
}

impl InferredExpiry {
    pub fn new(date: NaiveDate, raw_text: impl Into<String>) -> Self {
        Self {
            date,
            raw_text: raw_text.into(),
        }
    }

    /// `dd/mm/YYYY`, the form stored in `Document::ocr_extracted_date`.
    pub fn formatted(&self) -> String {
        self.date.format("%d/%m/%Y").to_string()
    }
}
