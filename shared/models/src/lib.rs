//! # Vehicle Tracker Domain Models
//!
//! Core data model for tracking vehicle compliance documents and the
//! reminders sent about them.
//!
//! ## Key Models
//!
//! - **User** / **Vehicle**: owners and the vehicles they register
//! - **Document**: a compliance document (registration, insurance, permit, ...)
//!   with an optional expiry date and a reminder window
//! - **ReminderLogEntry**: append-only record of a reminder that went out
//! - **InferredExpiry**: expiry date guessed from scanned text
//! - **ExpirySummary**: per-owner overview of expired and expiring documents
//!
//! Time-dependent properties (days remaining, urgency, reminder eligibility
//! window) are pure functions of the stored dates and a caller-supplied day.

pub mod document;
pub mod error;
pub mod reminder;
pub mod summary;
pub mod vehicle;


pub use document::*;
pub use error::UnknownVariant;
pub use reminder::*;
pub use summary::ExpirySummary;
pub use vehicle::*;

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    #[test]
    fn test_document_defaults() {
        let doc = Document::new(Uuid::new_v4(), DocumentType::Fitness);
        assert_eq!(doc.reminder_days, DEFAULT_REMINDER_DAYS);
        assert_eq!(doc.status, DocumentStatus::Active);
        assert!(doc.expiry_date.is_none());
    }

    #[test]
    fn test_document_serialization() {
        let doc = Document::new(Uuid::new_v4(), DocumentType::Dl);
        let json = serde_json::to_value(&doc).unwrap();
        assert_eq!(json["doc_type"], "dl");
        assert_eq!(json["status"], "active");

        let back: Document = serde_json::from_value(json).unwrap();
        assert_eq!(back, doc);
    }
}
