use chrono::NaiveDate;
use serde::Serialize;

use crate::document::{Document, DocumentStatus, WARNING_THRESHOLD_DAYS};
use crate::vehicle::Vehicle;

/// Per-owner expiry overview.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct ExpirySummary {
    pub today: NaiveDate,
    pub total_vehicles: usize,
    pub total_documents: usize,
    pub expired_count: usize,
    pub expiring_soon_count: usize,
    /// Active dated documents, soonest expiry first.
    pub documents: Vec<Document>,
}

impl ExpirySummary {
    pub fn from_documents(vehicles: &[Vehicle], documents: &[Document], today: NaiveDate) -> Self {
        let mut documents: Vec<Document> = documents
            .iter()
            .filter(|d| d.status == DocumentStatus::Active && d.expiry_date.is_some())
            .cloned()
            .collect();
        documents.sort_by_key(|d| d.expiry_date);

        let expired_count = documents
            .iter()
            .filter(|d| d.days_remaining(today).is_some_and(|days| days < 0))
            .count();
        let expiring_soon_count = documents
            .iter()
            .filter(|d| {
                d.days_remaining(today)
                    .is_some_and(|days| (0..=WARNING_THRESHOLD_DAYS).contains(&days))
            })
            .count();

        Self {
            today,
            total_vehicles: vehicles.iter().filter(|v| v.is_active).count(),
            total_documents: documents.len(),
            expired_count,
            expiring_soon_count,
            documents,
        }
    }
}
