//! Owner and vehicle models.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use uuid::Uuid;
use validator::Validate;

use crate::document::{Document, DocumentStatus};
use crate::error::UnknownVariant;

/// Account owning vehicles; the reminder e-mail goes to `email`.
#[derive(Debug, Clone, Serialize, Deserialize, Validate, PartialEq)]
pub struct User {
    pub id: Uuid,
    #[validate(length(min = 1, max = 100, message = "Name must be between 1 and 100 characters"))]
    pub name: String,
    #[validate(email(message = "Email must be a valid email address"))]
    pub email: String,
    #[validate(length(max = 15))]
    pub phone: Option<String>,
    pub is_active_user: bool,
    pub created_at: DateTime<Utc>,
}

impl User {
    pub fn new(name: impl Into<String>, email: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            name: name.into(),
            email: email.into(),
            phone: None,
            is_active_user: true,
            created_at: Utc::now(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VehicleType {
    Car,
    Bike,
    Truck,
    Bus,
    Auto,
}

impl FromStr for VehicleType {
    type Err = UnknownVariant;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "car" => Ok(Self::Car),
            "bike" => Ok(Self::Bike),
            "truck" => Ok(Self::Truck),
            "bus" => Ok(Self::Bus),
            "auto" => Ok(Self::Auto),
            _ => Err(UnknownVariant::new("vehicle type", s)),
        }
    }
}

impl VehicleType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Car => "car",
            Self::Bike => "bike",
            Self::Truck => "truck",
            Self::Bus => "bus",
            Self::Auto => "auto",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FuelType {
    Petrol,
    Diesel,
    Cng,
    Electric,
}

impl FromStr for FuelType {
    type Err = UnknownVariant;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "petrol" => Ok(Self::Petrol),
            "diesel" => Ok(Self::Diesel),
            "cng" => Ok(Self::Cng),
            "electric" => Ok(Self::Electric),
            _ => Err(UnknownVariant::new("fuel type", s)),
        }
    }
}

impl FuelType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Petrol => "petrol",
            Self::Diesel => "diesel",
            Self::Cng => "cng",
            Self::Electric => "electric",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate, PartialEq)]
pub struct Vehicle {
    pub id: Uuid,
    pub user_id: Uuid,
    #[validate(length(min = 1, max = 20, message = "Registration number is required"))]
    pub registration_number: String,
    pub make: Option<String>,
    pub model: Option<String>,
    pub year: Option<i32>,
    pub vehicle_type: Option<VehicleType>,
    pub fuel_type: Option<FuelType>,
    pub notes: Option<String>,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
}

impl Vehicle {
    pub fn new(user_id: Uuid, registration_number: &str) -> Self {
        Self {
            id: Uuid::new_v4(),
            user_id,
            registration_number: Self::normalize_registration(registration_number),
            make: None,
            model: None,
            year: None,
            vehicle_type: None,
            fuel_type: None,
            notes: None,
            is_active: true,
            created_at: Utc::now(),
        }
    }

    /// Registration numbers are stored trimmed and upper-cased.
    pub fn normalize_registration(raw: &str) -> String {
        raw.trim().to_uppercase()
    }

    /// Active dated document of this vehicle that expires first.
    pub fn nearest_expiry<'a>(&self, documents: &'a [Document]) -> Option<&'a Document> {
        documents
            .iter()
            .filter(|d| d.vehicle_id == self.id)
            .filter(|d| d.status == DocumentStatus::Active)
            .filter(|d| d.expiry_date.is_some())
            .min_by_key(|d| d.expiry_date)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::DocumentType;
    use chrono::NaiveDate;

    #[test]
    fn test_registration_normalized() {
        let vehicle = Vehicle::new(Uuid::new_v4(), "  ka01ab1234 ");
        assert_eq!(vehicle.registration_number, "KA01AB1234");
    }

    #[test]
    fn test_nearest_expiry_ignores_inactive_and_undated() {
        let vehicle = Vehicle::new(Uuid::new_v4(), "MH12XY0001");
        let early = NaiveDate::from_ymd_opt(2025, 1, 10).unwrap();
        let late = NaiveDate::from_ymd_opt(2025, 9, 1).unwrap();

        let mut renewed = Document::new(vehicle.id, DocumentType::Rc).with_expiry(early);
        renewed.status = DocumentStatus::Renewed;
        let undated = Document::new(vehicle.id, DocumentType::Tax);
        let insurance = Document::new(vehicle.id, DocumentType::Insurance).with_expiry(late);
        let other_vehicle = Document::new(Uuid::new_v4(), DocumentType::Puc).with_expiry(early);

        let docs = vec![renewed, undated, insurance.clone(), other_vehicle];
        assert_eq!(vehicle.nearest_expiry(&docs), Some(&insurance));
        assert_eq!(vehicle.nearest_expiry(&[]), None);
    }

    #[test]
    fn test_user_email_validation() {
        assert!(User::new("Asha", "asha@example.com").validate().is_ok());
        assert!(User::new("Asha", "not-an-email").validate().is_err());
    }
}
