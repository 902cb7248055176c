//! Vehicle Repository

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use sqlx::{FromRow, PgPool};
use uuid::Uuid;

use vtrack_models::Vehicle;

#[derive(Clone)]
pub struct VehicleRepository {
    pool: PgPool,
}

impl VehicleRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Active vehicles of a user, newest first
    pub async fn find_active_by_user(&self, user_id: Uuid) -> Result<Vec<Vehicle>> {
        let rows: Vec<VehicleRow> = sqlx::query_as(
            r#"
            SELECT id, user_id, registration_number, make, model, year,
                   vehicle_type, fuel_type, notes, is_active, created_at
            FROM vehicles
            WHERE user_id = $1 AND is_active = TRUE
            ORDER BY created_at DESC
            "#,
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await
        .context("Failed to fetch vehicles by user")?;

        Ok(rows.into_iter().map(Into::into).collect())
    }
}

#[derive(Debug, FromRow)]
struct VehicleRow {
    id: Uuid,
    user_id: Uuid,
    registration_number: String,
    make: Option<String>,
    model: Option<String>,
    year: Option<i32>,
    vehicle_type: Option<String>,
    fuel_type: Option<String>,
    notes: Option<String>,
    is_active: bool,
    created_at: DateTime<Utc>,
}

impl From<VehicleRow> for Vehicle {
    fn from(row: VehicleRow) -> Self {
        Self {
            id: row.id,
            user_id: row.user_id,
            registration_number: row.registration_number,
            make: row.make,
            model: row.model,
            year: row.year,
            // free-text legacy values are dropped rather than failing the read
            vehicle_type: row.vehicle_type.and_then(|t| t.parse().ok()),
            fuel_type: row.fuel_type.and_then(|f| f.parse().ok()),
            notes: row.notes,
            is_active: row.is_active,
            created_at: row.created_at,
        }
    }
}
