//! User Repository
//!
//! Uses runtime SQL queries (unchecked) to avoid requiring DATABASE_URL at compile time.

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use sqlx::{FromRow, PgPool};
use uuid::Uuid;

use vtrack_models::User;

#[derive(Clone)]
pub struct UserRepository {
    pool: PgPool,
}

impl UserRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Find user by ID
    pub async fn find_by_id(&self, id: Uuid) -> Result<Option<User>> {
        let row: Option<UserRow> = sqlx::query_as(
            r#"
            SELECT id, name, email, phone, is_active_user, created_at
            FROM users
            WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .context("Failed to fetch user by ID")?;

        Ok(row.map(Into::into))
    }

    /// Find all users
    pub async fn find_all(&self) -> Result<Vec<User>> {
        let rows: Vec<UserRow> = sqlx::query_as(
            r#"
            SELECT id, name, email, phone, is_active_user, created_at
            FROM users
            ORDER BY created_at
            "#,
        )
        .fetch_all(&self.pool)
        .await
        .context("Failed to fetch all users")?;

        Ok(rows.into_iter().map(Into::into).collect())
    }
}

#[derive(Debug, FromRow)]
struct UserRow {
    id: Uuid,
    name: String,
    email: String,
    phone: Option<String>,
    is_active_user: bool,
    created_at: DateTime<Utc>,
}

impl From<UserRow> for User {
    fn from(row: UserRow) -> Self {
        Self {
            id: row.id,
            name: row.name,
            email: row.email,
            phone: row.phone,
            is_active_user: row.is_active_user,
            created_at: row.created_at,
        }
    }
}
