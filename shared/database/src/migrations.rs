use anyhow::Result;
use sqlx::PgPool;
use vtrack_models::DocumentType;

/// `'rc', 'insurance', ...` for the `doc_type` check constraint.
fn doc_type_list() -> String {
    DocumentType::ALL
        .iter()
        .map(|doc_type| format!("'{}'", doc_type.as_str()))
        .collect::<Vec<_>>()
        .join(", ")
}

pub async fn run_postgres_migrations(pool: &PgPool) -> Result<()> {
    tracing::info!("Running PostgreSQL migrations");

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS users (
            id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
            name VARCHAR(100) NOT NULL,
            email VARCHAR(120) NOT NULL UNIQUE,
            phone VARCHAR(15),
            is_active_user BOOLEAN NOT NULL DEFAULT TRUE,
            created_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
        )
        "#,
    )
    .execute(pool)
    .await?;

    // Vehicles go away with their owner
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS vehicles (
            id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
            user_id UUID NOT NULL REFERENCES users(id) ON DELETE CASCADE,
            registration_number VARCHAR(20) NOT NULL,
            make VARCHAR(50),
            model VARCHAR(50),
            year INTEGER,
            vehicle_type VARCHAR(20),
            fuel_type VARCHAR(20),
            notes TEXT,
            is_active BOOLEAN NOT NULL DEFAULT TRUE,
            created_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS documents (
            id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
            vehicle_id UUID NOT NULL REFERENCES vehicles(id) ON DELETE CASCADE,
            doc_type VARCHAR(20) NOT NULL,
            doc_number VARCHAR(50),
            issuer VARCHAR(100),
            issue_date DATE,
            expiry_date DATE,
            file_path VARCHAR(256),
            file_type VARCHAR(10),
            ocr_extracted_date VARCHAR(50),
            reminder_days INTEGER NOT NULL DEFAULT 30,
            status VARCHAR(20) NOT NULL DEFAULT 'active',
            notes TEXT,
            created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
            updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
        )
        "#,
    )
    .execute(pool)
    .await?;

    // Append-only; rows are only ever removed by the document cascade
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS reminder_logs (
            id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
            document_id UUID NOT NULL REFERENCES documents(id) ON DELETE CASCADE,
            reminder_type VARCHAR(20) NOT NULL,
            sent_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
            message TEXT
        )
        "#,
    )
    .execute(pool)
    .await?;

    // NOT VALID: rows written before the constraint existed are left alone
    // and skipped on read; every new write is checked
    sqlx::query(&format!(
        r#"
        DO $$
        BEGIN
            IF NOT EXISTS (
                SELECT 1 FROM pg_constraint WHERE conname = 'documents_doc_type_check'
            ) THEN
                ALTER TABLE documents ADD CONSTRAINT documents_doc_type_check
                    CHECK (doc_type IN ({})) NOT VALID;
            END IF;
        END
        $$
        "#,
        doc_type_list()
    ))
    .execute(pool)
    .await?;

    sqlx::query("CREATE INDEX IF NOT EXISTS idx_vehicles_user_id ON vehicles(user_id)")
        .execute(pool)
        .await?;

    sqlx::query("CREATE INDEX IF NOT EXISTS idx_documents_vehicle_id ON documents(vehicle_id)")
        .execute(pool)
        .await?;

    sqlx::query("CREATE INDEX IF NOT EXISTS idx_documents_expiry_date ON documents(expiry_date)")
        .execute(pool)
        .await?;

    sqlx::query(
        "CREATE INDEX IF NOT EXISTS idx_reminder_logs_dedup ON reminder_logs(document_id, reminder_type, sent_at)",
    )
    .execute(pool)
    .await?;

    tracing::info!("PostgreSQL migrations completed successfully");
    Ok(())
}
