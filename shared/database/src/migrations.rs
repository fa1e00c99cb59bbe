use anyhow::Result;

use crate::sqlite::SqlitePool;

pub async fn run_migrations(pool: &SqlitePool) -> Result<()> {
    tracing::info!("Running SQLite migrations");

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS document_sets (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            company_product_name TEXT NOT NULL,
            original_product_name TEXT NOT NULL DEFAULT '',
            supplier_name TEXT NOT NULL DEFAULT '',
            cas_number TEXT,
            inci_name TEXT,
            molecular_formula TEXT,
            batch_number TEXT,
            manufacturing_date TEXT,
            expiry_date TEXT,
            supplier_coa_path TEXT,
            supplier_msds_path TEXT,
            supplier_tds_path TEXT,
            generated_coa_path TEXT,
            generated_msds_path TEXT,
            generated_tds_path TEXT,
            status TEXT NOT NULL,
            error_message TEXT,
            fingerprint TEXT NOT NULL,
            extracted_data TEXT,
            created_at TEXT NOT NULL,
            updated_at TEXT NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS test_results (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            document_set_id INTEGER NOT NULL REFERENCES document_sets(id) ON DELETE CASCADE,
            test_item TEXT NOT NULL,
            method TEXT,
            specification TEXT NOT NULL DEFAULT '',
            result TEXT NOT NULL DEFAULT '',
            document_type TEXT NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query("CREATE INDEX IF NOT EXISTS idx_document_sets_fingerprint ON document_sets(fingerprint)")
        .execute(pool)
        .await?;

    sqlx::query("CREATE INDEX IF NOT EXISTS idx_document_sets_created_at ON document_sets(created_at)")
        .execute(pool)
        .await?;

    sqlx::query("CREATE INDEX IF NOT EXISTS idx_test_results_document_set_id ON test_results(document_set_id)")
        .execute(pool)
        .await?;

    tracing::info!("SQLite migrations completed successfully");
    Ok(())
}
