//! Document Set Repository
//!
//! CRUD operations for upload sessions and their extraction results.

use anyhow::{Context, Result};
use chrono::{DateTime, NaiveDate, Utc};
use sqlx::FromRow;

use chemdocs_models::{
    DocumentSet, ExtractedFields, GeneratedPaths, ProcessingStatus, SupplierPaths,
};

use crate::sqlite::SqlitePool;

macro_rules! document_set_columns {
    () => {
        r#"id, company_product_name, original_product_name, supplier_name, cas_number,
           inci_name, molecular_formula, batch_number, manufacturing_date, expiry_date,
           supplier_coa_path, supplier_msds_path, supplier_tds_path,
           generated_coa_path, generated_msds_path, generated_tds_path,
           status, error_message, fingerprint, extracted_data, created_at, updated_at"#
    };
}

/// Values written once extraction of all three documents has succeeded
#[derive(Debug, Clone)]
pub struct ExtractionUpdate<'a> {
    pub fields: &'a ExtractedFields,
    pub manufacturing_date: Option<NaiveDate>,
    pub expiry_date: Option<NaiveDate>,
}

pub struct DocumentSetRepository {
    pool: SqlitePool,
}

impl DocumentSetRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Create a new document set in the `uploaded` state
    pub async fn create(&self, company_product_name: &str, fingerprint: &str) -> Result<DocumentSet> {
        let now = Utc::now();

        let id = sqlx::query(
            r#"
            INSERT INTO document_sets
                (company_product_name, status, fingerprint, created_at, updated_at)
            VALUES (?, ?, ?, ?, ?)
            "#,
        )
        .bind(company_product_name)
        .bind(ProcessingStatus::Uploaded.as_str())
        .bind(fingerprint)
        .bind(now)
        .bind(now)
        .execute(&self.pool)
        .await
        .context("Failed to create document set")?
        .last_insert_rowid();

        self.find_by_id(id)
            .await?
            .context("Document set vanished after insert")
    }

    pub async fn find_by_id(&self, id: i64) -> Result<Option<DocumentSet>> {
        let row: Option<DocumentSetRow> = sqlx::query_as(concat!(
            "SELECT ",
            document_set_columns!(),
            " FROM document_sets WHERE id = ?"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .context("Failed to fetch document set")?;

        row.map(DocumentSet::try_from).transpose()
    }

    /// Most recent successfully generated set with the same upload fingerprint
    pub async fn find_generated_by_fingerprint(&self, fingerprint: &str) -> Result<Option<DocumentSet>> {
        let row: Option<DocumentSetRow> = sqlx::query_as(concat!(
            "SELECT ",
            document_set_columns!(),
            " FROM document_sets WHERE fingerprint = ? AND status = ? ORDER BY id DESC LIMIT 1"
        ))
        .bind(fingerprint)
        .bind(ProcessingStatus::Generated.as_str())
        .fetch_optional(&self.pool)
        .await
        .context("Failed to fetch document set by fingerprint")?;

        row.map(DocumentSet::try_from).transpose()
    }

    pub async fn list_recent(&self, limit: i64) -> Result<Vec<DocumentSet>> {
        let rows: Vec<DocumentSetRow> = sqlx::query_as(concat!(
            "SELECT ",
            document_set_columns!(),
            " FROM document_sets ORDER BY created_at DESC, id DESC LIMIT ?"
        ))
        .bind(limit)
        .fetch_all(&self.pool)
        .await
        .context("Failed to list document sets")?;

        rows.into_iter().map(DocumentSet::try_from).collect()
    }

    pub async fn set_supplier_paths(&self, id: i64, paths: &SupplierPaths) -> Result<()> {
        sqlx::query(
            r#"
            UPDATE document_sets
            SET supplier_coa_path = ?, supplier_msds_path = ?, supplier_tds_path = ?,
                updated_at = ?
            WHERE id = ?
            "#,
        )
        .bind(&paths.coa)
        .bind(&paths.msds)
        .bind(&paths.tds)
        .bind(Utc::now())
        .bind(id)
        .execute(&self.pool)
        .await
        .context("Failed to store supplier paths")?;

        Ok(())
    }

    /// Store the extracted bag, its promoted columns and the test results in
    /// one transaction. Earlier test results for the set are replaced.
    pub async fn record_extraction(&self, id: i64, update: ExtractionUpdate<'_>) -> Result<()> {
        let fields = update.fields;
        let extracted_data = serde_json::to_string(fields)?;

        let mut tx = self.pool.begin().await?;

        sqlx::query(
            r#"
            UPDATE document_sets
            SET original_product_name = ?, supplier_name = ?, cas_number = ?,
                inci_name = ?, molecular_formula = ?, batch_number = ?,
                manufacturing_date = ?, expiry_date = ?, extracted_data = ?,
                status = ?, error_message = NULL, updated_at = ?
            WHERE id = ?
            "#,
        )
        .bind(fields.product_name.as_deref().unwrap_or_default())
        .bind(fields.supplier_name.as_deref().unwrap_or_default())
        .bind(fields.cas_number.as_deref())
        .bind(fields.inci_name.as_deref())
        .bind(fields.molecular_formula.as_deref())
        .bind(fields.batch_number.as_deref())
        .bind(update.manufacturing_date)
        .bind(update.expiry_date)
        .bind(&extracted_data)
        .bind(ProcessingStatus::Extracted.as_str())
        .bind(Utc::now())
        .bind(id)
        .execute(&mut *tx)
        .await
        .context("Failed to record extraction")?;

        sqlx::query("DELETE FROM test_results WHERE document_set_id = ?")
            .bind(id)
            .execute(&mut *tx)
            .await
            .context("Failed to clear previous test results")?;

        for row in &fields.test_results {
            sqlx::query(
                r#"
                INSERT INTO test_results
                    (document_set_id, test_item, method, specification, result, document_type)
                VALUES (?, ?, ?, ?, ?, ?)
                "#,
            )
            .bind(id)
            .bind(&row.test_item)
            .bind(row.method.as_deref())
            .bind(&row.specification)
            .bind(&row.result)
            .bind(row.document_type.label())
            .execute(&mut *tx)
            .await
            .context("Failed to insert test result")?;
        }

        tx.commit().await?;
        Ok(())
    }

    /// Record the three outputs and move the set to `generated`
    pub async fn record_generation(&self, id: i64, paths: &GeneratedPaths) -> Result<()> {
        sqlx::query(
            r#"
            UPDATE document_sets
            SET generated_coa_path = ?, generated_msds_path = ?, generated_tds_path = ?,
                status = ?, error_message = NULL, updated_at = ?
            WHERE id = ?
            "#,
        )
        .bind(&paths.coa)
        .bind(&paths.msds)
        .bind(&paths.tds)
        .bind(ProcessingStatus::Generated.as_str())
        .bind(Utc::now())
        .bind(id)
        .execute(&self.pool)
        .await
        .context("Failed to record generated documents")?;

        Ok(())
    }

    /// Move the set to `failed`. Generated paths are cleared so a failed set
    /// never points at partial output.
    pub async fn mark_failed(&self, id: i64, message: &str) -> Result<()> {
        sqlx::query(
            r#"
            UPDATE document_sets
            SET status = ?, error_message = ?,
                generated_coa_path = NULL, generated_msds_path = NULL, generated_tds_path = NULL,
                updated_at = ?
            WHERE id = ?
            "#,
        )
        .bind(ProcessingStatus::Failed.as_str())
        .bind(message)
        .bind(Utc::now())
        .bind(id)
        .execute(&self.pool)
        .await
        .context("Failed to mark document set as failed")?;

        Ok(())
    }

    /// Put a set back to `uploaded` ahead of reprocessing its stored files
    pub async fn reset_for_reprocess(&self, id: i64) -> Result<()> {
        sqlx::query(
            r#"
            UPDATE document_sets
            SET status = ?, error_message = NULL,
                generated_coa_path = NULL, generated_msds_path = NULL, generated_tds_path = NULL,
                updated_at = ?
            WHERE id = ?
            "#,
        )
        .bind(ProcessingStatus::Uploaded.as_str())
        .bind(Utc::now())
        .bind(id)
        .execute(&self.pool)
        .await
        .context("Failed to reset document set")?;

        Ok(())
    }
}

#[derive(Debug, FromRow)]
struct DocumentSetRow {
    id: i64,
    company_product_name: String,
    original_product_name: String,
    supplier_name: String,
    cas_number: Option<String>,
    inci_name: Option<String>,
    molecular_formula: Option<String>,
    batch_number: Option<String>,
    manufacturing_date: Option<NaiveDate>,
    expiry_date: Option<NaiveDate>,
    supplier_coa_path: Option<String>,
    supplier_msds_path: Option<String>,
    supplier_tds_path: Option<String>,
    generated_coa_path: Option<String>,
    generated_msds_path: Option<String>,
    generated_tds_path: Option<String>,
    status: String,
    error_message: Option<String>,
    fingerprint: String,
    extracted_data: Option<String>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<DocumentSetRow> for DocumentSet {
    type Error = anyhow::Error;

    fn try_from(row: DocumentSetRow) -> Result<Self> {
        let status = row.status.parse::<ProcessingStatus>()?;
        let extracted = match row.extracted_data.as_deref() {
            Some(json) => match serde_json::from_str::<ExtractedFields>(json) {
                Ok(fields) => Some(fields),
                Err(e) => {
                    tracing::warn!(document_set_id = row.id, error = %e, "Stored extracted data is not valid JSON");
                    None
                }
            },
            None => None,
        };

        Ok(Self {
            id: row.id,
            company_product_name: row.company_product_name,
            original_product_name: row.original_product_name,
            supplier_name: row.supplier_name,
            cas_number: row.cas_number,
            inci_name: row.inci_name,
            molecular_formula: row.molecular_formula,
            batch_number: row.batch_number,
            manufacturing_date: row.manufacturing_date,
            expiry_date: row.expiry_date,
            supplier_coa_path: row.supplier_coa_path,
            supplier_msds_path: row.supplier_msds_path,
            supplier_tds_path: row.supplier_tds_path,
            generated_coa_path: row.generated_coa_path,
            generated_msds_path: row.generated_msds_path,
            generated_tds_path: row.generated_tds_path,
            status,
            error_message: row.error_message,
            fingerprint: row.fingerprint,
            extracted,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}
