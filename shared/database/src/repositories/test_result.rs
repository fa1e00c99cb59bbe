//! Test Result Repository
//!
//! Read access to specification rows extracted from supplier documents.
//! Rows are written together with the extraction in
//! [`DocumentSetRepository::record_extraction`](super::DocumentSetRepository::record_extraction).

use anyhow::{Context, Result};
use sqlx::FromRow;

use chemdocs_models::{DocumentKind, TestResult};

use crate::sqlite::SqlitePool;

pub struct TestResultRepository {
    pool: SqlitePool,
}

impl TestResultRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// All rows for a document set, in extraction order
    pub async fn find_by_document_set(&self, document_set_id: i64) -> Result<Vec<TestResult>> {
        let rows: Vec<TestResultRow> = sqlx::query_as(
            r#"
            SELECT id, document_set_id, test_item, method, specification, result, document_type
            FROM test_results
            WHERE document_set_id = ?
            ORDER BY id
            "#,
        )
        .bind(document_set_id)
        .fetch_all(&self.pool)
        .await
        .context("Failed to fetch test results")?;

        rows.into_iter().map(TestResult::try_from).collect()
    }

    pub async fn count_by_document_set(&self, document_set_id: i64) -> Result<i64> {
        let row: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM test_results WHERE document_set_id = ?")
            .bind(document_set_id)
            .fetch_one(&self.pool)
            .await
            .context("Failed to count test results")?;

        Ok(row.0)
    }
}

#[derive(Debug, FromRow)]
struct TestResultRow {
    id: i64,
    document_set_id: i64,
    test_item: String,
    method: Option<String>,
    specification: String,
    result: String,
    document_type: String,
}

impl TryFrom<TestResultRow> for TestResult {
    type Error = anyhow::Error;

    fn try_from(row: TestResultRow) -> Result<Self> {
        Ok(Self {
            id: row.id,
            document_set_id: row.document_set_id,
            test_item: row.test_item,
            method: row.method,
            specification: row.specification,
            result: row.result,
            document_type: row.document_type.parse::<DocumentKind>()?,
        })
    }
}
