use serde::{Deserialize, Serialize};

use crate::document_set::DocumentKind;

/// Persisted specification row belonging to a document set.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TestResult {
    pub id: i64,
    pub document_set_id: i64,
    pub test_item: String,
    pub method: Option<String>,
    pub specification: String,
    pub result: String,
    pub document_type: DocumentKind,
}
