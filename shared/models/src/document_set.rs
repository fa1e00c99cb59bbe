use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use validator::Validate;

use crate::extracted::ExtractedFields;
use crate::ModelError;

/// The three supplier document types handled per upload.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum DocumentKind {
    Coa,
    Msds,
    Tds,
}

impl DocumentKind {
    pub const ALL: [DocumentKind; 3] = [DocumentKind::Coa, DocumentKind::Msds, DocumentKind::Tds];

    /// Lowercase identifier used in URLs and stored file names
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Coa => "coa",
            Self::Msds => "msds",
            Self::Tds => "tds",
        }
    }

    /// Uppercase label used in messages and generated file names
    pub fn label(&self) -> &'static str {
        match self {
            Self::Coa => "COA",
            Self::Msds => "MSDS",
            Self::Tds => "TDS",
        }
    }

    /// Multipart field carrying the supplier's copy of this document
    pub fn form_field(&self) -> &'static str {
        match self {
            Self::Coa => "supplier_coa",
            Self::Msds => "supplier_msds",
            Self::Tds => "supplier_tds",
        }
    }

    pub fn title(&self) -> &'static str {
        match self {
            Self::Coa => "Certificate of Analysis",
            Self::Msds => "Material Safety Data Sheet",
            Self::Tds => "Technical Data Sheet",
        }
    }

    pub fn from_form_field(field: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|kind| kind.form_field() == field)
    }
}

impl fmt::Display for DocumentKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for DocumentKind {
    type Err = ModelError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "coa" => Ok(Self::Coa),
            "msds" | "sds" => Ok(Self::Msds),
            "tds" => Ok(Self::Tds),
            other => Err(ModelError::UnknownDocumentKind(other.to_string())),
        }
    }
}

/// Lifecycle of a document set: uploaded → extracted → generated, or failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProcessingStatus {
    Uploaded,
    Extracted,
    Generated,
    Failed,
}

impl ProcessingStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Uploaded => "uploaded",
            Self::Extracted => "extracted",
            Self::Generated => "generated",
            Self::Failed => "failed",
        }
    }
}

impl FromStr for ProcessingStatus {
    type Err = ModelError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "uploaded" => Ok(Self::Uploaded),
            "extracted" => Ok(Self::Extracted),
            "generated" => Ok(Self::Generated),
            "failed" => Ok(Self::Failed),
            other => Err(ModelError::UnknownStatus(other.to_string())),
        }
    }
}

/// One upload session: three supplier documents for a single product.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DocumentSet {
    pub id: i64,
    pub company_product_name: String,
    pub original_product_name: String,
    pub supplier_name: String,
    pub cas_number: Option<String>,
    pub inci_name: Option<String>,
    pub molecular_formula: Option<String>,
    pub batch_number: Option<String>,
    pub manufacturing_date: Option<NaiveDate>,
    pub expiry_date: Option<NaiveDate>,
    pub supplier_coa_path: Option<String>,
    pub supplier_msds_path: Option<String>,
    pub supplier_tds_path: Option<String>,
    pub generated_coa_path: Option<String>,
    pub generated_msds_path: Option<String>,
    pub generated_tds_path: Option<String>,
    pub status: ProcessingStatus,
    pub error_message: Option<String>,
    pub fingerprint: String,
    pub extracted: Option<ExtractedFields>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl DocumentSet {
    pub fn supplier_path(&self, kind: DocumentKind) -> Option<&str> {
        match kind {
            DocumentKind::Coa => self.supplier_coa_path.as_deref(),
            DocumentKind::Msds => self.supplier_msds_path.as_deref(),
            DocumentKind::Tds => self.supplier_tds_path.as_deref(),
        }
    }

    pub fn generated_path(&self, kind: DocumentKind) -> Option<&str> {
        match kind {
            DocumentKind::Coa => self.generated_coa_path.as_deref(),
            DocumentKind::Msds => self.generated_msds_path.as_deref(),
            DocumentKind::Tds => self.generated_tds_path.as_deref(),
        }
    }

    /// All three supplier uploads are on record
    pub fn has_all_uploads(&self) -> bool {
        DocumentKind::ALL.iter().all(|kind| self.supplier_path(*kind).is_some())
    }

    pub fn is_generated(&self) -> bool {
        self.status == ProcessingStatus::Generated
            && DocumentKind::ALL.iter().all(|kind| self.generated_path(*kind).is_some())
    }
}

impl Default for DocumentSet {
    fn default() -> Self {
        Self {
            id: 0,
            company_product_name: String::new(),
            original_product_name: String::new(),
            supplier_name: String::new(),
            cas_number: None,
            inci_name: None,
            molecular_formula: None,
            batch_number: None,
            manufacturing_date: None,
            expiry_date: None,
            supplier_coa_path: None,
            supplier_msds_path: None,
            supplier_tds_path: None,
            generated_coa_path: None,
            generated_msds_path: None,
            generated_tds_path: None,
            status: ProcessingStatus::Uploaded,
            error_message: None,
            fingerprint: String::new(),
            extracted: None,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }
}

/// Generated output locations, recorded together once all three exist.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GeneratedPaths {
    pub coa: String,
    pub msds: String,
    pub tds: String,
}

/// Stored supplier upload locations.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SupplierPaths {
    pub coa: String,
    pub msds: String,
    pub tds: String,
}

/// Upload form metadata accompanying the three files.
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct UploadMetadata {
    #[validate(length(min = 1, max = 200))]
    pub company_product_name: String,
}
