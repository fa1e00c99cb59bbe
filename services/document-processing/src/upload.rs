//! Upload form: the three supplier PDFs and the company product name.

use sha2::{Digest, Sha256};

use chemdocs_models::{DocumentKind, UploadMetadata};
use chemdocs_utils::{
    validate_file_size, validate_file_type, validate_model, validate_pdf_signature, ChemdocsError,
    ChemdocsResult,
};

pub const PRODUCT_NAME_FIELD: &str = "company_product_name";

#[derive(Debug, Clone)]
pub struct UploadedFile {
    pub file_name: String,
    pub data: Vec<u8>,
}

/// A complete, validated upload
#[derive(Debug, Clone)]
pub struct UploadForm {
    pub company_product_name: String,
    pub coa: UploadedFile,
    pub msds: UploadedFile,
    pub tds: UploadedFile,
}

impl UploadForm {
    pub fn file(&self, kind: DocumentKind) -> &UploadedFile {
        match kind {
            DocumentKind::Coa => &self.coa,
            DocumentKind::Msds => &self.msds,
            DocumentKind::Tds => &self.tds,
        }
    }

    /// SHA-256 over the product name and the three file bodies. Identical
    /// uploads share a fingerprint.
    pub fn fingerprint(&self) -> String {
        let mut hasher = Sha256::new();
        hasher.update(self.company_product_name.trim().as_bytes());
        for kind in DocumentKind::ALL {
            let data = &self.file(kind).data;
            hasher.update([0u8]);
            hasher.update(kind.label().as_bytes());
            hasher.update((data.len() as u64).to_be_bytes());
            hasher.update(data);
        }
        hex::encode(hasher.finalize())
    }
}

/// Collects multipart parts and validates them into an [`UploadForm`].
#[derive(Debug, Default)]
pub struct UploadFormBuilder {
    company_product_name: Option<String>,
    coa: Option<UploadedFile>,
    msds: Option<UploadedFile>,
    tds: Option<UploadedFile>,
}

impl UploadFormBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn product_name(&mut self, name: impl Into<String>) {
        self.company_product_name = Some(name.into());
    }

    pub fn file(&mut self, kind: DocumentKind, file: UploadedFile) {
        let slot = match kind {
            DocumentKind::Coa => &mut self.coa,
            DocumentKind::Msds => &mut self.msds,
            DocumentKind::Tds => &mut self.tds,
        };
        *slot = Some(file);
    }

    pub fn build(self, max_file_size: u64) -> ChemdocsResult<UploadForm> {
        if self.coa.is_none() || self.msds.is_none() || self.tds.is_none() {
            return Err(ChemdocsError::validation(
                "files",
                "Please upload all three required documents (COA, MSDS, TDS)",
            ));
        }

        let coa = validate_file(DocumentKind::Coa, self.coa, max_file_size)?;
        let msds = validate_file(DocumentKind::Msds, self.msds, max_file_size)?;
        let tds = validate_file(DocumentKind::Tds, self.tds, max_file_size)?;

        let company_product_name = self
            .company_product_name
            .map(|name| name.trim().to_string())
            .unwrap_or_default();
        if company_product_name.is_empty() {
            return Err(ChemdocsError::validation(
                PRODUCT_NAME_FIELD,
                "Please provide a company product name",
            ));
        }
        validate_model(&UploadMetadata {
            company_product_name: company_product_name.clone(),
        })?;

        Ok(UploadForm {
            company_product_name,
            coa,
            msds,
            tds,
        })
    }
}

fn validate_file(
    kind: DocumentKind,
    file: Option<UploadedFile>,
    max_file_size: u64,
) -> ChemdocsResult<UploadedFile> {
    let field = kind.form_field();
    let file = match file {
        Some(file) if !file.file_name.trim().is_empty() => file,
        _ => {
            return Err(ChemdocsError::validation(
                field,
                format!("Please select a {} file", kind.label()),
            ))
        }
    };

    let must_be_pdf = || ChemdocsError::validation(field, format!("{} file must be a PDF", kind.label()));

    validate_file_type(&file.file_name, &["pdf"]).map_err(|_| must_be_pdf())?;
    validate_file_size(file.data.len() as u64, max_file_size)?;
    if file.data.is_empty() {
        return Err(ChemdocsError::validation(
            field,
            format!("{} file is empty", kind.label()),
        ));
    }
    validate_pdf_signature(&file.data).map_err(|_| must_be_pdf())?;

    Ok(file)
}
