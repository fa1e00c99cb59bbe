use crate::error::{ChemdocsError, ChemdocsResult};
use regex::Regex;
use std::sync::LazyLock;
use validator::{Validate, ValidationErrors};

static CAS_FORMAT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\d{2,7}-\d{2}-\d$").expect("CAS format regex"));

/// Leading bytes of every PDF file
pub const PDF_SIGNATURE: &[u8] = b"%PDF-";

pub fn validate_model<T: Validate>(model: &T) -> ChemdocsResult<()> {
    match model.validate() {
        Ok(()) => Ok(()),
        Err(errors) => {
            let error_messages = format_validation_errors(&errors);
            Err(ChemdocsError::validation("model", error_messages))
        }
    }
}

pub fn format_validation_errors(errors: &ValidationErrors) -> String {
    let mut messages = Vec::new();

    for (field, field_errors) in errors.field_errors() {
        for error in field_errors {
            let message = match &error.code {
                std::borrow::Cow::Borrowed("length") => {
                    format!("Length validation failed for field '{}'", field)
                }
                std::borrow::Cow::Borrowed("range") => {
                    format!("Value out of range for field '{}'", field)
                }
                std::borrow::Cow::Borrowed("required") => {
                    format!("Field '{}' is required", field)
                }
                _ => format!("Validation failed for field '{}': {}", field, error.code),
            };
            messages.push(message);
        }
    }

    messages.sort();
    messages.join(", ")
}

/// Check digit test for a CAS registry number that already has the right shape.
pub fn cas_checksum_valid(cas_number: &str) -> bool {
    let digits: Vec<u32> = cas_number.chars().filter_map(|c| c.to_digit(10)).collect();
    let Some((check_digit, body)) = digits.split_last() else {
        return false;
    };

    let sum: u32 = body
        .iter()
        .rev()
        .enumerate()
        .map(|(i, digit)| digit * (i as u32 + 1))
        .sum();

    sum % 10 == *check_digit
}

pub fn validate_cas_number(cas_number: &str) -> ChemdocsResult<()> {
    if !CAS_FORMAT.is_match(cas_number) {
        return Err(ChemdocsError::validation(
            "cas_number",
            "Invalid CAS number format. Expected format: XXXXXX-XX-X",
        ));
    }

    if !cas_checksum_valid(cas_number) {
        return Err(ChemdocsError::validation(
            "cas_number",
            "Invalid CAS number check digit",
        ));
    }

    Ok(())
}

pub fn validate_file_type(file_name: &str, allowed_types: &[&str]) -> ChemdocsResult<()> {
    let extension = std::path::Path::new(file_name)
        .extension()
        .and_then(|ext| ext.to_str())
        .unwrap_or("");

    if !allowed_types.contains(&extension.to_lowercase().as_str()) {
        return Err(ChemdocsError::validation(
            "file_type",
            format!("File type '{}' not allowed. Allowed types: {}", extension, allowed_types.join(", ")),
        ));
    }

    Ok(())
}

pub fn validate_file_size(file_size: u64, max_size: u64) -> ChemdocsResult<()> {
    if file_size > max_size {
        return Err(ChemdocsError::payload_too_large(format!(
            "File is too large. Maximum size is {}MB.",
            max_size / (1024 * 1024)
        )));
    }

    Ok(())
}

/// Content check in addition to the extension check: the body must be a PDF
pub fn validate_pdf_signature(data: &[u8]) -> ChemdocsResult<()> {
    // Some producers emit a few junk bytes before the header
    let window = &data[..data.len().min(1024)];
    let found = window
        .windows(PDF_SIGNATURE.len())
        .any(|candidate| candidate == PDF_SIGNATURE);

    if !found {
        return Err(ChemdocsError::validation(
            "file_content",
            "File content is not a PDF document",
        ));
    }

    Ok(())
}

/// Reduce an uploaded file name to a safe, ASCII-only name for the local
/// filesystem. Returns an empty string when nothing usable remains.
pub fn secure_filename(file_name: &str) -> String {
    // Keep only the last path component, whatever separator the client used
    let base = file_name
        .rsplit(['/', '\\'])
        .next()
        .unwrap_or(file_name);

    let mut cleaned = String::with_capacity(base.len());
    for c in base.chars() {
        if c.is_ascii_alphanumeric() || matches!(c, '.' | '-' | '_') {
            cleaned.push(c);
        } else if c.is_whitespace() {
            cleaned.push('_');
        }
    }

    cleaned.trim_matches(|c| c == '.' || c == '_').to_string()
}

/// File-name fragment built from a product name: spaces become underscores
pub fn product_file_stem(product_name: &str) -> String {
    let stem = secure_filename(&product_name.trim().replace(' ', "_"));
    if stem.is_empty() {
        "product".to_string()
    } else {
        stem
    }
}
