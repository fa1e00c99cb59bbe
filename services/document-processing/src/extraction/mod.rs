//! Field Extraction
//!
//! Pattern-based extraction of the fields the generators need from the text
//! of each supplier document. Labels are matched in English and Chinese.

use chrono::NaiveDate;
use regex::Regex;
use std::sync::LazyLock;

use chemdocs_models::{DocumentKind, ExtractedFields};

mod coa;
mod msds;
pub mod patterns;
pub mod table;
mod tds;

pub use patterns::{find_cas_numbers, CasMatch};

const DATE_FORMATS: &[&str] = &[
    "%d-%m-%Y",
    "%Y-%m-%d",
    "%d/%m/%Y",
    "%Y/%m/%d",
    "%d.%m.%Y",
    "%Y.%m.%d",
    "%Y年%m月%d日",
];

static DATE_TOKEN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\d{4}年\d{1,2}月\d{1,2}日|\d{4}[-/.]\d{1,2}[-/.]\d{1,2}|\d{1,2}[-/.]\d{1,2}[-/.]\d{4}")
        .expect("date token regex")
});

/// Extract the fields of one supplier document from its text.
pub fn extract_fields(kind: DocumentKind, text: &str) -> ExtractedFields {
    let fields = match kind {
        DocumentKind::Coa => coa::extract(text),
        DocumentKind::Msds => msds::extract(text),
        DocumentKind::Tds => tds::extract(text),
    };

    tracing::debug!(
        document_type = %kind,
        test_results = fields.test_results.len(),
        specifications = fields.specifications.len(),
        "Fields extracted"
    );
    fields
}

/// Combine per-document fields in COA, MSDS, TDS order; later non-empty
/// values win.
pub fn merge_documents(parts: impl IntoIterator<Item = (DocumentKind, ExtractedFields)>) -> ExtractedFields {
    let mut parts: Vec<(DocumentKind, ExtractedFields)> = parts.into_iter().collect();
    parts.sort_by_key(|(kind, _)| *kind);

    let mut merged = ExtractedFields::default();
    for (_, fields) in parts {
        merged.merge(fields);
    }
    merged
}

/// Parse the date inside an extracted value. Returns `None` for values that
/// contain no date in a known format.
pub fn parse_date(value: &str) -> Option<NaiveDate> {
    let token = DATE_TOKEN.find(value)?.as_str();
    DATE_FORMATS
        .iter()
        .find_map(|format| NaiveDate::parse_from_str(token, format).ok())
}
