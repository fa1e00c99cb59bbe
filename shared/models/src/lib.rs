//! # Chemdocs Domain Models
//!
//! Core records for the supplier document rebranding pipeline.
//!
//! ## Key Models
//!
//! - **DocumentSet**: one upload of COA, MSDS and TDS for a single product
//! - **TestResult**: a specification row extracted from a supplier document
//! - **ExtractedFields**: the schema-light field bag persisted as JSON
//! - **AiSettings**: runtime toggles for the optional AI assistance

pub mod document_set;
pub mod extracted;
pub mod settings;
pub mod test_result;

#[cfg(test)]
pub mod property_tests;

pub use document_set::*;
pub use extracted::*;
pub use settings::*;
pub use test_result::*;

use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ModelError {
    #[error("unknown document type: {0}")]
    UnknownDocumentKind(String),

    #[error("unknown processing status: {0}")]
    UnknownStatus(String),
}
