//! Repository module for database CRUD operations
//!
//! Typed repositories for document sets and their extracted test results.

pub mod document_set;
pub mod test_result;

pub use document_set::{DocumentSetRepository, ExtractionUpdate};
pub use test_result::TestResultRepository;
