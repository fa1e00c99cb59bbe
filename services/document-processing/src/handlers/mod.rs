pub mod document_sets;
pub mod health;
pub mod settings;

pub use document_sets::*;
pub use health::*;
pub use settings::*;
