use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::document_set::DocumentKind;

/// A row read from a supplier's test-result table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExtractedTestRow {
    pub test_item: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub method: Option<String>,
    #[serde(default)]
    pub specification: String,
    #[serde(default)]
    pub result: String,
    pub document_type: DocumentKind,
}

/// One line of a TDS specification table. Order follows the source document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SpecificationEntry {
    pub name: String,
    pub value: String,
}

/// Field bag collected from the three supplier documents.
///
/// Supplier layouts vary, so only the fields the generators consume are
/// typed. Anything else (for example `validation_notes` added by the AI
/// validator) lands in `extra` and survives serialization.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExtractedFields {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub product_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub supplier_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cas_number: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub inci_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub molecular_formula: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub batch_number: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub manufacturing_date: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expiry_date: Option<String>,
    pub test_results: Vec<ExtractedTestRow>,
    pub specifications: Vec<SpecificationEntry>,
    pub safety_data: BTreeMap<String, String>,
    pub physical_properties: BTreeMap<String, String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub recommended_use_level: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub use_method: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub storage_conditions: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub shelf_life: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub package: Option<String>,
    #[serde(flatten)]
    pub extra: BTreeMap<String, serde_json::Value>,
}

fn overlay(target: &mut Option<String>, value: Option<String>) {
    if let Some(value) = value {
        let trimmed = value.trim();
        if !trimmed.is_empty() {
            *target = Some(trimmed.to_string());
        }
    }
}

impl ExtractedFields {
    /// Merge a later document's fields over this one.
    ///
    /// Non-empty scalar values replace earlier ones; lists and maps are
    /// replaced only when the later document actually produced entries.
    pub fn merge(&mut self, other: ExtractedFields) {
        overlay(&mut self.product_name, other.product_name);
        overlay(&mut self.supplier_name, other.supplier_name);
        overlay(&mut self.cas_number, other.cas_number);
        overlay(&mut self.inci_name, other.inci_name);
        overlay(&mut self.molecular_formula, other.molecular_formula);
        overlay(&mut self.batch_number, other.batch_number);
        overlay(&mut self.manufacturing_date, other.manufacturing_date);
        overlay(&mut self.expiry_date, other.expiry_date);
        overlay(&mut self.recommended_use_level, other.recommended_use_level);
        overlay(&mut self.use_method, other.use_method);
        overlay(&mut self.storage_conditions, other.storage_conditions);
        overlay(&mut self.shelf_life, other.shelf_life);
        overlay(&mut self.package, other.package);

        if !other.test_results.is_empty() {
            self.test_results = other.test_results;
        }
        if !other.specifications.is_empty() {
            self.specifications = other.specifications;
        }
        self.safety_data.extend(other.safety_data);
        self.physical_properties.extend(other.physical_properties);
        self.extra.extend(other.extra);
    }

    /// Test rows that came from a particular document type
    pub fn test_results_for(&self, kind: DocumentKind) -> impl Iterator<Item = &ExtractedTestRow> {
        self.test_results.iter().filter(move |row| row.document_type == kind)
    }

    pub fn is_empty(&self) -> bool {
        *self == ExtractedFields::default()
    }
}
