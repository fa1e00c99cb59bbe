//! Material Safety Data Sheet fields.

use regex::Regex;
use std::sync::LazyLock;

use chemdocs_models::ExtractedFields;

use super::patterns::{cas_in, find_cas_numbers, LabelPattern};

static CAS_NUMBER: LazyLock<LabelPattern> = LazyLock::new(|| {
    LabelPattern::new(&["CAS No.", "CAS No", "CAS Number", "CAS号", "CAS"])
});
static MOLECULAR_FORMULA: LazyLock<LabelPattern> = LazyLock::new(|| {
    LabelPattern::new(&["Molecular formula", "M.F.", "Formula", "分子式"])
});
static SUPPLIER: LazyLock<LabelPattern> = LazyLock::new(|| {
    LabelPattern::new(&["Company Name", "Manufacturer", "Supplier", "公司名称", "生产商", "供应商"])
});
static APPEARANCE: LazyLock<LabelPattern> =
    LazyLock::new(|| LabelPattern::loose(&["Appearance", "外观"]));
static SOLUBILITY: LazyLock<LabelPattern> =
    LazyLock::new(|| LabelPattern::loose(&["Solubility", "溶解性"]));

static PH_VALUE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\bpH(?:[ \t]*value)?[ \t]*[:：\-]?[ \t]*(\d+(?:\.\d+)?(?:[ \t]*[-~～][ \t]*\d+(?:\.\d+)?)?)")
        .expect("pH regex")
});

static FORMULA_TOKEN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[(\[]?[A-Z][A-Za-z0-9()\[\]·.]*n?").expect("formula token regex")
});

pub fn extract(text: &str) -> ExtractedFields {
    let mut fields = ExtractedFields {
        cas_number: cas_number(text),
        molecular_formula: MOLECULAR_FORMULA.find(text).and_then(|value| formula(&value)),
        supplier_name: SUPPLIER.find(text),
        ..Default::default()
    };

    if let Some(ph) = PH_VALUE.captures(text).and_then(|caps| caps.get(1)) {
        fields.safety_data.insert("ph".to_string(), ph.as_str().trim().to_string());
    }
    if let Some(appearance) = APPEARANCE.find(text) {
        fields.physical_properties.insert("appearance".to_string(), appearance);
    }
    if let Some(solubility) = SOLUBILITY.find(text) {
        fields.physical_properties.insert("solubility".to_string(), solubility);
    }

    fields
}

/// Labelled CAS number, else the first checksum-valid CAS token anywhere
fn cas_number(text: &str) -> Option<String> {
    CAS_NUMBER
        .find(text)
        .and_then(|value| cas_in(&value))
        .or_else(|| {
            find_cas_numbers(text)
                .into_iter()
                .find(|candidate| candidate.checksum_valid)
                .map(|candidate| candidate.cas_number)
        })
}

fn formula(value: &str) -> Option<String> {
    FORMULA_TOKEN
        .find(value.trim())
        .map(|token| token.as_str().to_string())
}
