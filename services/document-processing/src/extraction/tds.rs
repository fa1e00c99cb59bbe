//! Technical Data Sheet specification table and usage information.

use std::sync::LazyLock;

use chemdocs_models::{ExtractedFields, SpecificationEntry};

use super::patterns::LabelPattern;
use super::table::{body_lines, contains_any, split_cells};

static USE_LEVEL: LazyLock<LabelPattern> = LazyLock::new(|| {
    LabelPattern::new(&["Recommended use level", "Recommended dosage", "Use level", "推荐用量", "建议用量"])
});
static USE_METHOD: LazyLock<LabelPattern> =
    LazyLock::new(|| LabelPattern::new(&["Use Method", "Usage", "使用方法"]));
static STORAGE: LazyLock<LabelPattern> = LazyLock::new(|| {
    LabelPattern::new(&["Storage Conditions", "Storage", "储存条件", "贮存条件", "储存", "贮存"])
});
static SHELF_LIFE: LazyLock<LabelPattern> =
    LazyLock::new(|| LabelPattern::new(&["Shelf life", "保质期"]));
static PACKAGE: LazyLock<LabelPattern> =
    LazyLock::new(|| LabelPattern::new(&["Package", "Packaging", "包装"]));
static INCI_NAME: LazyLock<LabelPattern> =
    LazyLock::new(|| LabelPattern::new(&["INCI Name", "INCI名称"]));

const TABLE_HEADERS: &[&str] = &["specifications", "test items", "检验项目", "指标"];
/// Usage lines interleaved with the specification table
const USAGE_WORDS: &[&str] = &[
    "recommended",
    "use",
    "package",
    "storage",
    "shelf life",
    "推荐用量",
    "使用",
    "包装",
    "储存",
    "贮存",
    "保质期",
];
const MAX_TABLE_LINES: usize = 30;

pub fn extract(text: &str) -> ExtractedFields {
    ExtractedFields {
        inci_name: INCI_NAME.find(text),
        specifications: specifications(text),
        recommended_use_level: USE_LEVEL.find(text),
        use_method: USE_METHOD.find(text),
        storage_conditions: STORAGE.find(text),
        shelf_life: SHELF_LIFE.find(text),
        package: PACKAGE.find(text),
        ..Default::default()
    }
}

/// Entries of the first header that yields any; order follows the sheet and
/// a repeated name keeps its first value.
fn specifications(text: &str) -> Vec<SpecificationEntry> {
    let lines: Vec<&str> = text.lines().collect();

    for (index, line) in lines.iter().enumerate() {
        if !contains_any(line, TABLE_HEADERS) {
            continue;
        }

        let mut entries: Vec<SpecificationEntry> = Vec::new();
        for (_, line) in body_lines(&lines, index, MAX_TABLE_LINES, &[]) {
            if line.is_empty() || contains_any(line, TABLE_HEADERS) || contains_any(line, USAGE_WORDS) {
                continue;
            }

            let cells = split_cells(line);
            if cells.len() < 2 || cells[0].ends_with([':', '：']) {
                continue;
            }
            if entries.iter().any(|entry| entry.name == cells[0]) {
                continue;
            }

            entries.push(SpecificationEntry {
                name: cells[0].clone(),
                value: cells[1].clone(),
            });
        }

        if !entries.is_empty() {
            return entries;
        }
    }

    Vec::new()
}
