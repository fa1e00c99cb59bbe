//! Certificate of Analysis fields and test-result table.

use std::sync::LazyLock;

use chemdocs_models::{DocumentKind, ExtractedFields, ExtractedTestRow};

use super::patterns::LabelPattern;
use super::table::{body_lines, contains_any, split_cells};

static PRODUCT_NAME: LazyLock<LabelPattern> =
    LazyLock::new(|| LabelPattern::new(&["Product Name", "产品名称", "品名"]));
static INCI_NAME: LazyLock<LabelPattern> =
    LazyLock::new(|| LabelPattern::new(&["INCI Name", "INCI名称"]));
static BATCH_NUMBER: LazyLock<LabelPattern> = LazyLock::new(|| {
    LabelPattern::new(&["Batch Number", "Batch No.", "Batch No", "Lot No.", "Lot No", "批号"])
});
static MANUFACTURING_DATE: LazyLock<LabelPattern> = LazyLock::new(|| {
    LabelPattern::new(&["Manufacturing Date", "Production Date", "MFG Date", "生产日期"])
});
static EXPIRY_DATE: LazyLock<LabelPattern> = LazyLock::new(|| {
    LabelPattern::new(&["Expiry Date", "Expiration Date", "EXP Date", "有效期至", "失效日期"])
});

const ITEM_HEADERS: &[&str] = &["items", "检验项目", "检测项目"];
const SPEC_HEADERS: &[&str] = &["specification", "standard", "标准", "指标"];
const RESULT_HEADERS: &[&str] = &["result", "结果"];
const TABLE_END: &[&str] = &["issued date", "conclusion", "结论"];
const MAX_TABLE_LINES: usize = 20;

pub fn extract(text: &str) -> ExtractedFields {
    ExtractedFields {
        product_name: PRODUCT_NAME.find(text),
        inci_name: INCI_NAME.find(text),
        batch_number: BATCH_NUMBER.find(text),
        manufacturing_date: MANUFACTURING_DATE.find(text),
        expiry_date: EXPIRY_DATE.find(text),
        test_results: test_results(text),
        ..Default::default()
    }
}

fn is_header(line: &str) -> bool {
    contains_any(line, ITEM_HEADERS) && contains_any(line, SPEC_HEADERS) && contains_any(line, RESULT_HEADERS)
}

/// Rows under every test-result header. Tables split across pages repeat
/// their header, so scanning resumes after each consumed block.
fn test_results(text: &str) -> Vec<ExtractedTestRow> {
    let lines: Vec<&str> = text.lines().collect();
    let mut rows = Vec::new();
    let mut index = 0;

    while index < lines.len() {
        if !is_header(lines[index]) {
            index += 1;
            continue;
        }

        let mut last = index;
        for (line_index, line) in body_lines(&lines, index, MAX_TABLE_LINES, TABLE_END) {
            last = line_index;
            if is_header(line) {
                last = line_index - 1;
                break;
            }
            if let Some(row) = parse_row(line) {
                rows.push(row);
            }
        }
        index = last + 1;
    }

    rows
}

fn parse_row(line: &str) -> Option<ExtractedTestRow> {
    let mut cells = split_cells(line);
    if cells.len() < 3 {
        return None;
    }

    let (method, specification, result) = if cells.len() >= 4 {
        let result = cells.swap_remove(3);
        let specification = cells.swap_remove(2);
        (Some(cells.swap_remove(1)), specification, result)
    } else {
        let result = cells.swap_remove(2);
        (None, cells.swap_remove(1), result)
    };

    Some(ExtractedTestRow {
        test_item: cells.swap_remove(0),
        method,
        specification,
        result,
        document_type: DocumentKind::Coa,
    })
}
