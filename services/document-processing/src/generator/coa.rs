use anyhow::Result;

use chemdocs_models::DocumentKind;

use super::layout::Block;
use super::templates::TemplateEngine;
use super::{GeneratorContext, MISSING};

pub fn compose(ctx: &GeneratorContext<'_>, templates: &TemplateEngine) -> Result<Vec<Block>> {
    let mut blocks = ctx.letterhead();

    blocks.push(Block::title("CERTIFICATE OF ANALYSIS"));
    blocks.push(Block::Spacer(14.0));

    blocks.push(Block::key_values([
        ("Product Name:", ctx.product_name().to_string()),
        ("INCI Name:", ctx.inci_name()),
        ("Batch Number:", ctx.batch_number()),
        ("Manufacturing Date:", ctx.manufacturing_date()),
        ("Expiry Date:", ctx.expiry_date()),
    ]));
    blocks.push(Block::Spacer(16.0));

    blocks.push(test_table(ctx));
    blocks.push(Block::Spacer(12.0));

    blocks.extend(ctx.section(templates, "coa_statement")?);

    blocks.push(Block::key_values([
        ("ISSUED DATE:", ctx.manufacturing_date()),
        ("TEST RESULT:", "PASS".to_string()),
    ]));
    blocks.push(Block::Spacer(24.0));
    blocks.push(Block::bold(&ctx.branding.company_name));

    Ok(blocks)
}

/// Supplier COA rows; without any, the TDS specifications with no result.
fn test_table(ctx: &GeneratorContext<'_>) -> Block {
    let rows: Vec<_> = ctx.fields.test_results_for(DocumentKind::Coa).collect();
    let with_method = rows.iter().any(|row| row.method.is_some());

    if !rows.is_empty() && with_method {
        return Block::table(
            vec![2.2, 1.4, 2.0, 1.4],
            Some(vec![
                "Test Items".into(),
                "Method".into(),
                "Specifications".into(),
                "Results".into(),
            ]),
            rows.iter()
                .map(|row| {
                    vec![
                        row.test_item.clone(),
                        GeneratorContext::value(row.method.as_deref()),
                        GeneratorContext::value(Some(&row.specification)),
                        GeneratorContext::value(Some(&row.result)),
                    ]
                })
                .collect(),
        );
    }

    let body: Vec<Vec<String>> = if !rows.is_empty() {
        rows.iter()
            .map(|row| {
                vec![
                    row.test_item.clone(),
                    GeneratorContext::value(Some(&row.specification)),
                    GeneratorContext::value(Some(&row.result)),
                ]
            })
            .collect()
    } else if !ctx.fields.specifications.is_empty() {
        ctx.fields
            .specifications
            .iter()
            .map(|spec| vec![spec.name.clone(), spec.value.clone(), MISSING.to_string()])
            .collect()
    } else {
        vec![vec![MISSING.to_string(), MISSING.to_string(), MISSING.to_string()]]
    };

    Block::table(
        vec![2.5, 2.0, 1.5],
        Some(vec!["Test Items".into(), "Specifications".into(), "Results".into()]),
        body,
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::generator::layout::Table;
    use chemdocs_models::{DocumentSet, ExtractedFields, ExtractedTestRow, SpecificationEntry};
    use chemdocs_utils::BrandingConfig;
    use chrono::NaiveDate;

    fn table_rows(fields: &ExtractedFields) -> Table {
        let set = DocumentSet::default();
        let branding = BrandingConfig::default();
        let ctx = GeneratorContext {
            document_set: &set,
            fields,
            branding: &branding,
            today: NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(),
        };
        match test_table(&ctx) {
            Block::Table(table) => table,
            other => panic!("expected table, got {:?}", other),
        }
    }

    #[test]
    fn test_uses_coa_rows() {
        let fields = ExtractedFields {
            test_results: vec![ExtractedTestRow {
                test_item: "pH".into(),
                method: None,
                specification: "5.0-8.5".into(),
                result: "6.8".into(),
                document_type: DocumentKind::Coa,
            }],
            ..Default::default()
        };
        let table = table_rows(&fields);
        assert_eq!(table.rows, vec![vec!["pH", "5.0-8.5", "6.8"]]);
        assert_eq!(table.header.unwrap().len(), 3);
    }

    #[test]
    fn test_method_column_when_present() {
        let fields = ExtractedFields {
            test_results: vec![ExtractedTestRow {
                test_item: "Assay".into(),
                method: Some("HPLC".into()),
                specification: ">=99%".into(),
                result: "99.4%".into(),
                document_type: DocumentKind::Coa,
            }],
            ..Default::default()
        };
        let table = table_rows(&fields);
        assert_eq!(table.rows, vec![vec!["Assay", "HPLC", ">=99%", "99.4%"]]);
    }

    #[test]
    fn test_falls_back_to_tds_specifications() {
        let fields = ExtractedFields {
            specifications: vec![SpecificationEntry {
                name: "Appearance".into(),
                value: "White powder".into(),
            }],
            ..Default::default()
        };
        let table = table_rows(&fields);
        assert_eq!(table.rows, vec![vec!["Appearance", "White powder", "-"]]);
    }

    #[test]
    fn test_placeholder_row_without_data() {
        let table = table_rows(&ExtractedFields::default());
        assert_eq!(table.rows, vec![vec!["-", "-", "-"]]);
    }
}
