use anyhow::Result;

use chemdocs_models::DocumentKind;

use super::layout::Block;
use super::templates::TemplateEngine;
use super::{GeneratorContext, MISSING};

pub fn compose(ctx: &GeneratorContext<'_>, templates: &TemplateEngine) -> Result<Vec<Block>> {
    let fields = ctx.fields;
    let mut blocks = ctx.letterhead();

    blocks.push(Block::title(ctx.product_name()));
    blocks.push(Block::centered(format!("(INCI Name: {})", ctx.inci_name()), 10.0, false));
    blocks.push(Block::Spacer(16.0));

    blocks.extend(ctx.section(templates, "tds_description")?);

    blocks.push(Block::key_values([
        ("INCI Name:", ctx.inci_name()),
        ("CAS No.:", ctx.cas_number()),
        ("M.F.:", ctx.molecular_formula()),
    ]));
    blocks.push(Block::Spacer(12.0));

    blocks.push(Block::heading("Specification"));
    blocks.push(Block::table(
        vec![3.0, 2.5],
        Some(vec!["Test Items".into(), "Specifications".into()]),
        specification_rows(ctx),
    ));
    blocks.push(Block::Spacer(12.0));

    blocks.push(Block::heading("Usage Information"));
    blocks.push(Block::key_values([
        ("Recommended use level:", GeneratorContext::value(fields.recommended_use_level.as_deref())),
        ("Use Method:", GeneratorContext::value(fields.use_method.as_deref())),
        ("Package:", GeneratorContext::value(fields.package.as_deref())),
        ("Storage:", GeneratorContext::value(fields.storage_conditions.as_deref())),
        ("Shelf life:", GeneratorContext::value(fields.shelf_life.as_deref())),
    ]));

    Ok(blocks)
}

/// TDS specifications; without any, the COA items and their limits.
fn specification_rows(ctx: &GeneratorContext<'_>) -> Vec<Vec<String>> {
    let fields = ctx.fields;
    if !fields.specifications.is_empty() {
        return fields
            .specifications
            .iter()
            .map(|spec| vec![spec.name.clone(), GeneratorContext::value(Some(&spec.value))])
            .collect();
    }

    let from_coa: Vec<Vec<String>> = fields
        .test_results_for(DocumentKind::Coa)
        .map(|row| vec![row.test_item.clone(), GeneratorContext::value(Some(&row.specification))])
        .collect();

    if from_coa.is_empty() {
        vec![vec![MISSING.to_string(), MISSING.to_string()]]
    } else {
        from_coa
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chemdocs_models::{DocumentSet, ExtractedFields, ExtractedTestRow, SpecificationEntry};
    use chemdocs_utils::BrandingConfig;
    use chrono::NaiveDate;

    fn rows_for(fields: &ExtractedFields) -> Vec<Vec<String>> {
        let set = DocumentSet::default();
        let branding = BrandingConfig::default();
        let ctx = GeneratorContext {
            document_set: &set,
            fields,
            branding: &branding,
            today: NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(),
        };
        specification_rows(&ctx)
    }

    #[test]
    fn test_specifications_keep_order() {
        let fields = ExtractedFields {
            specifications: vec![
                SpecificationEntry { name: "Appearance".into(), value: "White powder".into() },
                SpecificationEntry { name: "Assay".into(), value: "".into() },
            ],
            ..Default::default()
        };
        assert_eq!(
            rows_for(&fields),
            vec![vec!["Appearance", "White powder"], vec!["Assay", "-"]]
        );
    }

    #[test]
    fn test_falls_back_to_coa_items() {
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
        assert_eq!(rows_for(&fields), vec![vec!["pH", "5.0-8.5"]]);
        assert_eq!(rows_for(&ExtractedFields::default()), vec![vec!["-", "-"]]);
    }
}
