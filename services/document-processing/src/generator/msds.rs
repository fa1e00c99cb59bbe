use anyhow::Result;

use super::layout::Block;
use super::templates::TemplateEngine;
use super::GeneratorContext;

const NARRATIVE_SECTIONS: &[&str] = &[
    "msds_first_aid",
    "msds_fire_fighting",
    "msds_accidental_release",
    "msds_handling_storage",
    "msds_exposure_controls",
];

pub fn compose(ctx: &GeneratorContext<'_>, templates: &TemplateEngine) -> Result<Vec<Block>> {
    let mut blocks = ctx.letterhead();

    blocks.push(Block::title("MATERIAL SAFETY DATA SHEET"));
    blocks.push(Block::Spacer(14.0));

    blocks.push(Block::heading("1. Identification"));
    blocks.push(Block::key_values([
        ("Product identifier:", ctx.product_name().to_string()),
        ("INCI name:", ctx.inci_name()),
        ("CAS No.:", ctx.cas_number()),
        ("Recommended use:", "Cosmetics industry formulations".to_string()),
        ("Company Name:", ctx.branding.company_name.clone()),
        ("Address:", ctx.branding.address.clone()),
        ("Mobile No.:", ctx.branding.phone.clone()),
    ]));
    blocks.push(Block::Spacer(8.0));

    blocks.extend(ctx.section(templates, "msds_hazards")?);

    blocks.extend(ctx.section(templates, "msds_composition")?);
    blocks.push(Block::table(
        vec![2.4, 1.4, 2.0],
        Some(vec!["Product Name".into(), "CAS No".into(), "Molecular Formula".into()]),
        vec![vec![ctx.inci_name(), ctx.cas_number(), ctx.molecular_formula()]],
    ));
    blocks.push(Block::Spacer(8.0));

    for id in NARRATIVE_SECTIONS {
        blocks.extend(ctx.section(templates, id)?);
    }

    blocks.push(Block::heading("9. Physical and Chemical Properties"));
    blocks.push(Block::key_values(physical_properties(ctx)));

    Ok(blocks)
}

/// Extracted properties first, then anything else the supplier listed
fn physical_properties(ctx: &GeneratorContext<'_>) -> Vec<(String, String)> {
    let fields = ctx.fields;
    let properties = &fields.physical_properties;

    let mut rows = vec![
        (
            "Appearance:".to_string(),
            GeneratorContext::value(properties.get("appearance").map(String::as_str)),
        ),
        (
            "Solubility:".to_string(),
            GeneratorContext::value(properties.get("solubility").map(String::as_str)),
        ),
        (
            "pH:".to_string(),
            GeneratorContext::value(fields.safety_data.get("ph").map(String::as_str)),
        ),
        ("Molecular Formula:".to_string(), ctx.molecular_formula()),
    ];

    rows.extend(
        properties
            .iter()
            .filter(|(key, _)| !matches!(key.as_str(), "appearance" | "solubility"))
            .map(|(key, value)| (format!("{}:", title_case(key)), value.clone())),
    );
    rows
}

fn title_case(key: &str) -> String {
    key.split(['_', ' '])
        .filter(|word| !word.is_empty())
        .map(|word| {
            let mut chars = word.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().chain(chars).collect(),
                None => String::new(),
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}
