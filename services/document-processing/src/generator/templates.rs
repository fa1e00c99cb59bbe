//! Section Template Engine
//!
//! Handlebars templates for the narrative sections of the generated
//! documents. Tables and label/value grids are composed in code.

use anyhow::{Context, Result};
use handlebars::Handlebars;
use serde::Serialize;

/// A titled text section
#[derive(Debug, Clone, Copy)]
pub struct SectionTemplate {
    pub id: &'static str,
    pub title: &'static str,
    pub body: &'static str,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderedSection {
    pub title: String,
    pub body: String,
}

impl RenderedSection {
    /// Non-empty body lines
    pub fn lines(&self) -> impl Iterator<Item = &str> {
        self.body.lines().map(str::trim).filter(|line| !line.is_empty())
    }
}

const SECTIONS: &[SectionTemplate] = &[
    SectionTemplate {
        id: "coa_statement",
        title: "",
        body: "This is to certify that batch {{batch_number}} of {{product_name}} has been tested \
               and conforms to the specifications listed above.",
    },
    SectionTemplate {
        id: "msds_hazards",
        title: "2. Hazards Identification",
        body: r#"
Classification of the substance or mixture:
The product has been classified according to the legislation in force.
Classification according to Regulation (EC) No 1272/2008 as amended.
Label Elements: Not applicable.
Signal Words: Not applicable.
Hazard Statement(s): Not applicable.
Precautionary Statements: Not applicable.
"#,
    },
    SectionTemplate {
        id: "msds_composition",
        title: "3. Composition/Information on Ingredients",
        body: r#"
Substance: {{inci_name}}
{{#if cas_number}}CAS registry number {{cas_number}}.{{/if}}
"#,
    },
    SectionTemplate {
        id: "msds_first_aid",
        title: "4. First Aid Measures",
        body: r#"
After inhalation: Supply fresh air; consult a doctor in case of complaint.
After skin contact: Flush with plenty of water.
After eye contact: Rinse opened eye for several minutes under running water.
After swallowing: Rinse mouth. If symptoms persist consult a doctor.
"#,
    },
    SectionTemplate {
        id: "msds_fire_fighting",
        title: "5. Fire-Fighting Measures",
        body: r#"
Suitable extinguishing media: foam, carbon dioxide, dry powder, water spray.
Protective equipment: Wear self-contained respiratory protective device.
"#,
    },
    SectionTemplate {
        id: "msds_accidental_release",
        title: "6. Accidental Release Measures",
        body: r#"
Ensure adequate ventilation. Avoid contact with skin and eyes.
Collect spilled material mechanically and dispose of according to local regulations.
"#,
    },
    SectionTemplate {
        id: "msds_handling_storage",
        title: "7. Handling and Storage",
        body: r#"
Handling: Avoid formation of dust. Keep container tightly closed.
Storage: {{#if storage_conditions}}{{storage_conditions}}{{else}}Store in a cool, dry and well-ventilated place away from strong oxidants.{{/if}}
"#,
    },
    SectionTemplate {
        id: "msds_exposure_controls",
        title: "8. Exposure Controls/Personal Protection",
        body: r#"
Use appropriate personal protective equipment.
Respiratory protection: Not required under normal conditions of use.
Hand protection: Protective gloves.
Eye protection: Safety glasses.
"#,
    },
    SectionTemplate {
        id: "tds_description",
        title: "Description",
        body: "{{product_name}}{{#if inci_name}} (INCI: {{inci_name}}){{/if}} is a cosmetic raw material \
               supplied by {{company_name}}. The values below are typical specifications of current production.",
    },
];

/// Template engine
pub struct TemplateEngine {
    handlebars: Handlebars<'static>,
}

impl TemplateEngine {
    pub fn new() -> Result<Self> {
        let mut handlebars = Handlebars::new();
        // Output is PDF text, not HTML
        handlebars.register_escape_fn(handlebars::no_escape);

        for section in SECTIONS {
            handlebars
                .register_template_string(section.id, section.body)
                .with_context(|| format!("Invalid section template '{}'", section.id))?;
        }

        Ok(Self { handlebars })
    }

    pub fn render<T: Serialize>(&self, id: &str, data: &T) -> Result<RenderedSection> {
        let section = SECTIONS
            .iter()
            .find(|section| section.id == id)
            .with_context(|| format!("Template not found: {}", id))?;

        let body = self
            .handlebars
            .render(id, data)
            .with_context(|| format!("Failed to render section '{}'", id))?;

        Ok(RenderedSection {
            title: section.title.to_string(),
            body,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_all_templates_render_with_empty_data() {
        let engine = TemplateEngine::new().unwrap();
        for section in SECTIONS {
            assert!(engine.render(section.id, &json!({})).is_ok(), "{}", section.id);
        }
    }

    #[test]
    fn test_conditional_storage() {
        let engine = TemplateEngine::new().unwrap();

        let custom = engine
            .render("msds_handling_storage", &json!({ "storage_conditions": "Keep at 2-8°C" }))
            .unwrap();
        assert!(custom.lines().any(|line| line == "Storage: Keep at 2-8°C"));

        let fallback = engine.render("msds_handling_storage", &json!({})).unwrap();
        assert!(fallback.body.contains("cool, dry"));
        assert_eq!(fallback.title, "7. Handling and Storage");
    }

    #[test]
    fn test_no_html_escaping() {
        let engine = TemplateEngine::new().unwrap();
        let rendered = engine
            .render(
                "tds_description",
                &json!({ "product_name": "A&B <Extract>", "company_name": "Acme", "inci_name": "" }),
            )
            .unwrap();
        assert!(rendered.body.starts_with("A&B <Extract> is a cosmetic raw material"));
    }

    #[test]
    fn test_unknown_template() {
        let engine = TemplateEngine::new().unwrap();
        assert!(engine.render("missing", &json!({})).is_err());
    }
}
