//! Document Generator
//!
//! Builds the company-branded COA, MSDS and TDS from a document set and its
//! extracted fields.

use anyhow::Result;
use chrono::{Duration, NaiveDate};
use serde_json::json;

use chemdocs_models::{DocumentKind, DocumentSet, ExtractedFields};
use chemdocs_utils::{product_file_stem, BrandingConfig};

mod coa;
pub mod layout;
mod msds;
mod tds;
pub mod templates;

use layout::{render_document, Block};
use templates::TemplateEngine;

/// Placeholder for values the supplier documents did not provide
pub const MISSING: &str = "-";

/// Everything a generator reads while composing one document.
pub struct GeneratorContext<'a> {
    pub document_set: &'a DocumentSet,
    pub fields: &'a ExtractedFields,
    pub branding: &'a BrandingConfig,
    pub today: NaiveDate,
}

impl<'a> GeneratorContext<'a> {
    pub fn product_name(&self) -> &str {
        &self.document_set.company_product_name
    }

    /// Extracted value, or the document set column, or `-`
    fn pick(primary: Option<&str>, fallback: Option<&str>) -> String {
        primary
            .or(fallback)
            .map(str::trim)
            .filter(|value| !value.is_empty())
            .unwrap_or(MISSING)
            .to_string()
    }

    pub fn inci_name(&self) -> String {
        Self::pick(self.fields.inci_name.as_deref(), self.document_set.inci_name.as_deref())
    }

    pub fn cas_number(&self) -> String {
        Self::pick(self.fields.cas_number.as_deref(), self.document_set.cas_number.as_deref())
    }

    pub fn molecular_formula(&self) -> String {
        Self::pick(
            self.fields.molecular_formula.as_deref(),
            self.document_set.molecular_formula.as_deref(),
        )
    }

    pub fn value(value: Option<&str>) -> String {
        Self::pick(value, None)
    }

    pub fn batch_number(&self) -> String {
        batch_number(&self.branding.batch_prefix, self.today, self.document_set.id)
    }

    pub fn manufacturing_date(&self) -> String {
        self.today.format("%d-%m-%Y").to_string()
    }

    pub fn expiry_date(&self) -> String {
        (self.today + Duration::days(self.branding.shelf_life_days))
            .format("%d-%m-%Y")
            .to_string()
    }

    /// Company letterhead shared by all three documents
    pub fn letterhead(&self) -> Vec<Block> {
        vec![
            Block::centered(&self.branding.company_name, 14.0, true),
            Block::centered(&self.branding.address, 9.0, false),
            Block::centered(format!("Mobile No.: {}", self.branding.phone), 9.0, false),
            Block::Rule,
            Block::Spacer(12.0),
        ]
    }

    /// Values available to section templates. Missing values are empty so
    /// templates can branch on them.
    pub fn template_data(&self) -> serde_json::Value {
        let known = |value: String| if value == MISSING { String::new() } else { value };
        json!({
            "product_name": self.product_name(),
            "inci_name": known(self.inci_name()),
            "cas_number": known(self.cas_number()),
            "molecular_formula": known(self.molecular_formula()),
            "batch_number": self.batch_number(),
            "storage_conditions": self.fields.storage_conditions.as_deref().unwrap_or_default(),
            "company_name": self.branding.company_name,
            "address": self.branding.address,
            "phone": self.branding.phone,
        })
    }

    /// A rendered template as a heading followed by one paragraph per line
    fn section(&self, templates: &TemplateEngine, id: &str) -> Result<Vec<Block>> {
        let rendered = templates.render(id, &self.template_data())?;
        let mut blocks = Vec::new();
        if !rendered.title.is_empty() {
            blocks.push(Block::heading(&rendered.title));
        }
        blocks.extend(rendered.lines().map(Block::paragraph));
        blocks.push(Block::Spacer(8.0));
        Ok(blocks)
    }
}

/// Generates the three branded documents.
pub struct DocumentGenerator {
    templates: TemplateEngine,
    branding: BrandingConfig,
}

impl DocumentGenerator {
    pub fn new(branding: BrandingConfig) -> Result<Self> {
        Ok(Self {
            templates: TemplateEngine::new()?,
            branding,
        })
    }

    pub fn branding(&self) -> &BrandingConfig {
        &self.branding
    }

    /// Content blocks for one document type
    pub fn compose(&self, kind: DocumentKind, ctx: &GeneratorContext<'_>) -> Result<Vec<Block>> {
        match kind {
            DocumentKind::Coa => coa::compose(ctx, &self.templates),
            DocumentKind::Msds => msds::compose(ctx, &self.templates),
            DocumentKind::Tds => tds::compose(ctx, &self.templates),
        }
    }

    /// Render one document to PDF bytes. Blocking: call from `spawn_blocking`.
    pub fn generate(
        &self,
        kind: DocumentKind,
        document_set: &DocumentSet,
        fields: &ExtractedFields,
        today: NaiveDate,
    ) -> Result<Vec<u8>> {
        let ctx = GeneratorContext {
            document_set,
            fields,
            branding: &self.branding,
            today,
        };
        let blocks = self.compose(kind, &ctx)?;
        render_document(&blocks)
    }
}

/// Company batch number: `{prefix}/{yymmdd}{id:02}K1`
pub fn batch_number(prefix: &str, today: NaiveDate, id: i64) -> String {
    format!("{}/{}{:02}K1", prefix, today.format("%y%m%d"), id)
}

/// Stored name of a generated document: `{id}_{TYPE}_{product}.pdf`
pub fn output_file_name(id: i64, kind: DocumentKind, product_name: &str) -> String {
    format!("{}_{}_{}.pdf", id, kind.label(), product_file_stem(product_name))
}

/// Name offered to clients downloading a generated document
pub fn download_file_name(prefix: &str, kind: DocumentKind, product_name: &str) -> String {
    format!("{}_{}_{}.pdf", prefix, kind.label(), product_file_stem(product_name))
}
