#![allow(dead_code)]

use std::path::Path;
use std::sync::Arc;
use tempfile::TempDir;

use chemdocs_database::{create_memory_pool, migrations::run_migrations, SqlitePool};
use chemdocs_document_processing::generator::layout::{render_document, Block};
use chemdocs_document_processing::ocr::{OcrBackend, OcrError, PageImage};
use chemdocs_document_processing::upload::{UploadForm, UploadedFile};
use chemdocs_document_processing::AppState;
use chemdocs_utils::AppConfig;

pub const PRODUCT: &str = "Coscare Niacinamide";

/// Application state over an in-memory database and temporary directories.
/// Keep `dir` alive for the duration of the test.
pub struct TestApp {
    pub state: AppState,
    pub dir: TempDir,
}

pub fn test_config(dir: &TempDir) -> AppConfig {
    let mut config = AppConfig::default();
    let path = |name: &str| dir.path().join(name).to_string_lossy().into_owned();
    config.storage.upload_dir = path("uploads");
    config.storage.generated_dir = path("generated");
    config.settings.path = path("app_settings.json");
    config.ai.api_url = "http://127.0.0.1:9/v1".to_string();
    config.ai.timeout_seconds = 5;
    config
}

pub async fn test_app() -> TestApp {
    let dir = TempDir::new().unwrap();
    let config = test_config(&dir);
    test_app_with(dir, config, None).await
}

pub async fn test_app_with(dir: TempDir, config: AppConfig, ocr: Option<Arc<dyn OcrBackend>>) -> TestApp {
    let pool = create_memory_pool().await.unwrap();
    run_migrations(&pool).await.unwrap();
    let state = AppState::new(config, pool, ocr).await.unwrap();
    TestApp { state, dir }
}

/// Make every UPDATE that writes a non-null `column` on `document_sets`
/// fail, while other updates of the row still go through.
pub async fn fail_writes_to(pool: &SqlitePool, column: &str) {
    let sql = format!(
        "CREATE TRIGGER fail_{column} BEFORE UPDATE OF {column} ON document_sets \
         WHEN NEW.{column} IS NOT NULL \
         BEGIN SELECT RAISE(ABORT, 'simulated write failure'); END"
    );
    sqlx::query(&sql).execute(pool).await.unwrap();
}

pub async fn allow_writes_to(pool: &SqlitePool, column: &str) {
    sqlx::query(&format!("DROP TRIGGER fail_{column}"))
        .execute(pool)
        .await
        .unwrap();
}

/// Put a plain file where a storage directory should be
pub fn replace_dir_with_file(dir: &Path) {
    std::fs::remove_dir_all(dir).unwrap();
    std::fs::write(dir, b"not a directory").unwrap();
}

pub fn restore_dir(dir: &Path) {
    std::fs::remove_file(dir).unwrap();
    std::fs::create_dir(dir).unwrap();
}

pub fn files_in(dir: &Path) -> usize {
    std::fs::read_dir(dir).unwrap().count()
}

pub fn coa_pdf() -> Vec<u8> {
    render_document(&[
        Block::paragraph("CERTIFICATE OF ANALYSIS"),
        Block::paragraph("Product Name: Niacinamide"),
        Block::paragraph("INCI Name: Niacinamide"),
        Block::paragraph("Batch Number: NA20240115"),
        Block::paragraph("Manufacturing Date: 15-01-2024"),
        Block::paragraph("Expiry Date: 14-01-2026"),
        Block::table(
            vec![2.0, 2.0, 1.5],
            Some(vec!["Test Items".into(), "Specifications".into(), "Results".into()]),
            vec![
                vec!["Appearance".into(), "White crystalline powder".into(), "Conforms".into()],
                vec!["Assay".into(), "99.0%-101.0%".into(), "99.6%".into()],
                vec!["Loss on drying".into(), "0.5% max".into(), "0.12%".into()],
            ],
        ),
        Block::paragraph("ISSUED DATE: 20-01-2024"),
    ])
    .unwrap()
}

pub const MSDS_LINES: &[&str] = &[
    "MATERIAL SAFETY DATA SHEET",
    "Company Name: Acme Fine Chemicals Co., Ltd.",
    "CAS No.: 98-92-0",
    "Molecular formula: C6H6N2O",
    "Appearance: White crystalline powder",
    "pH value: 6.0-7.5",
    "Solubility: Soluble in water",
];

pub fn msds_pdf() -> Vec<u8> {
    let blocks: Vec<Block> = MSDS_LINES.iter().map(|line| Block::paragraph(*line)).collect();
    render_document(&blocks).unwrap()
}

pub fn tds_pdf() -> Vec<u8> {
    render_document(&[
        Block::paragraph("TECHNICAL DATA SHEET"),
        Block::paragraph("INCI Name: Niacinamide"),
        Block::table(
            vec![2.0, 2.5],
            Some(vec!["Items".into(), "Specifications".into()]),
            vec![
                vec!["Appearance".into(), "White crystalline powder".into()],
                vec!["Assay".into(), "99.0%-101.0%".into()],
            ],
        ),
        Block::paragraph("Recommended use level: 2-5%"),
        Block::paragraph("Storage: Store in a cool dry place"),
        Block::paragraph("Shelf life: 24 months"),
        Block::paragraph("Package: 25kg/drum"),
    ])
    .unwrap()
}

/// A one-page PDF with no text at all, like a scan without OCR
pub fn blank_pdf() -> Vec<u8> {
    use lopdf::{dictionary, Document, Object, Stream};

    let mut doc = Document::with_version("1.5");
    let pages_id = doc.new_object_id();
    let content_id = doc.add_object(Stream::new(dictionary! {}, Vec::new()));
    let page_id = doc.add_object(dictionary! {
        "Type" => "Page",
        "Parent" => pages_id,
        "MediaBox" => vec![0.into(), 0.into(), 595.into(), 842.into()],
        "Contents" => content_id,
    });
    doc.objects.insert(
        pages_id,
        Object::Dictionary(dictionary! {
            "Type" => "Pages",
            "Kids" => vec![page_id.into()],
            "Count" => 1,
        }),
    );
    let catalog_id = doc.add_object(dictionary! {
        "Type" => "Catalog",
        "Pages" => pages_id,
    });
    doc.trailer.set("Root", catalog_id);

    let mut buffer = Vec::new();
    doc.save_to(&mut buffer).unwrap();
    buffer
}

pub fn upload_form(coa: Vec<u8>, msds: Vec<u8>, tds: Vec<u8>) -> UploadForm {
    let file = |name: &str, data: Vec<u8>| UploadedFile {
        file_name: name.to_string(),
        data,
    };
    UploadForm {
        company_product_name: PRODUCT.to_string(),
        coa: file("supplier_coa.pdf", coa),
        msds: file("supplier_msds.pdf", msds),
        tds: file("supplier_tds.pdf", tds),
    }
}

pub fn standard_form() -> UploadForm {
    upload_form(coa_pdf(), msds_pdf(), tds_pdf())
}

pub fn text_of(pdf: &[u8]) -> String {
    let doc = lopdf::Document::load_mem(pdf).unwrap();
    let pages: Vec<u32> = doc.get_pages().keys().copied().collect();
    doc.extract_text(&pages).unwrap()
}

/// OCR backend that "recognises" a fixed text on every page
pub struct FixedOcr(pub String);

impl OcrBackend for FixedOcr {
    fn name(&self) -> &'static str {
        "fixed"
    }

    fn is_available(&self) -> bool {
        true
    }

    fn render_page(&self, _pdf: &[u8], page_number: u32) -> Result<PageImage, OcrError> {
        Ok(PageImage {
            page_number,
            png: vec![0x89, b'P', b'N', b'G'],
        })
    }

    fn render_all_pages(&self, pdf: &[u8]) -> Result<Vec<PageImage>, OcrError> {
        Ok(vec![self.render_page(pdf, 1)?])
    }

    fn recognize(&self, _image: &PageImage) -> Result<String, OcrError> {
        Ok(self.0.clone())
    }
}

pub enum Part<'a> {
    Text(&'a str, &'a str),
    File(&'a str, &'a str, &'a [u8]),
}

pub const BOUNDARY: &str = "chemdocs-test-boundary";

pub fn multipart_body(parts: &[Part<'_>]) -> Vec<u8> {
    let mut body = Vec::new();
    for part in parts {
        body.extend_from_slice(format!("--{}\r\n", BOUNDARY).as_bytes());
        match part {
            Part::Text(name, value) => {
                body.extend_from_slice(
                    format!("Content-Disposition: form-data; name=\"{}\"\r\n\r\n", name).as_bytes(),
                );
                body.extend_from_slice(value.as_bytes());
            }
            Part::File(name, file_name, data) => {
                body.extend_from_slice(
                    format!(
                        "Content-Disposition: form-data; name=\"{}\"; filename=\"{}\"\r\nContent-Type: application/pdf\r\n\r\n",
                        name, file_name
                    )
                    .as_bytes(),
                );
                body.extend_from_slice(data);
            }
        }
        body.extend_from_slice(b"\r\n");
    }
    body.extend_from_slice(format!("--{}--\r\n", BOUNDARY).as_bytes());
    body
}

pub fn multipart_content_type() -> String {
    format!("multipart/form-data; boundary={}", BOUNDARY)
}
