//! PDF Processor
//!
//! Extracts text from supplier PDFs page by page. Pages without a usable
//! text layer go through the OCR backend.

use anyhow::{Context, Result};
use regex::Regex;
use serde::Serialize;
use std::sync::{Arc, LazyLock};

use crate::ocr::{OcrBackend, OcrError, PageImage};

static CJK_GAP: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(\p{Han}) +(\p{Han})").expect("CJK gap regex")
});

/// Where the text of a page came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TextSource {
    TextLayer,
    Ocr,
    AiOcr,
}

/// Single page content
#[derive(Debug, Clone)]
pub struct PageText {
    pub number: u32,
    pub text: String,
    pub source: TextSource,
    /// Rendered image, kept for pages that needed OCR
    pub image: Option<PageImage>,
}

/// PDF processing result
#[derive(Debug, Clone, Default)]
pub struct ExtractedText {
    pub pages: Vec<PageText>,
}

impl ExtractedText {
    pub fn full_text(&self) -> String {
        self.pages
            .iter()
            .map(|page| page.text.as_str())
            .collect::<Vec<_>>()
            .join("\n")
    }

    pub fn is_blank(&self) -> bool {
        self.pages.iter().all(|page| page.text.trim().is_empty())
    }

    pub fn ocr_page_count(&self) -> usize {
        self.pages
            .iter()
            .filter(|page| page.source != TextSource::TextLayer)
            .count()
    }
}

/// PDF processor
#[derive(Clone)]
pub struct PdfProcessor {
    ocr: Option<Arc<dyn OcrBackend>>,
    min_page_chars: usize,
}

impl PdfProcessor {
    pub fn new(ocr: Option<Arc<dyn OcrBackend>>, min_page_chars: usize) -> Self {
        Self { ocr, min_page_chars }
    }

    /// Extract content from PDF bytes. Blocking: call from `spawn_blocking`.
    pub fn extract(&self, data: &[u8]) -> Result<ExtractedText> {
        match lopdf::Document::load_mem(data) {
            Ok(document) => Ok(self.extract_pages(&document, data)),
            Err(e) => {
                tracing::warn!(error = %e, "lopdf could not parse document, falling back to pdf-extract");
                self.extract_whole_document(data)
            }
        }
    }

    fn extract_pages(&self, document: &lopdf::Document, data: &[u8]) -> ExtractedText {
        let mut pages = Vec::new();

        for page_number in document.get_pages().keys().copied() {
            let text = match document.extract_text(&[page_number]) {
                Ok(text) => normalize_text(&text),
                Err(e) => {
                    tracing::debug!(page = page_number, error = %e, "No text layer on page");
                    String::new()
                }
            };

            let mut page = PageText {
                number: page_number,
                text,
                source: TextSource::TextLayer,
                image: None,
            };

            if self.needs_ocr(&page.text) {
                self.ocr_page(&mut page, data);
            }

            pages.push(page);
        }

        ExtractedText { pages }
    }

    fn extract_whole_document(&self, data: &[u8]) -> Result<ExtractedText> {
        let pages: Vec<PageText> = pdf_extract_pages(data)
            .into_iter()
            .zip(1u32..)
            .map(|(text, number)| PageText {
                number,
                text: normalize_text(&text),
                source: TextSource::TextLayer,
                image: None,
            })
            .collect();

        let text: String = pages.iter().map(|page| page.text.as_str()).collect();
        if !self.needs_ocr(&text) {
            return Ok(ExtractedText { pages });
        }

        let Some(ocr) = &self.ocr else {
            anyhow::ensure!(!text.trim().is_empty(), "PDF has no readable text and OCR is disabled");
            return Ok(ExtractedText { pages });
        };

        let images = ocr
            .render_all_pages(data)
            .context("Failed to render PDF pages for OCR")?;

        let pages = images
            .into_iter()
            .map(|image| {
                let text = match ocr.recognize(&image) {
                    Ok(text) => normalize_text(&text),
                    Err(e) => {
                        tracing::warn!(page = image.page_number, error = %e, "OCR failed");
                        String::new()
                    }
                };
                PageText {
                    number: image.page_number,
                    text,
                    source: TextSource::Ocr,
                    image: Some(image),
                }
            })
            .collect();

        Ok(ExtractedText { pages })
    }

    fn needs_ocr(&self, text: &str) -> bool {
        text.trim().chars().count() < self.min_page_chars || looks_garbled(text)
    }

    fn ocr_page(&self, page: &mut PageText, data: &[u8]) {
        let Some(ocr) = &self.ocr else {
            return;
        };

        let image = match ocr.render_page(data, page.number) {
            Ok(image) => image,
            Err(OcrError::BackendNotAvailable(reason)) => {
                tracing::warn!(page = page.number, %reason, "OCR unavailable, keeping text layer");
                return;
            }
            Err(e) => {
                tracing::warn!(page = page.number, error = %e, "Failed to render page for OCR");
                return;
            }
        };

        match ocr.recognize(&image) {
            Ok(text) => {
                let text = normalize_text(&text);
                if text.trim().chars().count() > page.text.trim().chars().count() {
                    page.text = text;
                    page.source = TextSource::Ocr;
                }
            }
            Err(e) => {
                tracing::warn!(page = page.number, backend = ocr.name(), error = %e, "OCR failed");
            }
        }

        // The image is kept even when local OCR failed so AI OCR can still try it
        page.image = Some(image);
    }
}

/// pdf-extract panics on some malformed files; treat that like a failure
fn pdf_extract_pages(data: &[u8]) -> Vec<String> {
    match std::panic::catch_unwind(|| pdf_extract::extract_text_from_mem_by_pages(data)) {
        Ok(Ok(pages)) => pages,
        Ok(Err(e)) => {
            tracing::warn!(error = %e, "pdf-extract failed");
            Vec::new()
        }
        Err(_) => {
            tracing::warn!("pdf-extract panicked on malformed document");
            Vec::new()
        }
    }
}

/// Unify line endings and remove OCR artifacts such as spaces between
/// Chinese characters.
pub fn normalize_text(text: &str) -> String {
    let text = text
        .replace("\r\n", "\n")
        .replace('\r', "\n")
        .replace(['\u{3000}', '\u{a0}'], " ");

    // Overlapping matches need a second pass: "产 品 名" leaves one gap after the first
    let once = CJK_GAP.replace_all(&text, "$1$2");
    CJK_GAP.replace_all(&once, "$1$2").into_owned()
}

/// Text layers of CID fonts without a ToUnicode map come out as control
/// characters and replacement glyphs.
fn looks_garbled(text: &str) -> bool {
    let total = text.chars().filter(|c| !c.is_whitespace()).count();
    if total == 0 {
        return false;
    }
    let bad = text
        .chars()
        .filter(|c| {
            *c == '\u{fffd}'
                || (c.is_control() && !c.is_whitespace())
                || ('\u{e000}'..='\u{f8ff}').contains(c)
        })
        .count();
    bad * 10 > total * 3
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct StubOcr {
        text: String,
        calls: AtomicUsize,
    }

    impl StubOcr {
        fn new(text: &str) -> Self {
            Self {
                text: text.to_string(),
                calls: AtomicUsize::new(0),
            }
        }
    }

    impl OcrBackend for StubOcr {
        fn name(&self) -> &'static str {
            "stub"
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
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(self.text.clone())
        }
    }

    fn pdf_with_pages(pages: &[&[&str]]) -> Vec<u8> {
        use crate::generator::layout::{render_document, Block};

        let mut blocks = Vec::new();
        for (index, lines) in pages.iter().enumerate() {
            if index > 0 {
                blocks.push(Block::PageBreak);
            }
            blocks.extend(lines.iter().map(|line| Block::paragraph(*line)));
        }
        render_document(&blocks).unwrap()
    }

    #[test]
    fn test_extracts_text_page_by_page() {
        let data = pdf_with_pages(&[
            &["Product Name: Sodium Hyaluronate powder for cosmetics"],
            &["Batch No: SH-2024-0113 from the second page of the report"],
        ]);

        let processor = PdfProcessor::new(None, 10);
        let extracted = processor.extract(&data).unwrap();

        assert_eq!(extracted.pages.len(), 2);
        assert!(extracted.pages[0].text.contains("Sodium Hyaluronate"));
        assert!(extracted.pages[1].text.contains("SH-2024-0113"));
        assert_eq!(extracted.ocr_page_count(), 0);
        assert!(extracted.full_text().contains("Product Name"));
    }

    #[test]
    fn test_sparse_page_goes_through_ocr() {
        let data = pdf_with_pages(&[&["x"]]);
        let ocr = Arc::new(StubOcr::new("Product Name: Scanned Ingredient from image"));

        let processor = PdfProcessor::new(Some(ocr.clone()), 20);
        let extracted = processor.extract(&data).unwrap();

        assert_eq!(ocr.calls.load(Ordering::SeqCst), 1);
        assert_eq!(extracted.pages[0].source, TextSource::Ocr);
        assert!(extracted.pages[0].text.contains("Scanned Ingredient"));
        assert!(extracted.pages[0].image.is_some());
    }

    #[test]
    fn test_dense_page_skips_ocr() {
        let data = pdf_with_pages(&[&["Certificate of Analysis for a product with plenty of text"]]);
        let ocr = Arc::new(StubOcr::new("should not be used"));

        let processor = PdfProcessor::new(Some(ocr.clone()), 20);
        let extracted = processor.extract(&data).unwrap();

        assert_eq!(ocr.calls.load(Ordering::SeqCst), 0);
        assert_eq!(extracted.pages[0].source, TextSource::TextLayer);
    }

    #[test]
    fn test_unparseable_pdf_without_text_fails_without_ocr() {
        let processor = PdfProcessor::new(None, 10);
        assert!(processor.extract(b"%PDF-1.4 garbage").is_err());
    }

    #[test]
    fn test_normalize_text() {
        assert_eq!(normalize_text("a\r\nb\rc"), "a\nb\nc");
        assert_eq!(normalize_text("产 品 名 称: X"), "产品名称: X");
        assert_eq!(normalize_text("Batch\u{3000}No"), "Batch No");
    }

    #[test]
    fn test_looks_garbled() {
        assert!(!looks_garbled("Product Name: Niacinamide"));
        assert!(looks_garbled("\u{1}\u{2}\u{3}\u{fffd}\u{fffd}ab"));
        assert!(!looks_garbled(""));
    }
}
