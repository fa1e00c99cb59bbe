//! OCR Fallback
//!
//! Renders PDF pages to images with `pdftoppm` (poppler-utils) and
//! recognises them with the `tesseract` command-line tool.

use std::path::{Path, PathBuf};
use std::process::Command;
use std::time::Instant;
use tempfile::TempDir;
use thiserror::Error;

use chemdocs_utils::OcrConfig;

#[derive(Debug, Error)]
pub enum OcrError {
    #[error("OCR backend not available: {0}")]
    BackendNotAvailable(String),

    #[error("OCR failed: {0}")]
    Failed(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// A rendered page image (PNG bytes)
#[derive(Debug, Clone)]
pub struct PageImage {
    pub page_number: u32,
    pub png: Vec<u8>,
}

/// Page rendering and text recognition for scanned PDF pages.
pub trait OcrBackend: Send + Sync {
    fn name(&self) -> &'static str;

    fn is_available(&self) -> bool;

    /// Render a single 1-based page of the PDF
    fn render_page(&self, pdf: &[u8], page_number: u32) -> Result<PageImage, OcrError>;

    /// Render every page of a PDF that could not be parsed for page structure
    fn render_all_pages(&self, pdf: &[u8]) -> Result<Vec<PageImage>, OcrError>;

    fn recognize(&self, image: &PageImage) -> Result<String, OcrError>;
}

/// Tesseract OCR via command line.
pub struct TesseractBackend {
    language: String,
    dpi: u32,
}

impl TesseractBackend {
    pub fn new(config: &OcrConfig) -> Self {
        Self {
            language: config.language.clone(),
            dpi: config.dpi,
        }
    }

    fn write_pdf(dir: &TempDir, pdf: &[u8]) -> Result<PathBuf, OcrError> {
        let path = dir.path().join("input.pdf");
        std::fs::write(&path, pdf)?;
        Ok(path)
    }

    fn run_pdftoppm(&self, pdf_path: &Path, output_prefix: &Path, page: Option<u32>) -> Result<(), OcrError> {
        let mut command = Command::new("pdftoppm");
        command.args(["-png", "-r", &self.dpi.to_string()]);
        if let Some(page) = page {
            let page = page.to_string();
            command.args(["-f", &page, "-l", &page]);
        }
        let status = command.arg(pdf_path).arg(output_prefix).status();

        match status {
            Ok(s) if s.success() => Ok(()),
            Ok(s) => Err(OcrError::Failed(format!("pdftoppm exited with {}", s))),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Err(OcrError::BackendNotAvailable(
                "pdftoppm not found (install poppler-utils)".to_string(),
            )),
            Err(e) => Err(OcrError::Io(e)),
        }
    }

    fn run_tesseract(&self, image_path: &Path) -> Result<String, OcrError> {
        let output = Command::new("tesseract")
            .arg(image_path)
            .arg("stdout")
            .args(["-l", &self.language])
            .output();

        match output {
            Ok(output) if output.status.success() => {
                Ok(String::from_utf8_lossy(&output.stdout).to_string())
            }
            Ok(output) => {
                let stderr = String::from_utf8_lossy(&output.stderr);
                Err(OcrError::Failed(format!("tesseract failed: {}", stderr.trim())))
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Err(OcrError::BackendNotAvailable(
                "tesseract not found (install tesseract-ocr)".to_string(),
            )),
            Err(e) => Err(OcrError::Io(e)),
        }
    }
}

impl OcrBackend for TesseractBackend {
    fn name(&self) -> &'static str {
        "tesseract"
    }

    fn is_available(&self) -> bool {
        check_binary("tesseract", "--version") && check_binary("pdftoppm", "-v")
    }

    fn render_page(&self, pdf: &[u8], page_number: u32) -> Result<PageImage, OcrError> {
        let dir = TempDir::new()?;
        let pdf_path = Self::write_pdf(&dir, pdf)?;
        self.run_pdftoppm(&pdf_path, &dir.path().join("page"), Some(page_number))?;

        let images = collect_page_images(dir.path())?;
        images
            .into_iter()
            .next()
            .map(|(_, path)| {
                Ok(PageImage {
                    page_number,
                    png: std::fs::read(path)?,
                })
            })
            .unwrap_or_else(|| Err(OcrError::Failed(format!("No image generated for page {}", page_number))))
    }

    fn render_all_pages(&self, pdf: &[u8]) -> Result<Vec<PageImage>, OcrError> {
        let dir = TempDir::new()?;
        let pdf_path = Self::write_pdf(&dir, pdf)?;
        self.run_pdftoppm(&pdf_path, &dir.path().join("page"), None)?;

        collect_page_images(dir.path())?
            .into_iter()
            .map(|(page_number, path)| {
                Ok(PageImage {
                    page_number,
                    png: std::fs::read(path)?,
                })
            })
            .collect()
    }

    fn recognize(&self, image: &PageImage) -> Result<String, OcrError> {
        let start = Instant::now();
        let dir = TempDir::new()?;
        let image_path = dir.path().join(format!("page-{}.png", image.page_number));
        std::fs::write(&image_path, &image.png)?;

        let text = self.run_tesseract(&image_path)?;
        tracing::debug!(
            page = image.page_number,
            chars = text.len(),
            elapsed_ms = start.elapsed().as_millis() as u64,
            "tesseract page recognised"
        );
        Ok(text)
    }
}

fn check_binary(binary: &str, version_flag: &str) -> bool {
    Command::new(binary)
        .arg(version_flag)
        .output()
        .is_ok()
}

/// pdftoppm names files page-1.png, page-01.png or page-001.png depending
/// on the page count. Returns (page number, path) sorted by page.
fn collect_page_images(dir: &Path) -> Result<Vec<(u32, PathBuf)>, OcrError> {
    let mut images = Vec::new();
    for entry in std::fs::read_dir(dir)? {
        let path = entry?.path();
        let Some(name) = path.file_name().and_then(|n| n.to_str()) else {
            continue;
        };
        if let Some(page_number) = page_number_from_file_name(name) {
            images.push((page_number, path));
        }
    }
    images.sort_by_key(|(page, _)| *page);
    Ok(images)
}

fn page_number_from_file_name(name: &str) -> Option<u32> {
    name.strip_prefix("page-")?
        .strip_suffix(".png")?
        .parse()
        .ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_page_number_from_file_name() {
        assert_eq!(page_number_from_file_name("page-1.png"), Some(1));
        assert_eq!(page_number_from_file_name("page-012.png"), Some(12));
        assert_eq!(page_number_from_file_name("input.pdf"), None);
        assert_eq!(page_number_from_file_name("page-x.png"), None);
    }

    #[test]
    fn test_collect_page_images_sorted() {
        let dir = TempDir::new().unwrap();
        for name in ["page-10.png", "page-02.png", "page-1.png", "input.pdf"] {
            std::fs::write(dir.path().join(name), b"x").unwrap();
        }

        let pages: Vec<u32> = collect_page_images(dir.path())
            .unwrap()
            .into_iter()
            .map(|(page, _)| page)
            .collect();
        assert_eq!(pages, vec![1, 2, 10]);
    }
}
