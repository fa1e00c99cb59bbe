//! Document Pipeline
//!
//! Runs one document set from upload to generated outputs: store, extract,
//! validate, persist, generate. A failing stage leaves the set `failed` with
//! its message and removes any outputs written for it.

use anyhow::{Context, Result};
use chrono::{Local, NaiveDate};
use std::sync::Arc;
use std::time::Instant;
use thiserror::Error;
use tracing::{info, warn};

use chemdocs_database::{DocumentSetRepository, ExtractionUpdate, SqlitePool};
use chemdocs_models::{AiSettings, DocumentKind, DocumentSet, ExtractedFields, GeneratedPaths, SupplierPaths};
use chemdocs_utils::{log_error, ChemdocsError};

use crate::extraction::{extract_fields, merge_documents, parse_date};
use crate::generator::{output_file_name, DocumentGenerator};
use crate::metrics::PipelineMetrics;
use crate::pdf_processor::{normalize_text, ExtractedText, PdfProcessor, TextSource};
use crate::settings_store::SettingsStore;
use crate::storage::FileStorage;
use crate::upload::UploadForm;
use crate::vlm_client::VlmClient;

/// Why a document set ended up `failed`
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("Failed to store uploaded files: {0}")]
    Storage(String),

    #[error("Failed to extract text from {kind}: {message}")]
    Extraction { kind: DocumentKind, message: String },

    #[error("No readable text found in {0} document")]
    BlankDocument(DocumentKind),

    #[error("Failed to save document set: {0}")]
    Persistence(String),

    #[error("Failed to generate {kind}: {message}")]
    Generation { kind: DocumentKind, message: String },

    #[error("Processing task failed: {0}")]
    Task(String),
}

impl PipelineError {
    /// Metrics label
    pub fn stage(&self) -> &'static str {
        match self {
            Self::Storage(_) => "storage",
            Self::Extraction { .. } | Self::BlankDocument(_) => "extraction",
            Self::Persistence(_) => "persistence",
            Self::Generation { .. } => "generation",
            Self::Task(_) => "task",
        }
    }
}

/// Result of an upload
#[derive(Debug, Clone)]
pub struct ProcessOutcome {
    pub document_set: DocumentSet,
    /// An identical upload had already been generated and was returned as is
    pub reused: bool,
}

pub struct DocumentPipeline {
    repository: DocumentSetRepository,
    storage: FileStorage,
    processor: PdfProcessor,
    generator: Arc<DocumentGenerator>,
    vlm: VlmClient,
    settings: Arc<SettingsStore>,
    metrics: PipelineMetrics,
}

impl DocumentPipeline {
    pub fn new(
        pool: SqlitePool,
        storage: FileStorage,
        processor: PdfProcessor,
        generator: DocumentGenerator,
        vlm: VlmClient,
        settings: Arc<SettingsStore>,
        metrics: PipelineMetrics,
    ) -> Self {
        Self {
            repository: DocumentSetRepository::new(pool),
            storage,
            processor,
            generator: Arc::new(generator),
            vlm,
            settings,
            metrics,
        }
    }

    /// Process a validated upload. Returns the existing set when the same
    /// files were already generated and their outputs are still on disk.
    pub async fn process_upload(&self, form: UploadForm) -> Result<ProcessOutcome> {
        let fingerprint = form.fingerprint();

        if let Some(existing) = self.repository.find_generated_by_fingerprint(&fingerprint).await? {
            if self.outputs_present(&existing).await {
                info!(document_set_id = existing.id, "Identical upload already generated, reusing");
                self.metrics.record_upload("reused");
                return Ok(ProcessOutcome {
                    document_set: existing,
                    reused: true,
                });
            }
        }

        let document_set = self
            .repository
            .create(&form.company_product_name, &fingerprint)
            .await?;
        let id = document_set.id;
        info!(document_set_id = id, product = %form.company_product_name, "Document set created");

        let started = Instant::now();
        let result = match self.store_uploads(id, &form).await {
            Ok(paths) => match self.repository.set_supplier_paths(id, &paths).await {
                Ok(()) => {
                    let documents = DocumentKind::ALL.map(|kind| (kind, form.file(kind).data.clone()));
                    self.run_stages(id, documents).await
                }
                Err(e) => {
                    self.remove_files([paths.coa.as_str(), paths.msds.as_str(), paths.tds.as_str()])
                        .await;
                    Err(PipelineError::Persistence(format!("{:#}", e)))
                }
            },
            Err(e) => Err(e),
        };
        let document_set = self.finish(id, result, started).await?;

        Ok(ProcessOutcome {
            document_set,
            reused: false,
        })
    }

    /// Run extraction and generation again on the stored supplier files.
    /// Earlier test results are replaced.
    pub async fn reprocess(&self, id: i64) -> Result<DocumentSet> {
        let document_set = self
            .repository
            .find_by_id(id)
            .await?
            .ok_or_else(|| ChemdocsError::not_found(format!("Document set {}", id)))?;

        if !document_set.has_all_uploads() {
            return Err(ChemdocsError::document_processing(format!(
                "Document set {} has no stored supplier files to reprocess",
                id
            ))
            .into());
        }

        info!(document_set_id = id, "Reprocessing document set");
        self.remove_outputs(&document_set).await;
        self.repository.reset_for_reprocess(id).await?;

        let started = Instant::now();
        let result = match self.read_uploads(&document_set).await {
            Ok(documents) => self.run_stages(id, documents).await,
            Err(e) => Err(e),
        };
        self.finish(id, result, started).await
    }

    async fn finish(
        &self,
        id: i64,
        result: Result<(), PipelineError>,
        started: Instant,
    ) -> Result<DocumentSet> {
        self.metrics.observe_duration(started.elapsed().as_secs_f64());

        match result {
            Ok(()) => {
                self.metrics.record_upload("processed");
                info!(document_set_id = id, elapsed_ms = started.elapsed().as_millis() as u64, "Document set generated");
            }
            Err(e) => {
                log_error!(e, "Document set failed", document_set_id = id, stage = e.stage());
                self.metrics.record_failure(e.stage());
                self.metrics.record_upload("failed");
                self.repository.mark_failed(id, &e.to_string()).await?;
            }
        }

        self.repository
            .find_by_id(id)
            .await?
            .with_context(|| format!("Document set {} disappeared", id))
    }

    async fn run_stages(
        &self,
        id: i64,
        documents: [(DocumentKind, Vec<u8>); 3],
    ) -> Result<(), PipelineError> {
        let settings = self.settings.get().await;

        let mut parts = Vec::with_capacity(documents.len());
        for (kind, data) in documents {
            let fields = self.extract_document(kind, data, &settings).await?;
            parts.push((kind, fields));
        }
        let mut fields = merge_documents(parts);

        if let (true, Some(key)) = (settings.field_validation_active(), settings.api_key()) {
            fields = self.vlm.validate_fields(key, &fields).await;
        }

        let update = ExtractionUpdate {
            fields: &fields,
            manufacturing_date: fields.manufacturing_date.as_deref().and_then(parse_date),
            expiry_date: fields.expiry_date.as_deref().and_then(parse_date),
        };
        self.repository
            .record_extraction(id, update)
            .await
            .map_err(|e| PipelineError::Persistence(format!("{:#}", e)))?;

        let document_set = self
            .repository
            .find_by_id(id)
            .await
            .map_err(|e| PipelineError::Persistence(format!("{:#}", e)))?
            .ok_or_else(|| PipelineError::Persistence(format!("Document set {} disappeared", id)))?;

        let paths = self
            .generate_outputs(document_set, fields, Local::now().date_naive())
            .await?;

        if let Err(e) = self.repository.record_generation(id, &paths).await {
            self.remove_files([paths.coa.as_str(), paths.msds.as_str(), paths.tds.as_str()])
                .await;
            return Err(PipelineError::Persistence(format!("{:#}", e)));
        }
        Ok(())
    }

    async fn extract_document(
        &self,
        kind: DocumentKind,
        data: Vec<u8>,
        settings: &AiSettings,
    ) -> Result<ExtractedFields, PipelineError> {
        let processor = self.processor.clone();
        let mut text = tokio::task::spawn_blocking(move || processor.extract(&data))
            .await
            .map_err(|e| PipelineError::Task(e.to_string()))?
            .map_err(|e| PipelineError::Extraction {
                kind,
                message: format!("{:#}", e),
            })?;

        self.metrics.record_ocr_pages(text.ocr_page_count());

        if let (true, Some(key)) = (settings.ai_ocr_active(), settings.api_key()) {
            self.enhance_pages(key, &mut text).await;
        }

        if text.is_blank() {
            return Err(PipelineError::BlankDocument(kind));
        }

        info!(
            document_type = %kind,
            pages = text.pages.len(),
            ocr_pages = text.ocr_page_count(),
            "Text extracted"
        );
        Ok(extract_fields(kind, &text.full_text()))
    }

    /// Send the pages that needed OCR to the vision model
    async fn enhance_pages(&self, api_key: &str, text: &mut ExtractedText) {
        for page in text.pages.iter_mut() {
            let Some(image) = page.image.as_ref() else {
                continue;
            };
            let enhanced = self.vlm.enhance_ocr(api_key, image, &page.text).await;
            if enhanced != page.text {
                page.text = normalize_text(&enhanced);
                page.source = TextSource::AiOcr;
            }
        }
    }

    /// Render and store all three outputs. On any failure the files written
    /// so far are removed.
    async fn generate_outputs(
        &self,
        document_set: DocumentSet,
        fields: ExtractedFields,
        today: NaiveDate,
    ) -> Result<GeneratedPaths, PipelineError> {
        let generator = Arc::clone(&self.generator);
        let id = document_set.id;
        let product_name = document_set.company_product_name.clone();

        let rendered = tokio::task::spawn_blocking(move || {
            DocumentKind::ALL
                .into_iter()
                .map(|kind| {
                    generator
                        .generate(kind, &document_set, &fields, today)
                        .map(|pdf| (kind, pdf))
                        .map_err(|e| PipelineError::Generation {
                            kind,
                            message: format!("{:#}", e),
                        })
                })
                .collect::<Result<Vec<_>, _>>()
        })
        .await
        .map_err(|e| PipelineError::Task(e.to_string()))??;

        let mut written: Vec<(DocumentKind, String)> = Vec::with_capacity(rendered.len());
        for (kind, pdf) in rendered {
            let file_name = output_file_name(id, kind, &product_name);
            match self.storage.store_generated(&file_name, &pdf).await {
                Ok(path) => written.push((kind, path)),
                Err(e) => {
                    self.remove_files(written.iter().map(|(_, path)| path.as_str()).collect::<Vec<_>>()).await;
                    return Err(PipelineError::Generation {
                        kind,
                        message: format!("{:#}", e),
                    });
                }
            }
        }

        let path_for = |kind: DocumentKind| {
            written
                .iter()
                .find(|(written_kind, _)| *written_kind == kind)
                .map(|(_, path)| path.clone())
                .unwrap_or_default()
        };

        Ok(GeneratedPaths {
            coa: path_for(DocumentKind::Coa),
            msds: path_for(DocumentKind::Msds),
            tds: path_for(DocumentKind::Tds),
        })
    }

    async fn store_uploads(&self, id: i64, form: &UploadForm) -> Result<SupplierPaths, PipelineError> {
        let mut paths = Vec::with_capacity(3);
        for kind in DocumentKind::ALL {
            let file = form.file(kind);
            match self.storage.store_upload(id, kind, &file.file_name, &file.data).await {
                Ok(path) => paths.push(path),
                Err(e) => {
                    self.remove_files(paths.iter().map(String::as_str).collect::<Vec<_>>()).await;
                    return Err(PipelineError::Storage(format!("{:#}", e)));
                }
            }
        }

        let [coa, msds, tds]: [String; 3] = paths
            .try_into()
            .map_err(|_| PipelineError::Storage("incomplete upload".to_string()))?;
        Ok(SupplierPaths { coa, msds, tds })
    }

    async fn read_uploads(
        &self,
        document_set: &DocumentSet,
    ) -> Result<[(DocumentKind, Vec<u8>); 3], PipelineError> {
        let mut documents = Vec::with_capacity(3);
        for kind in DocumentKind::ALL {
            let path = document_set
                .supplier_path(kind)
                .ok_or_else(|| PipelineError::Storage(format!("No stored {} file", kind)))?;
            let data = self
                .storage
                .read(path)
                .await
                .map_err(|e| PipelineError::Storage(format!("{:#}", e)))?;
            documents.push((kind, data));
        }

        documents
            .try_into()
            .map_err(|_| PipelineError::Storage("incomplete upload".to_string()))
    }

    async fn outputs_present(&self, document_set: &DocumentSet) -> bool {
        for kind in DocumentKind::ALL {
            match document_set.generated_path(kind) {
                Some(path) if self.storage.exists(path).await => {}
                _ => return false,
            }
        }
        true
    }

    async fn remove_outputs(&self, document_set: &DocumentSet) {
        self.remove_files(DocumentKind::ALL.into_iter().filter_map(|kind| document_set.generated_path(kind)).collect::<Vec<_>>())
            .await;
    }

    /// Best-effort cleanup; failures are logged
    async fn remove_files<'a>(&self, paths: impl IntoIterator<Item = &'a str>) {
        for path in paths {
            if let Err(e) = self.storage.remove(path).await {
                warn!(path = %path, error = %e, "Failed to remove file");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_failure_stages() {
        assert_eq!(PipelineError::BlankDocument(DocumentKind::Msds).stage(), "extraction");
        assert_eq!(
            PipelineError::Generation {
                kind: DocumentKind::Tds,
                message: "boom".into()
            }
            .stage(),
            "generation"
        );
        assert_eq!(PipelineError::Storage("disk".into()).stage(), "storage");
        assert_eq!(PipelineError::Persistence("locked".into()).stage(), "persistence");
    }

    #[test]
    fn test_task_failure_does_not_blame_a_document() {
        let error = PipelineError::Task("task 7 panicked".into());
        assert_eq!(error.stage(), "task");
        assert_eq!(error.to_string(), "Processing task failed: task 7 panicked");
        for kind in DocumentKind::ALL {
            assert!(!error.to_string().contains(kind.label()));
        }
    }

    #[test]
    fn test_failure_messages_name_document() {
        assert_eq!(
            PipelineError::BlankDocument(DocumentKind::Msds).to_string(),
            "No readable text found in MSDS document"
        );
        let error = PipelineError::Extraction {
            kind: DocumentKind::Coa,
            message: "invalid xref".into(),
        };
        assert_eq!(error.to_string(), "Failed to extract text from COA: invalid xref");
    }
}
