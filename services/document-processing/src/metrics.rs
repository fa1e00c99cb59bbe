//! Prometheus metrics for the upload pipeline.

use prometheus::{Histogram, HistogramOpts, IntCounter, IntCounterVec, Opts, Registry, TextEncoder};

/// Pipeline counters, registered on a registry owned by the application state
/// so several apps can coexist in one process.
#[derive(Clone)]
pub struct PipelineMetrics {
    registry: Registry,
    uploads: IntCounterVec,
    failures: IntCounterVec,
    ocr_pages: IntCounter,
    duration: Histogram,
}

impl PipelineMetrics {
    pub fn new(namespace: &str) -> Result<Self, prometheus::Error> {
        let registry = Registry::new();

        let uploads = IntCounterVec::new(
            Opts::new("uploads_total", "Document set uploads by outcome").namespace(namespace),
            &["outcome"],
        )?;
        let failures = IntCounterVec::new(
            Opts::new("pipeline_failures_total", "Pipeline failures by stage").namespace(namespace),
            &["stage"],
        )?;
        let ocr_pages = IntCounter::with_opts(
            Opts::new("ocr_pages_total", "Pages whose text came from OCR").namespace(namespace),
        )?;
        let duration = Histogram::with_opts(
            HistogramOpts::new("pipeline_duration_seconds", "Time to process one document set")
                .namespace(namespace)
                .buckets(vec![0.5, 1.0, 2.5, 5.0, 10.0, 30.0, 60.0, 120.0]),
        )?;

        registry.register(Box::new(uploads.clone()))?;
        registry.register(Box::new(failures.clone()))?;
        registry.register(Box::new(ocr_pages.clone()))?;
        registry.register(Box::new(duration.clone()))?;

        Ok(Self {
            registry,
            uploads,
            failures,
            ocr_pages,
            duration,
        })
    }

    /// `processed`, `reused` or `failed`
    pub fn record_upload(&self, outcome: &str) {
        self.uploads.with_label_values(&[outcome]).inc();
    }

    pub fn record_failure(&self, stage: &str) {
        self.failures.with_label_values(&[stage]).inc();
    }

    pub fn record_ocr_pages(&self, pages: usize) {
        self.ocr_pages.inc_by(pages as u64);
    }

    pub fn observe_duration(&self, seconds: f64) {
        self.duration.observe(seconds);
    }

    /// Text exposition format for `/metrics`
    pub fn encode(&self) -> Result<String, prometheus::Error> {
        TextEncoder::new().encode_to_string(&self.registry.gather())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_encode_contains_counters() {
        let metrics = PipelineMetrics::new("chemdocs").unwrap();
        metrics.record_upload("processed");
        metrics.record_failure("extraction");
        metrics.record_ocr_pages(2);
        metrics.observe_duration(1.5);

        let text = metrics.encode().unwrap();
        assert!(text.contains("chemdocs_uploads_total{outcome=\"processed\"} 1"));
        assert!(text.contains("chemdocs_pipeline_failures_total{stage=\"extraction\"} 1"));
        assert!(text.contains("chemdocs_ocr_pages_total 2"));
        assert!(text.contains("chemdocs_pipeline_duration_seconds_count 1"));
    }

    #[test]
    fn test_independent_registries() {
        let first = PipelineMetrics::new("chemdocs").unwrap();
        let second = PipelineMetrics::new("chemdocs").unwrap();
        first.record_upload("reused");
        assert!(!second.encode().unwrap().contains("reused"));
    }
}
