pub mod config;
pub mod logging;
pub mod error;
pub mod validation;

pub use config::*;
pub use logging::*;
pub use error::*;
pub use validation::*;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_defaults() {
        let config = AppConfig::default();
        assert_eq!(config.server.port, 8080);
        assert_eq!(config.server.host, "0.0.0.0");
        assert_eq!(config.storage.max_file_size, 16 * 1024 * 1024);
        assert_eq!(config.branding.batch_prefix, "NTCB");
        assert_eq!(config.ocr.language, "eng+chi_sim");
    }

    #[test]
    fn test_partial_config_fills_defaults() {
        let config: AppConfig =
            serde_json::from_str(r#"{"server":{"port":9000},"ocr":{"enabled":false}}"#).unwrap();
        assert_eq!(config.server.port, 9000);
        assert_eq!(config.server.host, "0.0.0.0");
        assert!(!config.ocr.enabled);
        assert_eq!(config.ocr.dpi, 300);
        assert_eq!(config.ai.text_model, "mistral-large-latest");
    }

    #[test]
    fn test_error_handling() {
        let error = ChemdocsError::validation("supplier_coa", "COA file must be a PDF");
        assert_eq!(error.error_code(), "VALIDATION_ERROR");
        assert_eq!(error.http_status_code(), 400);
        assert_eq!(error.user_message(), "COA file must be a PDF");

        let too_large = ChemdocsError::payload_too_large("File is too large. Maximum size is 16MB.");
        assert_eq!(too_large.http_status_code(), 413);
    }

    #[test]
    fn test_error_response_carries_field() {
        let response = ErrorResponse::from(ChemdocsError::validation("supplier_tds", "Please select a TDS file"));
        assert_eq!(response.code, "VALIDATION_ERROR");
        assert_eq!(response.message, "Please select a TDS file");
        assert_eq!(response.details.unwrap()["field"], "supplier_tds");
    }
}
