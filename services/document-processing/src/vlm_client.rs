//! VLM (Vision-Language Model) Client
//!
//! Optional Mistral integration: OCR enhancement for scanned pages and a
//! correction pass over the extracted fields. Every call degrades to the
//! caller's input on failure.

use anyhow::{Context, Result};
use base64::{engine::general_purpose::STANDARD as BASE64, Engine as _};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;

use chemdocs_models::ExtractedFields;
use chemdocs_utils::{validate_cas_number, AiConfig};

use crate::ocr::PageImage;

/// VLM client for document processing
#[derive(Clone)]
pub struct VlmClient {
    client: Client,
    config: AiConfig,
}

/// Outcome of a connectivity check
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ConnectionStatus {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub models_available: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl ConnectionStatus {
    fn failed(error: impl Into<String>) -> Self {
        Self {
            success: false,
            message: None,
            models_available: None,
            error: Some(error.into()),
        }
    }
}

impl VlmClient {
    pub fn new(config: &AiConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_seconds))
            .build()
            .context("Failed to create HTTP client")?;

        Ok(Self {
            client,
            config: config.clone(),
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.config.api_url.trim_end_matches('/'), path)
    }

    /// List models with the given key. Never fails; errors are reported in
    /// the status.
    pub async fn test_connection(&self, api_key: Option<&str>) -> ConnectionStatus {
        let Some(api_key) = api_key.filter(|key| !key.trim().is_empty()) else {
            return ConnectionStatus::failed("No API key provided");
        };

        let response = match self
            .client
            .get(self.url("models"))
            .bearer_auth(api_key)
            .send()
            .await
        {
            Ok(response) => response,
            Err(e) => return ConnectionStatus::failed(format!("Connection failed: {}", e)),
        };

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return ConnectionStatus::failed(format!("API returned status {}: {}", status.as_u16(), body));
        }

        match response.json::<ModelList>().await {
            Ok(models) => ConnectionStatus {
                success: true,
                message: Some("Connection successful".to_string()),
                models_available: Some(models.data.len()),
                error: None,
            },
            Err(e) => ConnectionStatus::failed(format!("Unexpected response: {}", e)),
        }
    }

    /// Re-read a page image with the vision model. Returns `existing_text`
    /// when the call fails or comes back empty.
    pub async fn enhance_ocr(&self, api_key: &str, image: &PageImage, existing_text: &str) -> String {
        match self.request_ocr(api_key, image).await {
            Ok(text) if !text.trim().is_empty() => {
                tracing::info!(page = image.page_number, chars = text.len(), "AI OCR enhanced page text");
                text
            }
            Ok(_) => existing_text.to_string(),
            Err(e) => {
                tracing::error!(page = image.page_number, error = %e, "AI OCR enhancement failed");
                existing_text.to_string()
            }
        }
    }

    async fn request_ocr(&self, api_key: &str, image: &PageImage) -> Result<String> {
        let request = VlmRequest {
            model: self.config.vision_model.clone(),
            messages: vec![VlmMessage {
                role: "user".to_string(),
                content: vec![
                    VlmContent::Text {
                        text: OCR_PROMPT.to_string(),
                    },
                    VlmContent::Image {
                        image_url: ImageUrl {
                            url: format!("data:image/png;base64,{}", BASE64.encode(&image.png)),
                        },
                    },
                ],
            }],
            max_tokens: self.config.max_tokens,
            temperature: None,
        };

        self.chat(api_key, &request).await
    }

    /// Ask the text model to correct OCR errors in the field bag.
    ///
    /// The reply is overlaid on the input, so fields the model leaves out keep
    /// their extracted values. Any failure returns the input unchanged.
    pub async fn validate_fields(&self, api_key: &str, fields: &ExtractedFields) -> ExtractedFields {
        match self.request_validation(api_key, fields).await {
            Ok(corrected) => {
                tracing::info!("AI field validation completed");
                let mut merged = fields.clone();
                merged.merge(corrected);
                if let Some(cas) = merged.cas_number.as_deref() {
                    if validate_cas_number(cas).is_err() {
                        tracing::warn!(cas_number = cas, "AI returned a CAS number with a bad check digit, keeping extracted value");
                        merged.cas_number = fields.cas_number.clone();
                    }
                }
                merged
            }
            Err(e) => {
                tracing::error!(error = %e, "AI field validation failed");
                fields.clone()
            }
        }
    }

    async fn request_validation(&self, api_key: &str, fields: &ExtractedFields) -> Result<ExtractedFields> {
        let data = serde_json::to_string_pretty(fields)?;
        let request = VlmRequest {
            model: self.config.text_model.clone(),
            messages: vec![VlmMessage {
                role: "user".to_string(),
                content: vec![VlmContent::Text {
                    text: VALIDATION_PROMPT.replace("{data}", &data),
                }],
            }],
            max_tokens: self.config.max_tokens,
            temperature: Some(self.config.temperature),
        };

        let content = self.chat(api_key, &request).await?;
        parse_json_reply(&content)
    }

    async fn chat(&self, api_key: &str, request: &VlmRequest) -> Result<String> {
        let response = self
            .client
            .post(self.url("chat/completions"))
            .bearer_auth(api_key)
            .json(request)
            .send()
            .await
            .context("Failed to call VLM API")?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response.text().await.unwrap_or_default();
            anyhow::bail!("VLM API error {}: {}", status.as_u16(), error_text);
        }

        let result: VlmResponse = response.json().await.context("Failed to parse VLM response")?;

        result
            .choices
            .into_iter()
            .next()
            .map(|choice| choice.message.content)
            .context("No response content")
    }
}

/// Pull the JSON object out of a model reply, with or without a ```json fence
fn parse_json_reply(content: &str) -> Result<ExtractedFields> {
    let json = match content.find("```json") {
        Some(start) => {
            let body = &content[start + "```json".len()..];
            let end = body.find("```").unwrap_or(body.len());
            &body[..end]
        }
        None => content,
    };

    serde_json::from_str(json.trim()).context("Failed to parse validation JSON")
}

/// VLM API request
#[derive(Debug, Serialize)]
struct VlmRequest {
    model: String,
    messages: Vec<VlmMessage>,
    max_tokens: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
}

#[derive(Debug, Serialize)]
struct VlmMessage {
    role: String,
    content: Vec<VlmContent>,
}

#[derive(Debug, Serialize)]
#[serde(tag = "type")]
enum VlmContent {
    #[serde(rename = "text")]
    Text { text: String },
    #[serde(rename = "image_url")]
    Image { image_url: ImageUrl },
}

#[derive(Debug, Serialize)]
struct ImageUrl {
    url: String,
}

/// VLM API response
#[derive(Debug, Deserialize)]
struct VlmResponse {
    choices: Vec<VlmChoice>,
}

#[derive(Debug, Deserialize)]
struct VlmChoice {
    message: VlmChoiceMessage,
}

#[derive(Debug, Deserialize)]
struct VlmChoiceMessage {
    content: String,
}

#[derive(Debug, Deserialize)]
struct ModelList {
    #[serde(default)]
    data: Vec<serde_json::Value>,
}

const OCR_PROMPT: &str = r#"Please extract ALL text content from this document image with high accuracy.
Pay special attention to:
- Product names, chemical names, and INCI names
- CAS numbers and molecular formulas
- Test results, specifications, and numerical values
- Company names and contact information
- Dates, batch numbers, and lot numbers
- Table data, keeping each row on one line with columns separated by two spaces

Return the extracted text exactly as it appears, maintaining the original structure."#;

const VALIDATION_PROMPT: &str = r#"Please validate and correct the following extracted chemical document data.
Look for common OCR errors and inconsistencies.

Extracted Data:
{data}

Check and correct:
1. Product names: proper chemical nomenclature
2. CAS numbers: format XXXXX-XX-X
3. INCI names: cosmetic ingredient naming standards
4. Molecular formulas: chemical formula syntax
5. Test values: units and ranges
6. Company names: OCR spelling errors
7. Dates: format YYYY-MM-DD

Return the corrected data in the same JSON structure inside a ```json block.
Only modify fields that contain clear errors.
Add a "validation_notes" field explaining any corrections made."#;
