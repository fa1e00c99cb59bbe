use serde::{Deserialize, Serialize};
use validator::Validate;

/// Persisted AI integration settings.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AiSettings {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mistral_api_key: Option<String>,
    pub enable_ai_ocr: bool,
    pub enable_field_validation: bool,
}

impl AiSettings {
    pub fn api_key(&self) -> Option<&str> {
        self.mistral_api_key.as_deref().filter(|key| !key.trim().is_empty())
    }

    /// AI OCR runs only when it is switched on and a key is present
    pub fn ai_ocr_active(&self) -> bool {
        self.enable_ai_ocr && self.api_key().is_some()
    }

    pub fn field_validation_active(&self) -> bool {
        self.enable_field_validation && self.api_key().is_some()
    }

    pub fn view(&self) -> AiSettingsView {
        AiSettingsView {
            has_api_key: self.api_key().is_some(),
            enable_ai_ocr: self.enable_ai_ocr,
            enable_field_validation: self.enable_field_validation,
        }
    }

    /// Apply an update. An absent or blank key leaves the stored key alone.
    pub fn apply(&mut self, update: SettingsUpdate) {
        if let Some(key) = update.mistral_api_key.filter(|key| !key.trim().is_empty()) {
            self.mistral_api_key = Some(key.trim().to_string());
        }
        if let Some(enabled) = update.enable_ai_ocr {
            self.enable_ai_ocr = enabled;
        }
        if let Some(enabled) = update.enable_field_validation {
            self.enable_field_validation = enabled;
        }
    }
}

/// Settings as returned to clients; the key itself never leaves the server.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AiSettingsView {
    pub has_api_key: bool,
    pub enable_ai_ocr: bool,
    pub enable_field_validation: bool,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate)]
pub struct SettingsUpdate {
    #[validate(length(min = 8, max = 256))]
    pub mistral_api_key: Option<String>,
    pub enable_ai_ocr: Option<bool>,
    pub enable_field_validation: Option<bool>,
}

impl SettingsUpdate {
    /// Blank keys mean "keep the current key", not "validate an empty key"
    pub fn normalized(mut self) -> Self {
        if self.mistral_api_key.as_deref().is_some_and(|key| key.trim().is_empty()) {
            self.mistral_api_key = None;
        }
        self
    }
}
