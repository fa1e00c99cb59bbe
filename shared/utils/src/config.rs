use config::{Config, ConfigError, Environment, File};
use serde::{Deserialize, Serialize};
use std::env;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub storage: StorageConfig,
    pub ocr: OcrConfig,
    pub ai: AiConfig,
    pub settings: SettingsConfig,
    pub branding: BrandingConfig,
    pub logging: LoggingConfig,
    pub monitoring: MonitoringConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub max_request_size: usize,
    pub timeout_seconds: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: u32,
    pub connection_timeout_seconds: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    pub upload_dir: String,
    pub generated_dir: String,
    pub max_file_size: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OcrConfig {
    pub enabled: bool,
    pub language: String,
    pub dpi: u32,
    /// Pages with less text than this are treated as scanned images
    pub min_page_chars: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AiConfig {
    pub api_url: String,
    pub vision_model: String,
    pub text_model: String,
    pub max_tokens: u32,
    pub temperature: f32,
    pub timeout_seconds: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SettingsConfig {
    pub path: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BrandingConfig {
    pub company_name: String,
    pub address: String,
    pub phone: String,
    pub batch_prefix: String,
    pub shelf_life_days: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub level: String,
    pub format: String,
    pub file_path: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MonitoringConfig {
    pub metrics_enabled: bool,
    pub prometheus_namespace: String,
}

impl AppConfig {
    pub fn load() -> Result<Self, ConfigError> {
        // Load .env file if it exists
        dotenvy::dotenv().ok();

        let config = Config::builder()
            .add_source(File::with_name("config/default").required(false))
            .add_source(
                File::with_name(&format!(
                    "config/{}",
                    env::var("ENVIRONMENT").unwrap_or_else(|_| "development".into())
                ))
                .required(false),
            )
            // Add local config (gitignored)
            .add_source(File::with_name("config/local").required(false))
            // CHEMDOCS__SERVER__PORT=9000 and friends
            .add_source(Environment::with_prefix("CHEMDOCS").separator("__"));

        config.build()?.try_deserialize()
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8080,
            // three 16MB uploads plus form overhead
            max_request_size: 3 * 16 * 1024 * 1024 + 1024 * 1024,
            timeout_seconds: 120,
        }
    }
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            url: "sqlite://chemdocs.db".to_string(),
            max_connections: 5,
            connection_timeout_seconds: 30,
        }
    }
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            upload_dir: "uploads".to_string(),
            generated_dir: "generated".to_string(),
            max_file_size: 16 * 1024 * 1024, // 16MB
        }
    }
}

impl Default for OcrConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            language: "eng+chi_sim".to_string(),
            dpi: 300,
            min_page_chars: 50,
        }
    }
}

impl Default for AiConfig {
    fn default() -> Self {
        Self {
            api_url: "https://api.mistral.ai/v1".to_string(),
            vision_model: "pixtral-12b-2409".to_string(),
            text_model: "mistral-large-latest".to_string(),
            max_tokens: 4000,
            temperature: 0.1,
            timeout_seconds: 30,
        }
    }
}

impl Default for SettingsConfig {
    fn default() -> Self {
        Self {
            path: "app_settings.json".to_string(),
        }
    }
}

impl Default for BrandingConfig {
    fn default() -> Self {
        Self {
            company_name: "Nano Tech Chemical Brothers Pvt. Ltd.".to_string(),
            address: "Vill. Mangarh, P.O. Kohara, Chandigarh Road Ludhiana-141112 INDIA".to_string(),
            phone: "9041060304".to_string(),
            batch_prefix: "NTCB".to_string(),
            shelf_life_days: 730,
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: "json".to_string(),
            file_path: None,
        }
    }
}

impl Default for MonitoringConfig {
    fn default() -> Self {
        Self {
            metrics_enabled: true,
            prometheus_namespace: "chemdocs".to_string(),
        }
    }
}
