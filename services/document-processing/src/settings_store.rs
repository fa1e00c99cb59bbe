//! JSON-file backed store for the AI settings.

use anyhow::{Context, Result};
use std::path::{Path, PathBuf};
use tokio::sync::RwLock;

use chemdocs_models::{AiSettings, SettingsUpdate};

pub struct SettingsStore {
    path: PathBuf,
    current: RwLock<AiSettings>,
}

impl SettingsStore {
    /// Load settings from `path`. A missing or unreadable file yields defaults.
    pub async fn load(path: impl AsRef<Path>) -> Self {
        let path = path.as_ref().to_path_buf();
        let current = match tokio::fs::read_to_string(&path).await {
            Ok(contents) => match serde_json::from_str::<AiSettings>(&contents) {
                Ok(settings) => settings,
                Err(e) => {
                    tracing::error!(path = %path.display(), error = %e, "Settings file is corrupt, using defaults");
                    AiSettings::default()
                }
            },
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => AiSettings::default(),
            Err(e) => {
                tracing::error!(path = %path.display(), error = %e, "Failed to read settings file, using defaults");
                AiSettings::default()
            }
        };

        Self {
            path,
            current: RwLock::new(current),
        }
    }

    pub async fn get(&self) -> AiSettings {
        self.current.read().await.clone()
    }

    /// Apply an update and persist it. The in-memory copy only changes once
    /// the file has been written.
    pub async fn update(&self, update: SettingsUpdate) -> Result<AiSettings> {
        let mut current = self.current.write().await;
        let mut next = current.clone();
        next.apply(update);

        let json = serde_json::to_string_pretty(&next)?;
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent)
                .await
                .with_context(|| format!("Failed to create {}", parent.display()))?;
        }
        tokio::fs::write(&self.path, json)
            .await
            .with_context(|| format!("Failed to write {}", self.path.display()))?;

        *current = next.clone();
        tracing::info!(
            has_api_key = next.api_key().is_some(),
            enable_ai_ocr = next.enable_ai_ocr,
            enable_field_validation = next.enable_field_validation,
            "AI settings updated"
        );
        Ok(next)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_missing_file_loads_defaults() {
        let dir = TempDir::new().unwrap();
        let store = SettingsStore::load(dir.path().join("app_settings.json")).await;
        assert_eq!(store.get().await, AiSettings::default());
    }

    #[tokio::test]
    async fn test_corrupt_file_loads_defaults() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("app_settings.json");
        std::fs::write(&path, "{not json").unwrap();

        let store = SettingsStore::load(&path).await;
        assert_eq!(store.get().await, AiSettings::default());
    }

    #[tokio::test]
    async fn test_update_persists_and_reloads() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("nested").join("app_settings.json");
        let store = SettingsStore::load(&path).await;

        store
            .update(SettingsUpdate {
                mistral_api_key: Some("secret-key-123".into()),
                enable_ai_ocr: Some(true),
                enable_field_validation: None,
            })
            .await
            .unwrap();

        // An empty key keeps the stored one
        store
            .update(SettingsUpdate {
                mistral_api_key: Some(String::new()),
                enable_ai_ocr: None,
                enable_field_validation: Some(true),
            })
            .await
            .unwrap();

        let reloaded = SettingsStore::load(&path).await.get().await;
        assert_eq!(reloaded.api_key(), Some("secret-key-123"));
        assert!(reloaded.enable_ai_ocr);
        assert!(reloaded.enable_field_validation);
    }
}
