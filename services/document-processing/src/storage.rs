//! Local file storage for supplier uploads and generated documents.

use anyhow::{Context, Result};
use std::path::{Path, PathBuf};

use chemdocs_models::DocumentKind;
use chemdocs_utils::{secure_filename, StorageConfig};

#[derive(Debug, Clone)]
pub struct FileStorage {
    upload_dir: PathBuf,
    generated_dir: PathBuf,
}

impl FileStorage {
    /// Create the storage directories if needed
    pub async fn new(config: &StorageConfig) -> Result<Self> {
        let storage = Self {
            upload_dir: PathBuf::from(&config.upload_dir),
            generated_dir: PathBuf::from(&config.generated_dir),
        };

        for dir in [&storage.upload_dir, &storage.generated_dir] {
            tokio::fs::create_dir_all(dir)
                .await
                .with_context(|| format!("Failed to create directory {}", dir.display()))?;
        }

        Ok(storage)
    }

    /// `{document_set_id}_{document_type}_{original_filename}`
    pub fn upload_file_name(document_set_id: i64, kind: DocumentKind, original_name: &str) -> String {
        let cleaned = secure_filename(original_name);
        let cleaned = if cleaned.is_empty() {
            format!("{}.pdf", kind.as_str())
        } else {
            cleaned
        };
        format!("{}_{}_{}", document_set_id, kind.as_str(), cleaned)
    }

    pub async fn store_upload(
        &self,
        document_set_id: i64,
        kind: DocumentKind,
        original_name: &str,
        data: &[u8],
    ) -> Result<String> {
        let path = self
            .upload_dir
            .join(Self::upload_file_name(document_set_id, kind, original_name));
        write_file(&path, data).await
    }

    pub async fn store_generated(&self, file_name: &str, data: &[u8]) -> Result<String> {
        let path = self.generated_dir.join(file_name);
        write_file(&path, data).await
    }

    pub async fn read(&self, path: &str) -> Result<Vec<u8>> {
        tokio::fs::read(path)
            .await
            .with_context(|| format!("Failed to read {}", path))
    }

    pub async fn exists(&self, path: &str) -> bool {
        tokio::fs::try_exists(path).await.unwrap_or(false)
    }

    /// Remove a file; one that is already gone is not an error
    pub async fn remove(&self, path: &str) -> Result<()> {
        match tokio::fs::remove_file(path).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e).with_context(|| format!("Failed to remove {}", path)),
        }
    }
}

async fn write_file(path: &Path, data: &[u8]) -> Result<String> {
    tokio::fs::write(path, data)
        .await
        .with_context(|| format!("Failed to write {}", path.display()))?;
    Ok(path.to_string_lossy().into_owned())
}
