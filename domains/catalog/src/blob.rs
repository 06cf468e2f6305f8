//! Blob store boundary for asset version content
//!
//! The catalog persists only the locator a blob store hands back. Two
//! implementations:
//! - [`FsBlobStore`]: writes under a root directory, locators of the form
//!   `depot://refs/<project>/<timestamp>_<asset>_<filename>`
//! - [`MockBlobStore`]: keeps bytes in memory for tests

use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use chrono::Utc;
use uuid::Uuid;

use depot_common::{Error, Result};

/// Stores file content and returns an opaque locator
#[async_trait::async_trait]
pub trait BlobStore: Send + Sync {
    async fn store(
        &self,
        project_id: Uuid,
        asset_id: Uuid,
        filename: &str,
        bytes: &[u8],
    ) -> Result<String>;
}

/// Last path component, restricted to `[A-Za-z0-9._-]`
#[mutants::skip]
fn sanitize_filename(filename: &str) -> String {
    let base = Path::new(filename)
        .file_name()
        .and_then(|name| name.to_str())
        .unwrap_or("upload");
    let cleaned: String = base
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '.' | '-' | '_') {
                c
            } else {
                '_'
            }
        })
        .collect();
    if cleaned.trim_matches('.').is_empty() {
        "upload".to_string()
    } else {
        cleaned
    }
}

/// Filesystem blob store rooted at `ASSET_STORAGE_PATH`
#[derive(Debug, Clone)]
pub struct FsBlobStore {
    root: PathBuf,
}

impl FsBlobStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Resolve a locator produced by this store back to a path
    pub fn resolve(&self, locator: &str) -> Option<PathBuf> {
        let relative = locator.strip_prefix("depot://")?;
        if relative.split('/').any(|part| part == "..") {
            return None;
        }
        Some(self.root.join(relative))
    }
}

#[async_trait::async_trait]
impl BlobStore for FsBlobStore {
    async fn store(
        &self,
        project_id: Uuid,
        asset_id: Uuid,
        filename: &str,
        bytes: &[u8],
    ) -> Result<String> {
        let dir = self.root.join("refs").join(project_id.to_string());
        tokio::fs::create_dir_all(&dir)
            .await
            .map_err(|e| Error::Internal(format!("Failed to create blob directory: {}", e)))?;

        let name = format!(
            "{}_{}_{}",
            Utc::now().format("%Y%m%dT%H%M%S%6f"),
            asset_id,
            sanitize_filename(filename)
        );
        tokio::fs::write(dir.join(&name), bytes)
            .await
            .map_err(|e| Error::Internal(format!("Failed to write blob: {}", e)))?;

        tracing::debug!(
            project_id = %project_id,
            asset_id = %asset_id,
            bytes = bytes.len(),
            "Stored asset blob"
        );
        Ok(format!("depot://refs/{}/{}", project_id, name))
    }
}

/// Blob captured by the mock store
#[derive(Debug, Clone)]
pub struct StoredBlob {
    pub locator: String,
    pub project_id: Uuid,
    pub asset_id: Uuid,
    pub filename: String,
    pub bytes: Vec<u8>,
}

/// In-memory blob store for tests
#[derive(Debug, Clone, Default)]
pub struct MockBlobStore {
    blobs: Arc<Mutex<Vec<StoredBlob>>>,
}

impl MockBlobStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn stored(&self) -> Vec<StoredBlob> {
        self.blobs.lock().map(|b| b.clone()).unwrap_or_default()
    }
}

#[async_trait::async_trait]
impl BlobStore for MockBlobStore {
    async fn store(
        &self,
        project_id: Uuid,
        asset_id: Uuid,
        filename: &str,
        bytes: &[u8],
    ) -> Result<String> {
        let mut blobs = self
            .blobs
            .lock()
            .map_err(|_| Error::Internal("Mock blob store poisoned".to_string()))?;
        let locator = format!(
            "depot://refs/{}/{:04}_{}_{}",
            project_id,
            blobs.len(),
            asset_id,
            sanitize_filename(filename)
        );
        blobs.push(StoredBlob {
            locator: locator.clone(),
            project_id,
            asset_id,
            filename: filename.to_string(),
            bytes: bytes.to_vec(),
        });
        Ok(locator)
    }
}
