//! Uploaded text documents.
//!
//! Bodies live under `file:{id}` as raw text; the `uploaded-files` key holds
//! the metadata index. Ids are content hashes, so importing the same text
//! twice refreshes its entry instead of adding another.

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use walkdir::WalkDir;

use crate::store::{keys, load_json, save_json, KeyValueStore, StoreResult};

pub const TEXT_EXTENSIONS: [&str; 2] = ["txt", "md"];

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UploadedFile {
    pub id: String,
    pub name: String,
    pub size: usize,
    pub uploaded_at: DateTime<Utc>,
}

/// First 16 hex chars of the SHA-256 of the content.
pub fn document_id(content: &str) -> String {
    let digest = format!("{:x}", Sha256::digest(content.as_bytes()));
    digest[..16].to_string()
}

pub fn discover_documents(directory: &Path) -> Vec<PathBuf> {
    let mut documents: Vec<PathBuf> = WalkDir::new(directory)
        .follow_links(false)
        .into_iter()
        .filter_map(|e| e.ok())
        .map(|entry| entry.into_path())
        .filter(|path| path.is_file() && is_text_document(path))
        .collect();

    documents.sort();
    documents
}

fn is_text_document(path: &Path) -> bool {
    path.extension()
        .map(|ext| ext.to_string_lossy().to_lowercase())
        .is_some_and(|ext| TEXT_EXTENSIONS.contains(&ext.as_str()))
}

pub struct DocumentStore {
    store: Arc<dyn KeyValueStore>,
}

impl DocumentStore {
    pub fn new(store: Arc<dyn KeyValueStore>) -> Self {
        Self { store }
    }

    pub fn list(&self) -> StoreResult<Vec<UploadedFile>> {
        Ok(load_json(self.store.as_ref(), keys::UPLOADED_FILES)?.unwrap_or_default())
    }

    pub fn import_text(&self, name: &str, content: &str) -> StoreResult<UploadedFile> {
        let file = UploadedFile {
            id: document_id(content),
            name: name.to_string(),
            size: content.len(),
            uploaded_at: Utc::now(),
        };

        self.store.set(&keys::file(&file.id), content)?;

        let mut index = self.list()?;
        index.retain(|f| f.id != file.id);
        index.push(file.clone());
        save_json(self.store.as_ref(), keys::UPLOADED_FILES, &index)?;

        tracing::info!(id = %file.id, name, size = file.size, "Imported document");
        Ok(file)
    }

    /// Import one file, or every `.txt`/`.md` file under a directory. A
    /// single file must be readable text; inside a directory, unreadable or
    /// non-UTF-8 files are skipped with a warning.
    pub fn import_path(&self, path: &Path) -> Result<Vec<UploadedFile>> {
        if !path.is_dir() {
            let content = std::fs::read_to_string(path)
                .with_context(|| format!("Failed to read {}", path.display()))?;
            return Ok(vec![self.import_text(&file_name(path), &content)?]);
        }

        let mut imported = Vec::new();
        for path in discover_documents(path) {
            let content = match std::fs::read_to_string(&path) {
                Ok(content) => content,
                Err(e) => {
                    tracing::warn!(path = %path.display(), error = %e, "Skipping unreadable document");
                    continue;
                }
            };
            imported.push(self.import_text(&file_name(&path), &content)?);
        }
        Ok(imported)
    }

    pub fn content(&self, id: &str) -> StoreResult<Option<String>> {
        self.store.get(&keys::file(id))
    }

    /// Drop a document and its index entry. Returns whether it was listed.
    pub fn remove(&self, id: &str) -> StoreResult<bool> {
        let mut index = self.list()?;
        let before = index.len();
        index.retain(|f| f.id != id);

        self.store.remove(&keys::file(id))?;
        if index.len() == before {
            return Ok(false);
        }
        save_json(self.store.as_ref(), keys::UPLOADED_FILES, &index)?;
        Ok(true)
    }
}

fn file_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}
