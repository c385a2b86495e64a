//! Local filesystem backend.
//!
//! Backs local-only mode and the development fallback. The content file is
//! the same seeded `data.json` the site renders from, so a fallback write is
//! immediately visible in a local preview.

use std::io::ErrorKind;
use std::path::Path;

use super::StoreError;

/// Read the local content document.
pub async fn read_document(path: &Path) -> Result<Vec<u8>, StoreError> {
    tokio::fs::read(path).await.map_err(StoreError::Io)
}

/// Write the local content document, creating parent directories as needed.
pub async fn write_document(path: &Path, bytes: &[u8]) -> Result<(), StoreError> {
    if let Some(parent) = path.parent() {
        tokio::fs::create_dir_all(parent)
            .await
            .map_err(StoreError::Io)?;
    }
    tokio::fs::write(path, bytes).await.map_err(StoreError::Io)
}

/// Write an uploaded asset under the local uploads directory.
pub async fn write_upload(dir: &Path, name: &str, bytes: &[u8]) -> Result<(), StoreError> {
    tokio::fs::create_dir_all(dir).await.map_err(StoreError::Io)?;
    tokio::fs::write(dir.join(name), bytes)
        .await
        .map_err(StoreError::Io)
}

/// List uploaded asset filenames, sorted. A missing directory is an empty
/// listing, not an error.
pub async fn list_uploads(dir: &Path) -> Result<Vec<String>, StoreError> {
    let mut entries = match tokio::fs::read_dir(dir).await {
        Ok(entries) => entries,
        Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
        Err(e) => return Err(StoreError::Io(e)),
    };

    let mut names = Vec::new();
    while let Some(entry) = entries.next_entry().await.map_err(StoreError::Io)? {
        let is_file = entry
            .file_type()
            .await
            .map(|t| t.is_file())
            .unwrap_or(false);
        if is_file {
            if let Ok(name) = entry.file_name().into_string() {
                names.push(name);
            }
        }
    }
    names.sort();
    Ok(names)
}
