//! Loading a corpus of plain-text documents from a directory.

use std::path::Path;

use tracing::{debug, info};

use crate::document::Document;
use crate::error::{RagError, Result};

/// Read every `*.txt` file directly inside `dir`, sorted by file name.
///
/// Each document's source is its file name. Subdirectories and other
/// extensions are skipped.
///
/// # Errors
///
/// Returns [`RagError::Io`] if `dir` cannot be listed or a file cannot be
/// read as UTF-8.
pub async fn load_documents(dir: impl AsRef<Path>) -> Result<Vec<Document>> {
    let dir = dir.as_ref();
    let io_err = |path: &Path| {
        let path = path.to_path_buf();
        move |source| RagError::Io { path, source }
    };

    let mut entries = tokio::fs::read_dir(dir).await.map_err(io_err(dir))?;
    let mut paths = Vec::new();
    while let Some(entry) = entries.next_entry().await.map_err(io_err(dir))? {
        let path = entry.path();
        let is_txt = path.extension().is_some_and(|ext| ext == "txt");
        if is_txt && entry.file_type().await.map_err(io_err(&path))?.is_file() {
            paths.push(path);
        }
    }
    paths.sort();

    let mut documents = Vec::with_capacity(paths.len());
    for path in paths {
        let text = tokio::fs::read_to_string(&path).await.map_err(io_err(&path))?;
        let source = path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_default();
        debug!(%source, chars = text.chars().count(), "loaded document");
        documents.push(Document { source, text });
    }

    info!(dir = %dir.display(), documents = documents.len(), "loaded corpus");
    Ok(documents)
}
