//! PDF loading and document reduction.

use crate::types::{Document, DocumentMetadata, MinimalDocument};
use mediguide_core::{AppError, AppResult};
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

/// Load every PDF under `data_dir`, one [`Document`] per page.
///
/// Files are visited in path order. A file that cannot be parsed, or whose
/// extraction panics, is logged and skipped; a missing directory is an error.
pub async fn load_pdf_files(data_dir: &Path) -> AppResult<Vec<Document>> {
    if !data_dir.is_dir() {
        return Err(AppError::Ingest(format!(
            "Data directory not found: {:?}",
            data_dir
        )));
    }

    let files = find_pdf_files(data_dir);
    tracing::info!("Found {} PDF files in {:?}", files.len(), data_dir);

    let mut documents = Vec::new();
    for path in files {
        if let Some(pages) = extract_pages(path.clone()).await {
            tracing::debug!("Extracted {} pages from {:?}", pages.len(), path);
            documents.extend(pages_to_documents(&path, pages));
        }
    }

    Ok(documents)
}

/// Extract page texts off the async runtime. `None` means skip the file.
async fn extract_pages(path: PathBuf) -> Option<Vec<String>> {
    let task_path = path.clone();
    let result =
        tokio::task::spawn_blocking(move || pdf_extract::extract_text_by_pages(&task_path)).await;

    match result {
        Ok(Ok(pages)) => Some(pages),
        Ok(Err(e)) => {
            tracing::warn!("Skipping unreadable PDF {:?}: {}", path, e);
            None
        }
        Err(e) => {
            tracing::warn!("Skipping PDF {:?}, extraction aborted: {}", path, e);
            None
        }
    }
}

/// Collect `*.pdf` files (any case) below a directory, sorted.
fn find_pdf_files(dir: &Path) -> Vec<PathBuf> {
    let mut files: Vec<PathBuf> = WalkDir::new(dir)
        .follow_links(false)
        .into_iter()
        .filter_map(|e| e.ok())
        .filter(|e| e.file_type().is_file())
        .map(|e| e.into_path())
        .filter(|p| is_pdf(p))
        .collect();

    files.sort();
    files
}

fn is_pdf(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .map(|e| e.eq_ignore_ascii_case("pdf"))
        .unwrap_or(false)
}

/// Build page documents for one source file.
pub(crate) fn pages_to_documents(path: &Path, pages: Vec<String>) -> Vec<Document> {
    let source = path.to_string_lossy().to_string();
    let total_pages = pages.len() as u32;

    pages
        .into_iter()
        .enumerate()
        .map(|(page, text)| Document {
            page_content: text,
            metadata: DocumentMetadata {
                source: source.clone(),
                page: Some(page as u32),
                total_pages: Some(total_pages),
            },
        })
        .collect()
}

/// Reduce documents to their content and source.
pub fn filter_to_minimal_docs(documents: Vec<Document>) -> Vec<MinimalDocument> {
    documents
        .into_iter()
        .map(|doc| MinimalDocument {
            content: doc.page_content,
            source: doc.metadata.source,
        })
        .collect()
}
