//! `seed` and `import` commands

use std::path::Path;

use anyhow::{Context, Result};
use redact_core::inspect_pdf;
use redact_core::sample::sample_documents;
use tracing::{info, warn};

use crate::store::{Document, Store};

const DOCUMENTS_DIR: &str = "documents";

/// Replace every document with the bundled sample documents
pub async fn seed(store: &Store) -> Result<Vec<Document>> {
    info!("Creating sample PDF documents...");
    let removed = store.delete_all_documents().await?;
    warn!("Deleted {} existing documents", removed);

    let mut created = Vec::new();
    for sample in sample_documents() {
        let (title, filename) = (sample.title, sample.filename);
        let pdf = tokio::task::spawn_blocking(move || sample.build_pdf()).await??;
        let info = inspect_pdf(&pdf)?;

        let file_ref = store.media().save(DOCUMENTS_DIR, filename, &pdf).await?;
        let document = store
            .insert_document(title, &file_ref, info.page_count)
            .await?;
        info!("Created: {} ({} pages)", title, info.page_count);
        created.push(document);
    }

    info!("Successfully created {} sample documents", created.len());
    Ok(created)
}

/// Copy a PDF into the media root and register it
pub async fn import(store: &Store, path: &Path, title: Option<String>) -> Result<Document> {
    let bytes = tokio::fs::read(path)
        .await
        .with_context(|| format!("Failed to read {}", path.display()))?;
    let info = inspect_pdf(&bytes).with_context(|| format!("{} is not a usable PDF", path.display()))?;

    let filename = path
        .file_name()
        .and_then(|n| n.to_str())
        .context("Path has no file name")?;
    let title = match title {
        Some(title) => title,
        None => path
            .file_stem()
            .and_then(|s| s.to_str())
            .unwrap_or(filename)
            .to_string(),
    };

    let file_ref = store.media().save(DOCUMENTS_DIR, filename, &bytes).await?;
    let document = store
        .insert_document(&title, &file_ref, info.page_count)
        .await?;
    info!("Imported {} as document {}", path.display(), document.id);
    Ok(document)
}
