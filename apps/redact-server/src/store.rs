//! Documents and redactions persisted in SQLite

use chrono::{DateTime, Utc};
use redact_core::{
    inspect_pdf, CanonicalRect, Coordinates, DocumentInfo, NewRedaction, PdfError, Redaction,
    RedactionKind, ValidationError,
};
use serde::Serialize;
use sqlx::sqlite::SqlitePool;
use sqlx::FromRow;
use thiserror::Error;

use crate::media::{MediaError, MediaStore};

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Document not found: {0}")]
    DocumentNotFound(i64),

    #[error("Redaction not found: {0}")]
    RedactionNotFound(i64),

    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error(transparent)]
    Pdf(#[from] PdfError),

    #[error(transparent)]
    Media(#[from] MediaError),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),
}

pub type StoreResult<T> = Result<T, StoreError>;

#[derive(Debug, Clone, PartialEq, Serialize, FromRow)]
pub struct Document {
    pub id: i64,
    pub title: String,
    /// Relative to the media root
    pub file_ref: String,
    pub page_count: i64,
    pub uploaded_at: DateTime<Utc>,
}

#[derive(Debug, FromRow)]
struct DbRedaction {
    id: i64,
    document_id: i64,
    kind: String,
    page: i64,
    x: f64,
    y: f64,
    width: f64,
    height: f64,
    created_at: DateTime<Utc>,
}

impl TryFrom<DbRedaction> for Redaction {
    type Error = sqlx::Error;

    fn try_from(row: DbRedaction) -> Result<Self, Self::Error> {
        let kind = RedactionKind::parse(&row.kind)
            .ok_or_else(|| sqlx::Error::Decode(format!("unknown redaction kind {:?}", row.kind).into()))?;
        let page = u32::try_from(row.page)
            .map_err(|_| sqlx::Error::Decode(format!("invalid page {}", row.page).into()))?;
        Ok(Redaction {
            id: row.id,
            document_id: row.document_id,
            kind,
            page,
            rect: CanonicalRect::new(row.x, row.y, row.width, row.height),
            created_at: row.created_at,
        })
    }
}

const REDACTION_COLUMNS: &str = "id, document_id, kind, page, x, y, width, height, created_at";

fn into_redactions(rows: Vec<DbRedaction>) -> StoreResult<Vec<Redaction>> {
    rows.into_iter()
        .map(|row| Redaction::try_from(row).map_err(StoreError::from))
        .collect()
}

/// Stored PDFs and their redactions
#[derive(Debug, Clone)]
pub struct Store {
    db: SqlitePool,
    media: MediaStore,
}

impl Store {
    pub fn new(db: SqlitePool, media: MediaStore) -> Self {
        Self { db, media }
    }

    pub fn media(&self) -> &MediaStore {
        &self.media
    }

    pub async fn insert_document(
        &self,
        title: &str,
        file_ref: &str,
        page_count: u32,
    ) -> StoreResult<Document> {
        let document: Document = sqlx::query_as(
            r#"
            INSERT INTO documents (title, file_ref, page_count, uploaded_at)
            VALUES (?, ?, ?, ?)
            RETURNING id, title, file_ref, page_count, uploaded_at
            "#,
        )
        .bind(title)
        .bind(file_ref)
        .bind(i64::from(page_count))
        .bind(Utc::now())
        .fetch_one(&self.db)
        .await?;

        tracing::info!("Registered document {}: {}", document.id, document.title);
        Ok(document)
    }

    pub async fn get_document(&self, id: i64) -> StoreResult<Document> {
        let document: Option<Document> = sqlx::query_as(
            "SELECT id, title, file_ref, page_count, uploaded_at FROM documents WHERE id = ?",
        )
        .bind(id)
        .fetch_optional(&self.db)
        .await?;
        document.ok_or(StoreError::DocumentNotFound(id))
    }

    /// Newest first
    pub async fn list_documents(&self) -> StoreResult<Vec<Document>> {
        let documents = sqlx::query_as(
            r#"
            SELECT id, title, file_ref, page_count, uploaded_at
            FROM documents
            ORDER BY uploaded_at DESC, id DESC
            "#,
        )
        .fetch_all(&self.db)
        .await?;
        Ok(documents)
    }

    /// Remove a document, its redactions and its file
    pub async fn delete_document(&self, id: i64) -> StoreResult<()> {
        let document = self.get_document(id).await?;
        sqlx::query("DELETE FROM documents WHERE id = ?")
            .bind(id)
            .execute(&self.db)
            .await?;
        self.media.delete(&document.file_ref).await?;
        tracing::info!("Deleted document {}", id);
        Ok(())
    }

    pub async fn delete_all_documents(&self) -> StoreResult<usize> {
        let documents = self.list_documents().await?;
        for document in &documents {
            self.delete_document(document.id).await?;
        }
        Ok(documents.len())
    }

    pub async fn read_file(&self, document: &Document) -> StoreResult<Vec<u8>> {
        Ok(self.media.read(&document.file_ref).await?)
    }

    /// Page geometry read from the document's file
    pub async fn document_info(&self, document: &Document) -> StoreResult<DocumentInfo> {
        let bytes = self.read_file(document).await?;
        Ok(inspect_pdf(&bytes)?)
    }

    /// Validate and persist a redaction. Nothing is stored when validation fails.
    pub async fn create_redaction(
        &self,
        document_id: i64,
        kind: RedactionKind,
        coordinates: &Coordinates,
    ) -> StoreResult<Redaction> {
        let document = self.get_document(document_id).await?;
        let info = self.document_info(&document).await?;
        let new = NewRedaction::validate(kind, coordinates, &info)?;

        let row: DbRedaction = sqlx::query_as(&format!(
            r#"
            INSERT INTO redactions (document_id, kind, page, x, y, width, height, created_at)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?)
            RETURNING {}
            "#,
            REDACTION_COLUMNS
        ))
        .bind(document_id)
        .bind(new.kind.as_str())
        .bind(i64::from(new.page))
        .bind(new.rect.x)
        .bind(new.rect.y)
        .bind(new.rect.width)
        .bind(new.rect.height)
        .bind(Utc::now())
        .fetch_one(&self.db)
        .await?;

        let redaction = Redaction::try_from(row)?;
        tracing::info!(
            "Created {} redaction {} on document {} page {}",
            redaction.kind,
            redaction.id,
            document_id,
            redaction.page
        );
        Ok(redaction)
    }

    /// Insertion order
    pub async fn list_redactions(&self, document_id: i64) -> StoreResult<Vec<Redaction>> {
        self.get_document(document_id).await?;
        let rows: Vec<DbRedaction> = sqlx::query_as(&format!(
            "SELECT {} FROM redactions WHERE document_id = ? ORDER BY id",
            REDACTION_COLUMNS
        ))
        .bind(document_id)
        .fetch_all(&self.db)
        .await?;
        into_redactions(rows)
    }

    /// Grouped by page for the output generator
    pub async fn redactions_for_output(&self, document_id: i64) -> StoreResult<Vec<Redaction>> {
        let rows: Vec<DbRedaction> = sqlx::query_as(&format!(
            "SELECT {} FROM redactions WHERE document_id = ? ORDER BY page, id",
            REDACTION_COLUMNS
        ))
        .bind(document_id)
        .fetch_all(&self.db)
        .await?;
        into_redactions(rows)
    }

    /// Delete a redaction, returning the document it belonged to
    pub async fn delete_redaction(&self, redaction_id: i64) -> StoreResult<i64> {
        let document_id: Option<i64> =
            sqlx::query_scalar("DELETE FROM redactions WHERE id = ? RETURNING document_id")
                .bind(redaction_id)
                .fetch_optional(&self.db)
                .await?;
        let document_id = document_id.ok_or(StoreError::RedactionNotFound(redaction_id))?;
        tracing::info!("Deleted redaction {} from document {}", redaction_id, document_id);
        Ok(document_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::connect_in_memory;
    use pretty_assertions::assert_eq;
    use redact_core::sample::{simple_pdf, TextRun};

    async fn store_with_document() -> (Store, Document, tempfile::TempDir) {
        let dir = tempfile::tempdir().unwrap();
        let store = Store::new(connect_in_memory().await.unwrap(), MediaStore::new(dir.path()));
        let pdf = simple_pdf(&[
            vec![TextRun::new(72.0, 700.0, 12.0, "Page one")],
            vec![TextRun::new(72.0, 700.0, 12.0, "Page two")],
        ])
        .unwrap();
        let file_ref = store.media().save("documents", "test.pdf", &pdf).await.unwrap();
        let document = store.insert_document("Test", &file_ref, 2).await.unwrap();
        (store, document, dir)
    }

    fn coords(x: f64, y: f64, width: f64, height: f64, page: i64) -> Coordinates {
        Coordinates {
            x,
            y,
            width,
            height,
            page,
        }
    }

    #[tokio::test]
    async fn test_create_adds_exactly_one() {
        let (store, document, _dir) = store_with_document().await;
        let created = store
            .create_redaction(document.id, RedactionKind::Area, &coords(100.0, 200.0, 150.0, 20.0, 1))
            .await
            .unwrap();
        assert_eq!(created.rect, CanonicalRect::new(100.0, 200.0, 150.0, 20.0));

        let list = store.list_redactions(document.id).await.unwrap();
        assert_eq!(list, vec![created]);
    }

    #[tokio::test]
    async fn test_invalid_redaction_is_not_persisted() {
        let (store, document, _dir) = store_with_document().await;
        let cases = [
            (coords(10.0, 10.0, 0.0, 10.0, 1), "INVALID_DIMENSIONS"),
            (coords(10.0, 10.0, 10.0, -1.0, 1), "INVALID_DIMENSIONS"),
            (coords(600.0, 10.0, 50.0, 10.0, 1), "OUT_OF_BOUNDS"),
            (coords(10.0, 10.0, 10.0, 10.0, 3), "INVALID_PAGE"),
        ];
        for (c, code) in cases {
            let err = store
                .create_redaction(document.id, RedactionKind::Area, &c)
                .await
                .unwrap_err();
            match err {
                StoreError::Validation(e) => assert_eq!(e.code(), code),
                other => panic!("unexpected error {:?}", other),
            }
        }
        assert!(store.list_redactions(document.id).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_unknown_document() {
        let (store, _document, _dir) = store_with_document().await;
        let err = store
            .create_redaction(999, RedactionKind::Text, &coords(1.0, 1.0, 1.0, 1.0, 1))
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::DocumentNotFound(999)));
        assert!(matches!(
            store.list_redactions(999).await,
            Err(StoreError::DocumentNotFound(999))
        ));
    }

    #[tokio::test]
    async fn test_delete_removes_only_target() {
        let (store, document, _dir) = store_with_document().await;
        let mut ids = Vec::new();
        for i in 0..3 {
            let r = store
                .create_redaction(
                    document.id,
                    RedactionKind::Area,
                    &coords(10.0 * f64::from(i), 10.0, 5.0, 5.0, 1),
                )
                .await
                .unwrap();
            ids.push(r.id);
        }

        assert_eq!(store.delete_redaction(ids[1]).await.unwrap(), document.id);
        let remaining: Vec<i64> = store
            .list_redactions(document.id)
            .await
            .unwrap()
            .iter()
            .map(|r| r.id)
            .collect();
        assert_eq!(remaining, vec![ids[0], ids[2]]);

        assert!(matches!(
            store.delete_redaction(ids[1]).await,
            Err(StoreError::RedactionNotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_list_keeps_insertion_order_when_clock_steps_back() {
        let (store, document, _dir) = store_with_document().await;
        let first = store
            .create_redaction(document.id, RedactionKind::Area, &coords(1.0, 1.0, 1.0, 1.0, 1))
            .await
            .unwrap();
        let second = store
            .create_redaction(document.id, RedactionKind::Area, &coords(5.0, 5.0, 1.0, 1.0, 1))
            .await
            .unwrap();
        sqlx::query("UPDATE redactions SET created_at = ? WHERE id = ?")
            .bind(chrono::Utc::now() - chrono::Duration::days(1))
            .bind(second.id)
            .execute(&store.db)
            .await
            .unwrap();

        let ids: Vec<i64> = store
            .list_redactions(document.id)
            .await
            .unwrap()
            .iter()
            .map(|r| r.id)
            .collect();
        assert_eq!(ids, vec![first.id, second.id]);
    }

    #[tokio::test]
    async fn test_output_order_groups_pages() {
        let (store, document, _dir) = store_with_document().await;
        for page in [2, 1, 2] {
            store
                .create_redaction(document.id, RedactionKind::Area, &coords(1.0, 1.0, 1.0, 1.0, page))
                .await
                .unwrap();
        }
        let pages: Vec<u32> = store
            .redactions_for_output(document.id)
            .await
            .unwrap()
            .iter()
            .map(|r| r.page)
            .collect();
        assert_eq!(pages, vec![1, 2, 2]);
    }

    #[tokio::test]
    async fn test_delete_document_cascades() {
        let (store, document, _dir) = store_with_document().await;
        store
            .create_redaction(document.id, RedactionKind::Area, &coords(1.0, 1.0, 1.0, 1.0, 1))
            .await
            .unwrap();

        store.delete_document(document.id).await.unwrap();
        assert!(store.list_documents().await.unwrap().is_empty());
        assert!(store.redactions_for_output(document.id).await.unwrap().is_empty());
        assert!(store.media().read(&document.file_ref).await.is_err());
    }

    #[tokio::test]
    async fn test_documents_newest_first() {
        let (store, first, _dir) = store_with_document().await;
        let second = store
            .insert_document("Second", &first.file_ref, 2)
            .await
            .unwrap();
        let ids: Vec<i64> = store
            .list_documents()
            .await
            .unwrap()
            .iter()
            .map(|d| d.id)
            .collect();
        assert_eq!(ids, vec![second.id, first.id]);
    }
}
