/// Print-file lifecycle: metadata extraction on upload, blob cleanup on
/// delete.
use crate::db::print_file_repo;
use crate::error::AppError;
use crate::extractor;
use crate::models::PrintFile;
use crate::services::blob_storage::ObjectStore;
use sqlx::PgPool;
use std::sync::Arc;
use uuid::Uuid;

pub struct PrintFileService {
    db: PgPool,
    store: Arc<dyn ObjectStore>,
}

impl PrintFileService {
    pub fn new(db: PgPool, store: Arc<dyn ObjectStore>) -> Self {
        Self { db, store }
    }

    fn thumbnail_key(file_id: Uuid) -> String {
        format!("print-files/{file_id}/thumbnail.png")
    }

    /// Downloads the uploaded archive, extracts metadata and thumbnail,
    /// and persists both onto the file record. Safe to re-run: every step
    /// is a pure overwrite.
    pub async fn process_uploaded_file(&self, file_id: Uuid) -> Result<(), AppError> {
        let file = print_file_repo::get(&self.db, file_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("print file {file_id} not found")))?;

        let archive = self.store.get(&file.storage_key).await?;
        let extracted = extractor::extract(&archive);

        let thumbnail_key = match extracted.thumbnail {
            Some(thumbnail) => {
                let key = Self::thumbnail_key(file_id);
                self.store
                    .put(&key, thumbnail.bytes, thumbnail.content_type)
                    .await?;
                Some(key)
            }
            None => None,
        };

        print_file_repo::store_metadata(
            &self.db,
            file_id,
            &extracted.metadata,
            thumbnail_key.as_deref(),
        )
        .await?;

        tracing::info!(
            %file_id,
            has_thumbnail = thumbnail_key.is_some(),
            "print file metadata extracted"
        );
        Ok(())
    }

    /// Deletes the file record together with its blobs. The thumbnail is
    /// only touched when one was stored.
    pub async fn delete_file(&self, file_id: Uuid) -> Result<(), AppError> {
        let file = print_file_repo::get(&self.db, file_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("print file {file_id} not found")))?;

        self.delete_blobs(&file).await?;
        print_file_repo::delete(&self.db, file_id).await?;
        tracing::info!(%file_id, "print file deleted");
        Ok(())
    }

    pub async fn delete_blobs(&self, file: &PrintFile) -> Result<(), AppError> {
        self.store.delete(&file.storage_key).await?;
        if let Some(thumbnail_key) = &file.thumbnail_key {
            self.store.delete(thumbnail_key).await?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::collections::HashSet;
    use std::sync::Mutex;

    #[derive(Default)]
    struct RecordingStore {
        deleted: Mutex<HashSet<String>>,
    }

    #[async_trait]
    impl ObjectStore for RecordingStore {
        async fn get(&self, key: &str) -> Result<Vec<u8>, AppError> {
            Err(AppError::Storage(format!("no such object: {key}")))
        }

        async fn put(&self, _key: &str, _bytes: Vec<u8>, _ct: &str) -> Result<(), AppError> {
            Ok(())
        }

        async fn delete(&self, key: &str) -> Result<(), AppError> {
            self.deleted
                .lock()
                .unwrap_or_else(std::sync::PoisonError::into_inner)
                .insert(key.to_string());
            Ok(())
        }
    }

    fn file(thumbnail_key: Option<&str>) -> PrintFile {
        PrintFile {
            id: Uuid::new_v4(),
            tenant_id: Uuid::new_v4(),
            storage_key: "print-files/abc/model.3mf".into(),
            thumbnail_key: thumbnail_key.map(String::from),
        }
    }

    #[actix_rt::test]
    async fn delete_blobs_removes_archive_and_thumbnail() {
        let store = Arc::new(RecordingStore::default());
        let service = PrintFileService::new(sqlx::PgPool::connect_lazy("postgres://unused").unwrap(), store.clone());

        service
            .delete_blobs(&file(Some("print-files/abc/thumbnail.png")))
            .await
            .unwrap();

        let deleted = store.deleted.lock().unwrap();
        assert!(deleted.contains("print-files/abc/model.3mf"));
        assert!(deleted.contains("print-files/abc/thumbnail.png"));
    }

    #[actix_rt::test]
    async fn delete_blobs_without_thumbnail_deletes_only_archive() {
        let store = Arc::new(RecordingStore::default());
        let service = PrintFileService::new(sqlx::PgPool::connect_lazy("postgres://unused").unwrap(), store.clone());

        service.delete_blobs(&file(None)).await.unwrap();

        let deleted = store.deleted.lock().unwrap();
        assert_eq!(deleted.len(), 1);
        assert!(deleted.contains("print-files/abc/model.3mf"));
    }
}
