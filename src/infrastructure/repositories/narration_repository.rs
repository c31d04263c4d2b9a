use super::narration_record_repository::NarrationRecordRepository;
use super::speech_repository::AUDIO_CONTENT_TYPE;
use crate::domain::narration::{Genre, NarrationRecord};
use crate::error::{AppError, AppResult};
use crate::infrastructure::storage::ObjectStorage;
use bytes::Bytes;
use chrono::Utc;
use std::sync::Arc;
use uuid::Uuid;

/// Durable story-id → narration mapping: one audio blob in object storage
/// plus one metadata record pointing at it.
///
/// The two writes are not transactional. If the record write fails after a
/// successful upload, the blob is orphaned; the same holds when two callers
/// race to save for one story and the second upsert wins. Both outcomes are
/// accepted and logged, not repaired here.
pub struct NarrationRepository {
    storage: Arc<dyn ObjectStorage>,
    records: Arc<dyn NarrationRecordRepository>,
}

impl NarrationRepository {
    pub fn new(
        storage: Arc<dyn ObjectStorage>,
        records: Arc<dyn NarrationRecordRepository>,
    ) -> Self {
        Self { storage, records }
    }

    /// Look up the narration URL for a story. Plain absence is `Ok(None)`,
    /// never an error.
    pub async fn get(&self, story_id: Uuid) -> AppResult<Option<String>> {
        let record = self.records.find_by_story(story_id).await?;
        Ok(record.map(|r| r.url))
    }

    /// Upload the audio payload and write the metadata record, returning the
    /// blob URL. Blobs are partitioned by owner and story so paths never
    /// collide across users or across one user's stories.
    pub async fn save(
        &self,
        audio: Bytes,
        owner_id: Uuid,
        story_id: Uuid,
        genre: Genre,
    ) -> AppResult<String> {
        if audio.is_empty() {
            return Err(AppError::BadRequest(
                "no audio payload to store".to_string(),
            ));
        }

        let created_at = Utc::now().timestamp_millis();
        let storage_path = format!("audio/{}/{}/{}_narration.mp3", owner_id, story_id, created_at);

        tracing::info!(
            %story_id,
            %owner_id,
            path = %storage_path,
            size_bytes = audio.len(),
            "Uploading narration audio"
        );

        // Phase one: the blob. The payload's media type is not trusted from
        // the transport, so the object is labeled audio/mpeg explicitly.
        let url = self
            .storage
            .put_object(&storage_path, audio, AUDIO_CONTENT_TYPE)
            .await?;

        // Phase two: the metadata pointer. A failure here orphans the blob
        // just uploaded.
        let record = NarrationRecord {
            story_id,
            owner_id,
            genre,
            created_at,
            storage_path,
            url: url.clone(),
        };
        self.records.upsert(&record).await.map_err(|e| {
            tracing::error!(
                error = %e,
                %story_id,
                "Narration record write failed after upload, blob is orphaned"
            );
            e
        })?;

        Ok(url)
    }

    /// Delete the narration for a story: blob first (best effort), record
    /// last. A missing record makes this a no-op.
    pub async fn delete(&self, story_id: Uuid) -> AppResult<()> {
        let Some(record) = self.records.find_by_story(story_id).await? else {
            tracing::debug!(%story_id, "No narration record to delete");
            return Ok(());
        };

        if let Err(err) = self.storage.delete_object(&record.storage_path).await {
            // Still remove the record so the story stops pointing at a blob
            // we could not reclaim.
            tracing::warn!(
                error = %err,
                %story_id,
                path = %record.storage_path,
                "Failed to delete narration blob, continuing with record delete"
            );
        }

        self.records.delete_by_story(story_id).await?;
        tracing::info!(%story_id, "Narration deleted");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::collections::HashMap;
    use std::sync::Mutex;

    #[derive(Default)]
    struct MemoryStorage {
        objects: Mutex<HashMap<String, Bytes>>,
        fail_deletes: bool,
    }

    #[async_trait]
    impl ObjectStorage for MemoryStorage {
        async fn put_object(
            &self,
            path: &str,
            bytes: Bytes,
            _content_type: &str,
        ) -> AppResult<String> {
            self.objects
                .lock()
                .unwrap()
                .insert(path.to_string(), bytes);
            Ok(format!("https://blobs.test/{}", path))
        }

        async fn delete_object(&self, path: &str) -> AppResult<()> {
            if self.fail_deletes {
                return Err(AppError::ExternalService("delete refused".to_string()));
            }
            self.objects.lock().unwrap().remove(path);
            Ok(())
        }
    }

    #[derive(Default)]
    struct MemoryRecords {
        records: Mutex<HashMap<Uuid, NarrationRecord>>,
        fail_upserts: bool,
    }

    #[async_trait]
    impl NarrationRecordRepository for MemoryRecords {
        async fn find_by_story(&self, story_id: Uuid) -> AppResult<Option<NarrationRecord>> {
            Ok(self.records.lock().unwrap().get(&story_id).cloned())
        }

        async fn upsert(&self, record: &NarrationRecord) -> AppResult<()> {
            if self.fail_upserts {
                return Err(AppError::Internal("record write refused".to_string()));
            }
            self.records
                .lock()
                .unwrap()
                .insert(record.story_id, record.clone());
            Ok(())
        }

        async fn delete_by_story(&self, story_id: Uuid) -> AppResult<()> {
            self.records.lock().unwrap().remove(&story_id);
            Ok(())
        }
    }

    fn repo_with(
        storage: Arc<MemoryStorage>,
        records: Arc<MemoryRecords>,
    ) -> NarrationRepository {
        NarrationRepository::new(storage, records)
    }

    #[tokio::test]
    async fn test_save_then_get_returns_same_url() {
        let storage = Arc::new(MemoryStorage::default());
        let records = Arc::new(MemoryRecords::default());
        let repo = repo_with(storage.clone(), records.clone());
        let owner = Uuid::new_v4();
        let story = Uuid::new_v4();

        let url = repo
            .save(Bytes::from_static(b"mp3 bytes"), owner, story, Genre::Horror)
            .await
            .unwrap();

        assert_eq!(repo.get(story).await.unwrap(), Some(url.clone()));
        // Path is partitioned by owner and story.
        assert!(url.contains(&owner.to_string()));
        assert!(url.contains(&story.to_string()));
        assert!(url.ends_with("_narration.mp3"));
    }

    #[tokio::test]
    async fn test_get_without_record_is_none() {
        let repo = repo_with(
            Arc::new(MemoryStorage::default()),
            Arc::new(MemoryRecords::default()),
        );
        assert_eq!(repo.get(Uuid::new_v4()).await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_save_rejects_empty_payload() {
        let storage = Arc::new(MemoryStorage::default());
        let repo = repo_with(storage.clone(), Arc::new(MemoryRecords::default()));

        let result = repo
            .save(Bytes::new(), Uuid::new_v4(), Uuid::new_v4(), Genre::SciFi)
            .await;

        assert!(matches!(result, Err(AppError::BadRequest(_))));
        assert!(storage.objects.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_second_save_wins_and_orphans_first_blob() {
        let storage = Arc::new(MemoryStorage::default());
        let records = Arc::new(MemoryRecords::default());
        let repo = repo_with(storage.clone(), records.clone());
        let owner = Uuid::new_v4();
        let story = Uuid::new_v4();

        let first = repo
            .save(Bytes::from_static(b"take one"), owner, story, Genre::RomCom)
            .await
            .unwrap();
        // Paths are timestamped at millisecond precision; space the writes
        // out so the second save lands at a distinct path.
        tokio::time::sleep(std::time::Duration::from_millis(5)).await;
        let second = repo
            .save(Bytes::from_static(b"take two"), owner, story, Genre::RomCom)
            .await
            .unwrap();

        // Last write wins for the pointer; the first blob is still sitting
        // in storage, unreferenced.
        assert_eq!(repo.get(story).await.unwrap(), Some(second.clone()));
        assert_ne!(first, second);
        assert_eq!(storage.objects.lock().unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_record_write_failure_leaves_orphaned_blob() {
        let storage = Arc::new(MemoryStorage::default());
        let records = Arc::new(MemoryRecords {
            fail_upserts: true,
            ..Default::default()
        });
        let repo = repo_with(storage.clone(), records.clone());
        let story = Uuid::new_v4();

        let result = repo
            .save(Bytes::from_static(b"bytes"), Uuid::new_v4(), story, Genre::Horror)
            .await;

        assert!(result.is_err());
        assert_eq!(repo.get(story).await.unwrap(), None);
        assert_eq!(storage.objects.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_delete_removes_blob_and_record() {
        let storage = Arc::new(MemoryStorage::default());
        let records = Arc::new(MemoryRecords::default());
        let repo = repo_with(storage.clone(), records.clone());
        let story = Uuid::new_v4();

        repo.save(Bytes::from_static(b"bytes"), Uuid::new_v4(), story, Genre::FilmNoir)
            .await
            .unwrap();
        repo.delete(story).await.unwrap();

        assert_eq!(repo.get(story).await.unwrap(), None);
        assert!(storage.objects.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_delete_without_record_is_a_noop() {
        let repo = repo_with(
            Arc::new(MemoryStorage::default()),
            Arc::new(MemoryRecords::default()),
        );
        let story = Uuid::new_v4();

        repo.delete(story).await.unwrap();
        // Twice in a row has the same end state as once.
        repo.delete(story).await.unwrap();
        assert_eq!(repo.get(story).await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_delete_survives_blob_delete_failure() {
        let storage = Arc::new(MemoryStorage {
            fail_deletes: true,
            ..Default::default()
        });
        let records = Arc::new(MemoryRecords::default());
        let repo = repo_with(storage.clone(), records.clone());
        let story = Uuid::new_v4();

        repo.save(Bytes::from_static(b"bytes"), Uuid::new_v4(), story, Genre::SciFi)
            .await
            .unwrap();
        repo.delete(story).await.unwrap();

        // Record is gone even though the blob could not be reclaimed.
        assert_eq!(repo.get(story).await.unwrap(), None);
        assert_eq!(storage.objects.lock().unwrap().len(), 1);
    }
}
