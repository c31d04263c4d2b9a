use super::error::NarrationServiceError;
use super::model::Genre;
use super::voice::{style_instructions_for, voice_for_genre};
use crate::infrastructure::repositories::{
    FavoritesRepository, NarrationRepository, SpeechRepository, StoryRepository,
};
use bytes::Bytes;
use moka::future::Cache;
use std::collections::HashSet;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use uuid::Uuid;

/// Result of an explicit "listen" request.
#[derive(Debug, Clone, PartialEq)]
pub enum ListenOutcome {
    /// Narration exists (cached or just generated) at this URL.
    Ready { url: String },
    /// A generation is already in flight for this story; no second one is
    /// started.
    Preparing,
    /// Synthesis succeeded but persistence failed. The audio is playable
    /// once and will not be there on the next visit.
    Transient { audio: Bytes },
}

/// Decision layer for the narration lifecycle: cache lookup on story view,
/// silent background generation for favorites, foreground generation on an
/// explicit listen, purge on unfavorite.
///
/// Foreground and background generation for one story are mutually
/// exclusive within this process via the in-flight set; two separate
/// processes can still race, with the documented last-write-wins outcome at
/// the store.
#[derive(Clone)]
pub struct NarrationService {
    speech: Arc<dyn SpeechRepository>,
    narrations: Arc<NarrationRepository>,
    stories: Arc<dyn StoryRepository>,
    favorites: Arc<dyn FavoritesRepository>,
    url_cache: Option<Cache<Uuid, String>>,
    in_flight: Arc<Mutex<HashSet<Uuid>>>,
}

impl NarrationService {
    pub fn new(
        speech: Arc<dyn SpeechRepository>,
        narrations: Arc<NarrationRepository>,
        stories: Arc<dyn StoryRepository>,
        favorites: Arc<dyn FavoritesRepository>,
        cache_enabled: bool,
    ) -> Self {
        let url_cache = if cache_enabled {
            Some(
                Cache::builder()
                    .max_capacity(100)
                    .time_to_idle(Duration::from_secs(30 * 60)) // 30 minutes, refreshes on access
                    .build(),
            )
        } else {
            None
        };

        Self {
            speech,
            narrations,
            stories,
            favorites,
            url_cache,
            in_flight: Arc::new(Mutex::new(HashSet::new())),
        }
    }

    /// Cached narration URL for a story, if one exists. Store errors degrade
    /// to "absent" so a flaky metadata read never breaks the page.
    pub async fn narration_for(&self, story_id: Uuid) -> Option<String> {
        if let Some(cache) = &self.url_cache {
            if let Some(url) = cache.get(&story_id).await {
                tracing::debug!(%story_id, "Narration URL cache hit");
                return Some(url);
            }
        }

        match self.narrations.get(story_id).await {
            Ok(Some(url)) => {
                self.cache_url(story_id, url.clone()).await;
                Some(url)
            }
            Ok(None) => None,
            Err(err) => {
                tracing::warn!(
                    error = %err,
                    %story_id,
                    "Narration lookup failed, treating as absent"
                );
                None
            }
        }
    }

    /// Story-page activation hook. Returns the cached URL when narration is
    /// already there; otherwise, if the story is one of the user's favorites
    /// and nothing is in flight for it, kicks off a background generation
    /// whose failures are logged and swallowed.
    pub async fn on_story_view(&self, user_id: Uuid, story_id: Uuid) -> Option<String> {
        if let Some(url) = self.narration_for(story_id).await {
            return Some(url);
        }

        let favorite = match self.favorites.is_favorite(user_id, story_id).await {
            Ok(favorite) => favorite,
            Err(err) => {
                tracing::warn!(
                    error = %err,
                    %story_id,
                    "Favorite check failed, skipping background narration"
                );
                false
            }
        };
        if !favorite {
            return None;
        }

        // Claim the story before spawning so a listen landing right after
        // this call already sees it as in flight.
        let Some(guard) = InFlightGuard::try_acquire(&self.in_flight, story_id) else {
            return None;
        };

        tracing::info!(%story_id, "Starting background narration generation");
        let service = self.clone();
        tokio::spawn(async move {
            let _guard = guard;
            // Re-check the store right before generating; another path may
            // have finished in the meantime.
            if service.narration_for(story_id).await.is_some() {
                return;
            }
            match service.generate_and_store(user_id, story_id).await {
                Ok(url) => {
                    tracing::info!(%story_id, url = %url, "Background narration ready");
                }
                Err(err) => {
                    // Background failures must never interrupt the reading
                    // experience; they are logged and dropped.
                    tracing::warn!(
                        error = %err,
                        %story_id,
                        "Background narration generation failed"
                    );
                }
            }
        });

        None
    }

    /// Explicit "listen" action.
    pub async fn listen(
        &self,
        user_id: Uuid,
        story_id: Uuid,
    ) -> Result<ListenOutcome, NarrationServiceError> {
        if let Some(url) = self.narration_for(story_id).await {
            return Ok(ListenOutcome::Ready { url });
        }

        let Some(_guard) = InFlightGuard::try_acquire(&self.in_flight, story_id) else {
            tracing::info!(%story_id, "Narration already being generated, still preparing");
            return Ok(ListenOutcome::Preparing);
        };

        // A background run may have completed between the lookup above and
        // winning the in-flight claim.
        if let Some(url) = self.narration_for(story_id).await {
            return Ok(ListenOutcome::Ready { url });
        }

        let (audio, genre) = self.synthesize_for_story(story_id).await?;

        match self
            .narrations
            .save(audio.clone(), user_id, story_id, genre)
            .await
        {
            Ok(url) => {
                self.cache_url(story_id, url.clone()).await;
                Ok(ListenOutcome::Ready { url })
            }
            Err(err) => {
                // The user asked to listen and we have the audio; hand it
                // over for one-shot playback and say so, instead of failing.
                tracing::error!(
                    error = %err,
                    %story_id,
                    "Narration persistence failed, serving transient audio"
                );
                Ok(ListenOutcome::Transient { audio })
            }
        }
    }

    /// Generate narration for a story and persist it, returning the blob
    /// URL. Save starts only after synthesis resolves.
    pub async fn generate_and_store(
        &self,
        user_id: Uuid,
        story_id: Uuid,
    ) -> Result<String, NarrationServiceError> {
        let (audio, genre) = self.synthesize_for_story(story_id).await?;
        let url = self
            .narrations
            .save(audio, user_id, story_id, genre)
            .await
            .map_err(|e| NarrationServiceError::StorageWrite(e.to_string()))?;
        self.cache_url(story_id, url.clone()).await;
        Ok(url)
    }

    /// Purge the narration for a story. Best effort: every failure is
    /// logged and swallowed so the surrounding unfavorite/deletion flow is
    /// never blocked.
    pub async fn delete_narration_for(&self, story_id: Uuid) {
        if let Some(cache) = &self.url_cache {
            cache.invalidate(&story_id).await;
        }

        if let Err(err) = self.narrations.delete(story_id).await {
            tracing::warn!(
                error = %err,
                %story_id,
                "Failed to delete narration, leaving it behind"
            );
        }
    }

    async fn synthesize_for_story(
        &self,
        story_id: Uuid,
    ) -> Result<(Bytes, Genre), NarrationServiceError> {
        let story = self
            .stories
            .find_text(story_id)
            .await
            .map_err(|e| NarrationServiceError::Dependency(e.to_string()))?
            .ok_or_else(|| {
                NarrationServiceError::Invalid(format!("story {} not found", story_id))
            })?;

        let voice = voice_for_genre(story.genre);
        let instructions = style_instructions_for(story.genre);

        tracing::info!(
            %story_id,
            genre = %story.genre,
            voice = voice,
            text_length = story.text.chars().count(),
            "Synthesizing narration"
        );

        let audio = self
            .speech
            .synthesize(&story.text, voice, Some(instructions))
            .await?;

        Ok((audio, story.genre))
    }

    async fn cache_url(&self, story_id: Uuid, url: String) {
        if let Some(cache) = &self.url_cache {
            cache.insert(story_id, url).await;
        }
    }
}

/// RAII claim on "a generation is running for this story". Released on
/// drop, so a panicking generation cannot wedge the story.
struct InFlightGuard {
    set: Arc<Mutex<HashSet<Uuid>>>,
    story_id: Uuid,
}

impl InFlightGuard {
    fn try_acquire(set: &Arc<Mutex<HashSet<Uuid>>>, story_id: Uuid) -> Option<Self> {
        let claimed = set.lock().unwrap().insert(story_id);
        claimed.then(|| Self {
            set: set.clone(),
            story_id,
        })
    }
}

impl Drop for InFlightGuard {
    fn drop(&mut self) {
        self.set.lock().unwrap().remove(&self.story_id);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::narration::model::StoryText;
    use crate::error::{AppError, AppResult};
    use crate::infrastructure::repositories::{NarrationRecordRepository, SpeechError};
    use crate::infrastructure::storage::ObjectStorage;
    use async_trait::async_trait;
    use std::collections::HashMap;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct FakeSpeech {
        calls: AtomicUsize,
        delay: Option<Duration>,
        response: Result<Bytes, SpeechError>,
    }

    impl FakeSpeech {
        fn ok() -> Self {
            Self {
                calls: AtomicUsize::new(0),
                delay: None,
                response: Ok(Bytes::from_static(b"mp3 bytes")),
            }
        }

        fn failing(err: SpeechError) -> Self {
            Self {
                response: Err(err),
                ..Self::ok()
            }
        }

        fn slow(delay: Duration) -> Self {
            Self {
                delay: Some(delay),
                ..Self::ok()
            }
        }

        fn call_count(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl SpeechRepository for FakeSpeech {
        async fn synthesize(
            &self,
            _text: &str,
            _voice: &str,
            _instructions: Option<&str>,
        ) -> Result<Bytes, SpeechError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if let Some(delay) = self.delay {
                tokio::time::sleep(delay).await;
            }
            self.response.clone()
        }
    }

    #[derive(Default)]
    struct MemoryStorage {
        objects: Mutex<HashMap<String, Bytes>>,
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
            self.objects.lock().unwrap().remove(path);
            Ok(())
        }
    }

    #[derive(Default)]
    struct MemoryRecords {
        records: Mutex<HashMap<Uuid, crate::domain::narration::NarrationRecord>>,
        fail_upserts: bool,
    }

    #[async_trait]
    impl NarrationRecordRepository for MemoryRecords {
        async fn find_by_story(
            &self,
            story_id: Uuid,
        ) -> AppResult<Option<crate::domain::narration::NarrationRecord>> {
            Ok(self.records.lock().unwrap().get(&story_id).cloned())
        }

        async fn upsert(
            &self,
            record: &crate::domain::narration::NarrationRecord,
        ) -> AppResult<()> {
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

    struct FakeStories {
        story: Option<StoryText>,
    }

    #[async_trait]
    impl StoryRepository for FakeStories {
        async fn find_text(&self, _story_id: Uuid) -> AppResult<Option<StoryText>> {
            Ok(self.story.clone())
        }
    }

    struct FakeFavorites {
        favorite: bool,
    }

    #[async_trait]
    impl FavoritesRepository for FakeFavorites {
        async fn is_favorite(&self, _user_id: Uuid, _story_id: Uuid) -> AppResult<bool> {
            Ok(self.favorite)
        }

        async fn remove(&self, _user_id: Uuid, _story_id: Uuid) -> AppResult<()> {
            Ok(())
        }
    }

    struct Harness {
        service: NarrationService,
        speech: Arc<FakeSpeech>,
        storage: Arc<MemoryStorage>,
        records: Arc<MemoryRecords>,
    }

    fn harness(speech: FakeSpeech, favorite: bool) -> Harness {
        let owner_id = Uuid::new_v4();
        harness_with(speech, favorite, Some(story_text(owner_id)))
    }

    fn harness_with(speech: FakeSpeech, favorite: bool, story: Option<StoryText>) -> Harness {
        let speech = Arc::new(speech);
        let storage = Arc::new(MemoryStorage::default());
        let records = Arc::new(MemoryRecords::default());
        let narrations = Arc::new(NarrationRepository::new(storage.clone(), records.clone()));
        let service = NarrationService::new(
            speech.clone(),
            narrations,
            Arc::new(FakeStories { story }),
            Arc::new(FakeFavorites { favorite }),
            true,
        );
        Harness {
            service,
            speech,
            storage,
            records,
        }
    }

    fn story_text(owner_id: Uuid) -> StoryText {
        StoryText {
            text: "It was a dark and stormy night.".to_string(),
            genre: Genre::Horror,
            owner_id,
        }
    }

    #[tokio::test]
    async fn test_repeated_lookup_is_idempotent_and_never_generates() {
        let h = harness(FakeSpeech::ok(), true);
        let user = Uuid::new_v4();
        let story = Uuid::new_v4();

        let url = h.service.generate_and_store(user, story).await.unwrap();

        let first = h.service.narration_for(story).await;
        let second = h.service.narration_for(story).await;
        assert_eq!(first, Some(url.clone()));
        assert_eq!(second, Some(url));
        // Exactly the one generation from setup, none from the lookups.
        assert_eq!(h.speech.call_count(), 1);
    }

    #[tokio::test]
    async fn test_first_listen_generates_persists_and_reveals() {
        let h = harness(FakeSpeech::ok(), true);
        let user = Uuid::new_v4();
        let story = Uuid::new_v4();

        let outcome = h.service.listen(user, story).await.unwrap();

        let ListenOutcome::Ready { url } = outcome else {
            panic!("expected Ready, got {:?}", outcome);
        };
        assert_eq!(h.speech.call_count(), 1);
        // One blob under a path carrying both ids, one record pointing at it.
        let objects = h.storage.objects.lock().unwrap();
        assert_eq!(objects.len(), 1);
        let path = objects.keys().next().unwrap();
        assert!(path.contains(&user.to_string()));
        assert!(path.contains(&story.to_string()));
        drop(objects);
        let record = h.records.records.lock().unwrap().get(&story).cloned().unwrap();
        assert_eq!(record.url, url);
        assert_eq!(record.genre, Genre::Horror);
    }

    #[tokio::test]
    async fn test_listen_reuses_cached_narration() {
        let h = harness(FakeSpeech::ok(), true);
        let user = Uuid::new_v4();
        let story = Uuid::new_v4();

        let first = h.service.listen(user, story).await.unwrap();
        let second = h.service.listen(user, story).await.unwrap();

        assert_eq!(first, second);
        assert_eq!(h.speech.call_count(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_view_starts_background_generation_for_favorite() {
        let h = harness(FakeSpeech::slow(Duration::from_millis(100)), true);
        let user = Uuid::new_v4();
        let story = Uuid::new_v4();

        assert_eq!(h.service.on_story_view(user, story).await, None);

        // Let the spawned generation run to completion.
        tokio::time::sleep(Duration::from_millis(500)).await;

        assert!(h.service.narration_for(story).await.is_some());
        assert_eq!(h.speech.call_count(), 1);
    }

    #[tokio::test]
    async fn test_view_skips_generation_for_non_favorite() {
        let h = harness(FakeSpeech::ok(), false);

        assert_eq!(
            h.service.on_story_view(Uuid::new_v4(), Uuid::new_v4()).await,
            None
        );
        tokio::task::yield_now().await;
        assert_eq!(h.speech.call_count(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_listen_during_background_generation_is_preparing() {
        let h = harness(FakeSpeech::slow(Duration::from_millis(100)), true);
        let user = Uuid::new_v4();
        let story = Uuid::new_v4();

        h.service.on_story_view(user, story).await;

        // The background claim is taken synchronously, so a listen landing
        // immediately afterwards must not start a second generation.
        let outcome = h.service.listen(user, story).await.unwrap();
        assert_eq!(outcome, ListenOutcome::Preparing);

        tokio::time::sleep(Duration::from_millis(500)).await;

        // Once the background run resolves, the same result is revealed.
        let outcome = h.service.listen(user, story).await.unwrap();
        assert!(matches!(outcome, ListenOutcome::Ready { .. }));
        assert_eq!(h.speech.call_count(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_background_timeout_is_swallowed_and_writes_nothing() {
        let h = harness(FakeSpeech::failing(SpeechError::Timeout), true);
        let user = Uuid::new_v4();
        let story = Uuid::new_v4();

        h.service.on_story_view(user, story).await;
        tokio::time::sleep(Duration::from_millis(500)).await;

        assert_eq!(h.service.narration_for(story).await, None);
        assert!(h.storage.objects.lock().unwrap().is_empty());
        assert!(h.records.records.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_foreground_timeout_surfaces_and_leaves_no_partial_state() {
        let h = harness(FakeSpeech::failing(SpeechError::Timeout), true);

        let result = h.service.listen(Uuid::new_v4(), Uuid::new_v4()).await;

        assert!(matches!(
            result,
            Err(NarrationServiceError::Speech(SpeechError::Timeout))
        ));
        assert!(h.storage.objects.lock().unwrap().is_empty());
        assert!(h.records.records.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_foreground_missing_credentials_surfaces() {
        let h = harness(FakeSpeech::failing(SpeechError::MissingCredentials), true);

        let result = h.service.listen(Uuid::new_v4(), Uuid::new_v4()).await;

        assert!(matches!(
            result,
            Err(NarrationServiceError::Speech(SpeechError::MissingCredentials))
        ));
    }

    #[tokio::test]
    async fn test_listen_falls_back_to_transient_audio_on_storage_failure() {
        let speech = Arc::new(FakeSpeech::ok());
        let storage = Arc::new(MemoryStorage::default());
        let records = Arc::new(MemoryRecords {
            fail_upserts: true,
            ..Default::default()
        });
        let narrations = Arc::new(NarrationRepository::new(storage.clone(), records.clone()));
        let service = NarrationService::new(
            speech.clone(),
            narrations,
            Arc::new(FakeStories {
                story: Some(story_text(Uuid::new_v4())),
            }),
            Arc::new(FakeFavorites { favorite: true }),
            true,
        );
        let story = Uuid::new_v4();

        let outcome = service.listen(Uuid::new_v4(), story).await.unwrap();

        let ListenOutcome::Transient { audio } = outcome else {
            panic!("expected Transient, got {:?}", outcome);
        };
        assert_eq!(audio, Bytes::from_static(b"mp3 bytes"));
        // The narration did not persist for next time.
        assert_eq!(service.narration_for(story).await, None);
    }

    #[tokio::test]
    async fn test_unfavorite_purge_removes_narration() {
        let h = harness(FakeSpeech::ok(), true);
        let user = Uuid::new_v4();
        let story = Uuid::new_v4();

        h.service.generate_and_store(user, story).await.unwrap();
        assert!(h.service.narration_for(story).await.is_some());

        h.service.delete_narration_for(story).await;

        assert_eq!(h.service.narration_for(story).await, None);
        assert!(h.storage.objects.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_purge_is_idempotent() {
        let h = harness(FakeSpeech::ok(), true);
        let story = Uuid::new_v4();

        // No record at all: still completes quietly, twice.
        h.service.delete_narration_for(story).await;
        h.service.delete_narration_for(story).await;
        assert_eq!(h.service.narration_for(story).await, None);
    }

    #[tokio::test]
    async fn test_listen_for_unknown_story_is_invalid() {
        let h = harness_with(FakeSpeech::ok(), true, None);

        let result = h.service.listen(Uuid::new_v4(), Uuid::new_v4()).await;

        assert!(matches!(result, Err(NarrationServiceError::Invalid(_))));
        assert_eq!(h.speech.call_count(), 0);
    }
}
