pub mod favorites_repository;
pub mod narration_record_repository;
pub mod narration_repository;
pub mod openai_speech_repository;
pub mod polly_speech_repository;
pub mod speech_repository;
pub mod story_repository;

pub use favorites_repository::{FavoritesRepository, PgFavoritesRepository};
pub use narration_record_repository::{NarrationRecordRepository, PgNarrationRecordRepository};
pub use narration_repository::NarrationRepository;
pub use openai_speech_repository::OpenAiSpeechRepository;
pub use polly_speech_repository::PollySpeechRepository;
pub use speech_repository::{
    truncate_for_narration, SpeechError, SpeechRepository, AUDIO_CONTENT_TYPE,
    DEFAULT_STYLE_INSTRUCTIONS, MAX_NARRATION_CHARS, SYNTHESIS_TIMEOUT, TRUNCATION_MARKER,
};
pub use story_repository::{PgStoryRepository, StoryRepository};
