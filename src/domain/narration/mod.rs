pub mod error;
pub mod model;
pub mod service;
pub mod voice;

pub use error::NarrationServiceError;
pub use model::{Genre, NarrationRecord, StoryText};
pub use service::{ListenOutcome, NarrationService};
pub use voice::{style_instructions_for, voice_for_genre};
