use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

/// Narrative genre a story was generated in.
///
/// Retained on the narration record for voice/style tuning at generation
/// time; the storage layer does not branch on it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Genre {
    RomCom,
    Horror,
    SciFi,
    FilmNoir,
}

impl Genre {
    pub fn as_str(&self) -> &'static str {
        match self {
            Genre::RomCom => "rom-com",
            Genre::Horror => "horror",
            Genre::SciFi => "sci-fi",
            Genre::FilmNoir => "film-noir",
        }
    }
}

impl fmt::Display for Genre {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Genre {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "rom-com" => Ok(Genre::RomCom),
            "horror" => Ok(Genre::Horror),
            "sci-fi" => Ok(Genre::SciFi),
            "film-noir" => Ok(Genre::FilmNoir),
            other => Err(format!("unknown genre: {}", other)),
        }
    }
}

/// Persisted metadata for one story's synthesized narration.
///
/// There is at most one live record per story; a new save replaces the
/// metadata pointer (last write wins) and the previous blob is orphaned.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NarrationRecord {
    pub story_id: Uuid,
    /// User that triggered generation; partitions the storage path.
    pub owner_id: Uuid,
    pub genre: Genre,
    /// Epoch milliseconds.
    pub created_at: i64,
    /// Object-storage key the blob lives under. Kept alongside the URL so
    /// deletion never has to parse the URL back into a path.
    pub storage_path: String,
    /// Durable, fetchable URL to the audio payload.
    pub url: String,
}

/// Story fields the narration subsystem needs, provided by the story
/// repository collaborator.
#[derive(Debug, Clone)]
pub struct StoryText {
    pub text: String,
    pub genre: Genre,
    pub owner_id: Uuid,
}
