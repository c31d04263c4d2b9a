use crate::domain::narration::{Genre, StoryText};
use crate::error::{AppError, AppResult};
use crate::infrastructure::db::DbPool;
use async_trait::async_trait;
use std::sync::Arc;
use uuid::Uuid;

/// Read-side port onto the story collaborator. The narration subsystem only
/// ever needs the text, genre and owner of a story.
#[async_trait]
pub trait StoryRepository: Send + Sync {
    async fn find_text(&self, story_id: Uuid) -> AppResult<Option<StoryText>>;
}

pub struct PgStoryRepository {
    pool: Arc<DbPool>,
}

impl PgStoryRepository {
    pub fn new(pool: Arc<DbPool>) -> Self {
        Self { pool }
    }
}

#[derive(sqlx::FromRow)]
struct StoryRow {
    content: String,
    genre: String,
    owner_id: Uuid,
}

#[async_trait]
impl StoryRepository for PgStoryRepository {
    async fn find_text(&self, story_id: Uuid) -> AppResult<Option<StoryText>> {
        let pool = self.pool.as_ref();
        let row = sqlx::query_as::<_, StoryRow>(
            r#"
            SELECT content, genre, owner_id
            FROM stories
            WHERE id = $1
            "#,
        )
        .bind(story_id)
        .fetch_optional(pool)
        .await?;

        row.map(|r| {
            let genre = r.genre.parse::<Genre>().map_err(AppError::Internal)?;
            Ok(StoryText {
                text: r.content,
                genre,
                owner_id: r.owner_id,
            })
        })
        .transpose()
    }
}
