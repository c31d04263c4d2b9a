use crate::domain::narration::{Genre, NarrationRecord};
use crate::error::{AppError, AppResult};
use crate::infrastructure::db::DbPool;
use async_trait::async_trait;
use std::sync::Arc;
use uuid::Uuid;

/// Metadata-record primitives backing the narration store: one row per
/// story, last write wins.
#[async_trait]
pub trait NarrationRecordRepository: Send + Sync {
    async fn find_by_story(&self, story_id: Uuid) -> AppResult<Option<NarrationRecord>>;

    /// Insert or replace the record for `record.story_id`.
    async fn upsert(&self, record: &NarrationRecord) -> AppResult<()>;

    /// Delete the record for `story_id`. Deleting a missing record is not an
    /// error.
    async fn delete_by_story(&self, story_id: Uuid) -> AppResult<()>;
}

pub struct PgNarrationRecordRepository {
    pool: Arc<DbPool>,
}

impl PgNarrationRecordRepository {
    pub fn new(pool: Arc<DbPool>) -> Self {
        Self { pool }
    }
}

#[derive(sqlx::FromRow)]
struct NarrationRow {
    story_id: Uuid,
    owner_id: Uuid,
    genre: String,
    created_at: i64,
    storage_path: String,
    url: String,
}

impl TryFrom<NarrationRow> for NarrationRecord {
    type Error = AppError;

    fn try_from(row: NarrationRow) -> Result<Self, Self::Error> {
        let genre = row
            .genre
            .parse::<Genre>()
            .map_err(AppError::Internal)?;
        Ok(NarrationRecord {
            story_id: row.story_id,
            owner_id: row.owner_id,
            genre,
            created_at: row.created_at,
            storage_path: row.storage_path,
            url: row.url,
        })
    }
}

#[async_trait]
impl NarrationRecordRepository for PgNarrationRecordRepository {
    async fn find_by_story(&self, story_id: Uuid) -> AppResult<Option<NarrationRecord>> {
        let pool = self.pool.as_ref();
        let row = sqlx::query_as::<_, NarrationRow>(
            r#"
            SELECT story_id, owner_id, genre, created_at, storage_path, url
            FROM narrations
            WHERE story_id = $1
            "#,
        )
        .bind(story_id)
        .fetch_optional(pool)
        .await?;

        row.map(NarrationRecord::try_from).transpose()
    }

    async fn upsert(&self, record: &NarrationRecord) -> AppResult<()> {
        let pool = self.pool.as_ref();
        sqlx::query(
            r#"
            INSERT INTO narrations (story_id, owner_id, genre, created_at, storage_path, url)
            VALUES ($1, $2, $3, $4, $5, $6)
            ON CONFLICT (story_id) DO UPDATE
            SET owner_id = EXCLUDED.owner_id,
                genre = EXCLUDED.genre,
                created_at = EXCLUDED.created_at,
                storage_path = EXCLUDED.storage_path,
                url = EXCLUDED.url
            "#,
        )
        .bind(record.story_id)
        .bind(record.owner_id)
        .bind(record.genre.as_str())
        .bind(record.created_at)
        .bind(&record.storage_path)
        .bind(&record.url)
        .execute(pool)
        .await?;

        Ok(())
    }

    async fn delete_by_story(&self, story_id: Uuid) -> AppResult<()> {
        let pool = self.pool.as_ref();
        sqlx::query("DELETE FROM narrations WHERE story_id = $1")
            .bind(story_id)
            .execute(pool)
            .await?;

        Ok(())
    }
}
