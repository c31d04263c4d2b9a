use crate::error::AppResult;
use crate::infrastructure::db::DbPool;
use async_trait::async_trait;
use std::sync::Arc;
use uuid::Uuid;

/// Membership port onto the favorites collaborator. Query/filtering
/// semantics beyond membership and removal live elsewhere.
#[async_trait]
pub trait FavoritesRepository: Send + Sync {
    async fn is_favorite(&self, user_id: Uuid, story_id: Uuid) -> AppResult<bool>;

    /// Remove the favorite. Removing a non-favorite is not an error.
    async fn remove(&self, user_id: Uuid, story_id: Uuid) -> AppResult<()>;
}

pub struct PgFavoritesRepository {
    pool: Arc<DbPool>,
}

impl PgFavoritesRepository {
    pub fn new(pool: Arc<DbPool>) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl FavoritesRepository for PgFavoritesRepository {
    async fn is_favorite(&self, user_id: Uuid, story_id: Uuid) -> AppResult<bool> {
        let pool = self.pool.as_ref();
        let exists = sqlx::query_scalar::<_, bool>(
            r#"
            SELECT EXISTS(
                SELECT 1 FROM favorites
                WHERE user_id = $1 AND story_id = $2
            )
            "#,
        )
        .bind(user_id)
        .bind(story_id)
        .fetch_one(pool)
        .await?;

        Ok(exists)
    }

    async fn remove(&self, user_id: Uuid, story_id: Uuid) -> AppResult<()> {
        let pool = self.pool.as_ref();
        sqlx::query("DELETE FROM favorites WHERE user_id = $1 AND story_id = $2")
            .bind(user_id)
            .bind(story_id)
            .execute(pool)
            .await?;

        Ok(())
    }
}
