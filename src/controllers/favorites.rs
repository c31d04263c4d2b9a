use axum::{
    extract::{Path, State},
    http::StatusCode,
    Extension,
};
use std::sync::Arc;
use uuid::Uuid;

use crate::{
    domain::narration::NarrationService,
    error::AppResult,
    infrastructure::{auth::AuthUser, repositories::FavoritesRepository},
};

pub struct FavoritesController {
    favorites: Arc<dyn FavoritesRepository>,
    narration_service: Arc<NarrationService>,
}

impl FavoritesController {
    pub fn new(
        favorites: Arc<dyn FavoritesRepository>,
        narration_service: Arc<NarrationService>,
    ) -> Self {
        Self {
            favorites,
            narration_service,
        }
    }

    /// DELETE /api/stories/:story_id/favorite - Unfavorite a story
    ///
    /// Removing a favorite also purges its narration so storage doesn't
    /// accumulate audio for stories nobody kept.
    pub async fn remove_favorite(
        State(controller): State<Arc<FavoritesController>>,
        Extension(auth_user): Extension<AuthUser>,
        Path(story_id): Path<Uuid>,
    ) -> AppResult<StatusCode> {
        controller
            .favorites
            .remove(auth_user.user_id, story_id)
            .await?;

        controller
            .narration_service
            .delete_narration_for(story_id)
            .await;

        Ok(StatusCode::NO_CONTENT)
    }
}
