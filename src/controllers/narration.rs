use axum::{
    body::Body,
    extract::{Path, State},
    http::{header, HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    Extension, Json,
};
use serde::Serialize;
use std::sync::Arc;
use uuid::Uuid;

use crate::{
    domain::narration::{ListenOutcome, NarrationService},
    error::{AppError, AppResult},
    infrastructure::{auth::AuthUser, repositories::AUDIO_CONTENT_TYPE},
};

/// Response for narration lookups and ready outcomes.
#[derive(Debug, Serialize)]
pub struct NarrationResponse {
    pub status: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
}

pub struct NarrationController {
    narration_service: Arc<NarrationService>,
}

impl NarrationController {
    pub fn new(narration_service: Arc<NarrationService>) -> Self {
        Self { narration_service }
    }

    /// GET /api/stories/:story_id/narration - Look up a stored narration
    pub async fn get_narration(
        State(controller): State<Arc<NarrationController>>,
        Extension(_auth_user): Extension<AuthUser>,
        Path(story_id): Path<Uuid>,
    ) -> AppResult<Json<NarrationResponse>> {
        match controller.narration_service.narration_for(story_id).await {
            Some(url) => Ok(Json(NarrationResponse {
                status: "ready",
                url: Some(url),
            })),
            None => Err(AppError::NotFound(format!(
                "No narration for story {}",
                story_id
            ))),
        }
    }

    /// POST /api/stories/:story_id/narration - Request playback audio
    pub async fn listen(
        State(controller): State<Arc<NarrationController>>,
        Extension(auth_user): Extension<AuthUser>,
        Path(story_id): Path<Uuid>,
    ) -> AppResult<Response> {
        let outcome = controller
            .narration_service
            .listen(auth_user.user_id, story_id)
            .await
            .map_err(AppError::from)?;

        let response = match outcome {
            ListenOutcome::Ready { url } => (
                StatusCode::OK,
                Json(NarrationResponse {
                    status: "ready",
                    url: Some(url),
                }),
            )
                .into_response(),
            ListenOutcome::Preparing => (
                StatusCode::ACCEPTED,
                Json(NarrationResponse {
                    status: "preparing",
                    url: None,
                }),
            )
                .into_response(),
            // Audio was synthesized but could not be persisted; stream it
            // directly so the listener still gets their narration.
            ListenOutcome::Transient { audio } => {
                let mut headers = HeaderMap::new();
                headers.insert(header::CONTENT_TYPE, AUDIO_CONTENT_TYPE.parse().unwrap());
                headers.insert("X-Narration-Persisted", "false".parse().unwrap());
                (StatusCode::OK, headers, Body::from(audio)).into_response()
            }
        };

        Ok(response)
    }

    /// POST /api/stories/:story_id/narration/prefetch - Warm the narration ahead of playback
    pub async fn prefetch(
        State(controller): State<Arc<NarrationController>>,
        Extension(auth_user): Extension<AuthUser>,
        Path(story_id): Path<Uuid>,
    ) -> AppResult<Response> {
        let response = match controller
            .narration_service
            .on_story_view(auth_user.user_id, story_id)
            .await
        {
            Some(url) => (
                StatusCode::OK,
                Json(NarrationResponse {
                    status: "ready",
                    url: Some(url),
                }),
            )
                .into_response(),
            None => (
                StatusCode::ACCEPTED,
                Json(NarrationResponse {
                    status: "accepted",
                    url: None,
                }),
            )
                .into_response(),
        };

        Ok(response)
    }

    /// DELETE /api/stories/:story_id/narration - Remove audio and record
    pub async fn delete_narration(
        State(controller): State<Arc<NarrationController>>,
        Extension(_auth_user): Extension<AuthUser>,
        Path(story_id): Path<Uuid>,
    ) -> StatusCode {
        controller
            .narration_service
            .delete_narration_for(story_id)
            .await;
        StatusCode::NO_CONTENT
    }
}
