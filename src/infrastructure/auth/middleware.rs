use axum::{
    extract::{Request, State},
    middleware::Next,
    response::Response,
};
use std::sync::Arc;
use uuid::Uuid;

use crate::error::AppError;
use crate::infrastructure::auth::jwt::JwtManager;
use crate::infrastructure::config::Config;

/// User context injected into request extensions after authentication
#[derive(Debug, Clone)]
pub struct AuthUser {
    pub user_id: Uuid,
}

/// Authentication middleware. Session issuance is the external auth
/// provider's concern; only the bearer token is validated here.
pub async fn auth_middleware(
    State(config): State<Arc<Config>>,
    mut request: Request,
    next: Next,
) -> Result<Response, AppError> {
    // Extract Authorization header
    let auth_header = request
        .headers()
        .get("authorization")
        .and_then(|v| v.to_str().ok())
        .ok_or_else(|| AppError::Unauthorized("Missing authorization header".to_string()))?;

    // Check Bearer token format
    if !auth_header.starts_with("Bearer ") {
        return Err(AppError::Unauthorized(
            "Invalid authorization format".to_string(),
        ));
    }

    let token = &auth_header[7..]; // Skip "Bearer "

    // Validate JWT token
    let jwt_manager = JwtManager::new(config.jwt_secret.clone(), config.jwt_expiration_hours);
    let user_id = jwt_manager.extract_user_id(token)?;

    // Add user context to request
    request.extensions_mut().insert(AuthUser { user_id });

    Ok(next.run(request).await)
}
