use axum::{
    extract::{Request, State},
    middleware::Next,
    response::Response,
};
use tracing::{debug, warn};

use crate::api::AppState;
use crate::auth::AuthError;
use crate::error::ApiError;

/// Session middleware for protected routes.
///
/// Resolves the caller through the session provider and injects
/// `SessionUser` into request extensions. Runs before any extractor, so a
/// request without a session never has its body parsed or reaches the store.
pub async fn session_auth_middleware(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let session_user = state
        .sessions
        .session_user(request.headers())
        .await
        .map_err(|e| {
            match e {
                AuthError::MissingCredential | AuthError::NotConfigured => debug!("{} {}: {}", request.method(), request.uri().path(), e),
                _ => warn!("{} {}: rejected session: {}", request.method(), request.uri().path(), e),
            }
            ApiError::unauthorized()
        })?;

    debug!("Session resolved for user {}", session_user.id);
    request.extensions_mut().insert(session_user);

    Ok(next.run(request).await)
}
