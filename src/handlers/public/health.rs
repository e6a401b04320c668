use axum::{extract::State, response::Json};
use serde_json::{json, Value};

use crate::api::AppState;

/// GET / - service descriptor
pub async fn root(State(state): State<AppState>) -> Json<Value> {
    Json(json!({
        "name": env!("CARGO_PKG_NAME"),
        "version": env!("CARGO_PKG_VERSION"),
        "environment": state.config.environment,
        "endpoints": {
            "health": "/health",
            "session": "/auth/session (public)",
            "sign_in": ["/sign-in", "/auth/sign-in/:provider"],
            "events": "/events (protected)",
            "memories": "/memories[/:id] (protected)",
        }
    }))
}

/// GET /health - liveness; does not touch the store
pub async fn health(State(state): State<AppState>) -> Json<Value> {
    Json(json!({
        "status": "ok",
        "backend": state.store.backend(),
        "timestamp": chrono::Utc::now(),
    }))
}
