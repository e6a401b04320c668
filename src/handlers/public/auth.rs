use axum::{
    extract::{Path, State},
    http::{header, HeaderMap},
    response::{Html, Json, Redirect},
};
use serde_json::{json, Value};
use tracing::{debug, warn};

use crate::api::AppState;
use crate::error::ApiError;
use crate::gate::{self, OAuthProvider, SignInPanel};

/// GET /auth/session - current session lookup, never 401
///
/// This is what a browser polls to feed a `SessionGate`.
pub async fn session(State(state): State<AppState>, headers: HeaderMap) -> Json<Value> {
    match state.sessions.session_user(&headers).await {
        Ok(user) => Json(json!({ "user": user })),
        Err(e) => {
            debug!("No session: {}", e);
            Json(json!({ "user": null }))
        }
    }
}

/// GET /auth/sign-in/:provider - redirect into the provider's consent flow
pub async fn sign_in(
    State(state): State<AppState>,
    Path(provider): Path<String>,
    headers: HeaderMap,
) -> Result<Redirect, ApiError> {
    let provider: OAuthProvider = provider.parse().map_err(|e| {
        debug!("{}", e);
        ApiError::bad_request("Unknown provider")
    })?;

    let origin = request_origin(&headers, state.config.security.require_https);
    let command = gate::sign_in(&state.config.store.url, provider, &origin).map_err(|e| {
        warn!("Cannot build sign-in redirect for origin '{}': {}", origin, e);
        ApiError::bad_request("Invalid origin")
    })?;

    Ok(Redirect::to(command.redirect_to.as_str()))
}

/// GET /sign-in - default sign-in panel
pub async fn sign_in_page(State(state): State<AppState>, headers: HeaderMap) -> Result<Html<String>, ApiError> {
    let origin = request_origin(&headers, state.config.security.require_https);
    let panel = SignInPanel::new(&state.config.store.url, &origin).map_err(|e| {
        warn!("Cannot build sign-in panel for origin '{}': {}", origin, e);
        ApiError::bad_request("Invalid origin")
    })?;

    Ok(Html(panel.to_html()))
}

/// Origin the provider should send the browser back to: the `Origin` header
/// when present, otherwise the scheme and `Host` of this request.
pub fn request_origin(headers: &HeaderMap, require_https: bool) -> String {
    let header_str = |name: &str| headers.get(name).and_then(|v| v.to_str().ok()).map(str::trim);

    if let Some(origin) = header_str(header::ORIGIN.as_str()).filter(|o| !o.is_empty() && *o != "null") {
        return origin.trim_end_matches('/').to_string();
    }

    let scheme = match header_str("x-forwarded-proto") {
        Some(proto) if !proto.is_empty() => proto,
        _ if require_https => "https",
        _ => "http",
    };
    let host = header_str(header::HOST.as_str()).filter(|h| !h.is_empty()).unwrap_or("localhost");

    format!("{}://{}", scheme, host)
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    #[test]
    fn origin_header_wins() {
        let mut headers = HeaderMap::new();
        headers.insert(header::ORIGIN, HeaderValue::from_static("https://app.example.com/"));
        headers.insert(header::HOST, HeaderValue::from_static("internal:3000"));
        assert_eq!(request_origin(&headers, false), "https://app.example.com");
    }

    #[test]
    fn falls_back_to_host() {
        let mut headers = HeaderMap::new();
        headers.insert(header::ORIGIN, HeaderValue::from_static("null"));
        headers.insert(header::HOST, HeaderValue::from_static("localhost:3000"));
        assert_eq!(request_origin(&headers, false), "http://localhost:3000");
        assert_eq!(request_origin(&headers, true), "https://localhost:3000");

        headers.insert("x-forwarded-proto", HeaderValue::from_static("https"));
        assert_eq!(request_origin(&headers, false), "https://localhost:3000");
    }
}
