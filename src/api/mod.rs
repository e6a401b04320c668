use std::sync::Arc;

use axum::{
    extract::DefaultBodyLimit,
    http::{header, HeaderValue, Method},
    middleware,
    routing::{get, put},
    Router,
};
use tower_http::{
    catch_panic::CatchPanicLayer,
    cors::{AllowOrigin, Any, CorsLayer},
    trace::TraceLayer,
};
use tracing::warn;

use crate::auth::SessionProvider;
use crate::config::AppConfig;
use crate::database::Store;
use crate::error::panic_response;
use crate::handlers::{protected, public};
use crate::middleware::session_auth_middleware;

/// Shared, read-only request state.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub store: Arc<dyn Store>,
    pub sessions: Arc<dyn SessionProvider>,
}

impl AppState {
    pub fn new(config: AppConfig, store: Arc<dyn Store>, sessions: Arc<dyn SessionProvider>) -> Self {
        Self { config: Arc::new(config), store, sessions }
    }
}

pub fn router(state: AppState) -> Router {
    let mut app = Router::new()
        .merge(public_routes())
        .merge(protected_routes(state.clone()))
        .layer(CatchPanicLayer::custom(panic_response))
        .layer(DefaultBodyLimit::max(state.config.api.max_request_size_bytes))
        .layer(cors_layer(&state.config));

    if state.config.api.enable_request_logging {
        app = app.layer(TraceLayer::new_for_http());
    }

    app.with_state(state)
}

fn public_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(public::root))
        .route("/health", get(public::health))
        .route("/auth/session", get(public::auth::session))
        .route("/auth/sign-in/:provider", get(public::auth::sign_in))
        .route("/sign-in", get(public::auth::sign_in_page))
}

/// Every route here runs the session middleware first.
fn protected_routes(state: AppState) -> Router<AppState> {
    use protected::{events, memories};

    Router::new()
        .route("/events", get(events::list).post(events::create))
        .route("/memories", get(memories::list).post(memories::create))
        .route("/memories/:id", put(memories::update).delete(memories::delete))
        .route_layer(middleware::from_fn_with_state(state, session_auth_middleware))
}

fn cors_layer(config: &AppConfig) -> CorsLayer {
    let layer = CorsLayer::new()
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE])
        .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION]);

    let origins = &config.security.cors_origins;
    if origins.is_empty() || origins.iter().any(|o| o == "*") {
        // Credentialed requests cannot use a wildcard origin.
        return layer.allow_origin(Any);
    }

    let allowed: Vec<HeaderValue> = origins
        .iter()
        .filter_map(|origin| match HeaderValue::from_str(origin) {
            Ok(value) => Some(value),
            Err(_) => {
                warn!("Ignoring invalid CORS origin '{}'", origin);
                None
            }
        })
        .collect();

    layer.allow_origin(AllowOrigin::list(allowed)).allow_credentials(true)
}
