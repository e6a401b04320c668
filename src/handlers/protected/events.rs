use axum::extract::{Extension, Query, State};
use serde::Deserialize;
use serde_json::{Map, Value};

use crate::api::AppState;
use crate::auth::SessionUser;
use crate::database::models::{Event, NewEvent};
use crate::database::EventRepository;
use crate::error::ApiError;
use crate::middleware::{ApiResponse, ApiResult, ValidJson};

use super::utils::parse_page;

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CreateEventRequest {
    #[serde(default)]
    pub kind: Option<String>,
    #[serde(default)]
    pub payload: Option<Map<String, Value>>,
    #[serde(default)]
    pub site: Option<String>,
    #[serde(default)]
    pub provider: Option<String>,
}

impl CreateEventRequest {
    pub fn validate(self) -> Result<NewEvent, ApiError> {
        match (self.kind, self.payload) {
            (Some(kind), Some(payload)) if !kind.is_empty() => Ok(NewEvent {
                kind,
                payload,
                site: self.site,
                provider: self.provider,
            }),
            _ => Err(ApiError::bad_request("Kind and payload required")),
        }
    }
}

/// Raw query values; numbers are parsed leniently in `parse_page`.
#[derive(Debug, Default, Deserialize)]
pub struct ListEventsQuery {
    pub kind: Option<String>,
    pub limit: Option<String>,
    pub offset: Option<String>,
}

/// POST /events - record an event for the session user
///
/// Body: `{ kind, payload, site?, provider? }`. The stored payload gains
/// `site`, `provider` and a server `timestamp`; `user_id` always comes from the
/// session. Responds with the inserted row.
pub async fn create(
    State(state): State<AppState>,
    Extension(user): Extension<SessionUser>,
    ValidJson(body): ValidJson<CreateEventRequest>,
) -> ApiResult<Event> {
    let event = body.validate()?;

    let created = EventRepository::new(state.store.as_ref(), user.id)
        .create(event)
        .await
        .map_err(|e| ApiError::store_failure("Failed to create event", e))?;

    Ok(ApiResponse::success(created))
}

/// GET /events - the session user's events, newest first
///
/// Query: `kind` (empty means all), `limit` (default 50, capped), `offset`.
/// Unusable paging values fall back to their defaults.
pub async fn list(
    State(state): State<AppState>,
    Extension(user): Extension<SessionUser>,
    query: Option<Query<ListEventsQuery>>,
) -> ApiResult<Vec<Event>> {
    let query = query.map(|Query(q)| q).unwrap_or_default();
    let page = parse_page(query.limit.as_deref(), query.offset.as_deref(), &state.config.api);
    let kind = query.kind.as_deref().filter(|k| !k.is_empty());

    let events = EventRepository::new(state.store.as_ref(), user.id)
        .list(kind, page)
        .await
        .map_err(|e| ApiError::store_failure("Failed to fetch events", e))?;

    Ok(ApiResponse::success(events))
}
