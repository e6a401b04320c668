use axum::extract::{Extension, Path, Query, State};
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::debug;
use uuid::Uuid;

use crate::api::AppState;
use crate::auth::SessionUser;
use crate::database::models::{Memory, MemoryFields};
use crate::database::MemoryRepository;
use crate::error::ApiError;
use crate::middleware::{ApiResponse, ApiResult, ValidJson};

use super::utils::parse_page;

/// Body for create and update. Update is a full replace: omitted optional
/// fields are written as `null`.
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct MemoryRequest {
    #[serde(rename = "type", default)]
    pub memory_type: Option<String>,
    #[serde(default)]
    pub content: Option<String>,
    #[serde(default)]
    pub importance: Option<i32>,
    #[serde(default)]
    pub pii: Option<bool>,
}

impl MemoryRequest {
    pub fn validate(self) -> Result<MemoryFields, ApiError> {
        match self.content {
            Some(content) if !content.is_empty() => Ok(MemoryFields {
                memory_type: self.memory_type,
                content,
                importance: self.importance,
                pii: self.pii,
            }),
            _ => Err(ApiError::bad_request("Content required")),
        }
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct ListMemoriesQuery {
    pub limit: Option<String>,
    pub offset: Option<String>,
}

/// GET /memories - the session user's memories, newest first
///
/// Query: `limit` and `offset`, parsed as for `GET /events`.
pub async fn list(
    State(state): State<AppState>,
    Extension(user): Extension<SessionUser>,
    query: Option<Query<ListMemoriesQuery>>,
) -> ApiResult<Vec<Memory>> {
    let query = query.map(|Query(q)| q).unwrap_or_default();
    let page = parse_page(query.limit.as_deref(), query.offset.as_deref(), &state.config.api);

    let memories = MemoryRepository::new(state.store.as_ref(), user.id)
        .list(page)
        .await
        .map_err(|e| ApiError::store_failure("Failed to fetch memories", e))?;

    Ok(ApiResponse::success(memories))
}

/// POST /memories - store a memory for the session user
///
/// Body: `{ type?, content, importance?, pii? }`; `content` must be non-empty.
/// Responds with the inserted row.
pub async fn create(
    State(state): State<AppState>,
    Extension(user): Extension<SessionUser>,
    ValidJson(body): ValidJson<MemoryRequest>,
) -> ApiResult<Memory> {
    let fields = body.validate()?;

    let created = MemoryRepository::new(state.store.as_ref(), user.id)
        .create(&fields)
        .await
        .map_err(|e| ApiError::store_failure("Failed to create memory", e))?;

    Ok(ApiResponse::success(created))
}

/// PUT /memories/:id - replace one of the session user's memories
///
/// No matching row (missing, another user's, or a malformed id) is a store
/// failure: 500 `Failed to update memory`.
pub async fn update(
    State(state): State<AppState>,
    Extension(user): Extension<SessionUser>,
    Path(id): Path<String>,
    ValidJson(body): ValidJson<MemoryRequest>,
) -> ApiResult<Memory> {
    let fields = body.validate()?;

    let id = Uuid::parse_str(&id)
        .map_err(|e| ApiError::store_failure("Failed to update memory", format!("invalid id '{}': {}", id, e)))?;

    let updated = MemoryRepository::new(state.store.as_ref(), user.id)
        .update(id, &fields)
        .await
        .map_err(|e| ApiError::store_failure("Failed to update memory", e))?;

    Ok(ApiResponse::success(updated))
}

/// DELETE /memories/:id - delete one of the session user's memories
///
/// Succeeds whether or not a row matched.
pub async fn delete(
    State(state): State<AppState>,
    Extension(user): Extension<SessionUser>,
    Path(id): Path<String>,
) -> ApiResult<Value> {
    let Ok(id) = Uuid::parse_str(&id) else {
        debug!("Delete of non-uuid memory id '{}' matches nothing", id);
        return Ok(ApiResponse::success(json!({ "success": true })));
    };

    let removed = MemoryRepository::new(state.store.as_ref(), user.id)
        .delete(id)
        .await
        .map_err(|e| ApiError::store_failure("Failed to delete memory", e))?;

    debug!("Deleted {} memory row(s) for {}", removed, user.id);
    Ok(ApiResponse::success(json!({ "success": true })))
}
