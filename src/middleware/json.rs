use axum::{
    async_trait,
    extract::{FromRequest, Request},
    Json,
};
use serde::de::DeserializeOwned;
use tracing::debug;

use crate::error::{ApiError, INVALID_BODY_MESSAGE};

/// JSON body extractor whose rejection is an `ApiError` with the standard
/// `{"error": ...}` body. Request types use `deny_unknown_fields`, so a body of
/// the wrong shape is rejected here rather than partially read.
pub struct ValidJson<T>(pub T);

#[async_trait]
impl<S, T> FromRequest<S> for ValidJson<T>
where
    T: DeserializeOwned,
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        match Json::<T>::from_request(req, state).await {
            Ok(Json(value)) => Ok(ValidJson(value)),
            Err(rejection) => {
                debug!("Rejected request body: {}", rejection.body_text());
                Err(ApiError::bad_request(INVALID_BODY_MESSAGE))
            }
        }
    }
}
