pub mod auth;
pub mod json;
pub mod response;

pub use auth::session_auth_middleware;
pub use json::ValidJson;
pub use response::{ApiResponse, ApiResult};
