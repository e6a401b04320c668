//! Session resolution against the identity provider's signed access token.
//!
//! The provider issues an HS256 JWT whose `sub` is the user id. Browsers carry
//! it in the session cookie; API clients may send it as a Bearer token.

use async_trait::async_trait;
use axum::http::{header, HeaderMap};
use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::warn;

use crate::config::AuthConfig;
use crate::types::UserId;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub aud: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub role: Option<String>,
    pub exp: i64,
    pub iat: i64,
}

impl Claims {
    pub fn new(user: UserId, audience: Option<String>, lifetime: Duration) -> Self {
        let now = Utc::now();
        Self {
            sub: user.to_string(),
            aud: audience,
            email: None,
            role: Some("authenticated".to_string()),
            exp: (now + lifetime).timestamp(),
            iat: now.timestamp(),
        }
    }
}

/// The authenticated caller, resolved once per request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct SessionUser {
    pub id: UserId,
}

#[derive(Debug, Error)]
pub enum AuthError {
    #[error("no session credential in request")]
    MissingCredential,

    #[error("invalid session token: {0}")]
    InvalidToken(String),

    #[error("session subject is not a user id: {0}")]
    InvalidSubject(String),

    #[error("token generation failed: {0}")]
    TokenGeneration(String),

    #[error("session verification disabled: JWT secret not configured")]
    NotConfigured,
}

/// Resolves the caller's session from request-scoped credentials.
#[async_trait]
pub trait SessionProvider: Send + Sync {
    async fn session_user(&self, headers: &HeaderMap) -> Result<SessionUser, AuthError>;
}

/// Verifies the provider's access token locally with the shared JWT secret.
///
/// Without a configured secret every credential is rejected.
pub struct JwtSessionProvider {
    enabled: bool,
    cookie_name: String,
    decoding_key: DecodingKey,
    validation: Validation,
}

impl JwtSessionProvider {
    pub fn new(config: &AuthConfig) -> Self {
        let enabled = config.is_configured();
        if !enabled {
            warn!("SUPABASE_JWT_SECRET not configured; all sessions will be rejected");
        }

        let mut validation = Validation::default();
        match &config.audience {
            Some(aud) => validation.set_audience(&[aud]),
            None => validation.validate_aud = false,
        }

        Self {
            enabled,
            cookie_name: config.cookie_name.clone(),
            decoding_key: DecodingKey::from_secret(config.jwt_secret.as_bytes()),
            validation,
        }
    }

    fn validate(&self, token: &str) -> Result<Claims, AuthError> {
        decode::<Claims>(token, &self.decoding_key, &self.validation)
            .map(|data| data.claims)
            .map_err(|e| AuthError::InvalidToken(e.to_string()))
    }
}

#[async_trait]
impl SessionProvider for JwtSessionProvider {
    async fn session_user(&self, headers: &HeaderMap) -> Result<SessionUser, AuthError> {
        if !self.enabled {
            return Err(AuthError::NotConfigured);
        }
        let token = extract_token(headers, &self.cookie_name).ok_or(AuthError::MissingCredential)?;
        let claims = self.validate(&token)?;
        let id = claims
            .sub
            .parse::<UserId>()
            .map_err(|_| AuthError::InvalidSubject(claims.sub.clone()))?;
        Ok(SessionUser { id })
    }
}

/// Session cookie first, then `Authorization: Bearer`.
fn extract_token(headers: &HeaderMap, cookie_name: &str) -> Option<String> {
    if let Some(token) = extract_cookie_value(headers, cookie_name).filter(|t| !t.is_empty()) {
        return Some(token);
    }

    let auth_str = headers.get(header::AUTHORIZATION)?.to_str().ok()?;
    auth_str
        .strip_prefix("Bearer ")
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .map(str::to_string)
}

fn extract_cookie_value(headers: &HeaderMap, name: &str) -> Option<String> {
    let prefix = format!("{}=", name);
    headers
        .get_all(header::COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .flat_map(|cookies| cookies.split(';'))
        .map(|part| part.trim())
        .find_map(|part| part.strip_prefix(&prefix).map(|value| value.to_string()))
}

/// Signs a session token the way the identity provider does. Used for local
/// development and tests; production tokens come from the provider.
pub fn issue_token(config: &AuthConfig, user: UserId, lifetime: Duration) -> Result<String, AuthError> {
    let claims = Claims::new(user, config.audience.clone(), lifetime);
    encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(config.jwt_secret.as_bytes()),
    )
    .map_err(|e| AuthError::TokenGeneration(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;
    use uuid::Uuid;

    fn config() -> AuthConfig {
        AuthConfig {
            jwt_secret: "test-secret".to_string(),
            cookie_name: "sb-access-token".to_string(),
            audience: Some("authenticated".to_string()),
        }
    }

    fn headers_with(name: header::HeaderName, value: &str) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(name, HeaderValue::from_str(value).unwrap());
        headers
    }

    #[tokio::test]
    async fn resolves_user_from_cookie() {
        let user = UserId::new(Uuid::new_v4());
        let token = issue_token(&config(), user, Duration::hours(1)).unwrap();
        let headers = headers_with(header::COOKIE, &format!("theme=dark; sb-access-token={}", token));

        let provider = JwtSessionProvider::new(&config());
        let session = provider.session_user(&headers).await.unwrap();
        assert_eq!(session.id, user);
    }

    #[tokio::test]
    async fn resolves_user_from_bearer() {
        let user = UserId::new(Uuid::new_v4());
        let token = issue_token(&config(), user, Duration::hours(1)).unwrap();
        let headers = headers_with(header::AUTHORIZATION, &format!("Bearer {}", token));

        let provider = JwtSessionProvider::new(&config());
        assert_eq!(provider.session_user(&headers).await.unwrap().id, user);
    }

    #[tokio::test]
    async fn missing_credential() {
        let provider = JwtSessionProvider::new(&config());
        let err = provider.session_user(&HeaderMap::new()).await.unwrap_err();
        assert!(matches!(err, AuthError::MissingCredential));
    }

    #[tokio::test]
    async fn rejects_wrong_secret_and_expired_tokens() {
        let user = UserId::new(Uuid::new_v4());
        let provider = JwtSessionProvider::new(&config());

        let other = AuthConfig { jwt_secret: "other".to_string(), ..config() };
        let forged = issue_token(&other, user, Duration::hours(1)).unwrap();
        let headers = headers_with(header::AUTHORIZATION, &format!("Bearer {}", forged));
        assert!(matches!(
            provider.session_user(&headers).await,
            Err(AuthError::InvalidToken(_))
        ));

        let expired = issue_token(&config(), user, Duration::hours(-2)).unwrap();
        let headers = headers_with(header::AUTHORIZATION, &format!("Bearer {}", expired));
        assert!(matches!(
            provider.session_user(&headers).await,
            Err(AuthError::InvalidToken(_))
        ));
    }

    #[tokio::test]
    async fn placeholder_secret_rejects_everything() {
        let placeholder = AuthConfig {
            jwt_secret: crate::config::PLACEHOLDER_JWT_SECRET.to_string(),
            ..config()
        };
        let token = issue_token(&placeholder, UserId::new(Uuid::new_v4()), Duration::hours(1)).unwrap();
        let headers = headers_with(header::AUTHORIZATION, &format!("Bearer {}", token));

        let provider = JwtSessionProvider::new(&placeholder);
        assert!(matches!(
            provider.session_user(&headers).await,
            Err(AuthError::NotConfigured)
        ));
    }

    #[tokio::test]
    async fn rejects_non_uuid_subject() {
        let claims = Claims {
            sub: "not-a-uuid".to_string(),
            aud: Some("authenticated".to_string()),
            email: None,
            role: None,
            exp: (Utc::now() + Duration::hours(1)).timestamp(),
            iat: Utc::now().timestamp(),
        };
        let token = encode(&Header::default(), &claims, &EncodingKey::from_secret(b"test-secret")).unwrap();
        let headers = headers_with(header::AUTHORIZATION, &format!("Bearer {}", token));

        let provider = JwtSessionProvider::new(&config());
        assert!(matches!(
            provider.session_user(&headers).await,
            Err(AuthError::InvalidSubject(_))
        ));
    }
}
