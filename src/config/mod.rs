use serde::{Deserialize, Serialize};
use std::env;

/// Placeholders used when the store credentials are not configured. The server
/// still starts; store calls then fail and surface as 500s.
pub const PLACEHOLDER_STORE_URL: &str = "https://placeholder.supabase.co";
pub const PLACEHOLDER_ANON_KEY: &str = "placeholder-anon-key";
pub const PLACEHOLDER_SERVICE_ROLE_KEY: &str = "placeholder-service-role-key";
pub const PLACEHOLDER_JWT_SECRET: &str = "placeholder-jwt-secret";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    pub environment: Environment,
    pub store: StoreConfig,
    pub auth: AuthConfig,
    pub api: ApiConfig,
    pub security: SecurityConfig,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Environment {
    Development,
    Staging,
    Production,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StoreBackend {
    /// PostgREST API of the hosted store
    Rest,
    /// Direct Postgres connection
    Postgres,
    /// In-process tables, nothing persisted
    Memory,
}

impl StoreBackend {
    pub fn as_str(&self) -> &'static str {
        match self {
            StoreBackend::Rest => "rest",
            StoreBackend::Postgres => "postgres",
            StoreBackend::Memory => "memory",
        }
    }

    fn parse(s: &str) -> Option<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "rest" | "supabase" => Some(StoreBackend::Rest),
            "postgres" | "pg" => Some(StoreBackend::Postgres),
            "memory" | "mem" => Some(StoreBackend::Memory),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreConfig {
    pub backend: StoreBackend,
    pub url: String,
    pub anon_key: String,
    pub service_role_key: String,
    pub database_url: Option<String>,
    pub max_connections: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthConfig {
    pub jwt_secret: String,
    pub cookie_name: String,
    pub audience: Option<String>,
}

impl StoreConfig {
    pub fn uses_placeholders(&self) -> bool {
        self.url == PLACEHOLDER_STORE_URL
            || self.anon_key == PLACEHOLDER_ANON_KEY
            || self.service_role_key == PLACEHOLDER_SERVICE_ROLE_KEY
    }
}

impl AuthConfig {
    /// False while the JWT secret is unset or the public placeholder. Sessions
    /// are never accepted in that state.
    pub fn is_configured(&self) -> bool {
        !self.jwt_secret.is_empty() && self.jwt_secret != PLACEHOLDER_JWT_SECRET
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiConfig {
    pub default_limit: i64,
    pub max_limit: i64,
    pub max_request_size_bytes: usize,
    pub enable_request_logging: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SecurityConfig {
    pub cors_origins: Vec<String>,
    pub require_https: bool,
}

impl AppConfig {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Builds the configuration from any key lookup; `from_env` passes the process environment.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let environment = match lookup("APP_ENV").as_deref() {
            Some("production") | Some("prod") => Environment::Production,
            Some("staging") | Some("stage") => Environment::Staging,
            _ => Environment::Development,
        };

        // Set defaults based on environment, then override with specific env vars
        match environment {
            Environment::Production => Self::production(),
            Environment::Staging => Self::staging(),
            Environment::Development => Self::development(),
        }
        .with_overrides(lookup)
    }

    fn with_overrides<F>(mut self, lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        // Store overrides; unset credentials keep their placeholders
        if let Some(v) = lookup("SUPABASE_URL").filter(|v| !v.trim().is_empty()) {
            self.store.url = v.trim_end_matches('/').to_string();
        }
        if let Some(v) = lookup("SUPABASE_ANON_KEY").filter(|v| !v.is_empty()) {
            self.store.anon_key = v;
        }
        if let Some(v) = lookup("SUPABASE_SERVICE_ROLE_KEY").filter(|v| !v.is_empty()) {
            self.store.service_role_key = v;
        }
        if let Some(v) = lookup("DATABASE_URL").filter(|v| !v.is_empty()) {
            self.store.database_url = Some(v);
            self.store.backend = StoreBackend::Postgres;
        }
        if let Some(v) = lookup("STORE_BACKEND") {
            match StoreBackend::parse(&v) {
                Some(backend) => self.store.backend = backend,
                None => tracing::warn!("Ignoring unknown STORE_BACKEND '{}'", v),
            }
        }
        if let Some(v) = lookup("DATABASE_MAX_CONNECTIONS") {
            self.store.max_connections = v.parse().unwrap_or(self.store.max_connections);
        }

        // Auth overrides
        if let Some(v) = lookup("SUPABASE_JWT_SECRET").filter(|v| !v.is_empty()) {
            self.auth.jwt_secret = v;
        }
        if let Some(v) = lookup("AUTH_COOKIE_NAME").filter(|v| !v.is_empty()) {
            self.auth.cookie_name = v;
        }
        if let Some(v) = lookup("AUTH_AUDIENCE") {
            self.auth.audience = if v.is_empty() { None } else { Some(v) };
        }

        // API overrides
        if let Some(v) = lookup("API_DEFAULT_LIMIT") {
            self.api.default_limit = v.parse().unwrap_or(self.api.default_limit);
        }
        if let Some(v) = lookup("API_MAX_LIMIT") {
            self.api.max_limit = v.parse().unwrap_or(self.api.max_limit);
        }
        if let Some(v) = lookup("API_MAX_REQUEST_SIZE_BYTES") {
            self.api.max_request_size_bytes = v.parse().unwrap_or(self.api.max_request_size_bytes);
        }
        if let Some(v) = lookup("API_ENABLE_REQUEST_LOGGING") {
            self.api.enable_request_logging = v.parse().unwrap_or(self.api.enable_request_logging);
        }

        // Security overrides
        if let Some(v) = lookup("SECURITY_CORS_ORIGINS") {
            self.security.cors_origins = v
                .split(',')
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty())
                .collect();
        }
        if let Some(v) = lookup("SECURITY_REQUIRE_HTTPS") {
            self.security.require_https = v.parse().unwrap_or(self.security.require_https);
        }

        self
    }

    /// True while any store credential or the JWT secret is still a placeholder.
    pub fn uses_placeholders(&self) -> bool {
        self.store.uses_placeholders() || !self.auth.is_configured()
    }

    fn base_store() -> StoreConfig {
        StoreConfig {
            backend: StoreBackend::Rest,
            url: PLACEHOLDER_STORE_URL.to_string(),
            anon_key: PLACEHOLDER_ANON_KEY.to_string(),
            service_role_key: PLACEHOLDER_SERVICE_ROLE_KEY.to_string(),
            database_url: None,
            max_connections: 10,
        }
    }

    fn base_auth() -> AuthConfig {
        AuthConfig {
            jwt_secret: PLACEHOLDER_JWT_SECRET.to_string(),
            cookie_name: "sb-access-token".to_string(),
            audience: Some("authenticated".to_string()),
        }
    }

    pub fn development() -> Self {
        Self {
            environment: Environment::Development,
            store: Self::base_store(),
            auth: Self::base_auth(),
            api: ApiConfig {
                default_limit: 50,
                max_limit: 1000,
                max_request_size_bytes: 10 * 1024 * 1024, // 10MB
                enable_request_logging: true,
            },
            security: SecurityConfig {
                cors_origins: vec!["http://localhost:3000".to_string(), "http://localhost:5173".to_string()],
                require_https: false,
            },
        }
    }

    pub fn staging() -> Self {
        Self {
            environment: Environment::Staging,
            store: StoreConfig { max_connections: 20, ..Self::base_store() },
            auth: Self::base_auth(),
            api: ApiConfig {
                default_limit: 50,
                max_limit: 500,
                max_request_size_bytes: 5 * 1024 * 1024, // 5MB
                enable_request_logging: true,
            },
            security: SecurityConfig {
                cors_origins: vec!["https://staging.example.com".to_string()],
                require_https: true,
            },
        }
    }

    pub fn production() -> Self {
        Self {
            environment: Environment::Production,
            store: StoreConfig { max_connections: 50, ..Self::base_store() },
            auth: Self::base_auth(),
            api: ApiConfig {
                default_limit: 50,
                max_limit: 500,
                max_request_size_bytes: 2 * 1024 * 1024, // 2MB
                enable_request_logging: false,
            },
            security: SecurityConfig {
                cors_origins: vec!["https://app.example.com".to_string()],
                require_https: true,
            },
        }
    }
}
