pub mod memory;
pub mod models;
pub mod postgres;
pub mod query_builder;
pub mod repository;
pub mod rest;
pub mod store;

use std::sync::Arc;

use tracing::{info, warn};

use crate::config::{AppConfig, StoreBackend};

pub use memory::MemoryStore;
pub use postgres::PgStore;
pub use query_builder::QueryBuilder;
pub use repository::{EventRepository, MemoryRepository, Page};
pub use rest::RestStore;
pub use store::{Store, StoreError};

/// Builds the configured store backend. Never connects eagerly.
pub fn connect(config: &AppConfig) -> Result<Arc<dyn Store>, StoreError> {
    let store: Arc<dyn Store> = match config.store.backend {
        StoreBackend::Rest => {
            if config.store.uses_placeholders() {
                warn!("Store credentials not configured; using placeholders, store calls will fail");
            }
            Arc::new(RestStore::new(&config.store)?)
        }
        StoreBackend::Postgres => {
            let url = config
                .store
                .database_url
                .as_deref()
                .ok_or_else(|| StoreError::Config("postgres backend requires DATABASE_URL".to_string()))?;
            Arc::new(PgStore::connect_lazy(url, config.store.max_connections)?)
        }
        StoreBackend::Memory => {
            warn!("Using in-memory store; data is lost on restart");
            Arc::new(MemoryStore::new())
        }
    };
    info!("Store backend: {} ({})", config.store.backend.as_str(), store.backend());
    Ok(store)
}
