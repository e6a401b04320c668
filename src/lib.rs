pub mod api;
pub mod auth;
pub mod config;
pub mod database;
pub mod error;
pub mod filter;
pub mod gate;
pub mod handlers;
pub mod middleware;
pub mod types;

pub use api::{router, AppState};
