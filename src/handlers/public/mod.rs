// handlers/public/mod.rs - No session required
pub mod auth;
pub mod health;

pub use health::{health, root};
