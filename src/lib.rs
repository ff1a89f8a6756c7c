pub mod app;
pub mod auth;
pub mod config;
pub mod error;
pub mod models;
pub mod openapi;
pub mod rate_limit;
pub mod repo;
pub mod routes;
pub mod security;

// Re-export commonly used items for tests / external users
pub use config::AppConfig;
pub use routes::AppState;
pub use security::Security;
