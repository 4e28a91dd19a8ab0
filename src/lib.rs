pub mod api;
pub mod auth;
pub mod cli;
pub mod error;
pub mod github;
pub mod health;
pub mod neighbours;
pub mod pool;
pub mod store;
pub mod types;
