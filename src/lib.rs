//! Ramais - internal employee directory
//!
//! Departments, job functions, business units and the employees assigned to
//! them, with extension numbers and contact handles. Served as a JSON API
//! behind session or bearer-token authentication.

pub mod config;
pub mod db;
pub mod entity;
pub mod error;
pub mod handlers;
pub mod middleware;
pub mod permission;
pub mod routes;
pub mod state;
pub mod store;

// Re-export commonly used types
pub use config::Config;
pub use state::AppState;
