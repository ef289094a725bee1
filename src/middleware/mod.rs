//! Request middleware

pub mod auth;
pub mod token;

pub use auth::{auth_layer, CurrentUser};
