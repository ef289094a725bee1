use sea_orm::DatabaseConnection;
use std::sync::Arc;

use crate::config::Config;
use crate::middleware::token::TokenSigner;

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    /// Database connection pool
    pub db: DatabaseConnection,
    /// Application configuration
    pub config: Arc<Config>,
    /// Signs and verifies API tokens
    pub tokens: TokenSigner,
}

impl AppState {
    /// Create new application state
    pub fn new(db: DatabaseConnection, config: Config) -> Self {
        let tokens = TokenSigner::new(&config.auth);
        Self {
            db,
            config: Arc::new(config),
            tokens,
        }
    }

    /// bcrypt cost used when hashing new passwords
    pub fn bcrypt_cost(&self) -> u32 {
        self.config.auth.bcrypt_cost
    }
}
