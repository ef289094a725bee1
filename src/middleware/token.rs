//! API tokens
//!
//! HS256 JWTs handed out at login for clients that cannot keep a session
//! cookie. The token only names the user; the account is re-read on every
//! request so deactivation takes effect immediately.

use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};

use crate::config::AuthConfig;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    /// User id
    pub sub: i32,
    pub username: String,
    pub iat: i64,
    pub exp: i64,
}

#[derive(Clone)]
pub struct TokenSigner {
    encoding: EncodingKey,
    decoding: DecodingKey,
    ttl_secs: i64,
}

impl TokenSigner {
    pub fn new(config: &AuthConfig) -> Self {
        Self {
            encoding: EncodingKey::from_secret(config.jwt_secret.as_bytes()),
            decoding: DecodingKey::from_secret(config.jwt_secret.as_bytes()),
            ttl_secs: config.token_ttl_secs as i64,
        }
    }

    /// Sign a token for the given user
    pub fn sign(&self, user_id: i32, username: &str) -> Result<String, jsonwebtoken::errors::Error> {
        let now = chrono::Utc::now().timestamp();
        let claims = Claims {
            sub: user_id,
            username: username.to_string(),
            iat: now,
            exp: now + self.ttl_secs,
        };
        encode(&Header::new(Algorithm::HS256), &claims, &self.encoding)
    }

    /// Verify signature and expiry, returning the claims
    pub fn verify(&self, token: &str) -> Result<Claims, jsonwebtoken::errors::Error> {
        let validation = Validation::new(Algorithm::HS256);
        decode::<Claims>(token, &self.decoding, &validation).map(|data| data.claims)
    }
}

/// Extract the token from an `Authorization: Bearer ...` header value
pub fn bearer_token(header: &str) -> Option<&str> {
    header
        .strip_prefix("Bearer ")
        .map(str::trim)
        .filter(|t| !t.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn signer(secret: &str, ttl: u64) -> TokenSigner {
        TokenSigner::new(&AuthConfig {
            jwt_secret: secret.to_string(),
            token_ttl_secs: ttl,
            ..Default::default()
        })
    }

    #[test]
    fn test_sign_and_verify() {
        let signer = signer("segredo", 60);
        let token = signer.sign(7, "maria").unwrap();
        let claims = signer.verify(&token).unwrap();
        assert_eq!(claims.sub, 7);
        assert_eq!(claims.username, "maria");
        assert_eq!(claims.exp - claims.iat, 60);
    }

    #[test]
    fn test_wrong_secret_rejected() {
        let token = signer("a", 60).sign(1, "admin").unwrap();
        assert!(signer("b", 60).verify(&token).is_err());
    }

    #[test]
    fn test_expired_token_rejected() {
        let signer = signer("segredo", 60);
        let now = chrono::Utc::now().timestamp();
        let claims = Claims {
            sub: 1,
            username: "admin".to_string(),
            iat: now - 7200,
            exp: now - 3600,
        };
        let token = encode(&Header::new(Algorithm::HS256), &claims, &signer.encoding).unwrap();
        assert!(signer.verify(&token).is_err());
    }

    #[test]
    fn test_bearer_token() {
        assert_eq!(bearer_token("Bearer abc.def"), Some("abc.def"));
        assert_eq!(bearer_token("Bearer "), None);
        assert_eq!(bearer_token("Basic abc"), None);
    }
}
