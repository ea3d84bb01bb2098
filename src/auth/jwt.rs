//! Bearer credential issuance and validation.

use chrono::{Duration, Utc};
use jsonwebtoken::errors::ErrorKind;
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::domain::role::Role;

/// One day, matching the lifetime clients expect before re-login.
pub const DEFAULT_EXPIRATION_MINUTES: i64 = 24 * 60;

#[derive(Debug, Clone)]
pub struct JwtConfig {
    /// HMAC secret, at least 32 bytes.
    pub secret: String,
    pub expiration_minutes: i64,
}

/// Claims carried by every issued token.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    /// User id.
    pub sub: String,
    /// Role at issuance. Informational only: the gate reloads the user.
    pub role: Role,
    pub exp: i64,
    pub iat: i64,
}

impl Claims {
    pub fn user_id(&self) -> Result<i32, JwtError> {
        self.sub
            .parse()
            .map_err(|_| JwtError::InvalidToken(format!("malformed subject '{}'", self.sub)))
    }
}

#[derive(Error, Debug)]
pub enum JwtError {
    #[error("Invalid token: {0}")]
    InvalidToken(String),

    #[error("Token expired")]
    ExpiredToken,

    #[error("Token generation failed: {0}")]
    GenerationFailed(String),
}

#[derive(Clone)]
pub struct JwtService {
    config: JwtConfig,
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
}

impl std::fmt::Debug for JwtService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("JwtService")
            .field("expiration_minutes", &self.config.expiration_minutes)
            .finish_non_exhaustive()
    }
}

impl JwtService {
    pub fn with_config(config: JwtConfig) -> Self {
        let encoding_key = EncodingKey::from_secret(config.secret.as_bytes());
        let decoding_key = DecodingKey::from_secret(config.secret.as_bytes());

        Self {
            config,
            encoding_key,
            decoding_key,
        }
    }

    pub fn generate_token(&self, user_id: i32, role: Role) -> Result<String, JwtError> {
        let now = Utc::now();
        let expiration = now + Duration::minutes(self.config.expiration_minutes);

        let claims = Claims {
            sub: user_id.to_string(),
            role,
            exp: expiration.timestamp(),
            iat: now.timestamp(),
        };

        self.encode(&claims)
    }

    fn encode(&self, claims: &Claims) -> Result<String, JwtError> {
        encode(&Header::new(Algorithm::HS256), claims, &self.encoding_key)
            .map_err(|e| JwtError::GenerationFailed(e.to_string()))
    }

    pub fn validate_token(&self, token: &str) -> Result<Claims, JwtError> {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.set_required_spec_claims(&["sub", "exp"]);

        let token_data =
            decode::<Claims>(token, &self.decoding_key, &validation).map_err(|e| match e.kind() {
                ErrorKind::ExpiredSignature => JwtError::ExpiredToken,
                _ => JwtError::InvalidToken(e.to_string()),
            })?;

        Ok(token_data.claims)
    }

    /// Strips the `Bearer ` scheme from an `Authorization` header value.
    pub fn extract_from_header(header: &str) -> Option<&str> {
        header
            .strip_prefix("Bearer ")
            .map(str::trim)
            .filter(|token| !token.is_empty())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn service(secret: &str) -> JwtService {
        JwtService::with_config(JwtConfig {
            secret: secret.to_string(),
            expiration_minutes: DEFAULT_EXPIRATION_MINUTES,
        })
    }

    #[test]
    fn issued_token_validates() {
        let jwt = service("an-hmac-secret-that-is-long-enough-for-hs256");
        let token = jwt.generate_token(42, Role::Waiter).unwrap();

        let claims = jwt.validate_token(&token).unwrap();
        assert_eq!(claims.user_id().unwrap(), 42);
        assert_eq!(claims.role, Role::Waiter);
        assert_eq!(claims.exp - claims.iat, DEFAULT_EXPIRATION_MINUTES * 60);
    }

    #[test]
    fn expired_token_is_rejected() {
        let jwt = service("an-hmac-secret-that-is-long-enough-for-hs256");
        let issued = Utc::now() - Duration::days(2);
        let token = jwt
            .encode(&Claims {
                sub: "7".into(),
                role: Role::Customer,
                iat: issued.timestamp(),
                exp: (issued + Duration::days(1)).timestamp(),
            })
            .unwrap();

        assert!(matches!(
            jwt.validate_token(&token),
            Err(JwtError::ExpiredToken)
        ));
    }

    #[test]
    fn token_signed_with_other_secret_is_rejected() {
        let issuer = service("an-hmac-secret-that-is-long-enough-for-hs256");
        let verifier = service("a-completely-different-secret-of-enough-size");
        let token = issuer.generate_token(1, Role::Admin).unwrap();

        assert!(matches!(
            verifier.validate_token(&token),
            Err(JwtError::InvalidToken(_))
        ));
    }

    #[test]
    fn garbage_is_rejected() {
        let jwt = service("an-hmac-secret-that-is-long-enough-for-hs256");
        assert!(matches!(
            jwt.validate_token("not.a.jwt"),
            Err(JwtError::InvalidToken(_))
        ));
    }

    #[test]
    fn malformed_subject_is_invalid() {
        let claims = Claims {
            sub: "abc".into(),
            role: Role::Customer,
            exp: 0,
            iat: 0,
        };
        assert!(claims.user_id().is_err());
    }

    #[test]
    fn bearer_prefix_is_required() {
        assert_eq!(JwtService::extract_from_header("Bearer abc"), Some("abc"));
        assert_eq!(JwtService::extract_from_header("Basic abc"), None);
        assert_eq!(JwtService::extract_from_header("Bearer "), None);
    }
}
