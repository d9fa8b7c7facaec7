//! Session token validation
//!
//! The identity provider signs session tokens with HS256 using a secret
//! shared with this service. The board only verifies them; `issue` exists for
//! dev tooling and tests.

use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use std::time::{SystemTime, UNIX_EPOCH};

use crate::config::MIN_JWT_SECRET_LEN;
use crate::identity::Session;
use crate::types::BoardError;

/// Payload stored in a session token
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    /// Identity provider uid
    pub sub: String,
    pub email: String,
    /// Issued at (Unix timestamp)
    pub iat: u64,
    /// Expiration time (Unix timestamp)
    pub exp: u64,
}

/// Verifies (and for dev tooling, issues) session tokens
#[derive(Clone)]
pub struct SessionValidator {
    secret: String,
    expiry_seconds: u64,
}

impl SessionValidator {
    /// Returns an error if the secret is too short
    pub fn new(secret: String, expiry_seconds: u64) -> Result<Self, BoardError> {
        if secret.len() < MIN_JWT_SECRET_LEN {
            return Err(BoardError::Config(format!(
                "JWT_SECRET must be at least {} characters",
                MIN_JWT_SECRET_LEN
            )));
        }

        Ok(Self {
            secret,
            expiry_seconds,
        })
    }

    /// Sign a token for the given session
    pub fn issue(&self, session: &Session) -> Result<String, BoardError> {
        let now = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map_err(|e| BoardError::Auth(format!("System time error: {}", e)))?
            .as_secs();

        let claims = Claims {
            sub: session.uid.clone(),
            email: session.email.clone(),
            iat: now,
            exp: now + self.expiry_seconds,
        };

        encode(
            &Header::default(),
            &claims,
            &EncodingKey::from_secret(self.secret.as_bytes()),
        )
        .map_err(|e| BoardError::Auth(format!("Failed to generate token: {}", e)))
    }

    /// Verify a token and return the session it carries
    pub fn verify(&self, token: &str) -> Result<Session, BoardError> {
        let data = decode::<Claims>(
            token,
            &DecodingKey::from_secret(self.secret.as_bytes()),
            &Validation::default(),
        )
        .map_err(|err| {
            use jsonwebtoken::errors::ErrorKind;
            let message = match err.kind() {
                ErrorKind::ExpiredSignature => "Token expired",
                ErrorKind::InvalidToken => "Invalid token",
                ErrorKind::InvalidSignature => "Invalid signature",
                _ => "Token validation failed",
            };
            BoardError::Unauthorized(message.to_string())
        })?;

        Ok(Session {
            uid: data.claims.sub,
            email: data.claims.email,
        })
    }
}

/// Extract token from Authorization header.
/// Supports "Bearer <token>" format and raw tokens.
pub fn extract_token_from_header(auth_header: Option<&str>) -> Option<&str> {
    let header = auth_header?;

    if let Some(token) = header.strip_prefix("Bearer ") {
        let token = token.trim();
        if !token.is_empty() {
            return Some(token);
        }
    }

    if !header.contains(' ') {
        let token = header.trim();
        if !token.is_empty() {
            return Some(token);
        }
    }

    None
}

#[cfg(test)]
mod tests {
    use super::*;

    const SECRET: &str = "test-secret-that-is-at-least-32-chars-long";

    fn session() -> Session {
        Session {
            uid: "uid-1".into(),
            email: "a@x.com".into(),
        }
    }

    #[test]
    fn test_issue_and_verify() {
        let validator = SessionValidator::new(SECRET.into(), 3600).unwrap();
        let token = validator.issue(&session()).unwrap();
        assert_eq!(validator.verify(&token).unwrap(), session());
    }

    #[test]
    fn test_wrong_secret_rejected() {
        let issuer = SessionValidator::new(SECRET.into(), 3600).unwrap();
        let other =
            SessionValidator::new("another-secret-that-is-also-32-chars-long".into(), 3600)
                .unwrap();
        let token = issuer.issue(&session()).unwrap();
        assert!(matches!(
            other.verify(&token),
            Err(BoardError::Unauthorized(_))
        ));
    }

    #[test]
    fn test_short_secret_rejected() {
        assert!(SessionValidator::new("short".into(), 3600).is_err());
    }

    #[test]
    fn test_extract_token() {
        assert_eq!(extract_token_from_header(Some("Bearer abc")), Some("abc"));
        assert_eq!(extract_token_from_header(Some("abc")), Some("abc"));
        assert_eq!(extract_token_from_header(Some("Bearer ")), None);
        assert_eq!(extract_token_from_header(Some("Basic a b")), None);
        assert_eq!(extract_token_from_header(None), None);
    }
}
