//! Signed session tokens.
//!
//! Tokens are HS256 JWTs carrying the user id and role. They are stateless:
//! there is no revocation list and no refresh, so an expired token requires
//! a new login. Verification accepts the current key and, during a rotation,
//! the previous one; only the current key signs.

use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::errors::ErrorKind;
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};

use crate::config::Config;
use crate::errors::AppError;
use crate::models::Role;

/// Lifetime of an issued token.
pub const TOKEN_TTL_HOURS: i64 = 12;

#[derive(Debug, Serialize, Deserialize)]
struct Claims {
    user_id: i64,
    role: Role,
    iat: i64,
    exp: i64,
    jti: String,
}

/// Verified identity attached to an authenticated request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Session {
    pub user_id: i64,
    pub role: Role,
}

/// Issues and verifies session tokens.
#[derive(Clone)]
pub struct TokenIssuer {
    encoding: EncodingKey,
    decoding: Vec<DecodingKey>,
    validation: Validation,
}

impl TokenIssuer {
    pub fn new(signing_key: &str, previous_signing_key: Option<&str>) -> Self {
        let mut decoding = vec![DecodingKey::from_secret(signing_key.as_bytes())];
        if let Some(previous) = previous_signing_key {
            decoding.push(DecodingKey::from_secret(previous.as_bytes()));
        }

        // Only HS256 is accepted; expiry is checked against an explicit clock.
        let mut validation = Validation::new(Algorithm::HS256);
        validation.validate_exp = false;
        validation.set_required_spec_claims(&["exp", "iat"]);

        Self {
            encoding: EncodingKey::from_secret(signing_key.as_bytes()),
            decoding,
            validation,
        }
    }

    pub fn from_config(config: &Config) -> Self {
        Self::new(&config.signing_key, config.previous_signing_key.as_deref())
    }

    /// Issue a token valid for [`TOKEN_TTL_HOURS`] from now.
    pub fn issue(&self, user_id: i64, role: Role) -> Result<String, AppError> {
        self.issue_at(user_id, role, Utc::now())
    }

    pub fn issue_at(&self, user_id: i64, role: Role, now: DateTime<Utc>) -> Result<String, AppError> {
        let claims = Claims {
            user_id,
            role,
            iat: now.timestamp(),
            exp: (now + Duration::hours(TOKEN_TTL_HOURS)).timestamp(),
            jti: uuid::Uuid::new_v4().to_string(),
        };

        encode(&Header::new(Algorithm::HS256), &claims, &self.encoding).map_err(|e| {
            tracing::error!("Token signing failed: {}", e);
            AppError::Internal("Token signing failed".to_string())
        })
    }

    /// Verify a token against the current time.
    pub fn verify(&self, token: &str) -> Result<Session, AppError> {
        self.verify_at(token, Utc::now())
    }

    pub fn verify_at(&self, token: &str, now: DateTime<Utc>) -> Result<Session, AppError> {
        for key in &self.decoding {
            match decode::<Claims>(token, key, &self.validation) {
                Ok(data) => {
                    let claims = data.claims;
                    if now.timestamp() >= claims.exp {
                        tracing::debug!(user_id = claims.user_id, "Rejected expired token");
                        return Err(invalid_token("Token has expired"));
                    }
                    return Ok(Session {
                        user_id: claims.user_id,
                        role: claims.role,
                    });
                }
                Err(e) if matches!(e.kind(), ErrorKind::InvalidSignature) => continue,
                Err(e) => {
                    tracing::debug!("Rejected token: {:?}", e.kind());
                    return Err(invalid_token("Invalid token"));
                }
            }
        }

        tracing::debug!("Rejected token: signature matches no configured key");
        Err(invalid_token("Invalid token"))
    }
}

fn invalid_token(message: &str) -> AppError {
    AppError::Authentication(message.to_string())
}
