//! Passwords and login tokens
//!
//! Passwords are stored as Argon2id PHC strings. A successful login or signup
//! yields an HS256 JWT naming the user, which the client sends back either as
//! the `loginToken` cookie or as a Bearer token.

use argon2::password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString};
use argon2::Argon2;
use chrono::Utc;
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::config::AuthConfig;
use crate::error::{AppError, AppResult};
use crate::id::DocId;
use crate::model::{MiniUser, User};

/// Cookie carrying the login token
pub const LOGIN_COOKIE: &str = "loginToken";

/// The user a request acts on behalf of
///
/// Resolved once per request by [`crate::middleware::auth_middleware`] and
/// handed explicitly to every service call that needs it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActingUser {
    pub id: DocId,
    pub fullname: String,
    pub is_admin: bool,
}

impl ActingUser {
    pub fn summary(&self) -> MiniUser {
        MiniUser {
            id: self.id.clone(),
            fullname: self.fullname.clone(),
        }
    }
}

impl From<&User> for ActingUser {
    fn from(user: &User) -> Self {
        ActingUser {
            id: user.id.clone(),
            fullname: user.fullname.clone(),
            is_admin: user.is_admin,
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
struct Claims {
    sub: DocId,
    fullname: String,
    #[serde(default)]
    is_admin: bool,
    iat: i64,
    exp: i64,
}

/// Hashes a password into an Argon2id PHC string with a fresh 16-byte salt
///
/// The salt comes from the thread-local CSPRNG of `rand`.
pub fn hash_password(password: &str) -> AppResult<String> {
    let mut salt_bytes = [0u8; 16];
    rand::rng().fill(&mut salt_bytes);
    let salt = SaltString::encode_b64(&salt_bytes)
        .map_err(|err| AppError::Internal(format!("salt encoding failed: {err}")))?;

    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|err| AppError::Internal(format!("password hashing failed: {err}")))
}

/// Checks `password` against a stored hash; a malformed hash never matches
pub fn verify_password(password: &str, hash: &str) -> bool {
    match PasswordHash::new(hash) {
        Ok(parsed) => Argon2::default()
            .verify_password(password.as_bytes(), &parsed)
            .is_ok(),
        Err(err) => {
            tracing::warn!(error = %err, "stored password hash is malformed");
            false
        }
    }
}

pub fn issue_token(user: &User, config: &AuthConfig) -> AppResult<String> {
    let now = Utc::now().timestamp();
    let claims = Claims {
        sub: user.id.clone(),
        fullname: user.fullname.clone(),
        is_admin: user.is_admin,
        iat: now,
        exp: now + config.token_ttl_hours * 3600,
    };

    encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(config.jwt_secret.as_bytes()),
    )
    .map_err(|err| AppError::Internal(format!("token signing failed: {err}")))
}

/// Decodes a login token; expired, tampered or garbage tokens yield `None`
pub fn validate_token(token: &str, config: &AuthConfig) -> Option<ActingUser> {
    let data = decode::<Claims>(
        token,
        &DecodingKey::from_secret(config.jwt_secret.as_bytes()),
        &Validation::default(),
    )
    .map_err(|err| tracing::debug!(error = %err, "rejected login token"))
    .ok()?;

    Some(ActingUser {
        id: data.claims.sub,
        fullname: data.claims.fullname,
        is_admin: data.claims.is_admin,
    })
}
