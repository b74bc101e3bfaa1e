use thiserror::Error;
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use std::env;
use std::time::{Duration as StdDuration, SystemTime, UNIX_EPOCH};
use tracing::{debug, error, info};
use chrono::{Duration, Utc};
use uuid::Uuid;

use crate::auth::{Claims, TokenPair};
use crate::auth::token_blacklist;
use crate::entities::user::UserRole;

/// Issuer used when `JWT_ISSUER` is unset
pub const DEFAULT_ISSUER: &str = "water-tracker-api";

const DEFAULT_ACCESS_MINUTES: i64 = 1440;
const DEFAULT_REFRESH_DAYS: i64 = 7;

/// Security errors for authentication and token operations
#[derive(Debug, Error, PartialEq)]
pub enum SecurityError {
    #[error("Token validation error: {0}")]
    TokenValidation(String),

    #[error("Token has expired")]
    TokenExpired,

    #[error("Invalid token format")]
    InvalidToken,

    /// Missing or unusable JWT settings
    #[error("Security configuration error: {0}")]
    ConfigError(String),

    #[error("Token has been revoked")]
    TokenRevoked,

    /// An access token where a refresh token was expected, or the reverse
    #[error("Expected a {expected} token")]
    WrongTokenType { expected: TokenType },

    #[error("Invalid token issuer")]
    InvalidIssuer,
}

/// Token types for authentication
#[derive(Debug, PartialEq, Eq, Clone, Copy, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TokenType {
    /// Short-lived access token
    Access,
    /// Long-lived refresh token
    Refresh,
}

impl std::fmt::Display for TokenType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TokenType::Access => write!(f, "access"),
            TokenType::Refresh => write!(f, "refresh"),
        }
    }
}

fn env_number(name: &str, default: i64) -> i64 {
    parse_positive(env::var(name).ok(), default)
}

fn parse_positive(raw: Option<String>, default: i64) -> i64 {
    raw.and_then(|value| value.trim().parse::<i64>().ok())
        .filter(|value| *value > 0)
        .unwrap_or(default)
}

impl TokenType {
    /// Lifetime of this token type
    pub fn expiration(&self) -> Duration {
        match self {
            TokenType::Access => Duration::minutes(env_number("ACCESS_TOKEN_EXPIRATION_MINUTES", DEFAULT_ACCESS_MINUTES)),
            TokenType::Refresh => Duration::days(env_number("REFRESH_TOKEN_EXPIRATION_DAYS", DEFAULT_REFRESH_DAYS)),
        }
    }
}

fn jwt_secret() -> Result<String, SecurityError> {
    match env::var("JWT_SECRET") {
        Ok(secret) if !secret.is_empty() => Ok(secret),
        _ => {
            error!("JWT_SECRET environment variable not found");
            Err(SecurityError::ConfigError("JWT_SECRET environment variable not found".to_string()))
        }
    }
}

fn issuer() -> String {
    env::var("JWT_ISSUER").unwrap_or_else(|_| DEFAULT_ISSUER.to_string())
}

fn encode_claims(claims: &Claims) -> Result<String, SecurityError> {
    let secret = jwt_secret()?;
    encode(&Header::new(Algorithm::HS256), claims, &EncodingKey::from_secret(secret.as_bytes())).map_err(|e| {
        error!("Failed to encode JWT token: {}", e);
        SecurityError::TokenValidation(e.to_string())
    })
}

/// Generate a signed token for a user
pub fn generate_token(user_id: &str, role: UserRole, token_type: TokenType) -> Result<String, SecurityError> {
    let now = Utc::now();
    let expiration = now + token_type.expiration();

    let claims = Claims {
        sub: user_id.to_string(),
        iss: issuer(),
        iat: now.timestamp(),
        exp: expiration.timestamp(),
        jti: Uuid::new_v4().to_string(),
        role,
        token_type,
    };

    let token = encode_claims(&claims)?;
    info!("Generated {} token for user {}", token_type, user_id);
    debug!("Token expiration: {}", expiration);
    Ok(token)
}

/// Access and refresh token for a user
pub fn generate_token_pair(user_id: &str, role: UserRole) -> Result<TokenPair, SecurityError> {
    Ok(TokenPair {
        access_token: generate_token(user_id, role, TokenType::Access)?,
        refresh_token: generate_token(user_id, role, TokenType::Refresh)?,
        token_type: "Bearer".to_string(),
        expires_in: TokenType::Access.expiration().num_seconds(),
    })
}

/// Validate a token and return its claims
pub fn validate_token(token: &str) -> Result<Claims, SecurityError> {
    let secret = jwt_secret()?;

    let mut validation = Validation::new(Algorithm::HS256);
    validation.validate_exp = true;
    validation.set_issuer(&[issuer()]);

    let token_data = decode::<Claims>(token, &DecodingKey::from_secret(secret.as_bytes()), &validation)
        .map_err(|e| match e.kind() {
            jsonwebtoken::errors::ErrorKind::ExpiredSignature => SecurityError::TokenExpired,
            jsonwebtoken::errors::ErrorKind::InvalidToken => SecurityError::InvalidToken,
            jsonwebtoken::errors::ErrorKind::InvalidIssuer => SecurityError::InvalidIssuer,
            jsonwebtoken::errors::ErrorKind::InvalidSignature => {
                SecurityError::TokenValidation("Invalid signature".to_string())
            }
            _ => SecurityError::TokenValidation(e.to_string()),
        })?;

    let claims = token_data.claims;
    if is_token_revoked(&claims) {
        return Err(SecurityError::TokenRevoked);
    }
    Ok(claims)
}

/// Validate a token and require a given type
pub fn validate_token_of_type(token: &str, expected: TokenType) -> Result<Claims, SecurityError> {
    let claims = validate_token(token)?;
    if claims.token_type != expected {
        return Err(SecurityError::WrongTokenType { expected });
    }
    Ok(claims)
}

fn token_key(jti: &str) -> String {
    format!("jti:{}", jti)
}

fn user_key(user_id: &str) -> String {
    format!("{}{}", token_blacklist::ACCOUNT_KEY_PREFIX, user_id)
}

fn is_token_revoked(claims: &Claims) -> bool {
    let blacklist = token_blacklist::blacklist();
    let revoked = blacklist.is_revoked(&token_key(&claims.jti)) || blacklist.is_revoked(&user_key(&claims.sub));
    debug!("Checking if token {} for user {} is revoked: {}", claims.jti, claims.sub, revoked);
    revoked
}

/// Revoke one token until it would have expired anyway
pub fn revoke_token(claims: &Claims) {
    let expires_at = UNIX_EPOCH + StdDuration::from_secs(claims.exp.max(0) as u64);
    token_blacklist::blacklist().revoke_token(&token_key(&claims.jti), expires_at);
}

/// Revoke every token of a user, e.g. on a ban or erasure
pub fn revoke_user(user_id: &str) {
    let refresh_lifetime = TokenType::Refresh.expiration().num_seconds().max(0) as u64;
    let expires_at = SystemTime::now() + StdDuration::from_secs(refresh_lifetime);
    token_blacklist::blacklist().revoke_token(&user_key(user_id), expires_at);
}

/// Lift a user-wide revocation
pub fn restore_user(user_id: &str) {
    token_blacklist::blacklist().restore(&user_key(user_id));
}
