//! Authentication primitives: password hashing and bearer tokens
//!
//! Passwords are stored as `salt$digest` where digest is SHA-256 over the
//! salt bytes followed by the password. Issued tokens are opaque UUIDs held
//! in the `api_tokens` table with an absolute expiry; validation is a
//! lookup plus an expiry check. No identity semantics live here beyond
//! "this token maps to that username".

use chrono::{DateTime, Duration, Utc};
use rand::Rng;
use sha2::{Digest, Sha256};
use sqlx::SqlitePool;
use uuid::Uuid;

/// Authentication error types
#[derive(Debug, Clone)]
pub enum AuthError {
    /// Unknown username or wrong password
    InvalidCredentials,

    /// Token not present in the api_tokens table
    TokenNotFound,

    /// Token present but past its expiry
    TokenExpired,

    /// Username already taken
    UserExists(String),

    /// Database error during lookup or insert
    DatabaseError(String),
}

impl std::fmt::Display for AuthError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AuthError::InvalidCredentials => write!(f, "Invalid username or password"),
            AuthError::TokenNotFound => write!(f, "Unknown token"),
            AuthError::TokenExpired => write!(f, "Token expired"),
            AuthError::UserExists(name) => write!(f, "User already exists: {}", name),
            AuthError::DatabaseError(err) => write!(f, "Database error: {}", err),
        }
    }
}

impl std::error::Error for AuthError {}

// ========================================
// Password Hashing
// ========================================

/// Hash a password with a fresh random salt
///
/// Output format: `<16-byte salt as hex>$<sha256 hex>`
pub fn hash_password(password: &str) -> String {
    let salt: [u8; 16] = rand::thread_rng().gen();
    let salt_hex: String = salt.iter().map(|b| format!("{:02x}", b)).collect();
    format!("{}${}", salt_hex, digest_hex(&salt_hex, password))
}

/// Verify a password against a stored `salt$digest` hash
pub fn verify_password(password: &str, stored: &str) -> bool {
    let Some((salt_hex, digest)) = stored.split_once('$') else {
        return false;
    };
    digest_hex(salt_hex, password) == digest
}

fn digest_hex(salt_hex: &str, password: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(salt_hex.as_bytes());
    hasher.update(password.as_bytes());
    format!("{:x}", hasher.finalize())
}

// ========================================
// Users
// ========================================

/// Insert a new user with a hashed password
pub async fn create_user(
    pool: &SqlitePool,
    username: &str,
    password: &str,
    email: &str,
) -> Result<i64, AuthError> {
    let existing: Option<(i64,)> = sqlx::query_as("SELECT id FROM users WHERE username = ?")
        .bind(username)
        .fetch_optional(pool)
        .await
        .map_err(|e| AuthError::DatabaseError(e.to_string()))?;
    if existing.is_some() {
        return Err(AuthError::UserExists(username.to_string()));
    }

    let result = sqlx::query("INSERT INTO users (username, password_hash, email) VALUES (?, ?, ?)")
        .bind(username)
        .bind(hash_password(password))
        .bind(email)
        .execute(pool)
        .await
        .map_err(|e| AuthError::DatabaseError(e.to_string()))?;

    Ok(result.last_insert_rowid())
}

/// Check a username/password pair against the users table
pub async fn authenticate_user(
    pool: &SqlitePool,
    username: &str,
    password: &str,
) -> Result<(), AuthError> {
    let row: Option<(String,)> =
        sqlx::query_as("SELECT password_hash FROM users WHERE username = ?")
            .bind(username)
            .fetch_optional(pool)
            .await
            .map_err(|e| AuthError::DatabaseError(e.to_string()))?;

    match row {
        Some((stored,)) if verify_password(password, &stored) => Ok(()),
        _ => Err(AuthError::InvalidCredentials),
    }
}

// ========================================
// Bearer Tokens
// ========================================

/// A freshly issued bearer token
#[derive(Debug, Clone)]
pub struct IssuedToken {
    pub token: String,
    pub expires_at: DateTime<Utc>,
}

/// Issue a new bearer token for `username`, valid for `ttl_minutes`
pub async fn issue_token(
    pool: &SqlitePool,
    username: &str,
    ttl_minutes: i64,
) -> Result<IssuedToken, AuthError> {
    let token = Uuid::new_v4().to_string();
    let expires_at = Utc::now() + Duration::minutes(ttl_minutes);

    sqlx::query("INSERT INTO api_tokens (token, username, expires_at) VALUES (?, ?, ?)")
        .bind(&token)
        .bind(username)
        .bind(expires_at.to_rfc3339())
        .execute(pool)
        .await
        .map_err(|e| AuthError::DatabaseError(e.to_string()))?;

    Ok(IssuedToken { token, expires_at })
}

/// Resolve a bearer token to its username, rejecting unknown/expired tokens
pub async fn validate_token(pool: &SqlitePool, token: &str) -> Result<String, AuthError> {
    let row: Option<(String, String)> =
        sqlx::query_as("SELECT username, expires_at FROM api_tokens WHERE token = ?")
            .bind(token)
            .fetch_optional(pool)
            .await
            .map_err(|e| AuthError::DatabaseError(e.to_string()))?;

    let Some((username, expires_at)) = row else {
        return Err(AuthError::TokenNotFound);
    };

    let expires_at = DateTime::parse_from_rfc3339(&expires_at)
        .map_err(|e| AuthError::DatabaseError(format!("Invalid expiry timestamp: {}", e)))?
        .with_timezone(&Utc);

    if expires_at < Utc::now() {
        return Err(AuthError::TokenExpired);
    }

    Ok(username)
}

/// Delete expired tokens; returns the number removed
pub async fn purge_expired_tokens(pool: &SqlitePool) -> Result<u64, AuthError> {
    let result = sqlx::query("DELETE FROM api_tokens WHERE expires_at < ?")
        .bind(Utc::now().to_rfc3339())
        .execute(pool)
        .await
        .map_err(|e| AuthError::DatabaseError(e.to_string()))?;
    Ok(result.rows_affected())
}

// ========================================
// Tests
// ========================================
