//! Revocation ledger and introspection cache types.
//!
//! The ledger is append-only: a JTI once recorded stays revoked until
//! its record is garbage-collected after the underlying token's expiry,
//! at which point the token is expired anyway.

use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use uuid::Uuid;

/// Kind of token a ledger record refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TokenType {
    /// Access token.
    Access,
    /// Refresh token.
    Refresh,
}

impl TokenType {
    /// Returns the token type as a string for logging.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Access => "access",
            Self::Refresh => "refresh",
        }
    }
}

impl std::fmt::Display for TokenType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// One record in the append-only revocation ledger.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RevokedToken {
    /// JTI of the revoked token. At most one record per (orbit, jti).
    pub jti: String,

    /// Orbit the token belonged to.
    pub orbit_id: Uuid,

    /// Kind of token.
    pub token_type: TokenType,

    /// Why the token was revoked ("logout", "reuse_detected",
    /// "session_revoked", "consent_revoked", "admin", ...).
    pub reason: String,

    /// When the revocation was recorded.
    #[serde(with = "time::serde::rfc3339")]
    pub revoked_at: OffsetDateTime,

    /// Natural expiry of the revoked token. The record may be
    /// garbage-collected after this instant.
    #[serde(with = "time::serde::rfc3339")]
    pub expires_at: OffsetDateTime,
}

impl RevokedToken {
    /// Returns `true` if the underlying token has expired and the
    /// record is eligible for cleanup.
    #[must_use]
    pub fn is_expired(&self) -> bool {
        OffsetDateTime::now_utc() > self.expires_at
    }
}

/// A cached introspection response.
///
/// Cache lifetime is capped at the token's own expiry so a cached
/// `active: true` can never outlive the token it describes.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IntrospectionEntry {
    /// JTI the response describes.
    pub jti: String,

    /// Orbit the token belongs to.
    pub orbit_id: Uuid,

    /// Whether the token was active when introspected.
    pub active: bool,

    /// The full RFC 7662 response body.
    pub response: serde_json::Value,

    /// When this cache entry was created.
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,

    /// When this cache entry expires.
    #[serde(with = "time::serde::rfc3339")]
    pub expires_at: OffsetDateTime,
}

impl IntrospectionEntry {
    /// Returns `true` if this cache entry has expired.
    #[must_use]
    pub fn is_expired(&self) -> bool {
        OffsetDateTime::now_utc() > self.expires_at
    }
}
