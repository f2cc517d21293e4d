//! Access token record.
//!
//! Access tokens are short-lived and never rotated; they are simply
//! re-issued via refresh. The record here is the server-side view keyed
//! by JTI; encoding the token as a JWT is the embedding layer's job.

use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use uuid::Uuid;

/// Server-side record of an issued access token.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AccessToken {
    /// Unique token identifier (the JWT `jti` claim). Unique per orbit.
    pub jti: String,

    /// Orbit this token belongs to.
    pub orbit_id: Uuid,

    /// Client the token was issued to.
    pub client_id: String,

    /// User on whose behalf the token acts (None for client credentials).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_id: Option<Uuid>,

    /// Granted scopes.
    pub scopes: Vec<String>,

    /// Refresh token record that produced this access token, if any.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub refresh_token_id: Option<Uuid>,

    /// When this token was issued.
    #[serde(with = "time::serde::rfc3339")]
    pub issued_at: OffsetDateTime,

    /// When this token expires.
    #[serde(with = "time::serde::rfc3339")]
    pub expires_at: OffsetDateTime,

    /// When this token was revoked (None = not revoked). One-way.
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        with = "time::serde::rfc3339::option"
    )]
    pub revoked_at: Option<OffsetDateTime>,
}

impl AccessToken {
    /// Returns `true` if this token has expired.
    #[must_use]
    pub fn is_expired(&self) -> bool {
        OffsetDateTime::now_utc() > self.expires_at
    }

    /// Returns `true` if this token has been revoked.
    #[must_use]
    pub fn is_revoked(&self) -> bool {
        self.revoked_at.is_some()
    }

    /// Returns `true` if this token is valid (not expired, not revoked).
    ///
    /// Note: the revocation ledger is authoritative; callers must also
    /// consult it. See `TokenService::is_active`.
    #[must_use]
    pub fn is_valid(&self) -> bool {
        !self.is_expired() && !self.is_revoked()
    }
}
