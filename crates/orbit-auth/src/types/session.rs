//! User session record.
//!
//! Sessions use a sliding-window TTL: each touch pushes `expires_at`
//! forward by the configured TTL, but never past the hard cap set at
//! creation time.

use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use uuid::Uuid;

/// An authenticated user session within an orbit.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Session {
    /// Unique identifier for this session.
    pub id: Uuid,

    /// Orbit this session belongs to.
    pub orbit_id: Uuid,

    /// Authenticated user.
    pub user_id: Uuid,

    /// Client that established the session, if known.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub client_id: Option<String>,

    /// Human-readable device description, if reported.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub device_name: Option<String>,

    /// Client IP at session start, if known.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ip_address: Option<String>,

    /// When this session was established.
    #[serde(with = "time::serde::rfc3339")]
    pub started_at: OffsetDateTime,

    /// Last activity instant. Updated on every touch.
    #[serde(with = "time::serde::rfc3339")]
    pub last_active_at: OffsetDateTime,

    /// Current expiry. Slides forward on touch, bounded by `max_expires_at`.
    #[serde(with = "time::serde::rfc3339")]
    pub expires_at: OffsetDateTime,

    /// Hard cap past which no touch can extend the session.
    #[serde(with = "time::serde::rfc3339")]
    pub max_expires_at: OffsetDateTime,

    /// When this session was revoked (None = live). One-way.
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        with = "time::serde::rfc3339::option"
    )]
    pub revoked_at: Option<OffsetDateTime>,
}

impl Session {
    /// Returns `true` if this session has expired.
    #[must_use]
    pub fn is_expired(&self) -> bool {
        OffsetDateTime::now_utc() > self.expires_at
    }

    /// Returns `true` if this session has been revoked.
    #[must_use]
    pub fn is_revoked(&self) -> bool {
        self.revoked_at.is_some()
    }

    /// Returns `true` if this session is active (not expired, not revoked).
    #[must_use]
    pub fn is_active(&self) -> bool {
        !self.is_expired() && !self.is_revoked()
    }
}
