//! User consent record.
//!
//! Consent binds (user, client) to a scope set. Granting again widens
//! or replaces the scope set; revoking cascades to the refresh chains
//! that were issued under it.

use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use uuid::Uuid;

/// A user's consent for a client to act with a set of scopes.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Consent {
    /// Unique identifier for this record.
    pub id: Uuid,

    /// Orbit this consent belongs to.
    pub orbit_id: Uuid,

    /// User who granted the consent.
    pub user_id: Uuid,

    /// Client the consent was granted to.
    pub client_id: String,

    /// Scopes the user agreed to.
    pub scopes: Vec<String>,

    /// When the consent was granted (or last re-granted).
    #[serde(with = "time::serde::rfc3339")]
    pub granted_at: OffsetDateTime,

    /// Optional expiry; None means the consent stands until revoked.
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        with = "time::serde::rfc3339::option"
    )]
    pub expires_at: Option<OffsetDateTime>,

    /// When the consent was revoked (None = standing). One-way.
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        with = "time::serde::rfc3339::option"
    )]
    pub revoked_at: Option<OffsetDateTime>,
}

impl Consent {
    /// Returns `true` if this consent has expired.
    #[must_use]
    pub fn is_expired(&self) -> bool {
        match self.expires_at {
            Some(at) => OffsetDateTime::now_utc() > at,
            None => false,
        }
    }

    /// Returns `true` if this consent is standing (not expired, not
    /// revoked).
    #[must_use]
    pub fn is_active(&self) -> bool {
        !self.is_expired() && self.revoked_at.is_none()
    }

    /// Returns `true` if this consent covers every requested scope.
    #[must_use]
    pub fn covers(&self, requested: &[String]) -> bool {
        requested.iter().all(|s| self.scopes.contains(s))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::Duration;

    fn consent(scopes: &[&str]) -> Consent {
        Consent {
            id: Uuid::new_v4(),
            orbit_id: Uuid::new_v4(),
            user_id: Uuid::new_v4(),
            client_id: "app".to_string(),
            scopes: scopes.iter().map(|s| s.to_string()).collect(),
            granted_at: OffsetDateTime::now_utc(),
            expires_at: None,
            revoked_at: None,
        }
    }

    #[test]
    fn test_covers_subset() {
        let c = consent(&["openid", "profile", "email"]);
        assert!(c.covers(&["openid".to_string()]));
        assert!(c.covers(&["openid".to_string(), "email".to_string()]));
        assert!(!c.covers(&["openid".to_string(), "admin".to_string()]));
        assert!(c.covers(&[]));
    }

    #[test]
    fn test_unexpiring_consent_is_active() {
        assert!(consent(&["openid"]).is_active());
    }

    #[test]
    fn test_expired_consent_is_inactive() {
        let mut c = consent(&["openid"]);
        c.expires_at = Some(OffsetDateTime::now_utc() - Duration::seconds(1));
        assert!(!c.is_active());
    }

    #[test]
    fn test_revoked_consent_is_inactive() {
        let mut c = consent(&["openid"]);
        c.revoked_at = Some(OffsetDateTime::now_utc());
        assert!(!c.is_active());
    }
}
