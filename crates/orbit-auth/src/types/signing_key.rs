//! Token signing key record.
//!
//! Keys have a validity window (`not_before` .. `expires_at`). Rotation
//! introduces a successor whose window begins where the predecessor's
//! grace period ends; at any instant exactly one key per (orbit, use)
//! is effective for signing, while recently-expired keys stay published
//! for verification.

use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use uuid::Uuid;

/// A signing key registered for an orbit.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SigningKey {
    /// Unique identifier for this record.
    pub id: Uuid,

    /// Orbit this key belongs to.
    pub orbit_id: Uuid,

    /// Key ID published in JWKS and carried in token headers. Unique
    /// within the orbit.
    pub kid: String,

    /// Signature algorithm ("ES256", "RS256", ...).
    pub alg: String,

    /// Public half as a JWK object, ready for JWKS publication.
    pub public_jwk: serde_json::Value,

    /// Encrypted private key material. Opaque to this crate; the
    /// embedding layer owns the cipher.
    pub private_key_cipher: String,

    /// Whether this key participates in signing at all. Retired keys
    /// stay inactive but published for verification.
    pub active: bool,

    /// Instant from which this key may sign.
    #[serde(with = "time::serde::rfc3339")]
    pub not_before: OffsetDateTime,

    /// Instant after which this key may no longer sign.
    #[serde(with = "time::serde::rfc3339")]
    pub expires_at: OffsetDateTime,

    /// When this record was created.
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
}

impl SigningKey {
    /// Returns `true` if this key may sign at the given instant.
    #[must_use]
    pub fn is_effective_at(&self, at: OffsetDateTime) -> bool {
        self.active && self.not_before <= at && at < self.expires_at
    }

    /// Returns `true` if this key's validity window overlaps the given
    /// window. Windows are half-open: `[not_before, expires_at)`.
    #[must_use]
    pub fn overlaps(&self, not_before: OffsetDateTime, expires_at: OffsetDateTime) -> bool {
        self.not_before < expires_at && not_before < self.expires_at
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::Duration;

    fn key(not_before: OffsetDateTime, expires_at: OffsetDateTime) -> SigningKey {
        SigningKey {
            id: Uuid::new_v4(),
            orbit_id: Uuid::new_v4(),
            kid: Uuid::new_v4().to_string(),
            alg: "ES256".to_string(),
            public_jwk: serde_json::json!({"kty": "EC", "crv": "P-256"}),
            private_key_cipher: "opaque".to_string(),
            active: true,
            not_before,
            expires_at,
            created_at: OffsetDateTime::now_utc(),
        }
    }

    #[test]
    fn test_effective_window_is_half_open() {
        let now = OffsetDateTime::now_utc();
        let k = key(now - Duration::hours(1), now + Duration::hours(1));
        assert!(k.is_effective_at(now));
        assert!(k.is_effective_at(k.not_before));
        assert!(!k.is_effective_at(k.expires_at));
    }

    #[test]
    fn test_inactive_key_never_effective() {
        let now = OffsetDateTime::now_utc();
        let mut k = key(now - Duration::hours(1), now + Duration::hours(1));
        k.active = false;
        assert!(!k.is_effective_at(now));
    }

    #[test]
    fn test_adjacent_windows_do_not_overlap() {
        let now = OffsetDateTime::now_utc();
        let k = key(now, now + Duration::hours(1));
        assert!(!k.overlaps(now + Duration::hours(1), now + Duration::hours(2)));
        assert!(k.overlaps(now + Duration::minutes(30), now + Duration::hours(2)));
        assert!(!k.overlaps(now - Duration::hours(2), now));
    }
}
