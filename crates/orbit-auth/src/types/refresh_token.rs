//! Refresh token domain type.
//!
//! Refresh tokens are stored only as a one-way hash and form rotation
//! chains: each rotation revokes the predecessor and links it to its
//! successor via `rotated_to`. A presented token whose record is
//! revoked AND already rotated is evidence of token theft and triggers
//! cascade revocation of the remaining live chain.

use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use uuid::Uuid;

/// A refresh token record (one link in a rotation chain).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RefreshToken {
    /// Unique identifier for this record.
    pub id: Uuid,

    /// Token identifier carried into issued access tokens and the
    /// revocation ledger.
    pub jti: String,

    /// SHA-256 hash of the token value. The plaintext token is returned
    /// to the client once and never stored.
    pub token_hash: String,

    /// Orbit this token belongs to.
    pub orbit_id: Uuid,

    /// Client the token was issued to.
    pub client_id: String,

    /// User on whose behalf the token acts (None for client credentials).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_id: Option<Uuid>,

    /// Session this token is bound to, if any. Revoking the session
    /// revokes every chain bound to it.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub session_id: Option<Uuid>,

    /// Granted scopes. Successors may only carry a subset.
    pub scopes: Vec<String>,

    /// Predecessor in the rotation chain, if this token was produced by
    /// a rotation.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rotated_from: Option<Uuid>,

    /// Successor in the rotation chain, set exactly once when this
    /// token is rotated.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rotated_to: Option<Uuid>,

    /// Number of times this token has been presented.
    pub use_count: u32,

    /// When this token was last presented.
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        with = "time::serde::rfc3339::option"
    )]
    pub last_used_at: Option<OffsetDateTime>,

    /// When this token was created.
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,

    /// When this token expires.
    #[serde(with = "time::serde::rfc3339")]
    pub expires_at: OffsetDateTime,

    /// When this token was revoked (None = live). One-way.
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        with = "time::serde::rfc3339::option"
    )]
    pub revoked_at: Option<OffsetDateTime>,
}

impl RefreshToken {
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

    /// Returns `true` if this token is live: not expired, not revoked,
    /// not yet rotated.
    #[must_use]
    pub fn is_live(&self) -> bool {
        !self.is_expired() && !self.is_revoked() && self.rotated_to.is_none()
    }

    /// Returns `true` if presenting this token constitutes reuse: it
    /// was rotated away and its successor already exists.
    #[must_use]
    pub fn is_reuse(&self) -> bool {
        self.is_revoked() && self.rotated_to.is_some()
    }

    /// Generate a cryptographically secure random token value.
    ///
    /// Returns a 256-bit random value encoded as base64url (43 characters).
    #[must_use]
    pub fn generate_token() -> String {
        use base64::Engine;
        use base64::engine::general_purpose::URL_SAFE_NO_PAD;

        let mut bytes = [0u8; 32];
        rand::Rng::fill(&mut rand::thread_rng(), &mut bytes);
        URL_SAFE_NO_PAD.encode(bytes)
    }

    /// Hash a token value using SHA-256.
    #[must_use]
    pub fn hash_token(token: &str) -> String {
        use sha2::{Digest, Sha256};
        let mut hasher = Sha256::new();
        hasher.update(token.as_bytes());
        hex::encode(hasher.finalize())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::Duration;

    fn token() -> RefreshToken {
        let now = OffsetDateTime::now_utc();
        RefreshToken {
            id: Uuid::new_v4(),
            jti: Uuid::new_v4().to_string(),
            token_hash: RefreshToken::hash_token(&RefreshToken::generate_token()),
            orbit_id: Uuid::new_v4(),
            client_id: "app".to_string(),
            user_id: Some(Uuid::new_v4()),
            session_id: None,
            scopes: vec!["openid".to_string()],
            rotated_from: None,
            rotated_to: None,
            use_count: 0,
            last_used_at: None,
            created_at: now,
            expires_at: now + Duration::days(90),
            revoked_at: None,
        }
    }

    #[test]
    fn test_fresh_token_is_live() {
        let t = token();
        assert!(t.is_live());
        assert!(!t.is_reuse());
    }

    #[test]
    fn test_rotated_token_is_reuse() {
        let mut t = token();
        t.revoked_at = Some(OffsetDateTime::now_utc());
        t.rotated_to = Some(Uuid::new_v4());
        assert!(!t.is_live());
        assert!(t.is_reuse());
    }

    #[test]
    fn test_plain_revocation_is_not_reuse() {
        let mut t = token();
        t.revoked_at = Some(OffsetDateTime::now_utc());
        assert!(!t.is_live());
        assert!(!t.is_reuse());
    }

    #[test]
    fn test_hash_token_is_stable() {
        let raw = RefreshToken::generate_token();
        assert_eq!(RefreshToken::hash_token(&raw), RefreshToken::hash_token(&raw));
        assert_eq!(RefreshToken::hash_token(&raw).len(), 64);
    }
}
