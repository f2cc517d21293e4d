//! Authorization code domain type.
//!
//! Authorization codes are short-lived, single-use credentials binding
//! an authenticated user, a client, and a scope set. The `used` flag
//! transitions false → true exactly once; after that (or after expiry)
//! the code is permanently unusable.

use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use uuid::Uuid;

/// An authorization code awaiting redemption.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthorizationCode {
    /// The opaque, high-entropy code value. Unique within the orbit.
    pub code: String,

    /// Orbit this code belongs to.
    pub orbit_id: Uuid,

    /// Client the code was issued to.
    pub client_id: String,

    /// User who authorized the request.
    pub user_id: Uuid,

    /// Granted scopes.
    pub scopes: Vec<String>,

    /// Redirect URI the code was bound to at authorization.
    pub redirect_uri: String,

    /// PKCE code challenge, if the client supplied one.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub code_challenge: Option<String>,

    /// PKCE challenge method ("S256").
    #[serde(skip_serializing_if = "Option::is_none")]
    pub code_challenge_method: Option<String>,

    /// Whether the code has been consumed. One-way.
    pub used: bool,

    /// When this code was created.
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,

    /// When this code expires.
    #[serde(with = "time::serde::rfc3339")]
    pub expires_at: OffsetDateTime,
}

impl AuthorizationCode {
    /// Returns `true` if this code has expired.
    #[must_use]
    pub fn is_expired(&self) -> bool {
        OffsetDateTime::now_utc() > self.expires_at
    }

    /// Generate a cryptographically secure random code.
    ///
    /// Returns a 256-bit random value encoded as base64url (43 characters).
    #[must_use]
    pub fn generate_code() -> String {
        use base64::Engine;
        use base64::engine::general_purpose::URL_SAFE_NO_PAD;

        let mut bytes = [0u8; 32];
        rand::Rng::fill(&mut rand::thread_rng(), &mut bytes);
        URL_SAFE_NO_PAD.encode(bytes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::Duration;

    #[test]
    fn test_generate_code_shape() {
        let code = AuthorizationCode::generate_code();
        assert_eq!(code.len(), 43);
        assert!(
            code.chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
        );
    }

    #[test]
    fn test_generate_code_uniqueness() {
        let codes: Vec<String> = (0..100)
            .map(|_| AuthorizationCode::generate_code())
            .collect();
        let mut unique = codes.clone();
        unique.sort();
        unique.dedup();
        assert_eq!(codes.len(), unique.len());
    }

    #[test]
    fn test_is_expired() {
        let now = OffsetDateTime::now_utc();
        let mut code = AuthorizationCode {
            code: AuthorizationCode::generate_code(),
            orbit_id: Uuid::new_v4(),
            client_id: "app".to_string(),
            user_id: Uuid::new_v4(),
            scopes: vec!["openid".to_string()],
            redirect_uri: "https://app.example.com/cb".to_string(),
            code_challenge: None,
            code_challenge_method: None,
            used: false,
            created_at: now,
            expires_at: now + Duration::minutes(10),
        };
        assert!(!code.is_expired());

        code.expires_at = now - Duration::seconds(1);
        assert!(code.is_expired());
    }
}
