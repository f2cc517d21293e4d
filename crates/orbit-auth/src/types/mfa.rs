//! Second-factor credential types: TOTP secrets and recovery codes.
//!
//! The TOTP secret tracks the last accepted time step so a given code
//! can never be accepted twice. Recovery codes are stored hashed and
//! burn on first use.

use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use uuid::Uuid;

/// A user's enrolled TOTP secret.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TotpSecret {
    /// Unique identifier for this record.
    pub id: Uuid,

    /// Orbit this enrollment belongs to.
    pub orbit_id: Uuid,

    /// Enrolled user. At most one confirmed secret per user.
    pub user_id: Uuid,

    /// Encrypted shared secret. Opaque to this crate; the embedding
    /// layer owns the cipher and the TOTP computation.
    pub secret_cipher: String,

    /// Whether enrollment was confirmed with a valid first code.
    pub confirmed: bool,

    /// Highest time step at which a code has been accepted. Strictly
    /// monotonic: a code at or below this step is rejected.
    pub last_step: i64,

    /// When this enrollment was created.
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,

    /// When this record was last updated.
    #[serde(with = "time::serde::rfc3339")]
    pub updated_at: OffsetDateTime,
}

/// A one-time recovery code.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecoveryCode {
    /// Unique identifier for this record.
    pub id: Uuid,

    /// Orbit this code belongs to.
    pub orbit_id: Uuid,

    /// User the code was issued to.
    pub user_id: Uuid,

    /// SHA-256 hash of the code. The plaintext is shown to the user
    /// once at generation and never stored.
    pub code_hash: String,

    /// When the code was consumed (None = still usable). One-way.
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        with = "time::serde::rfc3339::option"
    )]
    pub used_at: Option<OffsetDateTime>,

    /// When the code was generated.
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
}

impl RecoveryCode {
    /// Returns `true` if this code is still usable.
    #[must_use]
    pub fn is_usable(&self) -> bool {
        self.used_at.is_none()
    }

    /// Generate a recovery code of `bytes` random bytes, rendered as
    /// lowercase hex grouped in blocks of four for readability.
    #[must_use]
    pub fn generate_code(bytes: usize) -> String {
        let mut buf = vec![0u8; bytes];
        rand::Rng::fill(&mut rand::thread_rng(), buf.as_mut_slice());
        let raw = hex::encode(buf);
        raw.as_bytes()
            .chunks(4)
            .map(|c| std::str::from_utf8(c).unwrap_or_default())
            .collect::<Vec<_>>()
            .join("-")
    }

    /// Hash a recovery code using SHA-256.
    ///
    /// The separator dashes are stripped first so users may enter the
    /// code with or without them.
    #[must_use]
    pub fn hash_code(code: &str) -> String {
        use sha2::{Digest, Sha256};
        let normalized: String = code.chars().filter(|c| *c != '-').collect();
        let mut hasher = Sha256::new();
        hasher.update(normalized.as_bytes());
        hex::encode(hasher.finalize())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generate_code_shape() {
        let code = RecoveryCode::generate_code(10);
        // 20 hex chars in 5 groups of 4.
        assert_eq!(code.len(), 24);
        assert_eq!(code.matches('-').count(), 4);
    }

    #[test]
    fn test_hash_ignores_separators() {
        let code = RecoveryCode::generate_code(10);
        let bare: String = code.chars().filter(|c| *c != '-').collect();
        assert_eq!(RecoveryCode::hash_code(&code), RecoveryCode::hash_code(&bare));
    }

    #[test]
    fn test_unused_code_is_usable() {
        let code = RecoveryCode {
            id: Uuid::new_v4(),
            orbit_id: Uuid::new_v4(),
            user_id: Uuid::new_v4(),
            code_hash: RecoveryCode::hash_code("abcd-ef01"),
            used_at: None,
            created_at: OffsetDateTime::now_utc(),
        };
        assert!(code.is_usable());
    }
}
