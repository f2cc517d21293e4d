//! Device authorization grant domain types.
//!
//! The device code itself is stored only as a one-way hash; the short
//! user code is stored in cleartext because the end user types it in.
//! Status follows a strict one-directional state machine:
//!
//! ```text
//! pending ──► approved ──► consumed
//!    │
//!    ├──► denied
//!    └──► expired   (time-triggered, checked lazily on read)
//! ```

use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use uuid::Uuid;

/// Status of a device authorization request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeviceCodeStatus {
    /// Awaiting the end user's decision.
    Pending,
    /// Approved by the end user; grant not yet collected.
    Approved,
    /// The approved grant has been collected by the device. Terminal.
    Consumed,
    /// Denied by the end user. Terminal.
    Denied,
    /// Expired before a decision or collection. Terminal.
    Expired,
}

impl DeviceCodeStatus {
    /// Returns `true` if no further transition is permitted.
    #[must_use]
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Consumed | Self::Denied | Self::Expired)
    }

    /// Returns `true` if the transition `self` → `next` is legal.
    #[must_use]
    pub fn can_transition_to(&self, next: Self) -> bool {
        matches!(
            (self, next),
            (Self::Pending, Self::Approved)
                | (Self::Pending, Self::Denied)
                | (Self::Pending, Self::Expired)
                | (Self::Approved, Self::Consumed)
                | (Self::Approved, Self::Expired)
        )
    }

    /// Returns the status as a string for logging.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Approved => "approved",
            Self::Consumed => "consumed",
            Self::Denied => "denied",
            Self::Expired => "expired",
        }
    }
}

impl std::fmt::Display for DeviceCodeStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A device authorization request.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeviceCode {
    /// Unique identifier for this record.
    pub id: Uuid,

    /// Orbit this request belongs to.
    pub orbit_id: Uuid,

    /// Client that initiated the request.
    pub client_id: String,

    /// SHA-256 hash of the device code. The plaintext code is returned
    /// to the device once and never stored.
    pub device_code_hash: String,

    /// Short, human-enterable code shown to the end user. Unique among
    /// currently-pending codes within the orbit.
    pub user_code: String,

    /// Requested scopes.
    pub scopes: Vec<String>,

    /// Minimum seconds between polls from the device.
    pub poll_interval_secs: u64,

    /// Current state-machine status.
    pub status: DeviceCodeStatus,

    /// User who approved the request, once approved.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_id: Option<Uuid>,

    /// When the device last polled. Used to enforce the poll interval.
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        with = "time::serde::rfc3339::option"
    )]
    pub last_polled_at: Option<OffsetDateTime>,

    /// When this request was created.
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,

    /// When this request expires.
    #[serde(with = "time::serde::rfc3339")]
    pub expires_at: OffsetDateTime,
}

impl DeviceCode {
    /// Returns `true` if this request has passed its expiry instant.
    #[must_use]
    pub fn is_expired(&self) -> bool {
        OffsetDateTime::now_utc() > self.expires_at
    }

    /// Generate a cryptographically secure random device code.
    ///
    /// Returns a 256-bit random value encoded as base64url (43 characters).
    #[must_use]
    pub fn generate_device_code() -> String {
        use base64::Engine;
        use base64::engine::general_purpose::URL_SAFE_NO_PAD;

        let mut bytes = [0u8; 32];
        rand::Rng::fill(&mut rand::thread_rng(), &mut bytes);
        URL_SAFE_NO_PAD.encode(bytes)
    }

    /// Hash a device code value using SHA-256.
    #[must_use]
    pub fn hash_device_code(code: &str) -> String {
        use sha2::{Digest, Sha256};
        let mut hasher = Sha256::new();
        hasher.update(code.as_bytes());
        hex::encode(hasher.finalize())
    }

    /// Generate a short user code from an unambiguous alphabet.
    ///
    /// The alphabet omits vowels and look-alike characters (0/O, 1/I)
    /// so the code is easy to read out and type.
    #[must_use]
    pub fn generate_user_code(length: usize) -> String {
        use rand::Rng;
        const ALPHABET: &[u8] = b"BCDFGHJKLMNPQRSTVWXZ23456789";

        let mut rng = rand::thread_rng();
        (0..length)
            .map(|_| ALPHABET[rng.gen_range(0..ALPHABET.len())] as char)
            .collect()
    }
}
