//! Authorization code storage trait.
//!
//! # Security Considerations
//!
//! - A code must be redeemable at most once; `consume` is the
//!   single-winner primitive that enforces it
//! - Expired codes should be cleaned up periodically

use async_trait::async_trait;
use time::OffsetDateTime;
use uuid::Uuid;

use crate::AuthResult;
use crate::types::AuthorizationCode;

/// Storage trait for authorization codes.
#[async_trait]
pub trait AuthorizationCodeStorage: Send + Sync {
    /// Stores a new authorization code.
    ///
    /// # Errors
    ///
    /// Returns an error if the code value already exists in the orbit
    /// or the storage operation fails.
    async fn create(&self, code: &AuthorizationCode) -> AuthResult<()>;

    /// Finds a code by its value within an orbit.
    ///
    /// Returns the record regardless of `used`/expiry status; callers
    /// decide how to classify it.
    ///
    /// # Errors
    ///
    /// Returns an error if the storage operation fails.
    async fn find(&self, orbit_id: Uuid, code: &str) -> AuthResult<Option<AuthorizationCode>>;

    /// Atomically flips `used` from false to true.
    ///
    /// Returns `true` to exactly one caller per code; `false` if the
    /// code was already consumed or does not exist. The check and the
    /// write must be a single atomic step.
    ///
    /// # Errors
    ///
    /// Returns an error if the storage operation fails.
    async fn consume(&self, orbit_id: Uuid, code: &str) -> AuthResult<bool>;

    /// Deletes codes whose `expires_at` is before `now`.
    ///
    /// Returns the number of records deleted.
    ///
    /// # Errors
    ///
    /// Returns an error if the storage operation fails.
    async fn cleanup_expired(&self, now: OffsetDateTime) -> AuthResult<u64>;
}
