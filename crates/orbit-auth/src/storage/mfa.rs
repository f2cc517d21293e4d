//! Second-factor storage traits.

use async_trait::async_trait;
use uuid::Uuid;

use crate::AuthResult;
use crate::types::{RecoveryCode, TotpSecret};

/// Storage trait for TOTP enrollments.
#[async_trait]
pub trait TotpStorage: Send + Sync {
    /// Stores a new enrollment.
    ///
    /// # Errors
    ///
    /// Returns an error if the user already has an enrollment in the
    /// orbit or the storage operation fails.
    async fn create(&self, secret: &TotpSecret) -> AuthResult<()>;

    /// Finds a user's enrollment.
    ///
    /// # Errors
    ///
    /// Returns an error if the storage operation fails.
    async fn find_by_user(&self, orbit_id: Uuid, user_id: Uuid)
    -> AuthResult<Option<TotpSecret>>;

    /// Marks an enrollment confirmed.
    ///
    /// Returns `true` if the enrollment existed and was unconfirmed.
    ///
    /// # Errors
    ///
    /// Returns an error if the storage operation fails.
    async fn confirm(&self, orbit_id: Uuid, id: Uuid) -> AuthResult<bool>;

    /// Atomically advances `last_step` to `step`.
    ///
    /// Succeeds only if `step` is strictly greater than the stored
    /// `last_step`; the comparison and the write must be a single
    /// atomic step. Under concurrent submission of the same code,
    /// exactly one caller wins.
    ///
    /// # Errors
    ///
    /// Returns an error if the enrollment is not found or the storage
    /// operation fails.
    async fn advance_step(&self, orbit_id: Uuid, id: Uuid, step: i64) -> AuthResult<bool>;

    /// Removes a user's enrollment.
    ///
    /// Returns `true` if an enrollment existed.
    ///
    /// # Errors
    ///
    /// Returns an error if the storage operation fails.
    async fn delete_by_user(&self, orbit_id: Uuid, user_id: Uuid) -> AuthResult<bool>;
}

/// Storage trait for one-time recovery codes.
#[async_trait]
pub trait RecoveryCodeStorage: Send + Sync {
    /// Stores a batch of freshly generated codes.
    ///
    /// # Errors
    ///
    /// Returns an error if the storage operation fails.
    async fn create_batch(&self, codes: &[RecoveryCode]) -> AuthResult<()>;

    /// Atomically consumes the unused code matching `code_hash`.
    ///
    /// Returns `true` to exactly one caller per code; `false` if no
    /// unused code with this hash exists for the user.
    ///
    /// # Errors
    ///
    /// Returns an error if the storage operation fails.
    async fn consume(
        &self,
        orbit_id: Uuid,
        user_id: Uuid,
        code_hash: &str,
    ) -> AuthResult<bool>;

    /// Counts the user's unused codes.
    ///
    /// # Errors
    ///
    /// Returns an error if the storage operation fails.
    async fn count_unused(&self, orbit_id: Uuid, user_id: Uuid) -> AuthResult<u64>;

    /// Removes every code for a user, used or not.
    ///
    /// Returns the number of records deleted. Called before issuing a
    /// replacement batch.
    ///
    /// # Errors
    ///
    /// Returns an error if the storage operation fails.
    async fn delete_by_user(&self, orbit_id: Uuid, user_id: Uuid) -> AuthResult<u64>;
}
