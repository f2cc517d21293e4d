//! Device authorization storage trait.

use async_trait::async_trait;
use time::OffsetDateTime;
use uuid::Uuid;

use crate::AuthResult;
use crate::types::{DeviceCode, DeviceCodeStatus};

/// Storage trait for device authorization requests.
#[async_trait]
pub trait DeviceCodeStorage: Send + Sync {
    /// Stores a new device authorization request.
    ///
    /// # Errors
    ///
    /// Returns an error if the user code collides with a pending
    /// request in the same orbit, or the storage operation fails.
    async fn create(&self, code: &DeviceCode) -> AuthResult<()>;

    /// Finds a request by the hash of its device code.
    ///
    /// # Errors
    ///
    /// Returns an error if the storage operation fails.
    async fn find_by_device_code_hash(
        &self,
        orbit_id: Uuid,
        device_code_hash: &str,
    ) -> AuthResult<Option<DeviceCode>>;

    /// Finds a request by its user code.
    ///
    /// # Errors
    ///
    /// Returns an error if the storage operation fails.
    async fn find_by_user_code(
        &self,
        orbit_id: Uuid,
        user_code: &str,
    ) -> AuthResult<Option<DeviceCode>>;

    /// Atomically transitions a request from `from` to `to`.
    ///
    /// Returns `true` only if the stored status equaled `from` at the
    /// moment of the write; the check and the write must be a single
    /// atomic step. When approving, `user_id` records who decided.
    ///
    /// Implementations do not validate that the transition is legal;
    /// callers pass only transitions permitted by
    /// [`DeviceCodeStatus::can_transition_to`].
    ///
    /// # Errors
    ///
    /// Returns an error if the storage operation fails.
    async fn transition(
        &self,
        orbit_id: Uuid,
        id: Uuid,
        from: DeviceCodeStatus,
        to: DeviceCodeStatus,
        user_id: Option<Uuid>,
    ) -> AuthResult<bool>;

    /// Records a poll instant for interval enforcement.
    ///
    /// # Errors
    ///
    /// Returns an error if the request is not found or the storage
    /// operation fails.
    async fn record_poll(&self, orbit_id: Uuid, id: Uuid, at: OffsetDateTime) -> AuthResult<()>;

    /// Deletes requests whose `expires_at` is before `now`.
    ///
    /// Returns the number of records deleted.
    ///
    /// # Errors
    ///
    /// Returns an error if the storage operation fails.
    async fn cleanup_expired(&self, now: OffsetDateTime) -> AuthResult<u64>;
}
