//! Refresh token storage trait.
//!
//! # Security Considerations
//!
//! - Tokens are stored as SHA-256 hashes only
//! - `begin_rotation` is the single-winner primitive for rotation:
//!   under concurrent presentation of the same token, exactly one
//!   caller wins and every loser observes reuse
//! - Expired tokens should be cleaned up periodically

use async_trait::async_trait;
use time::OffsetDateTime;
use uuid::Uuid;

use crate::AuthResult;
use crate::types::RefreshToken;

/// Storage trait for refresh tokens.
#[async_trait]
pub trait RefreshTokenStorage: Send + Sync {
    /// Stores a new refresh token.
    ///
    /// # Errors
    ///
    /// Returns an error if the token hash already exists in the orbit
    /// or the storage operation fails.
    async fn create(&self, token: &RefreshToken) -> AuthResult<()>;

    /// Finds a refresh token by its hash within an orbit.
    ///
    /// Returns the record regardless of expiry/revocation status;
    /// callers classify it (live, revoked, reuse).
    ///
    /// # Errors
    ///
    /// Returns an error if the storage operation fails.
    async fn find_by_hash(
        &self,
        orbit_id: Uuid,
        token_hash: &str,
    ) -> AuthResult<Option<RefreshToken>>;

    /// Finds a refresh token by its record ID.
    ///
    /// # Errors
    ///
    /// Returns an error if the storage operation fails.
    async fn find_by_id(&self, orbit_id: Uuid, id: Uuid) -> AuthResult<Option<RefreshToken>>;

    /// Atomically commits a rotation of token `id` to `successor_id`.
    ///
    /// Succeeds only if the token is currently neither revoked nor
    /// rotated; on success it sets `revoked_at = at` and
    /// `rotated_to = successor_id` in one step. Returns `false` if
    /// another rotation already won or the token was revoked.
    ///
    /// # Errors
    ///
    /// Returns an error if the token is not found or the storage
    /// operation fails.
    async fn begin_rotation(
        &self,
        orbit_id: Uuid,
        id: Uuid,
        successor_id: Uuid,
        at: OffsetDateTime,
    ) -> AuthResult<bool>;

    /// Marks a token revoked without rotating it.
    ///
    /// Returns `true` if the token existed and was not yet revoked.
    ///
    /// # Errors
    ///
    /// Returns an error if the storage operation fails.
    async fn revoke(&self, orbit_id: Uuid, id: Uuid, at: OffsetDateTime) -> AuthResult<bool>;

    /// Increments `use_count` and stamps `last_used_at`.
    ///
    /// # Errors
    ///
    /// Returns an error if the token is not found or the storage
    /// operation fails.
    async fn record_use(&self, orbit_id: Uuid, id: Uuid, at: OffsetDateTime) -> AuthResult<()>;

    /// Lists tokens bound to a session.
    ///
    /// # Errors
    ///
    /// Returns an error if the storage operation fails.
    async fn list_by_session(
        &self,
        orbit_id: Uuid,
        session_id: Uuid,
    ) -> AuthResult<Vec<RefreshToken>>;

    /// Lists every token a user holds, session-bound or not.
    ///
    /// Used by global sign-out to reach chains that were issued
    /// without a session.
    ///
    /// # Errors
    ///
    /// Returns an error if the storage operation fails.
    async fn list_by_user(&self, orbit_id: Uuid, user_id: Uuid) -> AuthResult<Vec<RefreshToken>>;

    /// Lists tokens issued to a (user, client) pair.
    ///
    /// Used by consent revocation to find the chains to cascade over.
    ///
    /// # Errors
    ///
    /// Returns an error if the storage operation fails.
    async fn list_by_user_client(
        &self,
        orbit_id: Uuid,
        user_id: Uuid,
        client_id: &str,
    ) -> AuthResult<Vec<RefreshToken>>;

    /// Deletes tokens whose `expires_at` is before `now`.
    ///
    /// Returns the number of records deleted.
    ///
    /// # Errors
    ///
    /// Returns an error if the storage operation fails.
    async fn cleanup_expired(&self, now: OffsetDateTime) -> AuthResult<u64>;
}
