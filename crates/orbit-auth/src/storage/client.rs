//! Client registry lookup trait.
//!
//! Client registration and management are out of scope; the lifecycle
//! services only need a read path to validate incoming requests.

use async_trait::async_trait;
use uuid::Uuid;

use crate::AuthResult;
use crate::types::Client;

/// Read-only view of the client registry.
#[async_trait]
pub trait ClientStorage: Send + Sync {
    /// Finds a client by ID within an orbit.
    ///
    /// Returns `None` if the client does not exist in this orbit,
    /// including when it exists in a different orbit.
    ///
    /// # Errors
    ///
    /// Returns an error if the storage operation fails.
    async fn find(&self, orbit_id: Uuid, client_id: &str) -> AuthResult<Option<Client>>;
}
