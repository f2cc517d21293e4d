//! In-memory client registry.

use std::collections::HashMap;
use std::sync::RwLock;

use async_trait::async_trait;
use uuid::Uuid;

use orbit_auth::storage::ClientStorage;
use orbit_auth::types::Client;
use orbit_auth::AuthResult;

/// Client registry backed by a hash map.
///
/// Registration is not part of the engine's storage contract; the
/// [`InMemoryClientRegistry::register`] inherent method exists so
/// tests and examples can seed clients.
#[derive(Default)]
pub struct InMemoryClientRegistry {
    clients: RwLock<HashMap<(Uuid, String), Client>>,
}

impl InMemoryClientRegistry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds or replaces a client.
    pub fn register(&self, client: Client) {
        let mut clients = self.clients.write().unwrap();
        clients.insert((client.orbit_id, client.client_id.clone()), client);
    }
}

#[async_trait]
impl ClientStorage for InMemoryClientRegistry {
    async fn find(&self, orbit_id: Uuid, client_id: &str) -> AuthResult<Option<Client>> {
        let clients = self.clients.read().unwrap();
        Ok(clients.get(&(orbit_id, client_id.to_string())).cloned())
    }
}
