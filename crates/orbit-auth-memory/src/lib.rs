//! In-memory storage backend for `orbit-auth`.
//!
//! Every store is a `std::sync::RwLock` around a `HashMap`, with the
//! write lock held across the check and the mutation of each
//! conditional operation. That makes the conditional storage contracts
//! (consume, transition, rotation commit, step advance) hold under
//! concurrency without any further machinery, which is the point: this
//! backend exists for tests, examples, and single-process deployments.
//!
//! Locks are never held across an `await`, so the stores are safe on
//! any async runtime.

mod clients;
mod codes;
mod consents;
mod keys;
mod mfa;
mod revocations;
mod sessions;
mod tokens;

pub use clients::InMemoryClientRegistry;
pub use codes::{InMemoryAuthorizationCodeStore, InMemoryDeviceCodeStore};
pub use consents::InMemoryConsentStore;
pub use keys::InMemorySigningKeyStore;
pub use mfa::{InMemoryRecoveryCodeStore, InMemoryTotpStore};
pub use revocations::{InMemoryIntrospectionCache, InMemoryRevocationLedger};
pub use sessions::InMemorySessionStore;
pub use tokens::{InMemoryAccessTokenStore, InMemoryRefreshTokenStore};

use std::sync::Arc;

/// One of everything: a full set of in-memory stores sharing no state,
/// ready to wire into the engine's services.
#[derive(Clone, Default)]
pub struct InMemoryBackend {
    pub clients: Arc<InMemoryClientRegistry>,
    pub authorization_codes: Arc<InMemoryAuthorizationCodeStore>,
    pub device_codes: Arc<InMemoryDeviceCodeStore>,
    pub access_tokens: Arc<InMemoryAccessTokenStore>,
    pub refresh_tokens: Arc<InMemoryRefreshTokenStore>,
    pub sessions: Arc<InMemorySessionStore>,
    pub ledger: Arc<InMemoryRevocationLedger>,
    pub introspection_cache: Arc<InMemoryIntrospectionCache>,
    pub signing_keys: Arc<InMemorySigningKeyStore>,
    pub consents: Arc<InMemoryConsentStore>,
    pub totp: Arc<InMemoryTotpStore>,
    pub recovery_codes: Arc<InMemoryRecoveryCodeStore>,
}

impl InMemoryBackend {
    /// Creates a fresh, empty backend.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}
