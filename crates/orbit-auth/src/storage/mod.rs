//! Storage traits for the credential lifecycle engine.
//!
//! Every trait here is orbit-scoped: lookups take the orbit ID and
//! must never return rows from another orbit. Conditional operations
//! (consume, transition, rotation, step advance) are the atomicity
//! primitives of the engine — implementations must perform the check
//! and the mutation under one lock or one conditional write, returning
//! `true` only to the single caller whose update took effect.
//!
//! # Implementations
//!
//! The in-memory backend lives in the `orbit-auth-memory` crate.
//! Production deployments provide their own backend over the same
//! traits.

pub mod access_token;
pub mod authorization_code;
pub mod client;
pub mod consent;
pub mod device_code;
pub mod mfa;
pub mod refresh_token;
pub mod revocation;
pub mod session;
pub mod signing_key;

pub use access_token::AccessTokenStorage;
pub use authorization_code::AuthorizationCodeStorage;
pub use client::ClientStorage;
pub use consent::ConsentStorage;
pub use device_code::DeviceCodeStorage;
pub use mfa::{RecoveryCodeStorage, TotpStorage};
pub use refresh_token::RefreshTokenStorage;
pub use revocation::{IntrospectionCacheStorage, RevocationLedgerStorage};
pub use session::SessionStorage;
pub use signing_key::SigningKeyStorage;
