//! Token lifecycle: issuance, refresh rotation, revocation, and
//! introspection.

pub mod introspection;
pub mod ledger;
pub mod service;

pub use introspection::IntrospectionService;
pub use ledger::RevocationService;
pub use service::{IssuedTokens, TokenGrant, TokenService};
