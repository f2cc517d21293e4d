//! Domain types for the credential lifecycle engine.
//!
//! Every entity is scoped to exactly one orbit (tenant); uniqueness
//! constraints are implicitly qualified by `orbit_id`.

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

pub use access_token::AccessToken;
pub use authorization_code::AuthorizationCode;
pub use client::{Client, GrantType};
pub use consent::Consent;
pub use device_code::{DeviceCode, DeviceCodeStatus};
pub use mfa::{RecoveryCode, TotpSecret};
pub use refresh_token::RefreshToken;
pub use revocation::{IntrospectionEntry, RevokedToken, TokenType};
pub use session::Session;
pub use signing_key::SigningKey;
