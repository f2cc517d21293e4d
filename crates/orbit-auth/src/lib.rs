//! # orbit-auth
//!
//! Credential lifecycle engine for a multi-tenant OAuth 2.0 / OIDC
//! identity provider. Tenants are called orbits; every credential in
//! this crate lives inside exactly one orbit.
//!
//! This crate provides:
//! - Authorization code grant with mandatory PKCE for public clients
//! - Device authorization grant (RFC 8628)
//! - Refresh token rotation with reuse detection and cascade revocation
//! - An append-only revocation ledger and cached introspection (RFC 7662)
//! - Sliding-window user sessions with global sign-out
//! - Signing key rotation with verification overlap
//! - Consent tracking with revocation cascade
//! - TOTP step tracking and one-time recovery codes
//!
//! ## Overview
//!
//! The engine is storage-agnostic: every persistence concern sits
//! behind a trait in [`storage`], and the atomicity each flow needs is
//! expressed as conditional storage operations (consume a code, commit
//! a rotation, advance a TOTP step) that exactly one concurrent caller
//! can win. Token signing, TOTP math, and HTTP are deliberately
//! outside this crate; it owns credential state, not wire formats.
//!
//! ## Modules
//!
//! - [`config`] - Engine configuration
//! - [`oauth`] - Authorization code and device grants
//! - [`token`] - Issuance, rotation, revocation, introspection
//! - [`session`] - User session lifecycle
//! - [`keys`] - Signing key rotation
//! - [`consent`] - Consent records and cascade
//! - [`mfa`] - TOTP enrollment and recovery codes
//! - [`audit`] - Structured audit events
//! - [`sweeper`] - Background cleanup of expired records
//! - [`storage`] - Storage traits for all of the above

pub mod audit;
pub mod config;
pub mod consent;
pub mod error;
pub mod keys;
pub mod mfa;
pub mod oauth;
pub mod session;
pub mod storage;
pub mod sweeper;
pub mod token;
pub mod types;

pub use audit::AuditLog;
pub use config::{AuthConfig, ConfigError};
pub use consent::ConsentService;
pub use error::{AuthError, ErrorCategory};
pub use keys::{KeyService, NewKeyMaterial};
pub use mfa::MfaService;
pub use oauth::{
    AuthorizationCodeService, CodeGrant, DeviceCodeService, DeviceGrant, IssueCodeRequest,
    PkceChallenge, PkceError, PkceVerifier, StartDeviceAuthResponse,
};
pub use session::{OpenSessionRequest, SessionService};
pub use storage::{
    AccessTokenStorage, AuthorizationCodeStorage, ClientStorage, ConsentStorage,
    DeviceCodeStorage, IntrospectionCacheStorage, RecoveryCodeStorage, RefreshTokenStorage,
    RevocationLedgerStorage, SessionStorage, SigningKeyStorage, TotpStorage,
};
pub use sweeper::{ExpirySweeper, SweepReport};
pub use token::{
    IntrospectionService, IssuedTokens, RevocationService, TokenGrant, TokenService,
};
pub use types::{
    AccessToken, AuthorizationCode, Client, Consent, DeviceCode, DeviceCodeStatus, GrantType,
    IntrospectionEntry, RecoveryCode, RefreshToken, RevokedToken, Session, SigningKey, TokenType,
    TotpSecret,
};

/// Type alias for engine results.
pub type AuthResult<T> = Result<T, AuthError>;

/// Prelude module for convenient imports.
pub mod prelude {
    pub use crate::config::AuthConfig;
    pub use crate::error::{AuthError, ErrorCategory};
    pub use crate::oauth::{AuthorizationCodeService, DeviceCodeService};
    pub use crate::token::{IntrospectionService, RevocationService, TokenService};
    pub use crate::types::*;
    pub use crate::{AuthResult, ConsentService, KeyService, MfaService, SessionService};
}
