//! OAuth 2.0 front-channel grant services.
//!
//! Covers the two interactive grants:
//!
//! - Authorization code with PKCE ([`code::AuthorizationCodeService`])
//! - Device authorization, RFC 8628 ([`device::DeviceCodeService`])

pub mod code;
pub mod device;
pub mod pkce;

pub use code::{AuthorizationCodeService, CodeGrant, IssueCodeRequest};
pub use device::{DeviceCodeService, DeviceGrant, StartDeviceAuthResponse};
pub use pkce::{PkceChallenge, PkceError, PkceVerifier};
