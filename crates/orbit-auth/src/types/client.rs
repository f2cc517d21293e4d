//! Registered OAuth client.
//!
//! Client registration itself is out of scope; this type is the
//! read-only view the lifecycle services use to validate requests.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A registered OAuth client, as seen by the lifecycle services.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Client {
    /// Client identifier, unique within the orbit.
    pub client_id: String,

    /// Orbit (tenant) this client belongs to.
    pub orbit_id: Uuid,

    /// Human-readable name.
    pub name: String,

    /// Exact-match redirect URIs allowed at authorization.
    pub redirect_uris: Vec<String>,

    /// Scopes this client may request. Empty means all scopes allowed.
    pub allowed_scopes: Vec<String>,

    /// Grant types this client may use.
    pub grant_types: Vec<GrantType>,

    /// Whether the client can keep a secret (confidential vs public).
    pub confidential: bool,

    /// Whether the client is currently enabled.
    pub active: bool,
}

impl Client {
    /// Returns `true` if the redirect URI exactly matches a registered URI.
    #[must_use]
    pub fn is_redirect_uri_allowed(&self, uri: &str) -> bool {
        self.redirect_uris.iter().any(|u| u == uri)
    }

    /// Returns `true` if the client may use the given grant type.
    #[must_use]
    pub fn is_grant_type_allowed(&self, grant_type: GrantType) -> bool {
        self.grant_types.contains(&grant_type)
    }

    /// Returns `true` if the client may request the given scope.
    ///
    /// An empty allow-list means all scopes are allowed.
    #[must_use]
    pub fn is_scope_allowed(&self, scope: &str) -> bool {
        self.allowed_scopes.is_empty() || self.allowed_scopes.iter().any(|s| s == scope)
    }
}

/// OAuth 2.0 grant types supported by the lifecycle engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GrantType {
    /// Authorization code grant (with PKCE).
    AuthorizationCode,
    /// Client credentials grant (machine-to-machine, no user).
    ClientCredentials,
    /// Refresh token grant.
    RefreshToken,
    /// Device authorization grant (RFC 8628).
    DeviceCode,
}

impl GrantType {
    /// Returns the grant type as its wire string.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::AuthorizationCode => "authorization_code",
            Self::ClientCredentials => "client_credentials",
            Self::RefreshToken => "refresh_token",
            Self::DeviceCode => "urn:ietf:params:oauth:grant-type:device_code",
        }
    }
}

impl std::fmt::Display for GrantType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
