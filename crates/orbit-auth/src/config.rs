//! Credential lifecycle configuration.
//!
//! This module provides the file-facing configuration for the crate,
//! organized into per-concern sections. Individual services take their
//! own narrow config structs (see e.g. [`OAuthConfig`]); this type is
//! what an embedding server deserializes from its config file.
//!
//! # Example (TOML)
//!
//! ```toml
//! [auth.oauth]
//! authorization_code_lifetime = "10m"
//! access_token_lifetime = "1h"
//! refresh_token_lifetime = "90d"
//!
//! [auth.device]
//! code_lifetime = "15m"
//! poll_interval = "5s"
//! ```

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Root configuration for the credential lifecycle engine.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct AuthConfig {
    /// OAuth 2.0 grant configuration.
    pub oauth: OAuthConfig,

    /// Device authorization grant configuration.
    pub device: DeviceFlowConfig,

    /// End-user session configuration.
    pub session: SessionConfig,

    /// Signing key lifecycle configuration.
    pub signing: SigningConfig,

    /// Introspection cache configuration.
    pub introspection: IntrospectionConfig,

    /// Multi-factor authentication configuration.
    pub mfa: MfaConfig,

    /// Expiry sweeper configuration.
    pub sweeper: SweeperConfig,

    /// Audit configuration.
    pub audit: AuditConfig,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            oauth: OAuthConfig::default(),
            device: DeviceFlowConfig::default(),
            session: SessionConfig::default(),
            signing: SigningConfig::default(),
            introspection: IntrospectionConfig::default(),
            mfa: MfaConfig::default(),
            sweeper: SweeperConfig::default(),
            audit: AuditConfig::default(),
        }
    }
}

/// OAuth 2.0 grant configuration.
///
/// Controls credential lifetimes and refresh token behavior.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct OAuthConfig {
    /// Authorization code lifetime.
    /// Codes should be short-lived for security.
    #[serde(with = "humantime_serde")]
    pub authorization_code_lifetime: Duration,

    /// Access token lifetime.
    /// Shorter lifetimes are more secure but require more frequent refresh.
    #[serde(with = "humantime_serde")]
    pub access_token_lifetime: Duration,

    /// Refresh token lifetime.
    /// Can be longer since refresh tokens require client authentication.
    #[serde(with = "humantime_serde")]
    pub refresh_token_lifetime: Duration,
}

impl Default for OAuthConfig {
    fn default() -> Self {
        Self {
            authorization_code_lifetime: Duration::from_secs(600), // 10 minutes
            access_token_lifetime: Duration::from_secs(3600),      // 1 hour
            refresh_token_lifetime: Duration::from_secs(90 * 24 * 3600), // 90 days
        }
    }
}

/// Device authorization grant configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct DeviceFlowConfig {
    /// Device code lifetime.
    /// How long the end user has to approve or deny the request.
    #[serde(with = "humantime_serde")]
    pub code_lifetime: Duration,

    /// Minimum spacing between polls from the device client.
    #[serde(with = "humantime_serde")]
    pub poll_interval: Duration,

    /// Length of the human-enterable user code.
    pub user_code_length: usize,
}

impl Default for DeviceFlowConfig {
    fn default() -> Self {
        Self {
            code_lifetime: Duration::from_secs(900), // 15 minutes
            poll_interval: Duration::from_secs(5),
            user_code_length: 8,
        }
    }
}

/// End-user session configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct SessionConfig {
    /// Session time-to-live from creation (or from last activity when
    /// `sliding_window` is enabled).
    #[serde(with = "humantime_serde")]
    pub ttl: Duration,

    /// When enabled, touching a session extends its expiry by `ttl`
    /// from the touch instant. When disabled, expiry is fixed at open.
    pub sliding_window: bool,

    /// Hard cap on total session lifetime. No touch can extend a
    /// session past creation + `max_lifetime`.
    #[serde(with = "humantime_serde")]
    pub max_lifetime: Duration,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            ttl: Duration::from_secs(12 * 3600), // 12 hours
            sliding_window: true,
            max_lifetime: Duration::from_secs(30 * 24 * 3600), // 30 days
        }
    }
}

/// Signing key lifecycle configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct SigningConfig {
    /// Grace period between publishing a new key and it becoming the
    /// effective signing key. Verifiers have this long to pick up the
    /// new key set before tokens signed with it appear.
    #[serde(with = "humantime_serde")]
    pub rotation_grace: Duration,

    /// How long a freshly installed key may sign before it must be
    /// rotated out.
    #[serde(with = "humantime_serde")]
    pub key_lifetime: Duration,

    /// Accepted signing algorithms; key installation rejects others.
    pub algorithms: Vec<String>,
}

impl Default for SigningConfig {
    fn default() -> Self {
        Self {
            rotation_grace: Duration::from_secs(3600), // 1 hour
            key_lifetime: Duration::from_secs(90 * 24 * 3600), // 90 days
            algorithms: vec!["RS256".to_string(), "ES384".to_string()],
        }
    }
}

/// Introspection cache configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct IntrospectionConfig {
    /// Maximum cache entry lifetime. Entries are additionally capped at
    /// the introspected token's own remaining lifetime.
    #[serde(with = "humantime_serde")]
    pub cache_ttl: Duration,
}

impl Default for IntrospectionConfig {
    fn default() -> Self {
        Self {
            cache_ttl: Duration::from_secs(60),
        }
    }
}

/// Multi-factor authentication configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct MfaConfig {
    /// Number of recovery codes generated per enrollment batch.
    pub recovery_code_count: usize,

    /// Length in bytes of each recovery code before encoding.
    pub recovery_code_bytes: usize,
}

impl Default for MfaConfig {
    fn default() -> Self {
        Self {
            recovery_code_count: 10,
            recovery_code_bytes: 10,
        }
    }
}

/// Expiry sweeper configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct SweeperConfig {
    /// Enable the periodic background sweep.
    pub enabled: bool,

    /// Spacing between sweeps.
    #[serde(with = "humantime_serde")]
    pub interval: Duration,
}

impl Default for SweeperConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            interval: Duration::from_secs(300), // 5 minutes
        }
    }
}

/// Audit logging configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct AuditConfig {
    /// Log successful credential issuance.
    pub log_issuance: bool,

    /// Log failed redemption/rotation attempts.
    pub log_failures: bool,

    /// Log revocation operations.
    pub log_revocations: bool,
}

impl Default for AuditConfig {
    fn default() -> Self {
        Self {
            log_issuance: true,
            log_failures: true,
            log_revocations: true,
        }
    }
}

/// Configuration validation errors.
#[derive(Debug, Clone, thiserror::Error)]
pub enum ConfigError {
    /// An invalid configuration value was provided.
    #[error("Invalid configuration value: {0}")]
    InvalidValue(String),
}

impl AuthConfig {
    /// Validates the configuration.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::InvalidValue` if:
    /// - Any lifetime is zero
    /// - The access token outlives the refresh token
    /// - The device poll interval is zero or exceeds the code lifetime
    /// - The user code is too short to be unique among pending codes
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.oauth.authorization_code_lifetime.is_zero() {
            return Err(ConfigError::InvalidValue(
                "authorization_code_lifetime must be > 0".to_string(),
            ));
        }

        if self.oauth.access_token_lifetime.is_zero() {
            return Err(ConfigError::InvalidValue(
                "access_token_lifetime must be > 0".to_string(),
            ));
        }

        if self.oauth.refresh_token_lifetime < self.oauth.access_token_lifetime {
            return Err(ConfigError::InvalidValue(
                "refresh_token_lifetime must be >= access_token_lifetime".to_string(),
            ));
        }

        if self.device.poll_interval.is_zero() {
            return Err(ConfigError::InvalidValue(
                "device poll_interval must be > 0".to_string(),
            ));
        }

        if self.device.poll_interval >= self.device.code_lifetime {
            return Err(ConfigError::InvalidValue(
                "device poll_interval must be shorter than code_lifetime".to_string(),
            ));
        }

        if self.device.user_code_length < 6 {
            return Err(ConfigError::InvalidValue(
                "device user_code_length must be >= 6".to_string(),
            ));
        }

        if self.session.ttl.is_zero() {
            return Err(ConfigError::InvalidValue(
                "session ttl must be > 0".to_string(),
            ));
        }

        if self.signing.key_lifetime <= self.signing.rotation_grace {
            return Err(ConfigError::InvalidValue(
                "signing key_lifetime must exceed rotation_grace".to_string(),
            ));
        }

        if self.session.max_lifetime < self.session.ttl {
            return Err(ConfigError::InvalidValue(
                "session max_lifetime must be >= ttl".to_string(),
            ));
        }

        if self.mfa.recovery_code_count == 0 {
            return Err(ConfigError::InvalidValue(
                "recovery_code_count must be > 0".to_string(),
            ));
        }

        if self.sweeper.enabled && self.sweeper.interval.is_zero() {
            return Err(ConfigError::InvalidValue(
                "sweeper interval must be > 0".to_string(),
            ));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_validates() {
        let config = AuthConfig::default();
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_default_lifetimes() {
        let oauth = OAuthConfig::default();
        assert_eq!(oauth.authorization_code_lifetime, Duration::from_secs(600));
        assert_eq!(oauth.access_token_lifetime, Duration::from_secs(3600));
        assert_eq!(
            oauth.refresh_token_lifetime,
            Duration::from_secs(90 * 24 * 3600)
        );
    }

    #[test]
    fn test_zero_code_lifetime_fails_validation() {
        let mut config = AuthConfig::default();
        config.oauth.authorization_code_lifetime = Duration::ZERO;
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("authorization_code_lifetime"));
    }

    #[test]
    fn test_refresh_shorter_than_access_fails_validation() {
        let mut config = AuthConfig::default();
        config.oauth.refresh_token_lifetime = Duration::from_secs(60);
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("refresh_token_lifetime"));
    }

    #[test]
    fn test_poll_interval_must_fit_code_lifetime() {
        let mut config = AuthConfig::default();
        config.device.poll_interval = config.device.code_lifetime;
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("poll_interval"));
    }

    #[test]
    fn test_short_user_code_fails_validation() {
        let mut config = AuthConfig::default();
        config.device.user_code_length = 4;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_disabled_sweeper_skips_interval_check() {
        let mut config = AuthConfig::default();
        config.sweeper.enabled = false;
        config.sweeper.interval = Duration::ZERO;
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_serde_roundtrip() {
        let config = AuthConfig::default();
        let json = serde_json::to_string(&config).unwrap();
        let parsed: AuthConfig = serde_json::from_str(&json).unwrap();
        assert_eq!(
            config.oauth.access_token_lifetime,
            parsed.oauth.access_token_lifetime
        );
        assert_eq!(config.device.poll_interval, parsed.device.poll_interval);
        assert_eq!(config.session.sliding_window, parsed.session.sliding_window);
    }
}
