//! Structured audit events for the token lifecycle.
//!
//! Events go to the `tracing` subscriber under the `audit` target so
//! deployments can route them separately from application logs. Token
//! values and hashes are never logged; events carry JTIs and IDs only.

use uuid::Uuid;

use crate::config::AuditConfig;
use crate::error::AuthError;
use crate::types::TokenType;

/// Audit event emitter, gated by [`AuditConfig`].
#[derive(Debug, Clone)]
pub struct AuditLog {
    config: AuditConfig,
}

impl AuditLog {
    /// Creates an audit log with the given configuration.
    #[must_use]
    pub fn new(config: AuditConfig) -> Self {
        Self { config }
    }

    /// Records a successful token issuance.
    pub fn token_issued(&self, orbit_id: Uuid, client_id: &str, jti: &str, grant_type: &str) {
        if self.config.log_issuance {
            tracing::info!(
                target: "audit",
                orbit_id = %orbit_id,
                client_id = %client_id,
                jti = %jti,
                grant_type = %grant_type,
                "token issued"
            );
        }
    }

    /// Records a revocation.
    pub fn token_revoked(&self, orbit_id: Uuid, jti: &str, token_type: TokenType, reason: &str) {
        if self.config.log_revocations {
            tracing::info!(
                target: "audit",
                orbit_id = %orbit_id,
                jti = %jti,
                token_type = %token_type,
                reason = %reason,
                "token revoked"
            );
        }
    }

    /// Records a failed grant attempt.
    ///
    /// Security events (token reuse) are always emitted at `warn`,
    /// regardless of configuration; ordinary failures respect
    /// `log_failures`.
    pub fn grant_failed(&self, orbit_id: Uuid, client_id: &str, error: &AuthError) {
        if error.is_security_event() {
            tracing::warn!(
                target: "audit",
                orbit_id = %orbit_id,
                client_id = %client_id,
                category = %error.category(),
                "refresh token reuse detected, chain revoked"
            );
        } else if self.config.log_failures {
            tracing::info!(
                target: "audit",
                orbit_id = %orbit_id,
                client_id = %client_id,
                category = %error.category(),
                error_code = error.oauth_error_code(),
                "grant attempt failed"
            );
        }
    }
}

impl Default for AuditLog {
    fn default() -> Self {
        Self::new(AuditConfig::default())
    }
}
