//! Credential lifecycle error types.
//!
//! This module defines all error types that can occur while issuing,
//! consuming, rotating, or revoking credentials.
//!
//! At the protocol boundary, invalid, expired, consumed, and revoked
//! credentials must be indistinguishable (generic `invalid_grant`) to
//! prevent enumeration. The variants below preserve the distinction for
//! internal logging; [`AuthError::oauth_error_code`] performs the
//! collapsing mapping.

use std::fmt;

/// Errors that can occur during credential lifecycle operations.
#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    /// The referenced entity does not exist (or belongs to another orbit).
    #[error("Not found: {entity}")]
    NotFound {
        /// The kind of entity that was not found.
        entity: String,
    },

    /// A one-time credential has already been consumed.
    #[error("Already used")]
    AlreadyUsed,

    /// A state-machine transition was attempted from an illegal state.
    #[error("Invalid state: {message}")]
    InvalidState {
        /// Description of the violated transition.
        message: String,
    },

    /// The credential has passed its expiry instant.
    #[error("Expired")]
    Expired,

    /// The credential has been revoked; revocation is permanent.
    #[error("Revoked")]
    Revoked,

    /// A rotated refresh token was presented again.
    ///
    /// This is a security-significant event: the remaining rotation
    /// chain has already been revoked by the time this error is
    /// returned, so ignoring it cannot leave the system unsafe.
    #[error("Refresh token reuse detected")]
    TokenReuseDetected,

    /// A refresh requested broader scopes than the original grant.
    #[error("Scope escalation: {message}")]
    ScopeEscalation {
        /// Description of the escalation attempt.
        message: String,
    },

    /// A unique-key collision occurred (e.g. duplicate user code).
    #[error("Conflict: {message}")]
    Conflict {
        /// Description of the colliding key.
        message: String,
    },

    /// PKCE code verifier does not match the stored challenge.
    #[error("PKCE verification failed")]
    PkceVerificationFailed,

    /// The device-flow client is polling faster than its interval.
    #[error("Slow down")]
    SlowDown,

    /// The device-flow authorization has not been decided yet.
    #[error("Authorization pending")]
    AuthorizationPending,

    /// The resource owner denied the authorization request.
    #[error("Access denied")]
    AccessDenied,

    /// The client is unknown, inactive, or not allowed the operation.
    #[error("Invalid client: {message}")]
    InvalidClient {
        /// Description of why the client is invalid.
        message: String,
    },

    /// The request is malformed or references unregistered values.
    #[error("Invalid request: {message}")]
    InvalidRequest {
        /// Description of why the request is invalid.
        message: String,
    },

    /// Zero or more than one signing key is currently effective.
    #[error("No active signing key: {message}")]
    NoActiveKey {
        /// Description of the key configuration problem.
        message: String,
    },

    /// The storage backend is transiently unavailable.
    ///
    /// Safe to retry with backoff at the caller's discretion; the
    /// services themselves never retry writes.
    #[error("Storage unavailable: {message}")]
    StorageUnavailable {
        /// Description of the storage failure.
        message: String,
    },

    /// The configuration is invalid.
    #[error("Configuration error: {message}")]
    Configuration {
        /// Description of the configuration error.
        message: String,
    },

    /// An unexpected internal error occurred.
    #[error("Internal error: {message}")]
    Internal {
        /// Description of the internal error.
        message: String,
    },
}

impl AuthError {
    /// Creates a new `NotFound` error.
    #[must_use]
    pub fn not_found(entity: impl Into<String>) -> Self {
        Self::NotFound {
            entity: entity.into(),
        }
    }

    /// Creates a new `InvalidState` error.
    #[must_use]
    pub fn invalid_state(message: impl Into<String>) -> Self {
        Self::InvalidState {
            message: message.into(),
        }
    }

    /// Creates a new `ScopeEscalation` error.
    #[must_use]
    pub fn scope_escalation(message: impl Into<String>) -> Self {
        Self::ScopeEscalation {
            message: message.into(),
        }
    }

    /// Creates a new `Conflict` error.
    #[must_use]
    pub fn conflict(message: impl Into<String>) -> Self {
        Self::Conflict {
            message: message.into(),
        }
    }

    /// Creates a new `InvalidClient` error.
    #[must_use]
    pub fn invalid_client(message: impl Into<String>) -> Self {
        Self::InvalidClient {
            message: message.into(),
        }
    }

    /// Creates a new `InvalidRequest` error.
    #[must_use]
    pub fn invalid_request(message: impl Into<String>) -> Self {
        Self::InvalidRequest {
            message: message.into(),
        }
    }

    /// Creates a new `NoActiveKey` error.
    #[must_use]
    pub fn no_active_key(message: impl Into<String>) -> Self {
        Self::NoActiveKey {
            message: message.into(),
        }
    }

    /// Creates a new `StorageUnavailable` error.
    #[must_use]
    pub fn storage(message: impl Into<String>) -> Self {
        Self::StorageUnavailable {
            message: message.into(),
        }
    }

    /// Creates a new `Configuration` error.
    #[must_use]
    pub fn configuration(message: impl Into<String>) -> Self {
        Self::Configuration {
            message: message.into(),
        }
    }

    /// Creates a new `Internal` error.
    #[must_use]
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal {
            message: message.into(),
        }
    }

    /// Returns `true` if this is a credential error the caller should
    /// present as a generic invalid grant.
    #[must_use]
    pub fn is_grant_error(&self) -> bool {
        matches!(
            self,
            Self::NotFound { .. }
                | Self::AlreadyUsed
                | Self::InvalidState { .. }
                | Self::Expired
                | Self::Revoked
                | Self::TokenReuseDetected
                | Self::PkceVerificationFailed
        )
    }

    /// Returns `true` if this is a server-side error (5xx category).
    #[must_use]
    pub fn is_server_error(&self) -> bool {
        matches!(
            self,
            Self::NoActiveKey { .. }
                | Self::StorageUnavailable { .. }
                | Self::Configuration { .. }
                | Self::Internal { .. }
        )
    }

    /// Returns `true` if this error must be surfaced to audit logging.
    #[must_use]
    pub fn is_security_event(&self) -> bool {
        matches!(self, Self::TokenReuseDetected)
    }

    /// Returns `true` if the failed operation is safe to retry.
    ///
    /// Only transient storage failures qualify; everything else either
    /// succeeded partially or is a definitive rejection.
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::StorageUnavailable { .. })
    }

    /// Returns the error category for logging/monitoring purposes.
    #[must_use]
    pub fn category(&self) -> ErrorCategory {
        match self {
            Self::NotFound { .. } => ErrorCategory::Credential,
            Self::AlreadyUsed => ErrorCategory::Credential,
            Self::InvalidState { .. } => ErrorCategory::StateMachine,
            Self::Expired => ErrorCategory::Credential,
            Self::Revoked => ErrorCategory::Credential,
            Self::TokenReuseDetected => ErrorCategory::Security,
            Self::ScopeEscalation { .. } => ErrorCategory::Security,
            Self::Conflict { .. } => ErrorCategory::Infrastructure,
            Self::PkceVerificationFailed => ErrorCategory::Credential,
            Self::SlowDown => ErrorCategory::StateMachine,
            Self::AuthorizationPending => ErrorCategory::StateMachine,
            Self::AccessDenied => ErrorCategory::Credential,
            Self::InvalidClient { .. } => ErrorCategory::Validation,
            Self::InvalidRequest { .. } => ErrorCategory::Validation,
            Self::NoActiveKey { .. } => ErrorCategory::Configuration,
            Self::StorageUnavailable { .. } => ErrorCategory::Infrastructure,
            Self::Configuration { .. } => ErrorCategory::Configuration,
            Self::Internal { .. } => ErrorCategory::Internal,
        }
    }

    /// Returns the OAuth 2.0 error code for this error.
    ///
    /// Invalid, expired, consumed, and revoked credentials all collapse
    /// to `invalid_grant` so callers cannot distinguish them.
    #[must_use]
    pub fn oauth_error_code(&self) -> &'static str {
        match self {
            Self::NotFound { .. }
            | Self::AlreadyUsed
            | Self::InvalidState { .. }
            | Self::Expired
            | Self::Revoked
            | Self::TokenReuseDetected
            | Self::PkceVerificationFailed => "invalid_grant",
            Self::ScopeEscalation { .. } => "invalid_scope",
            Self::SlowDown => "slow_down",
            Self::AuthorizationPending => "authorization_pending",
            Self::AccessDenied => "access_denied",
            Self::InvalidClient { .. } => "invalid_client",
            Self::InvalidRequest { .. } => "invalid_request",
            Self::Conflict { .. }
            | Self::NoActiveKey { .. }
            | Self::StorageUnavailable { .. }
            | Self::Configuration { .. }
            | Self::Internal { .. } => "server_error",
        }
    }
}

/// Categories of credential lifecycle errors for logging and monitoring.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCategory {
    /// Invalid, expired, consumed, or revoked credentials.
    Credential,
    /// Illegal state-machine transitions and pacing violations.
    StateMachine,
    /// Security-significant events (reuse, escalation attempts).
    Security,
    /// Request validation errors.
    Validation,
    /// Infrastructure/storage errors.
    Infrastructure,
    /// Configuration errors.
    Configuration,
    /// Internal errors.
    Internal,
}

impl fmt::Display for ErrorCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Credential => write!(f, "credential"),
            Self::StateMachine => write!(f, "state_machine"),
            Self::Security => write!(f, "security"),
            Self::Validation => write!(f, "validation"),
            Self::Infrastructure => write!(f, "infrastructure"),
            Self::Configuration => write!(f, "configuration"),
            Self::Internal => write!(f, "internal"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = AuthError::not_found("refresh token");
        assert_eq!(err.to_string(), "Not found: refresh token");

        let err = AuthError::TokenReuseDetected;
        assert_eq!(err.to_string(), "Refresh token reuse detected");

        let err = AuthError::scope_escalation("requested write, granted read");
        assert_eq!(
            err.to_string(),
            "Scope escalation: requested write, granted read"
        );
    }

    #[test]
    fn test_grant_errors_collapse_to_invalid_grant() {
        // Anti-enumeration: all credential failures look identical.
        for err in [
            AuthError::not_found("code"),
            AuthError::AlreadyUsed,
            AuthError::Expired,
            AuthError::Revoked,
            AuthError::TokenReuseDetected,
            AuthError::PkceVerificationFailed,
            AuthError::invalid_state("denied is terminal"),
        ] {
            assert!(err.is_grant_error());
            assert_eq!(err.oauth_error_code(), "invalid_grant");
        }
    }

    #[test]
    fn test_error_predicates() {
        assert!(AuthError::TokenReuseDetected.is_security_event());
        assert!(!AuthError::Revoked.is_security_event());

        assert!(AuthError::storage("connection refused").is_retryable());
        assert!(!AuthError::AlreadyUsed.is_retryable());

        assert!(AuthError::no_active_key("orbit has two").is_server_error());
        assert!(!AuthError::Expired.is_server_error());
    }

    #[test]
    fn test_error_category() {
        assert_eq!(
            AuthError::TokenReuseDetected.category(),
            ErrorCategory::Security
        );
        assert_eq!(AuthError::Expired.category(), ErrorCategory::Credential);
        assert_eq!(AuthError::SlowDown.category(), ErrorCategory::StateMachine);
        assert_eq!(
            AuthError::storage("down").category(),
            ErrorCategory::Infrastructure
        );
    }

    #[test]
    fn test_device_flow_error_codes() {
        assert_eq!(
            AuthError::AuthorizationPending.oauth_error_code(),
            "authorization_pending"
        );
        assert_eq!(AuthError::SlowDown.oauth_error_code(), "slow_down");
        assert_eq!(AuthError::AccessDenied.oauth_error_code(), "access_denied");
    }

    #[test]
    fn test_error_category_display() {
        assert_eq!(ErrorCategory::Credential.to_string(), "credential");
        assert_eq!(ErrorCategory::Security.to_string(), "security");
        assert_eq!(ErrorCategory::StateMachine.to_string(), "state_machine");
    }
}
