//! Authorization code issuance and redemption.
//!
//! Codes are single-use: redemption consumes the code first and
//! validates after, so any failure past the consume point leaves the
//! code permanently burned rather than retryable.

use std::sync::Arc;

use time::OffsetDateTime;
use uuid::Uuid;

use crate::AuthResult;
use crate::config::OAuthConfig;
use crate::error::AuthError;
use crate::oauth::pkce::{PkceChallenge, PkceVerifier};
use crate::storage::{AuthorizationCodeStorage, ClientStorage, ConsentStorage};
use crate::types::{AuthorizationCode, GrantType};

/// Parameters for issuing an authorization code.
#[derive(Debug, Clone)]
pub struct IssueCodeRequest {
    /// Orbit the request belongs to.
    pub orbit_id: Uuid,
    /// Requesting client.
    pub client_id: String,
    /// Authenticated user granting the authorization.
    pub user_id: Uuid,
    /// Redirect URI from the authorization request.
    pub redirect_uri: String,
    /// Requested scopes.
    pub scopes: Vec<String>,
    /// PKCE challenge (required for public clients).
    pub code_challenge: Option<String>,
    /// PKCE challenge method; only "S256" is accepted.
    pub code_challenge_method: Option<String>,
}

/// The outcome of a successful redemption: everything the token layer
/// needs to mint tokens.
#[derive(Debug, Clone)]
pub struct CodeGrant {
    /// Orbit the grant belongs to.
    pub orbit_id: Uuid,
    /// Client the code was issued to.
    pub client_id: String,
    /// User who authorized the request.
    pub user_id: Uuid,
    /// Granted scopes.
    pub scopes: Vec<String>,
}

/// Service for the authorization code grant.
pub struct AuthorizationCodeService {
    clients: Arc<dyn ClientStorage>,
    codes: Arc<dyn AuthorizationCodeStorage>,
    consents: Arc<dyn ConsentStorage>,
    config: OAuthConfig,
}

impl AuthorizationCodeService {
    /// Creates a new authorization code service.
    pub fn new(
        clients: Arc<dyn ClientStorage>,
        codes: Arc<dyn AuthorizationCodeStorage>,
        consents: Arc<dyn ConsentStorage>,
        config: OAuthConfig,
    ) -> Self {
        Self {
            clients,
            codes,
            consents,
            config,
        }
    }

    /// Issues an authorization code for an authenticated, consented user.
    ///
    /// Returns the plaintext code; it is not stored anywhere else and
    /// must be delivered to the client via the redirect.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - The client is unknown, inactive, or not allowed this grant
    /// - The redirect URI or a scope is not registered for the client
    /// - A public client omits PKCE, or the challenge is malformed
    /// - The user has no standing consent covering the scopes
    pub async fn issue(&self, request: &IssueCodeRequest) -> AuthResult<String> {
        // 1. Validate the client
        let client = self
            .clients
            .find(request.orbit_id, &request.client_id)
            .await?
            .ok_or_else(|| AuthError::invalid_client("Unknown client"))?;

        if !client.active {
            return Err(AuthError::invalid_client("Client is disabled"));
        }

        if !client.is_grant_type_allowed(GrantType::AuthorizationCode) {
            return Err(AuthError::invalid_client(
                "Client is not allowed the authorization_code grant",
            ));
        }

        // 2. Redirect URI must match a registered URI exactly
        if !client.is_redirect_uri_allowed(&request.redirect_uri) {
            return Err(AuthError::invalid_request("Unregistered redirect URI"));
        }

        // 3. Every requested scope must be allowed for the client
        for scope in &request.scopes {
            if !client.is_scope_allowed(scope) {
                return Err(AuthError::scope_escalation(format!(
                    "Scope not permitted for client: {scope}"
                )));
            }
        }

        // 4. PKCE: mandatory for public clients, S256 only
        match (&request.code_challenge, &request.code_challenge_method) {
            (None, _) if !client.confidential => {
                return Err(AuthError::invalid_request(
                    "PKCE is required for public clients",
                ));
            }
            (None, _) => {}
            (Some(challenge), method) => {
                if method.as_deref() != Some("S256") {
                    return Err(AuthError::invalid_request(
                        "Only the S256 code_challenge_method is supported",
                    ));
                }
                PkceChallenge::new(challenge.clone())
                    .map_err(|e| AuthError::invalid_request(e.to_string()))?;
            }
        }

        // 5. The user's consent must cover the requested scopes
        let consent = self
            .consents
            .find(request.orbit_id, request.user_id, &request.client_id)
            .await?;
        let covered = consent
            .as_ref()
            .is_some_and(|c| c.is_active() && c.covers(&request.scopes));
        if !covered {
            return Err(AuthError::AccessDenied);
        }

        // 6. Mint and store the code
        let now = OffsetDateTime::now_utc();
        let code = AuthorizationCode {
            code: AuthorizationCode::generate_code(),
            orbit_id: request.orbit_id,
            client_id: request.client_id.clone(),
            user_id: request.user_id,
            scopes: request.scopes.clone(),
            redirect_uri: request.redirect_uri.clone(),
            code_challenge: request.code_challenge.clone(),
            code_challenge_method: request.code_challenge.is_some().then(|| "S256".to_string()),
            used: false,
            created_at: now,
            expires_at: now + self.config.authorization_code_lifetime,
        };

        self.codes.create(&code).await?;

        tracing::debug!(
            orbit_id = %request.orbit_id,
            client_id = %request.client_id,
            "Issued authorization code"
        );

        Ok(code.code)
    }

    /// Redeems an authorization code for a grant.
    ///
    /// The code is consumed before anything else is checked: exactly
    /// one concurrent redemption can win, and a failed redemption
    /// burns the code rather than leaving it retryable.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - The code is unknown, already used, or expired
    /// - The code was issued to a different client or redirect URI
    /// - PKCE verification fails
    pub async fn redeem(
        &self,
        orbit_id: Uuid,
        code: &str,
        client_id: &str,
        redirect_uri: &str,
        code_verifier: Option<&str>,
    ) -> AuthResult<CodeGrant> {
        // 1. Consume first (atomic one-time use)
        if !self.codes.consume(orbit_id, code).await? {
            return match self.codes.find(orbit_id, code).await? {
                Some(_) => Err(AuthError::AlreadyUsed),
                None => Err(AuthError::not_found("authorization code")),
            };
        }

        let record = self
            .codes
            .find(orbit_id, code)
            .await?
            .ok_or_else(|| AuthError::internal("Consumed code vanished from storage"))?;

        // 2. Expiry (the consume above does not check it)
        if record.is_expired() {
            return Err(AuthError::Expired);
        }

        // 3. The code must have been issued to this client
        if record.client_id != client_id {
            return Err(AuthError::not_found("authorization code"));
        }

        // 4. Redirect URI must match the one bound at issuance
        if record.redirect_uri != redirect_uri {
            return Err(AuthError::invalid_request(
                "redirect_uri does not match the authorization request",
            ));
        }

        // 5. Verify PKCE when a challenge was bound
        if let Some(ref challenge) = record.code_challenge {
            let verifier = code_verifier
                .ok_or_else(|| AuthError::invalid_request("Missing code_verifier"))?;
            let challenge = PkceChallenge::new(challenge.clone())
                .map_err(|_| AuthError::PkceVerificationFailed)?;
            let verifier =
                PkceVerifier::new(verifier).map_err(|_| AuthError::PkceVerificationFailed)?;
            challenge
                .verify(&verifier)
                .map_err(|_| AuthError::PkceVerificationFailed)?;
        }

        tracing::debug!(
            orbit_id = %orbit_id,
            client_id = %client_id,
            "Redeemed authorization code"
        );

        Ok(CodeGrant {
            orbit_id: record.orbit_id,
            client_id: record.client_id,
            user_id: record.user_id,
            scopes: record.scopes,
        })
    }
}
