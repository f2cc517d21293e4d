//! Consent lifecycle.
//!
//! Re-granting widens the standing consent (union of scopes); revoking
//! cascades to every refresh chain the client holds for the user, so a
//! withdrawn consent cannot keep minting tokens.

use std::collections::BTreeSet;
use std::sync::Arc;

use time::OffsetDateTime;
use uuid::Uuid;

use crate::AuthResult;
use crate::error::AuthError;
use crate::storage::ConsentStorage;
use crate::token::TokenService;
use crate::types::Consent;

/// Service owning consent records.
pub struct ConsentService {
    consents: Arc<dyn ConsentStorage>,
    tokens: Arc<TokenService>,
}

impl ConsentService {
    /// Creates a new consent service.
    pub fn new(consents: Arc<dyn ConsentStorage>, tokens: Arc<TokenService>) -> Self {
        Self { consents, tokens }
    }

    /// Records a user's consent for a client.
    ///
    /// If an active consent already stands, the scope sets are merged;
    /// a revoked or expired consent is replaced outright.
    ///
    /// # Errors
    ///
    /// Returns an error if storage fails.
    pub async fn grant(
        &self,
        orbit_id: Uuid,
        user_id: Uuid,
        client_id: &str,
        scopes: Vec<String>,
        expires_at: Option<OffsetDateTime>,
    ) -> AuthResult<Consent> {
        let existing = self.consents.find(orbit_id, user_id, client_id).await?;

        let scopes = match existing.as_ref().filter(|c| c.is_active()) {
            Some(standing) => {
                let merged: BTreeSet<String> = standing
                    .scopes
                    .iter()
                    .chain(scopes.iter())
                    .cloned()
                    .collect();
                merged.into_iter().collect()
            }
            None => scopes,
        };

        let consent = Consent {
            id: Uuid::new_v4(),
            orbit_id,
            user_id,
            client_id: client_id.to_string(),
            scopes,
            granted_at: OffsetDateTime::now_utc(),
            expires_at,
            revoked_at: None,
        };
        self.consents.upsert(&consent).await?;

        tracing::debug!(
            orbit_id = %orbit_id,
            client_id = %client_id,
            scope_count = consent.scopes.len(),
            "Consent granted"
        );
        Ok(consent)
    }

    /// Returns `true` if an active consent covers every requested scope.
    ///
    /// # Errors
    ///
    /// Returns an error if storage fails.
    pub async fn check(
        &self,
        orbit_id: Uuid,
        user_id: Uuid,
        client_id: &str,
        scopes: &[String],
    ) -> AuthResult<bool> {
        let consent = self.consents.find(orbit_id, user_id, client_id).await?;
        Ok(consent.is_some_and(|c| c.is_active() && c.covers(scopes)))
    }

    /// Revokes a user's consent for a client and every refresh chain
    /// issued under it.
    ///
    /// Returns the number of refresh tokens revoked by the cascade.
    ///
    /// # Errors
    ///
    /// Returns an error if no consent exists or storage fails.
    pub async fn revoke(
        &self,
        orbit_id: Uuid,
        user_id: Uuid,
        client_id: &str,
    ) -> AuthResult<u64> {
        let consent = self
            .consents
            .find(orbit_id, user_id, client_id)
            .await?
            .ok_or_else(|| AuthError::not_found("consent"))?;

        self.consents
            .revoke(orbit_id, consent.id, OffsetDateTime::now_utc())
            .await?;

        let revoked = self
            .tokens
            .revoke_user_client_tokens(orbit_id, user_id, client_id, "consent_revoked")
            .await?;

        tracing::info!(
            orbit_id = %orbit_id,
            client_id = %client_id,
            chains_revoked = revoked,
            "Consent revoked"
        );
        Ok(revoked)
    }

    /// Lists a user's consents across clients.
    ///
    /// # Errors
    ///
    /// Returns an error if storage fails.
    pub async fn list(&self, orbit_id: Uuid, user_id: Uuid) -> AuthResult<Vec<Consent>> {
        self.consents.list_by_user(orbit_id, user_id).await
    }
}
