//! Signing key lifecycle.
//!
//! Per orbit, at most one key is effective for signing at any instant;
//! validity windows are half-open and must not overlap. Rotation
//! shortens the current key's window to end after the grace period and
//! installs the successor with its window starting exactly there, so
//! verifiers see both keys published while in-flight tokens age out.

use std::sync::Arc;

use time::OffsetDateTime;
use uuid::Uuid;

use crate::AuthResult;
use crate::config::SigningConfig;
use crate::error::AuthError;
use crate::storage::SigningKeyStorage;
use crate::types::SigningKey;

/// Key material for installation. Private material arrives already
/// encrypted; this crate never sees plaintext keys.
#[derive(Debug, Clone)]
pub struct NewKeyMaterial {
    /// Key ID; generated when `None`.
    pub kid: Option<String>,
    /// Signature algorithm, checked against the configured list.
    pub alg: String,
    /// Public half as a JWK object.
    pub public_jwk: serde_json::Value,
    /// Encrypted private key material.
    pub private_key_cipher: String,
}

/// Service owning signing key state for all orbits.
pub struct KeyService {
    keys: Arc<dyn SigningKeyStorage>,
    config: SigningConfig,
}

impl KeyService {
    /// Creates a new key service.
    pub fn new(keys: Arc<dyn SigningKeyStorage>, config: SigningConfig) -> Self {
        Self { keys, config }
    }

    /// Installs the first signing key for an orbit, effective
    /// immediately.
    ///
    /// # Errors
    ///
    /// Returns an error if the algorithm is not accepted, a key with
    /// an overlapping window already exists, or storage fails.
    pub async fn install_initial(
        &self,
        orbit_id: Uuid,
        material: NewKeyMaterial,
    ) -> AuthResult<SigningKey> {
        let now = OffsetDateTime::now_utc();
        self.install(orbit_id, material, now).await
    }

    /// Rotates the orbit's signing key.
    ///
    /// The current key keeps signing through the grace period; the new
    /// key takes over the instant the grace period ends.
    ///
    /// # Errors
    ///
    /// Returns an error if there is no current key, the algorithm is
    /// not accepted, or storage fails.
    pub async fn rotate(
        &self,
        orbit_id: Uuid,
        material: NewKeyMaterial,
    ) -> AuthResult<SigningKey> {
        let now = OffsetDateTime::now_utc();
        let current = self.effective_key_at(orbit_id, now).await?;
        let handover = now + self.config.rotation_grace;

        self.keys
            .shorten_window(orbit_id, current.id, handover)
            .await?;

        let key = self.install(orbit_id, material, handover).await?;

        tracing::info!(
            orbit_id = %orbit_id,
            old_kid = %current.kid,
            new_kid = %key.kid,
            "Signing key rotated"
        );
        Ok(key)
    }

    /// Returns the key that must sign right now.
    ///
    /// # Errors
    ///
    /// Returns [`AuthError::NoActiveKey`] if no key is effective.
    pub async fn signing_key(&self, orbit_id: Uuid) -> AuthResult<SigningKey> {
        self.effective_key_at(orbit_id, OffsetDateTime::now_utc())
            .await
    }

    /// Returns the keys verifiers should accept: every key whose
    /// window has not been closed for longer than the grace period.
    ///
    /// # Errors
    ///
    /// Returns an error if storage fails.
    pub async fn verification_keys(&self, orbit_id: Uuid) -> AuthResult<Vec<SigningKey>> {
        let cutoff = OffsetDateTime::now_utc() - self.config.rotation_grace;
        let mut keys = self.keys.list(orbit_id).await?;
        keys.retain(|k| k.expires_at > cutoff);
        Ok(keys)
    }

    /// Retires a key outright. Tokens signed with it stop verifying;
    /// use [`Self::rotate`] for a graceful handover.
    ///
    /// # Errors
    ///
    /// Returns an error if the key is unknown or storage fails.
    pub async fn retire(&self, orbit_id: Uuid, kid: &str) -> AuthResult<()> {
        let key = self
            .keys
            .find_by_kid(orbit_id, kid)
            .await?
            .ok_or_else(|| AuthError::not_found("signing key"))?;
        self.keys.deactivate(orbit_id, key.id).await?;
        tracing::info!(orbit_id = %orbit_id, kid = %kid, "Signing key retired");
        Ok(())
    }

    async fn effective_key_at(
        &self,
        orbit_id: Uuid,
        at: OffsetDateTime,
    ) -> AuthResult<SigningKey> {
        let keys = self.keys.list(orbit_id).await?;
        let mut effective = keys.into_iter().filter(|k| k.is_effective_at(at));

        let key = effective
            .next()
            .ok_or_else(|| AuthError::no_active_key("No signing key is currently effective"))?;
        if effective.next().is_some() {
            return Err(AuthError::internal(
                "Multiple signing keys effective at once",
            ));
        }
        Ok(key)
    }

    async fn install(
        &self,
        orbit_id: Uuid,
        material: NewKeyMaterial,
        not_before: OffsetDateTime,
    ) -> AuthResult<SigningKey> {
        if !self.config.algorithms.contains(&material.alg) {
            return Err(AuthError::invalid_request(format!(
                "Unsupported signing algorithm: {}",
                material.alg
            )));
        }

        let expires_at = not_before + self.config.key_lifetime;

        // Write-time overlap rejection keeps the one-effective-key
        // invariant without a read-side tiebreak.
        let existing = self.keys.list(orbit_id).await?;
        if existing
            .iter()
            .any(|k| k.active && k.overlaps(not_before, expires_at))
        {
            return Err(AuthError::conflict(
                "Key validity window overlaps an existing key",
            ));
        }

        let key = SigningKey {
            id: Uuid::new_v4(),
            orbit_id,
            kid: material.kid.unwrap_or_else(|| Uuid::new_v4().to_string()),
            alg: material.alg,
            public_jwk: material.public_jwk,
            private_key_cipher: material.private_key_cipher,
            active: true,
            not_before,
            expires_at,
            created_at: OffsetDateTime::now_utc(),
        };
        self.keys.create(&key).await?;
        Ok(key)
    }
}
