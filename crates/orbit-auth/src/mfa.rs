//! Second-factor lifecycle: TOTP enrollment and recovery codes.
//!
//! The engine does not compute TOTP values; the embedding layer owns
//! the secret cipher and code math and hands in the time step a
//! presented code matched. What the engine enforces is replay safety:
//! the accepted step only ever moves forward, and recovery codes burn
//! on first use.

use std::sync::Arc;

use time::OffsetDateTime;
use uuid::Uuid;

use crate::AuthResult;
use crate::config::MfaConfig;
use crate::error::AuthError;
use crate::storage::{RecoveryCodeStorage, TotpStorage};
use crate::types::{RecoveryCode, TotpSecret};

/// Service owning second-factor credentials.
pub struct MfaService {
    totp: Arc<dyn TotpStorage>,
    recovery_codes: Arc<dyn RecoveryCodeStorage>,
    config: MfaConfig,
}

impl MfaService {
    /// Creates a new MFA service.
    pub fn new(
        totp: Arc<dyn TotpStorage>,
        recovery_codes: Arc<dyn RecoveryCodeStorage>,
        config: MfaConfig,
    ) -> Self {
        Self {
            totp,
            recovery_codes,
            config,
        }
    }

    /// Starts a TOTP enrollment for a user.
    ///
    /// An unconfirmed enrollment is replaced; a confirmed one must be
    /// removed first.
    ///
    /// # Errors
    ///
    /// Returns [`AuthError::Conflict`] if the user already has a
    /// confirmed enrollment.
    pub async fn enroll(
        &self,
        orbit_id: Uuid,
        user_id: Uuid,
        secret_cipher: String,
    ) -> AuthResult<TotpSecret> {
        if let Some(existing) = self.totp.find_by_user(orbit_id, user_id).await? {
            if existing.confirmed {
                return Err(AuthError::conflict("User already has a confirmed TOTP enrollment"));
            }
            self.totp.delete_by_user(orbit_id, user_id).await?;
        }

        let now = OffsetDateTime::now_utc();
        let secret = TotpSecret {
            id: Uuid::new_v4(),
            orbit_id,
            user_id,
            secret_cipher,
            confirmed: false,
            last_step: 0,
            created_at: now,
            updated_at: now,
        };
        self.totp.create(&secret).await?;
        Ok(secret)
    }

    /// Confirms an enrollment with the step of a valid first code.
    ///
    /// The confirming step is consumed, so the same code cannot also
    /// authenticate afterwards.
    ///
    /// # Errors
    ///
    /// Returns an error if no enrollment exists or it is already
    /// confirmed.
    pub async fn confirm(&self, orbit_id: Uuid, user_id: Uuid, step: i64) -> AuthResult<()> {
        let secret = self
            .totp
            .find_by_user(orbit_id, user_id)
            .await?
            .ok_or_else(|| AuthError::not_found("TOTP enrollment"))?;

        if !self.totp.confirm(orbit_id, secret.id).await? {
            return Err(AuthError::invalid_state("Enrollment is already confirmed"));
        }
        if !self.totp.advance_step(orbit_id, secret.id, step).await? {
            return Err(AuthError::AlreadyUsed);
        }

        tracing::info!(orbit_id = %orbit_id, "TOTP enrollment confirmed");
        Ok(())
    }

    /// Accepts a TOTP authentication at the given time step.
    ///
    /// The step must be strictly greater than any previously accepted
    /// step; a replayed or out-of-order code fails even inside its
    /// validity window. Exactly one of two concurrent submissions of
    /// the same code succeeds.
    ///
    /// # Errors
    ///
    /// - [`AuthError::NotFound`] if the user has no enrollment
    /// - [`AuthError::InvalidState`] if the enrollment is unconfirmed
    /// - [`AuthError::AlreadyUsed`] if the step was already consumed
    pub async fn verify_totp(&self, orbit_id: Uuid, user_id: Uuid, step: i64) -> AuthResult<()> {
        let secret = self
            .totp
            .find_by_user(orbit_id, user_id)
            .await?
            .ok_or_else(|| AuthError::not_found("TOTP enrollment"))?;

        if !secret.confirmed {
            return Err(AuthError::invalid_state("Enrollment is not confirmed"));
        }

        if !self.totp.advance_step(orbit_id, secret.id, step).await? {
            return Err(AuthError::AlreadyUsed);
        }
        Ok(())
    }

    /// Issues a fresh batch of recovery codes, invalidating any
    /// previous batch. Returns the plaintext codes; they are shown
    /// once and stored only as hashes.
    ///
    /// # Errors
    ///
    /// Returns an error if storage fails.
    pub async fn issue_recovery_codes(
        &self,
        orbit_id: Uuid,
        user_id: Uuid,
    ) -> AuthResult<Vec<String>> {
        self.recovery_codes.delete_by_user(orbit_id, user_id).await?;

        let now = OffsetDateTime::now_utc();
        let mut plaintexts = Vec::with_capacity(self.config.recovery_code_count);
        let mut records = Vec::with_capacity(self.config.recovery_code_count);

        for _ in 0..self.config.recovery_code_count {
            let code = RecoveryCode::generate_code(self.config.recovery_code_bytes);
            records.push(RecoveryCode {
                id: Uuid::new_v4(),
                orbit_id,
                user_id,
                code_hash: RecoveryCode::hash_code(&code),
                used_at: None,
                created_at: now,
            });
            plaintexts.push(code);
        }

        self.recovery_codes.create_batch(&records).await?;
        tracing::info!(
            orbit_id = %orbit_id,
            count = plaintexts.len(),
            "Recovery codes issued"
        );
        Ok(plaintexts)
    }

    /// Consumes a recovery code. Each code works exactly once.
    ///
    /// # Errors
    ///
    /// Returns [`AuthError::NotFound`] if the code is unknown or
    /// already used; the two cases are deliberately indistinguishable.
    pub async fn use_recovery_code(
        &self,
        orbit_id: Uuid,
        user_id: Uuid,
        code: &str,
    ) -> AuthResult<()> {
        let hash = RecoveryCode::hash_code(code);
        if !self.recovery_codes.consume(orbit_id, user_id, &hash).await? {
            return Err(AuthError::not_found("recovery code"));
        }

        let remaining = self.recovery_codes.count_unused(orbit_id, user_id).await?;
        tracing::info!(orbit_id = %orbit_id, remaining, "Recovery code used");
        Ok(())
    }

    /// Counts the user's unused recovery codes.
    ///
    /// # Errors
    ///
    /// Returns an error if storage fails.
    pub async fn remaining_recovery_codes(&self, orbit_id: Uuid, user_id: Uuid) -> AuthResult<u64> {
        self.recovery_codes.count_unused(orbit_id, user_id).await
    }

    /// Removes a user's TOTP enrollment and recovery codes.
    ///
    /// # Errors
    ///
    /// Returns an error if storage fails.
    pub async fn unenroll(&self, orbit_id: Uuid, user_id: Uuid) -> AuthResult<()> {
        self.totp.delete_by_user(orbit_id, user_id).await?;
        self.recovery_codes.delete_by_user(orbit_id, user_id).await?;
        tracing::info!(orbit_id = %orbit_id, "TOTP enrollment removed");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::sync::RwLock;

    struct MockTotpStorage {
        secrets: RwLock<HashMap<(Uuid, Uuid), TotpSecret>>,
    }

    #[async_trait::async_trait]
    impl TotpStorage for MockTotpStorage {
        async fn create(&self, secret: &TotpSecret) -> AuthResult<()> {
            let mut secrets = self.secrets.write().unwrap();
            if secrets.contains_key(&(secret.orbit_id, secret.user_id)) {
                return Err(AuthError::conflict("Enrollment exists"));
            }
            secrets.insert((secret.orbit_id, secret.user_id), secret.clone());
            Ok(())
        }

        async fn find_by_user(
            &self,
            orbit_id: Uuid,
            user_id: Uuid,
        ) -> AuthResult<Option<TotpSecret>> {
            let secrets = self.secrets.read().unwrap();
            Ok(secrets.get(&(orbit_id, user_id)).cloned())
        }

        async fn confirm(&self, orbit_id: Uuid, id: Uuid) -> AuthResult<bool> {
            let mut secrets = self.secrets.write().unwrap();
            for secret in secrets.values_mut() {
                if secret.orbit_id == orbit_id && secret.id == id {
                    if secret.confirmed {
                        return Ok(false);
                    }
                    secret.confirmed = true;
                    secret.updated_at = OffsetDateTime::now_utc();
                    return Ok(true);
                }
            }
            Ok(false)
        }

        async fn advance_step(&self, orbit_id: Uuid, id: Uuid, step: i64) -> AuthResult<bool> {
            let mut secrets = self.secrets.write().unwrap();
            for secret in secrets.values_mut() {
                if secret.orbit_id == orbit_id && secret.id == id {
                    if step <= secret.last_step {
                        return Ok(false);
                    }
                    secret.last_step = step;
                    secret.updated_at = OffsetDateTime::now_utc();
                    return Ok(true);
                }
            }
            Err(AuthError::not_found("TOTP enrollment"))
        }

        async fn delete_by_user(&self, orbit_id: Uuid, user_id: Uuid) -> AuthResult<bool> {
            let mut secrets = self.secrets.write().unwrap();
            Ok(secrets.remove(&(orbit_id, user_id)).is_some())
        }
    }

    struct MockRecoveryCodeStorage {
        codes: RwLock<Vec<RecoveryCode>>,
    }

    #[async_trait::async_trait]
    impl RecoveryCodeStorage for MockRecoveryCodeStorage {
        async fn create_batch(&self, batch: &[RecoveryCode]) -> AuthResult<()> {
            let mut codes = self.codes.write().unwrap();
            codes.extend_from_slice(batch);
            Ok(())
        }

        async fn consume(
            &self,
            orbit_id: Uuid,
            user_id: Uuid,
            code_hash: &str,
        ) -> AuthResult<bool> {
            let mut codes = self.codes.write().unwrap();
            for code in codes.iter_mut() {
                if code.orbit_id == orbit_id
                    && code.user_id == user_id
                    && code.code_hash == code_hash
                    && code.used_at.is_none()
                {
                    code.used_at = Some(OffsetDateTime::now_utc());
                    return Ok(true);
                }
            }
            Ok(false)
        }

        async fn count_unused(&self, orbit_id: Uuid, user_id: Uuid) -> AuthResult<u64> {
            let codes = self.codes.read().unwrap();
            Ok(codes
                .iter()
                .filter(|c| c.orbit_id == orbit_id && c.user_id == user_id && c.used_at.is_none())
                .count() as u64)
        }

        async fn delete_by_user(&self, orbit_id: Uuid, user_id: Uuid) -> AuthResult<u64> {
            let mut codes = self.codes.write().unwrap();
            let before = codes.len();
            codes.retain(|c| !(c.orbit_id == orbit_id && c.user_id == user_id));
            Ok((before - codes.len()) as u64)
        }
    }

    fn service() -> MfaService {
        MfaService::new(
            Arc::new(MockTotpStorage {
                secrets: RwLock::new(HashMap::new()),
            }),
            Arc::new(MockRecoveryCodeStorage {
                codes: RwLock::new(Vec::new()),
            }),
            MfaConfig::default(),
        )
    }

    #[tokio::test]
    async fn test_enroll_confirm_verify() {
        let svc = service();
        let orbit_id = Uuid::new_v4();
        let user_id = Uuid::new_v4();

        svc.enroll(orbit_id, user_id, "cipher".to_string()).await.unwrap();
        svc.confirm(orbit_id, user_id, 1000).await.unwrap();
        svc.verify_totp(orbit_id, user_id, 1001).await.unwrap();
    }

    #[tokio::test]
    async fn test_step_never_moves_backwards() {
        let svc = service();
        let orbit_id = Uuid::new_v4();
        let user_id = Uuid::new_v4();

        svc.enroll(orbit_id, user_id, "cipher".to_string()).await.unwrap();
        svc.confirm(orbit_id, user_id, 1000).await.unwrap();
        svc.verify_totp(orbit_id, user_id, 1002).await.unwrap();

        // Same step replayed.
        let err = svc.verify_totp(orbit_id, user_id, 1002).await.unwrap_err();
        assert!(matches!(err, AuthError::AlreadyUsed));

        // Earlier step, still inside a typical validity window.
        let err = svc.verify_totp(orbit_id, user_id, 1001).await.unwrap_err();
        assert!(matches!(err, AuthError::AlreadyUsed));
    }

    #[tokio::test]
    async fn test_unconfirmed_enrollment_cannot_authenticate() {
        let svc = service();
        let orbit_id = Uuid::new_v4();
        let user_id = Uuid::new_v4();

        svc.enroll(orbit_id, user_id, "cipher".to_string()).await.unwrap();
        let err = svc.verify_totp(orbit_id, user_id, 1000).await.unwrap_err();
        assert!(matches!(err, AuthError::InvalidState { .. }));
    }

    #[tokio::test]
    async fn test_confirmed_enrollment_blocks_re_enroll() {
        let svc = service();
        let orbit_id = Uuid::new_v4();
        let user_id = Uuid::new_v4();

        svc.enroll(orbit_id, user_id, "cipher".to_string()).await.unwrap();
        svc.confirm(orbit_id, user_id, 1000).await.unwrap();

        let err = svc
            .enroll(orbit_id, user_id, "cipher2".to_string())
            .await
            .unwrap_err();
        assert!(matches!(err, AuthError::Conflict { .. }));
    }

    #[tokio::test]
    async fn test_recovery_code_burns_on_use() {
        let svc = service();
        let orbit_id = Uuid::new_v4();
        let user_id = Uuid::new_v4();

        let codes = svc.issue_recovery_codes(orbit_id, user_id).await.unwrap();
        assert_eq!(codes.len(), MfaConfig::default().recovery_code_count);

        svc.use_recovery_code(orbit_id, user_id, &codes[0]).await.unwrap();
        let err = svc
            .use_recovery_code(orbit_id, user_id, &codes[0])
            .await
            .unwrap_err();
        assert!(matches!(err, AuthError::NotFound { .. }));

        assert_eq!(
            svc.remaining_recovery_codes(orbit_id, user_id).await.unwrap(),
            (codes.len() - 1) as u64
        );
    }

    #[tokio::test]
    async fn test_reissue_invalidates_previous_batch() {
        let svc = service();
        let orbit_id = Uuid::new_v4();
        let user_id = Uuid::new_v4();

        let old = svc.issue_recovery_codes(orbit_id, user_id).await.unwrap();
        let _new = svc.issue_recovery_codes(orbit_id, user_id).await.unwrap();

        let err = svc
            .use_recovery_code(orbit_id, user_id, &old[0])
            .await
            .unwrap_err();
        assert!(matches!(err, AuthError::NotFound { .. }));
    }
}
