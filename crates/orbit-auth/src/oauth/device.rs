//! Device authorization grant (RFC 8628).
//!
//! The device holds the long random device code and polls the token
//! endpoint; the user enters the short user code elsewhere to approve
//! or deny. Terminal states are sticky: once consumed, denied, or
//! expired, a request never changes again.

use std::sync::Arc;

use time::OffsetDateTime;
use uuid::Uuid;

use crate::AuthResult;
use crate::config::DeviceFlowConfig;
use crate::error::AuthError;
use crate::storage::{ClientStorage, DeviceCodeStorage};
use crate::types::{DeviceCode, DeviceCodeStatus, GrantType};

/// How many times to retry user-code generation on collision.
const USER_CODE_ATTEMPTS: usize = 5;

/// Response to a device authorization start request.
#[derive(Debug, Clone)]
pub struct StartDeviceAuthResponse {
    /// Long device code the device polls with. Shown once.
    pub device_code: String,
    /// Short code the user enters on the verification page.
    pub user_code: String,
    /// Seconds until the request expires.
    pub expires_in: u64,
    /// Minimum seconds between polls.
    pub interval: u64,
}

/// The outcome of a successful poll on an approved request.
#[derive(Debug, Clone)]
pub struct DeviceGrant {
    /// Orbit the grant belongs to.
    pub orbit_id: Uuid,
    /// Client the request was started by.
    pub client_id: String,
    /// User who approved the request.
    pub user_id: Uuid,
    /// Granted scopes.
    pub scopes: Vec<String>,
}

/// Service for the device authorization grant.
pub struct DeviceCodeService {
    clients: Arc<dyn ClientStorage>,
    codes: Arc<dyn DeviceCodeStorage>,
    config: DeviceFlowConfig,
}

impl DeviceCodeService {
    /// Creates a new device code service.
    pub fn new(
        clients: Arc<dyn ClientStorage>,
        codes: Arc<dyn DeviceCodeStorage>,
        config: DeviceFlowConfig,
    ) -> Self {
        Self {
            clients,
            codes,
            config,
        }
    }

    /// Starts a device authorization request.
    ///
    /// # Errors
    ///
    /// Returns an error if the client is unknown, inactive, not
    /// allowed the device grant, or requests a disallowed scope.
    pub async fn start(
        &self,
        orbit_id: Uuid,
        client_id: &str,
        scopes: Vec<String>,
    ) -> AuthResult<StartDeviceAuthResponse> {
        // 1. Validate the client
        let client = self
            .clients
            .find(orbit_id, client_id)
            .await?
            .ok_or_else(|| AuthError::invalid_client("Unknown client"))?;

        if !client.active {
            return Err(AuthError::invalid_client("Client is disabled"));
        }

        if !client.is_grant_type_allowed(GrantType::DeviceCode) {
            return Err(AuthError::invalid_client(
                "Client is not allowed the device_code grant",
            ));
        }

        for scope in &scopes {
            if !client.is_scope_allowed(scope) {
                return Err(AuthError::scope_escalation(format!(
                    "Scope not permitted for client: {scope}"
                )));
            }
        }

        // 2. Mint codes; retry the short user code on collision
        let device_code = DeviceCode::generate_device_code();
        let now = OffsetDateTime::now_utc();

        let mut last_err = None;
        for _ in 0..USER_CODE_ATTEMPTS {
            let record = DeviceCode {
                id: Uuid::new_v4(),
                orbit_id,
                client_id: client_id.to_string(),
                device_code_hash: DeviceCode::hash_device_code(&device_code),
                user_code: DeviceCode::generate_user_code(self.config.user_code_length),
                scopes: scopes.clone(),
                poll_interval_secs: self.config.poll_interval.as_secs(),
                status: DeviceCodeStatus::Pending,
                user_id: None,
                last_polled_at: None,
                created_at: now,
                expires_at: now + self.config.code_lifetime,
            };

            match self.codes.create(&record).await {
                Ok(()) => {
                    tracing::debug!(
                        orbit_id = %orbit_id,
                        client_id = %client_id,
                        "Started device authorization"
                    );
                    return Ok(StartDeviceAuthResponse {
                        device_code,
                        user_code: record.user_code,
                        expires_in: self.config.code_lifetime.as_secs(),
                        interval: record.poll_interval_secs,
                    });
                }
                Err(e @ AuthError::Conflict { .. }) => last_err = Some(e),
                Err(e) => return Err(e),
            }
        }

        Err(last_err.unwrap_or_else(|| AuthError::internal("User code generation failed")))
    }

    /// Approves a pending request identified by its user code.
    ///
    /// # Errors
    ///
    /// Returns an error if the code is unknown, expired, or no longer
    /// pending.
    pub async fn approve(&self, orbit_id: Uuid, user_code: &str, user_id: Uuid) -> AuthResult<()> {
        let record = self.find_live_by_user_code(orbit_id, user_code).await?;

        let moved = self
            .codes
            .transition(
                orbit_id,
                record.id,
                DeviceCodeStatus::Pending,
                DeviceCodeStatus::Approved,
                Some(user_id),
            )
            .await?;
        if !moved {
            return Err(AuthError::invalid_state(
                "Device authorization has already been decided",
            ));
        }

        tracing::info!(
            orbit_id = %orbit_id,
            client_id = %record.client_id,
            "Device authorization approved"
        );
        Ok(())
    }

    /// Denies a pending request identified by its user code.
    ///
    /// # Errors
    ///
    /// Returns an error if the code is unknown, expired, or no longer
    /// pending.
    pub async fn deny(&self, orbit_id: Uuid, user_code: &str) -> AuthResult<()> {
        let record = self.find_live_by_user_code(orbit_id, user_code).await?;

        let moved = self
            .codes
            .transition(
                orbit_id,
                record.id,
                DeviceCodeStatus::Pending,
                DeviceCodeStatus::Denied,
                None,
            )
            .await?;
        if !moved {
            return Err(AuthError::invalid_state(
                "Device authorization has already been decided",
            ));
        }

        tracing::info!(
            orbit_id = %orbit_id,
            client_id = %record.client_id,
            "Device authorization denied"
        );
        Ok(())
    }

    /// Polls with a device code, consuming the grant if approved.
    ///
    /// # Errors
    ///
    /// - [`AuthError::SlowDown`] when polled before the interval elapsed
    /// - [`AuthError::AuthorizationPending`] while the user has not decided
    /// - [`AuthError::AccessDenied`] when the user denied
    /// - [`AuthError::Expired`] when the request expired
    /// - [`AuthError::AlreadyUsed`] when the grant was already collected
    pub async fn poll(
        &self,
        orbit_id: Uuid,
        device_code: &str,
        client_id: &str,
    ) -> AuthResult<DeviceGrant> {
        let hash = DeviceCode::hash_device_code(device_code);
        let record = self
            .codes
            .find_by_device_code_hash(orbit_id, &hash)
            .await?
            .ok_or_else(|| AuthError::not_found("device code"))?;

        // 1. The code is only meaningful to the client that started it
        if record.client_id != client_id {
            return Err(AuthError::not_found("device code"));
        }

        let now = OffsetDateTime::now_utc();

        // 2. Lazy expiry of non-terminal requests
        if !record.status.is_terminal() && record.is_expired() {
            // Best-effort; a lost race means someone else expired it.
            let _ = self
                .codes
                .transition(orbit_id, record.id, record.status, DeviceCodeStatus::Expired, None)
                .await?;
            return Err(AuthError::Expired);
        }

        // 3. Enforce the poll interval against the previous poll
        let too_fast = record.last_polled_at.is_some_and(|last| {
            (now - last).whole_seconds() < record.poll_interval_secs as i64
        });
        self.codes.record_poll(orbit_id, record.id, now).await?;
        if too_fast {
            return Err(AuthError::SlowDown);
        }

        // 4. Map status to outcome
        match record.status {
            DeviceCodeStatus::Pending => Err(AuthError::AuthorizationPending),
            DeviceCodeStatus::Denied => Err(AuthError::AccessDenied),
            DeviceCodeStatus::Expired => Err(AuthError::Expired),
            DeviceCodeStatus::Consumed => Err(AuthError::AlreadyUsed),
            DeviceCodeStatus::Approved => {
                // Collect at most once.
                let won = self
                    .codes
                    .transition(
                        orbit_id,
                        record.id,
                        DeviceCodeStatus::Approved,
                        DeviceCodeStatus::Consumed,
                        None,
                    )
                    .await?;
                if !won {
                    return Err(AuthError::AlreadyUsed);
                }

                let user_id = record
                    .user_id
                    .ok_or_else(|| AuthError::internal("Approved device code without user"))?;

                tracing::debug!(
                    orbit_id = %orbit_id,
                    client_id = %client_id,
                    "Device grant collected"
                );

                Ok(DeviceGrant {
                    orbit_id: record.orbit_id,
                    client_id: record.client_id,
                    user_id,
                    scopes: record.scopes,
                })
            }
        }
    }

    /// Looks up a user code and lazily expires it when overdue.
    async fn find_live_by_user_code(
        &self,
        orbit_id: Uuid,
        user_code: &str,
    ) -> AuthResult<DeviceCode> {
        let record = self
            .codes
            .find_by_user_code(orbit_id, user_code)
            .await?
            .ok_or_else(|| AuthError::not_found("user code"))?;

        if !record.status.is_terminal() && record.is_expired() {
            let _ = self
                .codes
                .transition(orbit_id, record.id, record.status, DeviceCodeStatus::Expired, None)
                .await?;
            return Err(AuthError::Expired);
        }

        Ok(record)
    }
}
