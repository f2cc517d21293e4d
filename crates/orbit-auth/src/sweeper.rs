//! Background cleanup of expired records.
//!
//! Expiry in this crate is checked lazily on read; the sweeper exists
//! so dead rows do not pile up. Nothing correctness-critical depends
//! on it running: revocation ledger entries are only removed after the
//! tokens they refer to are expired anyway.

use std::sync::Arc;

use time::OffsetDateTime;

use crate::AuthResult;
use crate::config::SweeperConfig;
use crate::storage::{
    AccessTokenStorage, AuthorizationCodeStorage, ConsentStorage, DeviceCodeStorage,
    IntrospectionCacheStorage, RefreshTokenStorage, RevocationLedgerStorage, SessionStorage,
};

/// Counts of records removed by one sweep.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct SweepReport {
    pub authorization_codes: u64,
    pub device_codes: u64,
    pub access_tokens: u64,
    pub refresh_tokens: u64,
    pub sessions: u64,
    pub ledger_records: u64,
    pub cache_entries: u64,
    pub consents: u64,
}

impl SweepReport {
    /// Total records removed.
    #[must_use]
    pub fn total(&self) -> u64 {
        self.authorization_codes
            + self.device_codes
            + self.access_tokens
            + self.refresh_tokens
            + self.sessions
            + self.ledger_records
            + self.cache_entries
            + self.consents
    }
}

/// Periodic cleaner for every expiring store.
pub struct ExpirySweeper {
    authorization_codes: Arc<dyn AuthorizationCodeStorage>,
    device_codes: Arc<dyn DeviceCodeStorage>,
    access_tokens: Arc<dyn AccessTokenStorage>,
    refresh_tokens: Arc<dyn RefreshTokenStorage>,
    sessions: Arc<dyn SessionStorage>,
    ledger: Arc<dyn RevocationLedgerStorage>,
    cache: Arc<dyn IntrospectionCacheStorage>,
    consents: Arc<dyn ConsentStorage>,
    config: SweeperConfig,
}

impl ExpirySweeper {
    /// Creates a sweeper over the given stores.
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        authorization_codes: Arc<dyn AuthorizationCodeStorage>,
        device_codes: Arc<dyn DeviceCodeStorage>,
        access_tokens: Arc<dyn AccessTokenStorage>,
        refresh_tokens: Arc<dyn RefreshTokenStorage>,
        sessions: Arc<dyn SessionStorage>,
        ledger: Arc<dyn RevocationLedgerStorage>,
        cache: Arc<dyn IntrospectionCacheStorage>,
        consents: Arc<dyn ConsentStorage>,
        config: SweeperConfig,
    ) -> Self {
        Self {
            authorization_codes,
            device_codes,
            access_tokens,
            refresh_tokens,
            sessions,
            ledger,
            cache,
            consents,
            config,
        }
    }

    /// Removes expired records from every store once.
    ///
    /// # Errors
    ///
    /// Returns the first storage error encountered; stores already
    /// swept in this pass stay swept.
    pub async fn sweep_once(&self) -> AuthResult<SweepReport> {
        let now = OffsetDateTime::now_utc();

        let report = SweepReport {
            authorization_codes: self.authorization_codes.cleanup_expired(now).await?,
            device_codes: self.device_codes.cleanup_expired(now).await?,
            access_tokens: self.access_tokens.cleanup_expired(now).await?,
            refresh_tokens: self.refresh_tokens.cleanup_expired(now).await?,
            sessions: self.sessions.cleanup_expired(now).await?,
            ledger_records: self.ledger.cleanup_expired(now).await?,
            cache_entries: self.cache.cleanup_expired(now).await?,
            consents: self.consents.cleanup_expired(now).await?,
        };

        if report.total() > 0 {
            tracing::debug!(removed = report.total(), "Expiry sweep completed");
        }
        Ok(report)
    }

    /// Runs the sweeper until the task is aborted.
    ///
    /// Returns immediately when the sweeper is disabled in config.
    /// Storage errors are logged and the loop keeps going; a flaky
    /// backend should not kill cleanup forever.
    pub fn spawn(self: Arc<Self>) -> Option<tokio::task::JoinHandle<()>> {
        if !self.config.enabled {
            return None;
        }

        let interval = self.config.interval;
        Some(tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
            loop {
                ticker.tick().await;
                if let Err(e) = self.sweep_once().await {
                    tracing::warn!(error = %e, "Expiry sweep failed");
                }
            }
        }))
    }
}
