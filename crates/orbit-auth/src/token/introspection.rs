//! Token introspection (RFC 7662) with a bounded response cache.
//!
//! Cache entries live for at most the configured TTL, and never past
//! the token's own expiry. Revocations invalidate the cache through
//! [`RevocationService`], so a hit is always safe to serve.

use std::sync::Arc;

use time::OffsetDateTime;
use uuid::Uuid;

use crate::AuthResult;
use crate::config::IntrospectionConfig;
use crate::storage::{AccessTokenStorage, IntrospectionCacheStorage};
use crate::token::ledger::RevocationService;
use crate::types::IntrospectionEntry;

/// Service answering introspection queries by JTI.
pub struct IntrospectionService {
    access_tokens: Arc<dyn AccessTokenStorage>,
    cache: Arc<dyn IntrospectionCacheStorage>,
    revocation: Arc<RevocationService>,
    config: IntrospectionConfig,
}

impl IntrospectionService {
    /// Creates a new introspection service.
    pub fn new(
        access_tokens: Arc<dyn AccessTokenStorage>,
        cache: Arc<dyn IntrospectionCacheStorage>,
        revocation: Arc<RevocationService>,
        config: IntrospectionConfig,
    ) -> Self {
        Self {
            access_tokens,
            cache,
            revocation,
            config,
        }
    }

    /// Introspects an access token by JTI.
    ///
    /// Returns the RFC 7662 response body. Unknown tokens yield
    /// `{"active": false}` and are not cached, so probing cannot fill
    /// the cache with garbage.
    ///
    /// # Errors
    ///
    /// Returns an error if storage fails.
    pub async fn introspect(&self, orbit_id: Uuid, jti: &str) -> AuthResult<serde_json::Value> {
        // 1. Serve from cache when fresh
        if let Some(entry) = self.cache.get(orbit_id, jti).await?
            && !entry.is_expired()
        {
            return Ok(entry.response);
        }

        // 2. Resolve against the record and the ledger
        let Some(record) = self.access_tokens.find_by_jti(orbit_id, jti).await? else {
            return Ok(serde_json::json!({ "active": false }));
        };

        let revoked = self.revocation.is_revoked(orbit_id, jti).await?;
        let active = record.is_valid() && !revoked;

        let response = if active {
            serde_json::json!({
                "active": true,
                "client_id": record.client_id,
                "scope": record.scopes.join(" "),
                "sub": record.user_id.map(|u| u.to_string()),
                "exp": record.expires_at.unix_timestamp(),
                "iat": record.issued_at.unix_timestamp(),
                "jti": record.jti,
                "token_type": "Bearer",
            })
        } else {
            serde_json::json!({ "active": false })
        };

        // 3. Cache, capped at the token's own expiry
        let now = OffsetDateTime::now_utc();
        let cache_until = (now + self.config.cache_ttl).min(record.expires_at);
        if cache_until > now {
            self.cache
                .put(&IntrospectionEntry {
                    jti: jti.to_string(),
                    orbit_id,
                    active,
                    response: response.clone(),
                    created_at: now,
                    expires_at: cache_until,
                })
                .await?;
        }

        Ok(response)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::token::ledger::tests::{MockCacheStorage, MockLedgerStorage};
    use crate::token::service::tests::MockAccessTokenStorage;
    use crate::types::{AccessToken, TokenType};
    use time::Duration;

    struct Fixture {
        service: IntrospectionService,
        access_tokens: Arc<MockAccessTokenStorage>,
        cache: Arc<MockCacheStorage>,
        revocation: Arc<RevocationService>,
    }

    fn fixture() -> Fixture {
        let access_tokens = Arc::new(MockAccessTokenStorage::new());
        let cache = Arc::new(MockCacheStorage::new());
        let revocation = Arc::new(RevocationService::new(
            Arc::new(MockLedgerStorage::new()),
            cache.clone(),
        ));
        Fixture {
            service: IntrospectionService::new(
                access_tokens.clone(),
                cache.clone(),
                revocation.clone(),
                IntrospectionConfig::default(),
            ),
            access_tokens,
            cache,
            revocation,
        }
    }

    fn token(orbit_id: Uuid, lifetime: Duration) -> AccessToken {
        let now = OffsetDateTime::now_utc();
        AccessToken {
            jti: Uuid::new_v4().to_string(),
            orbit_id,
            client_id: "app".to_string(),
            user_id: Some(Uuid::new_v4()),
            scopes: vec!["openid".to_string()],
            refresh_token_id: None,
            issued_at: now,
            expires_at: now + lifetime,
            revoked_at: None,
        }
    }

    #[tokio::test]
    async fn test_active_token_introspects_true() {
        let f = fixture();
        let orbit_id = Uuid::new_v4();
        let t = token(orbit_id, Duration::hours(1));
        f.access_tokens.create(&t).await.unwrap();

        let response = f.service.introspect(orbit_id, &t.jti).await.unwrap();
        assert_eq!(response["active"], true);
        assert_eq!(response["scope"], "openid");
    }

    #[tokio::test]
    async fn test_unknown_token_is_inactive_and_uncached() {
        let f = fixture();
        let orbit_id = Uuid::new_v4();

        let response = f.service.introspect(orbit_id, "no-such-jti").await.unwrap();
        assert_eq!(response["active"], false);
        assert!(f.cache.get(orbit_id, "no-such-jti").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_response_is_cached() {
        let f = fixture();
        let orbit_id = Uuid::new_v4();
        let t = token(orbit_id, Duration::hours(1));
        f.access_tokens.create(&t).await.unwrap();

        f.service.introspect(orbit_id, &t.jti).await.unwrap();
        let entry = f.cache.get(orbit_id, &t.jti).await.unwrap().unwrap();
        assert!(entry.active);
    }

    #[tokio::test]
    async fn test_cache_ttl_capped_at_token_expiry() {
        let f = fixture();
        let orbit_id = Uuid::new_v4();
        // Token expires well before the 60s cache TTL.
        let t = token(orbit_id, Duration::seconds(5));
        f.access_tokens.create(&t).await.unwrap();

        f.service.introspect(orbit_id, &t.jti).await.unwrap();
        let entry = f.cache.get(orbit_id, &t.jti).await.unwrap().unwrap();
        assert!(entry.expires_at <= t.expires_at);
    }

    #[tokio::test]
    async fn test_revocation_invalidates_cached_response() {
        let f = fixture();
        let orbit_id = Uuid::new_v4();
        let t = token(orbit_id, Duration::hours(1));
        f.access_tokens.create(&t).await.unwrap();

        let response = f.service.introspect(orbit_id, &t.jti).await.unwrap();
        assert_eq!(response["active"], true);

        f.revocation
            .revoke(orbit_id, &t.jti, TokenType::Access, "logout", t.expires_at)
            .await
            .unwrap();

        let response = f.service.introspect(orbit_id, &t.jti).await.unwrap();
        assert_eq!(response["active"], false);
    }
}
