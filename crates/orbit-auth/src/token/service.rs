//! Token issuance and refresh rotation.
//!
//! Refresh tokens rotate on every use: the presented token is revoked
//! and linked to its successor in one conditional write
//! (`begin_rotation`), which is the commit point of the whole
//! operation. The successor is created before the commit, so a
//! cancelled or lost rotation leaves at worst an orphaned record whose
//! plaintext was never released.
//!
//! Presenting a token that was already rotated is treated as theft:
//! every live descendant of the chain is revoked and the caller gets
//! [`AuthError::TokenReuseDetected`].

use std::collections::HashSet;
use std::sync::Arc;

use time::OffsetDateTime;
use uuid::Uuid;

use crate::AuthResult;
use crate::audit::AuditLog;
use crate::config::OAuthConfig;
use crate::error::AuthError;
use crate::storage::{AccessTokenStorage, RefreshTokenStorage, SessionStorage};
use crate::token::ledger::RevocationService;
use crate::types::{AccessToken, GrantType, RefreshToken, TokenType};

/// A validated grant, ready to be turned into tokens.
#[derive(Debug, Clone)]
pub struct TokenGrant {
    /// Orbit the grant belongs to.
    pub orbit_id: Uuid,
    /// Client receiving the tokens.
    pub client_id: String,
    /// User the tokens act for (None for client credentials).
    pub user_id: Option<Uuid>,
    /// Granted scopes.
    pub scopes: Vec<String>,
    /// Session to bind the refresh chain to, if any.
    pub session_id: Option<Uuid>,
    /// Grant type that produced this grant.
    pub grant_type: GrantType,
}

/// Freshly issued tokens.
///
/// `refresh_token` is the only copy of the plaintext refresh token;
/// storage keeps its hash.
#[derive(Debug, Clone)]
pub struct IssuedTokens {
    /// The access token record. JWT encoding is the embedding layer's job.
    pub access: AccessToken,
    /// The refresh token record, absent for client credentials.
    pub refresh: Option<RefreshToken>,
    /// Plaintext refresh token, absent for client credentials.
    pub refresh_token: Option<String>,
}

/// Service owning token issuance and the refresh rotation state machine.
pub struct TokenService {
    access_tokens: Arc<dyn AccessTokenStorage>,
    refresh_tokens: Arc<dyn RefreshTokenStorage>,
    sessions: Arc<dyn SessionStorage>,
    revocation: Arc<RevocationService>,
    audit: AuditLog,
    config: OAuthConfig,
}

impl TokenService {
    /// Creates a new token service.
    pub fn new(
        access_tokens: Arc<dyn AccessTokenStorage>,
        refresh_tokens: Arc<dyn RefreshTokenStorage>,
        sessions: Arc<dyn SessionStorage>,
        revocation: Arc<RevocationService>,
        audit: AuditLog,
        config: OAuthConfig,
    ) -> Self {
        Self {
            access_tokens,
            refresh_tokens,
            sessions,
            revocation,
            audit,
            config,
        }
    }

    /// Issues tokens for a validated grant.
    ///
    /// Client credentials grants get an access token only; every other
    /// grant also starts a fresh refresh chain.
    ///
    /// # Errors
    ///
    /// Returns an error if the storage operations fail.
    pub async fn issue(&self, grant: &TokenGrant) -> AuthResult<IssuedTokens> {
        let now = OffsetDateTime::now_utc();

        let (refresh, refresh_token, refresh_id) =
            if grant.grant_type == GrantType::ClientCredentials {
                (None, None, None)
            } else {
                let plaintext = RefreshToken::generate_token();
                let record = RefreshToken {
                    id: Uuid::new_v4(),
                    jti: Uuid::new_v4().to_string(),
                    token_hash: RefreshToken::hash_token(&plaintext),
                    orbit_id: grant.orbit_id,
                    client_id: grant.client_id.clone(),
                    user_id: grant.user_id,
                    session_id: grant.session_id,
                    scopes: grant.scopes.clone(),
                    rotated_from: None,
                    rotated_to: None,
                    use_count: 0,
                    last_used_at: None,
                    created_at: now,
                    expires_at: now + self.config.refresh_token_lifetime,
                    revoked_at: None,
                };
                self.refresh_tokens.create(&record).await?;
                let id = record.id;
                (Some(record), Some(plaintext), Some(id))
            };

        let access = self
            .create_access_token(grant, refresh_id, now)
            .await?;

        self.audit.token_issued(
            grant.orbit_id,
            &grant.client_id,
            &access.jti,
            grant.grant_type.as_str(),
        );

        Ok(IssuedTokens {
            access,
            refresh,
            refresh_token,
        })
    }

    /// Rotates a presented refresh token.
    ///
    /// On success the presented token is dead and the returned tokens
    /// replace it. `requested_scopes` may narrow but never widen the
    /// chain's scope set; `None` inherits it unchanged.
    ///
    /// # Errors
    ///
    /// - [`AuthError::TokenReuseDetected`] if the token was already
    ///   rotated; the remaining chain is revoked as a side effect
    /// - [`AuthError::Revoked`] / [`AuthError::Expired`] for dead tokens
    /// - [`AuthError::ScopeEscalation`] if the requested scopes are not
    ///   a subset of the chain's
    pub async fn rotate(
        &self,
        orbit_id: Uuid,
        presented: &str,
        requested_scopes: Option<Vec<String>>,
    ) -> AuthResult<IssuedTokens> {
        let result = self
            .rotate_inner(orbit_id, presented, requested_scopes)
            .await;

        if let Err(ref e) = result {
            // Client id is unknown for unparseable tokens; audit what we have.
            self.audit.grant_failed(orbit_id, "", e);
        }
        result
    }

    async fn rotate_inner(
        &self,
        orbit_id: Uuid,
        presented: &str,
        requested_scopes: Option<Vec<String>>,
    ) -> AuthResult<IssuedTokens> {
        // 1. Look up by hash
        let hash = RefreshToken::hash_token(presented);
        let current = self
            .refresh_tokens
            .find_by_hash(orbit_id, &hash)
            .await?
            .ok_or_else(|| AuthError::not_found("refresh token"))?;

        // 2. A rotated token coming back is theft
        if current.is_reuse() {
            self.cascade_revoke_descendants(&current).await?;
            return Err(AuthError::TokenReuseDetected);
        }

        // The ledger is authoritative even if the row flag lags behind
        if current.is_revoked() || self.revocation.is_revoked(orbit_id, &current.jti).await? {
            return Err(AuthError::Revoked);
        }

        if current.is_expired() {
            return Err(AuthError::Expired);
        }

        // 3. A dead session kills its chains
        if let Some(session_id) = current.session_id {
            let session = self.sessions.find_by_id(orbit_id, session_id).await?;
            if !session.is_some_and(|s| s.is_active()) {
                self.revoke_refresh_record(&current, "session_ended").await?;
                return Err(AuthError::Revoked);
            }
        }

        // 4. Scopes may shrink, never grow
        let scopes = match requested_scopes {
            None => current.scopes.clone(),
            Some(requested) => {
                let held: HashSet<&str> = current.scopes.iter().map(String::as_str).collect();
                if let Some(extra) = requested.iter().find(|s| !held.contains(s.as_str())) {
                    return Err(AuthError::scope_escalation(format!(
                        "Scope not held by refresh token: {extra}"
                    )));
                }
                requested
            }
        };

        // 5. Create the successor before committing the rotation
        let now = OffsetDateTime::now_utc();
        let plaintext = RefreshToken::generate_token();
        let successor = RefreshToken {
            id: Uuid::new_v4(),
            jti: Uuid::new_v4().to_string(),
            token_hash: RefreshToken::hash_token(&plaintext),
            orbit_id,
            client_id: current.client_id.clone(),
            user_id: current.user_id,
            session_id: current.session_id,
            scopes: scopes.clone(),
            rotated_from: Some(current.id),
            rotated_to: None,
            use_count: 0,
            last_used_at: None,
            created_at: now,
            expires_at: now + self.config.refresh_token_lifetime,
            revoked_at: None,
        };
        self.refresh_tokens.create(&successor).await?;

        // 6. Commit point: exactly one concurrent rotation wins
        let won = self
            .refresh_tokens
            .begin_rotation(orbit_id, current.id, successor.id, now)
            .await?;
        if !won {
            // Someone else rotated or revoked it between our read and
            // the commit. Re-read and classify; our successor stays
            // orphaned and its plaintext is dropped here.
            let fresh = self
                .refresh_tokens
                .find_by_id(orbit_id, current.id)
                .await?
                .ok_or_else(|| AuthError::not_found("refresh token"))?;
            if fresh.is_reuse() {
                self.cascade_revoke_descendants(&fresh).await?;
                return Err(AuthError::TokenReuseDetected);
            }
            return Err(AuthError::Revoked);
        }

        // 7. Bookkeeping on the now-dead predecessor
        self.revocation
            .revoke(orbit_id, &current.jti, TokenType::Refresh, "rotated", current.expires_at)
            .await?;
        self.refresh_tokens.record_use(orbit_id, current.id, now).await?;

        // 8. Fresh access token under the successor
        let grant = TokenGrant {
            orbit_id,
            client_id: current.client_id.clone(),
            user_id: current.user_id,
            scopes,
            session_id: current.session_id,
            grant_type: GrantType::RefreshToken,
        };
        let access = self.create_access_token(&grant, Some(successor.id), now).await?;

        self.audit.token_issued(
            orbit_id,
            &current.client_id,
            &access.jti,
            GrantType::RefreshToken.as_str(),
        );

        Ok(IssuedTokens {
            access,
            refresh: Some(successor),
            refresh_token: Some(plaintext),
        })
    }

    /// Revokes a presented refresh token (RFC 7009 style).
    ///
    /// Revokes the token and the access tokens issued under it. A
    /// token that is already dead is not an error; revocation is
    /// idempotent from the caller's view.
    ///
    /// # Errors
    ///
    /// Returns an error only if storage fails; unknown tokens succeed
    /// silently to avoid token scanning.
    pub async fn revoke_presented(&self, orbit_id: Uuid, presented: &str, reason: &str) -> AuthResult<()> {
        let hash = RefreshToken::hash_token(presented);
        let Some(record) = self.refresh_tokens.find_by_hash(orbit_id, &hash).await? else {
            return Ok(());
        };
        self.revoke_refresh_record(&record, reason).await?;
        Ok(())
    }

    /// Revokes an access token by JTI.
    ///
    /// # Errors
    ///
    /// Returns an error if the token is unknown or storage fails.
    pub async fn revoke_access_token(
        &self,
        orbit_id: Uuid,
        jti: &str,
        reason: &str,
    ) -> AuthResult<()> {
        let record = self
            .access_tokens
            .find_by_jti(orbit_id, jti)
            .await?
            .ok_or_else(|| AuthError::not_found("access token"))?;

        self.access_tokens.revoke(orbit_id, jti, OffsetDateTime::now_utc()).await?;
        self.revocation
            .revoke(orbit_id, jti, TokenType::Access, reason, record.expires_at)
            .await?;
        self.audit.token_revoked(orbit_id, jti, TokenType::Access, reason);
        Ok(())
    }

    /// Revokes every refresh chain bound to a session.
    ///
    /// Returns the number of refresh tokens revoked.
    ///
    /// # Errors
    ///
    /// Returns an error if storage fails.
    pub async fn revoke_session_tokens(
        &self,
        orbit_id: Uuid,
        session_id: Uuid,
        reason: &str,
    ) -> AuthResult<u64> {
        let tokens = self.refresh_tokens.list_by_session(orbit_id, session_id).await?;
        let mut revoked = 0;
        for token in &tokens {
            if !token.is_revoked() {
                self.revoke_refresh_record(token, reason).await?;
                revoked += 1;
            }
        }
        Ok(revoked)
    }

    /// Revokes every refresh chain a user holds, whether or not it is
    /// bound to a session.
    ///
    /// Used by global sign-out. Returns the number of refresh tokens
    /// revoked.
    ///
    /// # Errors
    ///
    /// Returns an error if storage fails.
    pub async fn revoke_user_tokens(
        &self,
        orbit_id: Uuid,
        user_id: Uuid,
        reason: &str,
    ) -> AuthResult<u64> {
        let tokens = self.refresh_tokens.list_by_user(orbit_id, user_id).await?;
        let mut revoked = 0;
        for token in &tokens {
            if !token.is_revoked() {
                self.revoke_refresh_record(token, reason).await?;
                revoked += 1;
            }
        }
        Ok(revoked)
    }

    /// Revokes every refresh chain a (user, client) pair holds.
    ///
    /// Used by consent revocation. Returns the number of refresh
    /// tokens revoked.
    ///
    /// # Errors
    ///
    /// Returns an error if storage fails.
    pub async fn revoke_user_client_tokens(
        &self,
        orbit_id: Uuid,
        user_id: Uuid,
        client_id: &str,
        reason: &str,
    ) -> AuthResult<u64> {
        let tokens = self
            .refresh_tokens
            .list_by_user_client(orbit_id, user_id, client_id)
            .await?;
        let mut revoked = 0;
        for token in &tokens {
            if !token.is_revoked() {
                self.revoke_refresh_record(token, reason).await?;
                revoked += 1;
            }
        }
        Ok(revoked)
    }

    /// Returns `true` if an access token is currently valid: known,
    /// unexpired, unrevoked, and absent from the revocation ledger.
    ///
    /// # Errors
    ///
    /// Returns an error if storage fails.
    pub async fn is_active(&self, orbit_id: Uuid, jti: &str) -> AuthResult<bool> {
        // Ledger first; it is the authority on revocation
        if self.revocation.is_revoked(orbit_id, jti).await? {
            return Ok(false);
        }
        let Some(record) = self.access_tokens.find_by_jti(orbit_id, jti).await? else {
            return Ok(false);
        };
        Ok(record.is_valid())
    }

    /// Revokes one refresh token record plus its access tokens.
    async fn revoke_refresh_record(&self, token: &RefreshToken, reason: &str) -> AuthResult<()> {
        let now = OffsetDateTime::now_utc();
        self.refresh_tokens.revoke(token.orbit_id, token.id, now).await?;
        self.revocation
            .revoke(token.orbit_id, &token.jti, TokenType::Refresh, reason, token.expires_at)
            .await?;
        self.audit
            .token_revoked(token.orbit_id, &token.jti, TokenType::Refresh, reason);

        for access in self
            .access_tokens
            .list_by_refresh_token(token.orbit_id, token.id)
            .await?
        {
            if !access.is_revoked() {
                self.access_tokens.revoke(token.orbit_id, &access.jti, now).await?;
                self.revocation
                    .revoke(token.orbit_id, &access.jti, TokenType::Access, reason, access.expires_at)
                    .await?;
            }
        }
        Ok(())
    }

    /// Walks forward from a reused token and revokes every live
    /// descendant of its chain.
    async fn cascade_revoke_descendants(&self, stale: &RefreshToken) -> AuthResult<u64> {
        let mut revoked = 0;
        let mut cursor = stale.rotated_to;

        while let Some(id) = cursor {
            let Some(token) = self.refresh_tokens.find_by_id(stale.orbit_id, id).await? else {
                break;
            };
            if !token.is_revoked() {
                self.revoke_refresh_record(&token, "reuse_detected").await?;
                revoked += 1;
            }
            cursor = token.rotated_to;
        }

        tracing::warn!(
            orbit_id = %stale.orbit_id,
            client_id = %stale.client_id,
            revoked,
            "Refresh token reuse detected, descendants revoked"
        );
        Ok(revoked)
    }

    /// Creates and stores an access token record.
    async fn create_access_token(
        &self,
        grant: &TokenGrant,
        refresh_token_id: Option<Uuid>,
        now: OffsetDateTime,
    ) -> AuthResult<AccessToken> {
        let access = AccessToken {
            jti: Uuid::new_v4().to_string(),
            orbit_id: grant.orbit_id,
            client_id: grant.client_id.clone(),
            user_id: grant.user_id,
            scopes: grant.scopes.clone(),
            refresh_token_id,
            issued_at: now,
            expires_at: now + self.config.access_token_lifetime,
            revoked_at: None,
        };
        self.access_tokens.create(&access).await?;
        Ok(access)
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::token::ledger::tests::{MockCacheStorage, MockLedgerStorage};
    use crate::types::Session;
    use std::collections::HashMap;
    use std::sync::RwLock;
    use time::Duration;

    pub(crate) struct MockAccessTokenStorage {
        pub tokens: RwLock<HashMap<(Uuid, String), AccessToken>>,
    }

    impl MockAccessTokenStorage {
        pub fn new() -> Self {
            Self {
                tokens: RwLock::new(HashMap::new()),
            }
        }
    }

    #[async_trait::async_trait]
    impl AccessTokenStorage for MockAccessTokenStorage {
        async fn create(&self, token: &AccessToken) -> AuthResult<()> {
            let mut tokens = self.tokens.write().unwrap();
            tokens.insert((token.orbit_id, token.jti.clone()), token.clone());
            Ok(())
        }

        async fn find_by_jti(&self, orbit_id: Uuid, jti: &str) -> AuthResult<Option<AccessToken>> {
            let tokens = self.tokens.read().unwrap();
            Ok(tokens.get(&(orbit_id, jti.to_string())).cloned())
        }

        async fn revoke(&self, orbit_id: Uuid, jti: &str, at: OffsetDateTime) -> AuthResult<bool> {
            let mut tokens = self.tokens.write().unwrap();
            match tokens.get_mut(&(orbit_id, jti.to_string())) {
                Some(t) if t.revoked_at.is_none() => {
                    t.revoked_at = Some(at);
                    Ok(true)
                }
                Some(_) => Ok(false),
                None => Ok(false),
            }
        }

        async fn list_by_refresh_token(
            &self,
            orbit_id: Uuid,
            refresh_token_id: Uuid,
        ) -> AuthResult<Vec<AccessToken>> {
            let tokens = self.tokens.read().unwrap();
            Ok(tokens
                .values()
                .filter(|t| t.orbit_id == orbit_id && t.refresh_token_id == Some(refresh_token_id))
                .cloned()
                .collect())
        }

        async fn cleanup_expired(&self, now: OffsetDateTime) -> AuthResult<u64> {
            let mut tokens = self.tokens.write().unwrap();
            let before = tokens.len();
            tokens.retain(|_, t| t.expires_at >= now);
            Ok((before - tokens.len()) as u64)
        }
    }

    pub(crate) struct MockRefreshTokenStorage {
        pub tokens: RwLock<HashMap<Uuid, RefreshToken>>,
    }

    impl MockRefreshTokenStorage {
        pub fn new() -> Self {
            Self {
                tokens: RwLock::new(HashMap::new()),
            }
        }
    }

    #[async_trait::async_trait]
    impl RefreshTokenStorage for MockRefreshTokenStorage {
        async fn create(&self, token: &RefreshToken) -> AuthResult<()> {
            let mut tokens = self.tokens.write().unwrap();
            tokens.insert(token.id, token.clone());
            Ok(())
        }

        async fn find_by_hash(
            &self,
            orbit_id: Uuid,
            token_hash: &str,
        ) -> AuthResult<Option<RefreshToken>> {
            let tokens = self.tokens.read().unwrap();
            Ok(tokens
                .values()
                .find(|t| t.orbit_id == orbit_id && t.token_hash == token_hash)
                .cloned())
        }

        async fn find_by_id(&self, orbit_id: Uuid, id: Uuid) -> AuthResult<Option<RefreshToken>> {
            let tokens = self.tokens.read().unwrap();
            Ok(tokens.get(&id).filter(|t| t.orbit_id == orbit_id).cloned())
        }

        async fn begin_rotation(
            &self,
            orbit_id: Uuid,
            id: Uuid,
            successor_id: Uuid,
            at: OffsetDateTime,
        ) -> AuthResult<bool> {
            let mut tokens = self.tokens.write().unwrap();
            match tokens.get_mut(&id) {
                Some(t)
                    if t.orbit_id == orbit_id
                        && t.revoked_at.is_none()
                        && t.rotated_to.is_none() =>
                {
                    t.revoked_at = Some(at);
                    t.rotated_to = Some(successor_id);
                    Ok(true)
                }
                _ => Ok(false),
            }
        }

        async fn revoke(&self, orbit_id: Uuid, id: Uuid, at: OffsetDateTime) -> AuthResult<bool> {
            let mut tokens = self.tokens.write().unwrap();
            match tokens.get_mut(&id) {
                Some(t) if t.orbit_id == orbit_id && t.revoked_at.is_none() => {
                    t.revoked_at = Some(at);
                    Ok(true)
                }
                _ => Ok(false),
            }
        }

        async fn record_use(&self, orbit_id: Uuid, id: Uuid, at: OffsetDateTime) -> AuthResult<()> {
            let mut tokens = self.tokens.write().unwrap();
            match tokens.get_mut(&id) {
                Some(t) if t.orbit_id == orbit_id => {
                    t.use_count += 1;
                    t.last_used_at = Some(at);
                    Ok(())
                }
                _ => Err(AuthError::not_found("refresh token")),
            }
        }

        async fn list_by_session(
            &self,
            orbit_id: Uuid,
            session_id: Uuid,
        ) -> AuthResult<Vec<RefreshToken>> {
            let tokens = self.tokens.read().unwrap();
            Ok(tokens
                .values()
                .filter(|t| t.orbit_id == orbit_id && t.session_id == Some(session_id))
                .cloned()
                .collect())
        }

        async fn list_by_user(
            &self,
            orbit_id: Uuid,
            user_id: Uuid,
        ) -> AuthResult<Vec<RefreshToken>> {
            let tokens = self.tokens.read().unwrap();
            Ok(tokens
                .values()
                .filter(|t| t.orbit_id == orbit_id && t.user_id == Some(user_id))
                .cloned()
                .collect())
        }

        async fn list_by_user_client(
            &self,
            orbit_id: Uuid,
            user_id: Uuid,
            client_id: &str,
        ) -> AuthResult<Vec<RefreshToken>> {
            let tokens = self.tokens.read().unwrap();
            Ok(tokens
                .values()
                .filter(|t| {
                    t.orbit_id == orbit_id
                        && t.user_id == Some(user_id)
                        && t.client_id == client_id
                })
                .cloned()
                .collect())
        }

        async fn cleanup_expired(&self, now: OffsetDateTime) -> AuthResult<u64> {
            let mut tokens = self.tokens.write().unwrap();
            let before = tokens.len();
            tokens.retain(|_, t| t.expires_at >= now);
            Ok((before - tokens.len()) as u64)
        }
    }

    pub(crate) struct MockSessionStorage {
        pub sessions: RwLock<HashMap<Uuid, Session>>,
    }

    impl MockSessionStorage {
        pub fn new() -> Self {
            Self {
                sessions: RwLock::new(HashMap::new()),
            }
        }
    }

    #[async_trait::async_trait]
    impl SessionStorage for MockSessionStorage {
        async fn create(&self, session: &Session) -> AuthResult<()> {
            let mut sessions = self.sessions.write().unwrap();
            sessions.insert(session.id, session.clone());
            Ok(())
        }

        async fn find_by_id(&self, orbit_id: Uuid, id: Uuid) -> AuthResult<Option<Session>> {
            let sessions = self.sessions.read().unwrap();
            Ok(sessions.get(&id).filter(|s| s.orbit_id == orbit_id).cloned())
        }

        async fn touch(
            &self,
            orbit_id: Uuid,
            id: Uuid,
            last_active_at: OffsetDateTime,
            expires_at: OffsetDateTime,
        ) -> AuthResult<bool> {
            let mut sessions = self.sessions.write().unwrap();
            match sessions.get_mut(&id) {
                Some(s)
                    if s.orbit_id == orbit_id
                        && s.revoked_at.is_none()
                        && s.expires_at >= last_active_at =>
                {
                    s.last_active_at = last_active_at;
                    s.expires_at = expires_at;
                    Ok(true)
                }
                _ => Ok(false),
            }
        }

        async fn revoke(&self, orbit_id: Uuid, id: Uuid, at: OffsetDateTime) -> AuthResult<bool> {
            let mut sessions = self.sessions.write().unwrap();
            match sessions.get_mut(&id) {
                Some(s) if s.orbit_id == orbit_id && s.revoked_at.is_none() => {
                    s.revoked_at = Some(at);
                    Ok(true)
                }
                _ => Ok(false),
            }
        }

        async fn list_by_user(&self, orbit_id: Uuid, user_id: Uuid) -> AuthResult<Vec<Session>> {
            let sessions = self.sessions.read().unwrap();
            Ok(sessions
                .values()
                .filter(|s| s.orbit_id == orbit_id && s.user_id == user_id)
                .cloned()
                .collect())
        }

        async fn cleanup_expired(&self, now: OffsetDateTime) -> AuthResult<u64> {
            let mut sessions = self.sessions.write().unwrap();
            let before = sessions.len();
            sessions.retain(|_, s| s.expires_at >= now);
            Ok((before - sessions.len()) as u64)
        }
    }

    fn service() -> TokenService {
        TokenService::new(
            Arc::new(MockAccessTokenStorage::new()),
            Arc::new(MockRefreshTokenStorage::new()),
            Arc::new(MockSessionStorage::new()),
            Arc::new(RevocationService::new(
                Arc::new(MockLedgerStorage::new()),
                Arc::new(MockCacheStorage::new()),
            )),
            AuditLog::default(),
            OAuthConfig::default(),
        )
    }

    fn grant(orbit_id: Uuid) -> TokenGrant {
        TokenGrant {
            orbit_id,
            client_id: "app".to_string(),
            user_id: Some(Uuid::new_v4()),
            scopes: vec!["openid".to_string(), "profile".to_string()],
            session_id: None,
            grant_type: GrantType::AuthorizationCode,
        }
    }

    #[tokio::test]
    async fn test_issue_returns_refresh_chain_head() {
        let svc = service();
        let orbit_id = Uuid::new_v4();

        let issued = svc.issue(&grant(orbit_id)).await.unwrap();
        let refresh = issued.refresh.unwrap();

        assert!(refresh.rotated_from.is_none());
        assert!(refresh.is_live());
        assert_eq!(issued.access.refresh_token_id, Some(refresh.id));
        assert!(svc.is_active(orbit_id, &issued.access.jti).await.unwrap());
    }

    #[tokio::test]
    async fn test_client_credentials_gets_no_refresh_token() {
        let svc = service();
        let mut g = grant(Uuid::new_v4());
        g.user_id = None;
        g.grant_type = GrantType::ClientCredentials;

        let issued = svc.issue(&g).await.unwrap();
        assert!(issued.refresh.is_none());
        assert!(issued.refresh_token.is_none());
    }

    #[tokio::test]
    async fn test_rotation_links_chain() {
        let svc = service();
        let orbit_id = Uuid::new_v4();
        let issued = svc.issue(&grant(orbit_id)).await.unwrap();
        let rt1 = issued.refresh_token.unwrap();
        let rt1_record = issued.refresh.unwrap();

        let rotated = svc.rotate(orbit_id, &rt1, None).await.unwrap();
        let rt2_record = rotated.refresh.unwrap();

        assert_eq!(rt2_record.rotated_from, Some(rt1_record.id));

        let stale = svc
            .refresh_tokens
            .find_by_id(orbit_id, rt1_record.id)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(stale.rotated_to, Some(rt2_record.id));
        assert!(stale.is_revoked());
        assert_eq!(stale.use_count, 1);
    }

    #[tokio::test]
    async fn test_reuse_revokes_descendants() {
        let svc = service();
        let orbit_id = Uuid::new_v4();
        let issued = svc.issue(&grant(orbit_id)).await.unwrap();
        let rt1 = issued.refresh_token.unwrap();

        let rotated = svc.rotate(orbit_id, &rt1, None).await.unwrap();
        let rt2_record = rotated.refresh.unwrap();
        let rt2 = rotated.refresh_token.unwrap();

        // Presenting RT1 again is reuse; RT2 must die with it.
        let err = svc.rotate(orbit_id, &rt1, None).await.unwrap_err();
        assert!(matches!(err, AuthError::TokenReuseDetected));

        let rt2_fresh = svc
            .refresh_tokens
            .find_by_id(orbit_id, rt2_record.id)
            .await
            .unwrap()
            .unwrap();
        assert!(rt2_fresh.is_revoked());

        let err = svc.rotate(orbit_id, &rt2, None).await.unwrap_err();
        assert!(matches!(err, AuthError::Revoked));
    }

    #[tokio::test]
    async fn test_reuse_revokes_access_tokens_of_descendants() {
        let svc = service();
        let orbit_id = Uuid::new_v4();
        let issued = svc.issue(&grant(orbit_id)).await.unwrap();
        let rt1 = issued.refresh_token.unwrap();

        let rotated = svc.rotate(orbit_id, &rt1, None).await.unwrap();
        let at2 = rotated.access;
        assert!(svc.is_active(orbit_id, &at2.jti).await.unwrap());

        svc.rotate(orbit_id, &rt1, None).await.unwrap_err();
        assert!(!svc.is_active(orbit_id, &at2.jti).await.unwrap());
    }

    #[tokio::test]
    async fn test_scopes_shrink_but_never_grow() {
        let svc = service();
        let orbit_id = Uuid::new_v4();
        let issued = svc.issue(&grant(orbit_id)).await.unwrap();
        let rt1 = issued.refresh_token.unwrap();

        let narrowed = svc
            .rotate(orbit_id, &rt1, Some(vec!["openid".to_string()]))
            .await
            .unwrap();
        let rt2 = narrowed.refresh_token.unwrap();
        assert_eq!(narrowed.refresh.unwrap().scopes, vec!["openid".to_string()]);

        // The dropped scope cannot come back.
        let err = svc
            .rotate(orbit_id, &rt2, Some(vec!["openid".to_string(), "profile".to_string()]))
            .await
            .unwrap_err();
        assert!(matches!(err, AuthError::ScopeEscalation { .. }));
    }

    #[tokio::test]
    async fn test_rotation_in_wrong_orbit_is_not_found() {
        let svc = service();
        let orbit_id = Uuid::new_v4();
        let issued = svc.issue(&grant(orbit_id)).await.unwrap();
        let rt1 = issued.refresh_token.unwrap();

        let err = svc.rotate(Uuid::new_v4(), &rt1, None).await.unwrap_err();
        assert!(matches!(err, AuthError::NotFound { .. }));
    }

    #[tokio::test]
    async fn test_dead_session_kills_rotation() {
        let svc = service();
        let orbit_id = Uuid::new_v4();
        let now = OffsetDateTime::now_utc();

        let session = Session {
            id: Uuid::new_v4(),
            orbit_id,
            user_id: Uuid::new_v4(),
            client_id: Some("app".to_string()),
            device_name: None,
            ip_address: None,
            started_at: now,
            last_active_at: now,
            expires_at: now + Duration::hours(12),
            max_expires_at: now + Duration::days(30),
            revoked_at: None,
        };
        svc.sessions.create(&session).await.unwrap();

        let mut g = grant(orbit_id);
        g.session_id = Some(session.id);
        let issued = svc.issue(&g).await.unwrap();
        let rt1 = issued.refresh_token.unwrap();

        svc.sessions.revoke(orbit_id, session.id, now).await.unwrap();

        let err = svc.rotate(orbit_id, &rt1, None).await.unwrap_err();
        assert!(matches!(err, AuthError::Revoked));
    }

    #[tokio::test]
    async fn test_revoke_presented_is_idempotent_and_silent() {
        let svc = service();
        let orbit_id = Uuid::new_v4();
        let issued = svc.issue(&grant(orbit_id)).await.unwrap();
        let rt1 = issued.refresh_token.unwrap();

        svc.revoke_presented(orbit_id, &rt1, "logout").await.unwrap();
        svc.revoke_presented(orbit_id, &rt1, "logout").await.unwrap();
        svc.revoke_presented(orbit_id, "no-such-token", "logout")
            .await
            .unwrap();

        let err = svc.rotate(orbit_id, &rt1, None).await.unwrap_err();
        assert!(matches!(err, AuthError::Revoked));
    }

    #[tokio::test]
    async fn test_revoke_user_tokens_covers_sessionless_chains() {
        let svc = service();
        let orbit_id = Uuid::new_v4();
        let user_id = Uuid::new_v4();

        let mut g = grant(orbit_id);
        g.user_id = Some(user_id);
        let bound = {
            let mut g = g.clone();
            g.session_id = Some(Uuid::new_v4());
            svc.issue(&g).await.unwrap()
        };
        let free = svc.issue(&g).await.unwrap();
        let other = svc.issue(&grant(orbit_id)).await.unwrap();

        let revoked = svc
            .revoke_user_tokens(orbit_id, user_id, "password_change")
            .await
            .unwrap();
        assert_eq!(revoked, 2);

        for rt in [bound.refresh_token.unwrap(), free.refresh_token.unwrap()] {
            let err = svc.rotate(orbit_id, &rt, None).await.unwrap_err();
            assert!(matches!(err, AuthError::Revoked));
        }

        // A different user's chain keeps rotating.
        assert!(svc
            .rotate(orbit_id, &other.refresh_token.unwrap(), None)
            .await
            .is_ok());
    }

    #[tokio::test]
    async fn test_ledger_record_alone_kills_token() {
        let svc = service();
        let orbit_id = Uuid::new_v4();
        let issued = svc.issue(&grant(orbit_id)).await.unwrap();
        let refresh = issued.refresh.unwrap();
        let rt1 = issued.refresh_token.unwrap();

        // Write only to the ledger; the token rows stay untouched.
        svc.revocation
            .revoke(orbit_id, &refresh.jti, TokenType::Refresh, "admin", refresh.expires_at)
            .await
            .unwrap();
        svc.revocation
            .revoke(
                orbit_id,
                &issued.access.jti,
                TokenType::Access,
                "admin",
                issued.access.expires_at,
            )
            .await
            .unwrap();

        let err = svc.rotate(orbit_id, &rt1, None).await.unwrap_err();
        assert!(matches!(err, AuthError::Revoked));
        assert!(!svc.is_active(orbit_id, &issued.access.jti).await.unwrap());
    }

    #[tokio::test]
    async fn test_session_revocation_cascades_to_chains() {
        let svc = service();
        let orbit_id = Uuid::new_v4();
        let session_id = Uuid::new_v4();

        let mut g = grant(orbit_id);
        g.session_id = Some(session_id);
        let a = svc.issue(&g).await.unwrap();
        let b = svc.issue(&g).await.unwrap();

        let revoked = svc
            .revoke_session_tokens(orbit_id, session_id, "session_revoked")
            .await
            .unwrap();
        assert_eq!(revoked, 2);

        for rt in [a.refresh_token.unwrap(), b.refresh_token.unwrap()] {
            let err = svc.rotate(orbit_id, &rt, None).await.unwrap_err();
            assert!(matches!(err, AuthError::Revoked));
        }
    }
}
