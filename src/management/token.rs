use std::{
    collections::HashMap,
    sync::{Arc, Mutex, MutexGuard, PoisonError},
};

use async_trait::async_trait;
use tokio::sync::Mutex as AsyncMutex;
use tracing::{debug, info, warn};

use crate::{
    error::UpstreamError,
    types::{LogoutOutcome, TokenGrant, UserToken},
    utils,
};

/// Lifetime assigned to every stored access token.
pub const TOKEN_VALIDITY_MS: i64 = 3600 * 1000;

/// Tokens expiring within this window are renewed before use.
pub const REFRESH_MARGIN_MS: i64 = 5 * 60 * 1000;

/// Performs the refresh-token grant against the authorization server.
#[async_trait]
pub trait TokenRefresher: Send + Sync {
    async fn refresh_access_token(&self, refresh_token: &str) -> Result<TokenGrant, UpstreamError>;
}

/// In-memory OAuth credential store keyed by upstream user id.
///
/// Renewal is single-flight per user: the first caller that finds a token
/// inside the refresh margin performs the network call while concurrent
/// callers for the same user wait on a per-user lock and then read the
/// renewed record instead of spending the refresh token a second time.
pub struct TokenStore {
    tokens: Mutex<HashMap<String, UserToken>>,
    renewals: Mutex<HashMap<String, Arc<AsyncMutex<()>>>>,
    refresher: Arc<dyn TokenRefresher>,
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

impl TokenStore {
    pub fn new(refresher: Arc<dyn TokenRefresher>) -> Self {
        Self {
            tokens: Mutex::new(HashMap::new()),
            renewals: Mutex::new(HashMap::new()),
            refresher,
        }
    }

    /// Creates or overwrites the record for `user_id`.
    ///
    /// The expiry is always recomputed as now plus [`TOKEN_VALIDITY_MS`].
    pub fn set_token(&self, user_id: &str, access_token: &str, refresh_token: Option<&str>) {
        let token = UserToken {
            access_token: access_token.to_string(),
            refresh_token: refresh_token.map(str::to_string),
            expires_at: utils::now_ms() + TOKEN_VALIDITY_MS,
        };
        lock(&self.tokens).insert(user_id.to_string(), token);
    }

    /// Stores a record exactly as given, expiry included.
    pub fn insert(&self, user_id: &str, token: UserToken) {
        lock(&self.tokens).insert(user_id.to_string(), token);
    }

    pub fn get(&self, user_id: &str) -> Option<UserToken> {
        lock(&self.tokens).get(user_id).cloned()
    }

    pub fn contains(&self, user_id: &str) -> bool {
        lock(&self.tokens).contains_key(user_id)
    }

    pub fn len(&self) -> usize {
        lock(&self.tokens).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Returns an access token that stays valid for at least the refresh margin.
    ///
    /// Tokens close to expiry are renewed with the stored refresh token. When
    /// there is no refresh token, or the renewal fails, the record is deleted
    /// and `None` is returned: the caller is unauthenticated, not failing.
    pub async fn get_valid_access_token(&self, user_id: &str) -> Option<String> {
        if let Some(token) = self.fresh_access_token(user_id) {
            return Some(token);
        }

        let renewal = self.renewal_lock(user_id);
        let _guard = renewal.lock().await;

        // a concurrent caller may have renewed or purged the record meanwhile
        let record = self.get(user_id)?;
        if is_fresh(&record, utils::now_ms()) {
            return Some(record.access_token);
        }

        let Some(refresh_token) = record.refresh_token.clone() else {
            debug!(user_id, "Token expired without refresh token, purging");
            self.purge(user_id);
            return None;
        };

        info!(user_id, "Refreshing access token");
        match self.refresher.refresh_access_token(&refresh_token).await {
            Ok(grant) => {
                let next_refresh = grant.refresh_token.unwrap_or(refresh_token);
                if self.replace_if_present(user_id, &grant.access_token, &next_refresh) {
                    info!(user_id, "Access token refreshed");
                    Some(grant.access_token)
                } else {
                    debug!(user_id, "Record removed during refresh, dropping new token");
                    None
                }
            }
            Err(e) => {
                warn!(user_id, error = %e, "Failed to refresh access token, purging");
                self.purge(user_id);
                None
            }
        }
    }

    /// Deletes the record for `user_id`. Always succeeds.
    pub fn logout(&self, user_id: &str) -> LogoutOutcome {
        self.purge(user_id);
        LogoutOutcome {
            success: true,
            message: "User logged out successfully".to_string(),
        }
    }

    /// Removes the record without reporting anything.
    pub fn purge(&self, user_id: &str) {
        lock(&self.tokens).remove(user_id);
        lock(&self.renewals).remove(user_id);
    }

    /// Drops every record. Used at shutdown and between tests.
    pub fn clear(&self) {
        lock(&self.tokens).clear();
        lock(&self.renewals).clear();
    }

    fn fresh_access_token(&self, user_id: &str) -> Option<String> {
        let tokens = lock(&self.tokens);
        let record = tokens.get(user_id)?;
        is_fresh(record, utils::now_ms()).then(|| record.access_token.clone())
    }

    fn renewal_lock(&self, user_id: &str) -> Arc<AsyncMutex<()>> {
        let mut renewals = lock(&self.renewals);
        Arc::clone(
            renewals
                .entry(user_id.to_string())
                .or_insert_with(|| Arc::new(AsyncMutex::new(()))),
        )
    }

    fn replace_if_present(&self, user_id: &str, access_token: &str, refresh_token: &str) -> bool {
        let mut tokens = lock(&self.tokens);
        match tokens.get_mut(user_id) {
            Some(record) => {
                record.access_token = access_token.to_string();
                record.refresh_token = Some(refresh_token.to_string());
                record.expires_at = utils::now_ms() + TOKEN_VALIDITY_MS;
                true
            }
            None => false,
        }
    }
}

fn is_fresh(token: &UserToken, now: i64) -> bool {
    token.expires_at > now + REFRESH_MARGIN_MS
}
