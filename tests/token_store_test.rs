use std::{
    sync::{
        Arc,
        atomic::{AtomicUsize, Ordering},
    },
    time::Duration,
};

use async_trait::async_trait;
use folio::{
    error::UpstreamError,
    management::{REFRESH_MARGIN_MS, TOKEN_VALIDITY_MS, TokenRefresher, TokenStore},
    types::{TokenGrant, UserToken},
    utils,
};

// Refresher double that counts calls and answers after a short delay
struct CountingRefresher {
    calls: AtomicUsize,
    delay: Duration,
    outcome: Result<TokenGrant, u16>,
}

impl CountingRefresher {
    fn granting(access_token: &str, refresh_token: Option<&str>) -> Arc<Self> {
        Arc::new(Self {
            calls: AtomicUsize::new(0),
            delay: Duration::from_millis(50),
            outcome: Ok(TokenGrant {
                access_token: access_token.to_string(),
                refresh_token: refresh_token.map(str::to_string),
            }),
        })
    }

    fn failing(status: u16) -> Arc<Self> {
        Arc::new(Self {
            calls: AtomicUsize::new(0),
            delay: Duration::from_millis(10),
            outcome: Err(status),
        })
    }

    fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl TokenRefresher for CountingRefresher {
    async fn refresh_access_token(&self, _refresh_token: &str) -> Result<TokenGrant, UpstreamError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        tokio::time::sleep(self.delay).await;
        match &self.outcome {
            Ok(grant) => Ok(grant.clone()),
            Err(status) => Err(UpstreamError::from_status(*status, "invalid_grant".to_string())),
        }
    }
}

fn expiring_in(ms: i64, refresh_token: Option<&str>) -> UserToken {
    UserToken {
        access_token: "old-access".to_string(),
        refresh_token: refresh_token.map(str::to_string),
        expires_at: utils::now_ms() + ms,
    }
}

#[tokio::test]
async fn test_fresh_token_is_returned_without_refresh() {
    let refresher = CountingRefresher::granting("new-access", None);
    let store = TokenStore::new(refresher.clone());
    store.set_token("user-1", "access-1", Some("refresh-1"));

    assert_eq!(store.get_valid_access_token("user-1").await.as_deref(), Some("access-1"));
    assert_eq!(refresher.calls(), 0);
}

#[tokio::test]
async fn test_set_token_assigns_fixed_validity() {
    let store = TokenStore::new(CountingRefresher::granting("x", None));
    let before = utils::now_ms();
    store.set_token("user-1", "access-1", None);

    let token = store.get("user-1").unwrap();
    assert!(token.expires_at >= before + TOKEN_VALIDITY_MS);
    assert!(token.expires_at <= utils::now_ms() + TOKEN_VALIDITY_MS);
    assert!(token.refresh_token.is_none());
}

#[tokio::test]
async fn test_unknown_user_has_no_token() {
    let refresher = CountingRefresher::granting("x", None);
    let store = TokenStore::new(refresher.clone());

    assert!(store.get_valid_access_token("nobody").await.is_none());
    assert_eq!(refresher.calls(), 0);
}

#[tokio::test]
async fn test_expiring_token_is_refreshed_silently() {
    let refresher = CountingRefresher::granting("new-access", None);
    let store = TokenStore::new(refresher.clone());
    // two minutes left is inside the refresh margin
    store.insert("user-1", expiring_in(2 * 60 * 1000, Some("refresh-1")));

    let token = store.get_valid_access_token("user-1").await;
    assert_eq!(token.as_deref(), Some("new-access"));
    assert_eq!(refresher.calls(), 1);

    let record = store.get("user-1").unwrap();
    assert_eq!(record.access_token, "new-access");
    // the old refresh token is kept when none is returned
    assert_eq!(record.refresh_token.as_deref(), Some("refresh-1"));
    assert!(record.expires_at > utils::now_ms() + TOKEN_VALIDITY_MS - 5_000);
}

#[tokio::test]
async fn test_rotated_refresh_token_is_stored() {
    let refresher = CountingRefresher::granting("new-access", Some("refresh-2"));
    let store = TokenStore::new(refresher.clone());
    store.insert("user-1", expiring_in(-1_000, Some("refresh-1")));

    assert_eq!(store.get_valid_access_token("user-1").await.as_deref(), Some("new-access"));
    assert_eq!(store.get("user-1").unwrap().refresh_token.as_deref(), Some("refresh-2"));
}

#[tokio::test]
async fn test_token_at_margin_boundary_is_refreshed() {
    let refresher = CountingRefresher::granting("new-access", None);
    let store = TokenStore::new(refresher.clone());
    store.insert("user-1", expiring_in(REFRESH_MARGIN_MS - 1_000, Some("refresh-1")));

    assert_eq!(store.get_valid_access_token("user-1").await.as_deref(), Some("new-access"));
    assert_eq!(refresher.calls(), 1);
}

#[tokio::test]
async fn test_expired_token_without_refresh_token_is_purged() {
    let refresher = CountingRefresher::granting("new-access", None);
    let store = TokenStore::new(refresher.clone());
    store.insert("user-1", expiring_in(-1_000, None));

    assert!(store.get_valid_access_token("user-1").await.is_none());
    assert!(!store.contains("user-1"));
    assert_eq!(refresher.calls(), 0);
}

#[tokio::test]
async fn test_failed_refresh_purges_record() {
    let refresher = CountingRefresher::failing(400);
    let store = TokenStore::new(refresher.clone());
    store.insert("user-1", expiring_in(60_000, Some("revoked")));

    assert!(store.get_valid_access_token("user-1").await.is_none());
    assert!(!store.contains("user-1"));
    assert_eq!(refresher.calls(), 1);

    // the next call sees an unauthenticated user and does not retry
    assert!(store.get_valid_access_token("user-1").await.is_none());
    assert_eq!(refresher.calls(), 1);
}

#[tokio::test]
async fn test_concurrent_callers_share_one_refresh() {
    let refresher = CountingRefresher::granting("new-access", None);
    let store = Arc::new(TokenStore::new(refresher.clone()));
    store.insert("user-1", expiring_in(60_000, Some("refresh-1")));

    let mut handles = Vec::new();
    for _ in 0..8 {
        let store = Arc::clone(&store);
        handles.push(tokio::spawn(async move {
            store.get_valid_access_token("user-1").await
        }));
    }

    for handle in handles {
        assert_eq!(handle.await.unwrap().as_deref(), Some("new-access"));
    }
    assert_eq!(refresher.calls(), 1);
}

#[tokio::test]
async fn test_renewals_are_independent_per_user() {
    let refresher = CountingRefresher::granting("new-access", None);
    let store = Arc::new(TokenStore::new(refresher.clone()));
    store.insert("user-1", expiring_in(60_000, Some("refresh-1")));
    store.insert("user-2", expiring_in(60_000, Some("refresh-2")));

    let (a, b) = tokio::join!(
        store.get_valid_access_token("user-1"),
        store.get_valid_access_token("user-2")
    );
    assert!(a.is_some() && b.is_some());
    assert_eq!(refresher.calls(), 2);
}

#[tokio::test]
async fn test_logout_always_succeeds() {
    let store = TokenStore::new(CountingRefresher::granting("x", None));
    store.set_token("user-1", "access-1", Some("refresh-1"));

    let outcome = store.logout("user-1");
    assert!(outcome.success);
    assert_eq!(outcome.message, "User logged out successfully");
    assert!(!store.contains("user-1"));

    // logging out twice is not an error
    assert!(store.logout("user-1").success);
    assert!(store.get_valid_access_token("user-1").await.is_none());
}
