use moka::future::Cache;
use shared_http::api::RecordId;
use std::time::Duration;
use tracing::debug;

pub const SESSION_COOKIE: &str = "spark_session";

pub type SessionToken = String;

/// Moka-backed session tokens. A token maps to the user it was opened for
/// and expires `ttl` after creation.
#[derive(Clone)]
pub struct SessionStore {
    sessions: Cache<SessionToken, RecordId>,
    ttl: Duration,
}

impl SessionStore {
    pub fn new(ttl: Duration) -> Self {
        Self {
            sessions: Cache::builder().time_to_live(ttl).build(),
            ttl,
        }
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    pub async fn open(&self, user_id: RecordId) -> SessionToken {
        let token = uuid::Uuid::new_v4().simple().to_string();
        self.sessions.insert(token.clone(), user_id).await;
        debug!("Opened session for user {}", user_id);
        token
    }

    pub async fn user_id(&self, token: &str) -> Option<RecordId> {
        self.sessions.get(token).await
    }

    pub async fn close(&self, token: &str) -> bool {
        self.sessions.remove(token).await.is_some()
    }

    /// `Set-Cookie` value carrying `token`.
    pub fn cookie(&self, token: &str) -> String {
        format!(
            "{SESSION_COOKIE}={token}; HttpOnly; Path=/; SameSite=Lax; Max-Age={}",
            self.ttl.as_secs()
        )
    }

    /// `Set-Cookie` value that removes the session cookie.
    pub fn expired_cookie() -> String {
        format!("{SESSION_COOKIE}=; HttpOnly; Path=/; SameSite=Lax; Max-Age=0")
    }
}

impl std::fmt::Debug for SessionStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionStore")
            .field("entry_count", &self.sessions.entry_count())
            .field("ttl", &self.ttl)
            .finish()
    }
}

/// Finds the session token in a `Cookie` header value.
pub fn token_from_cookie_header(header: &str) -> Option<&str> {
    header.split(';').find_map(|pair| {
        let (name, value) = pair.trim().split_once('=')?;
        (name == SESSION_COOKIE && !value.is_empty()).then_some(value)
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::time::sleep;

    #[tokio::test]
    async fn test_open_lookup_close() {
        let store = SessionStore::new(Duration::from_secs(60));

        let token = store.open(7).await;
        assert_eq!(store.user_id(&token).await, Some(7));

        assert!(store.close(&token).await);
        assert_eq!(store.user_id(&token).await, None);
        assert!(!store.close(&token).await);
    }

    #[tokio::test]
    async fn test_sessions_expire() {
        let store = SessionStore::new(Duration::from_millis(100));
        let token = store.open(1).await;

        sleep(Duration::from_millis(150)).await;

        assert_eq!(store.user_id(&token).await, None);
    }

    #[test]
    fn test_token_from_cookie_header() {
        assert_eq!(
            token_from_cookie_header("theme=dark; spark_session=abc123; lang=en"),
            Some("abc123")
        );
        assert_eq!(token_from_cookie_header("spark_session="), None);
        assert_eq!(token_from_cookie_header("theme=dark"), None);
    }

    #[test]
    fn test_cookie_attributes() {
        let store = SessionStore::new(Duration::from_secs(3600));
        let cookie = store.cookie("abc");
        assert!(cookie.starts_with("spark_session=abc;"));
        assert!(cookie.contains("HttpOnly"));
        assert!(cookie.contains("Max-Age=3600"));
        assert!(SessionStore::expired_cookie().contains("Max-Age=0"));
    }
}
