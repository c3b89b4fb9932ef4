//! Anonymous browser sessions and visit counting

use std::sync::Arc;

use async_trait::async_trait;
use rand::{distributions::Alphanumeric, Rng};

use crate::error::AppResult;

/// Cookie carrying the session id
pub const SESSION_COOKIE: &str = "sessionid";

const SESSION_ID_LEN: usize = 32;

/// Storage for per-session data
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait SessionStore: Send + Sync {
    /// Increment the visit counter of a session and return the new value.
    /// The session expires `ttl_seconds` after its last visit.
    async fn incr_visits(&self, session_id: &str, ttl_seconds: u64) -> AppResult<i64>;

    /// Forget everything stored for a session
    async fn flush(&self, session_id: &str) -> AppResult<()>;
}

#[derive(Clone)]
pub struct SessionsService {
    store: Arc<dyn SessionStore>,
    ttl_seconds: u64,
}

impl SessionsService {
    pub fn new(store: Arc<dyn SessionStore>, ttl_seconds: u64) -> Self {
        Self { store, ttl_seconds }
    }

    /// Record a visit and return how many visits the session had before this one
    pub async fn record_visit(&self, session_id: &str) -> AppResult<i64> {
        let count = self.store.incr_visits(session_id, self.ttl_seconds).await?;
        Ok((count - 1).max(0))
    }

    pub async fn flush(&self, session_id: &str) -> AppResult<()> {
        self.store.flush(session_id).await
    }
}

pub fn new_session_id() -> String {
    rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(SESSION_ID_LEN)
        .map(|b| char::from(b).to_ascii_lowercase())
        .collect()
}

/// Session ids coming from clients are only trusted if they look like ours
pub fn is_valid_session_id(id: &str) -> bool {
    id.len() == SESSION_ID_LEN
        && id
            .chars()
            .all(|c| c.is_ascii_digit() || c.is_ascii_lowercase())
}
