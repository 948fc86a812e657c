//! Redis Session Store
//!
//! Layout:
//! - `session:{sha256(token)}` holds the JSON [`SessionRecord`] with a TTL
//! - `user_sessions:{user_id}` is a list of the most recent digests, newest
//!   first, trimmed to `max_indexed_sessions`, used for bulk revocation.
//!   Every refresh slides its TTL together with the session's.

use std::time::Duration;

use kernel::id::UserId;
use redis::AsyncCommands;
use redis::aio::{ConnectionManager, ConnectionManagerConfig};

use crate::domain::entity::SessionRecord;
use crate::domain::repository::SessionStore;
use crate::domain::value_object::SessionToken;
use crate::error::{AuthError, AuthResult};

const SESSION_PREFIX: &str = "session:";
const USER_INDEX_PREFIX: &str = "user_sessions:";

pub async fn connect(redis_url: &str) -> Result<ConnectionManager, redis::RedisError> {
    let config = ConnectionManagerConfig::new().set_number_of_retries(3);
    let client = redis::Client::open(redis_url)?;
    client.get_connection_manager_with_config(config).await
}

#[derive(Clone)]
pub struct RedisSessionStore {
    conn: ConnectionManager,
    max_indexed_sessions: usize,
}

impl RedisSessionStore {
    pub fn new(conn: ConnectionManager, max_indexed_sessions: usize) -> Self {
        Self {
            conn,
            max_indexed_sessions: max_indexed_sessions.max(1),
        }
    }
}

fn session_key(digest: &str) -> String {
    format!("{SESSION_PREFIX}{digest}")
}

fn index_key(user_id: UserId) -> String {
    format!("{USER_INDEX_PREFIX}{user_id}")
}

impl SessionStore for RedisSessionStore {
    async fn create(
        &self,
        token: &SessionToken,
        record: &SessionRecord,
        ttl: Duration,
    ) -> AuthResult<()> {
        let payload = serde_json::to_string(record)
            .map_err(|e| AuthError::Internal(format!("Session serialization failed: {e}")))?;
        let digest = token.digest();
        let index = index_key(record.user_id);
        let ttl_secs = ttl.as_secs().max(1);

        let mut conn = self.conn.clone();
        let _: () = redis::pipe()
            .atomic()
            .set_ex(session_key(&digest), payload, ttl_secs)
            .ignore()
            .lpush(&index, &digest)
            .ignore()
            .ltrim(&index, 0, self.max_indexed_sessions as isize - 1)
            .ignore()
            .expire(&index, ttl_secs as i64)
            .ignore()
            .query_async(&mut conn)
            .await?;

        Ok(())
    }

    async fn get(&self, token: &SessionToken) -> AuthResult<Option<SessionRecord>> {
        let mut conn = self.conn.clone();
        let payload: Option<String> = conn.get(session_key(&token.digest())).await?;

        let Some(payload) = payload else {
            return Ok(None);
        };
        match serde_json::from_str(&payload) {
            Ok(record) => Ok(Some(record)),
            Err(e) => {
                tracing::warn!(error = %e, "Discarding unreadable session record");
                Ok(None)
            }
        }
    }

    async fn refresh(
        &self,
        token: &SessionToken,
        user_id: UserId,
        ttl: Duration,
    ) -> AuthResult<bool> {
        let ttl_secs = ttl.as_secs().max(1) as i64;
        let mut conn = self.conn.clone();
        let (refreshed,): (bool,) = redis::pipe()
            .atomic()
            .expire(session_key(&token.digest()), ttl_secs)
            .expire(index_key(user_id), ttl_secs)
            .ignore()
            .query_async(&mut conn)
            .await?;
        Ok(refreshed)
    }

    async fn delete(&self, token: &SessionToken) -> AuthResult<()> {
        let mut conn = self.conn.clone();
        let _: () = conn.del(session_key(&token.digest())).await?;
        Ok(())
    }

    async fn delete_all_for_user(&self, user_id: UserId) -> AuthResult<u64> {
        let index = index_key(user_id);
        let mut conn = self.conn.clone();

        let digests: Vec<String> = conn.lrange(&index, 0, -1).await?;
        let keys: Vec<String> = digests.iter().map(|d| session_key(d)).collect();

        let removed: u64 = if keys.is_empty() {
            0
        } else {
            conn.del(keys).await?
        };
        let _: () = conn.del(&index).await?;

        Ok(removed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn key_layout() {
        let user_id: UserId = "6f1c1f0e-2d7a-4c55-9a47-0e8a8c3c2b11".parse().unwrap();
        assert_eq!(session_key("ab12"), "session:ab12");
        assert_eq!(
            index_key(user_id),
            "user_sessions:6f1c1f0e-2d7a-4c55-9a47-0e8a8c3c2b11"
        );
    }
}
