//! In-memory implementations of the auth repositories.
//!
//! Used by the unit tests of this crate and of the crates that sit on top
//! of it. Same observable behavior as the Postgres and Redis stores.

use std::collections::{HashMap, VecDeque};
use std::sync::Arc;
use std::time::{Duration, Instant};

use kernel::id::UserId;
use kernel::pagination::{Page, PageRequest};
use tokio::sync::Mutex;

use crate::domain::entity::{NewAccount, Profile, SessionRecord, User};
use crate::domain::repository::{ProfileRepository, SessionStore, UserRepository};
use crate::domain::value_object::{Email, SessionToken, UserName, UserPassword};
use crate::error::{AuthError, AuthResult};

#[derive(Default)]
struct Accounts {
    users: HashMap<UserId, (User, UserPassword)>,
    profiles: HashMap<UserId, Profile>,
}

#[derive(Clone, Default)]
pub struct MemoryAuthRepository {
    inner: Arc<Mutex<Accounts>>,
}

impl MemoryAuthRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

impl UserRepository for MemoryAuthRepository {
    async fn create_account(&self, account: &NewAccount) -> AuthResult<()> {
        let mut accounts = self.inner.lock().await;
        let user = &account.user;
        if accounts.users.values().any(|(u, _)| u.email == user.email) {
            return Err(AuthError::EmailTaken);
        }
        if accounts
            .users
            .values()
            .any(|(u, _)| u.user_name.canonical() == user.user_name.canonical())
        {
            return Err(AuthError::UserNameTaken);
        }
        accounts
            .users
            .insert(user.id, (user.clone(), account.password_hash.clone()));
        accounts.profiles.insert(user.id, account.profile.clone());
        Ok(())
    }

    async fn find_by_id(&self, user_id: UserId) -> AuthResult<Option<User>> {
        let accounts = self.inner.lock().await;
        Ok(accounts.users.get(&user_id).map(|(u, _)| u.clone()))
    }

    async fn find_by_email(&self, email: &Email) -> AuthResult<Option<User>> {
        let accounts = self.inner.lock().await;
        Ok(accounts
            .users
            .values()
            .find(|(u, _)| &u.email == email)
            .map(|(u, _)| u.clone()))
    }

    async fn find_by_user_name(&self, user_name: &UserName) -> AuthResult<Option<User>> {
        let canonical = user_name.canonical();
        let accounts = self.inner.lock().await;
        Ok(accounts
            .users
            .values()
            .find(|(u, _)| u.user_name.canonical() == canonical)
            .map(|(u, _)| u.clone()))
    }

    async fn exists_by_email(&self, email: &Email) -> AuthResult<bool> {
        Ok(self.find_by_email(email).await?.is_some())
    }

    async fn exists_by_user_name(&self, user_name: &UserName) -> AuthResult<bool> {
        Ok(self.find_by_user_name(user_name).await?.is_some())
    }

    async fn find_credentials(&self, email: &Email) -> AuthResult<Option<(User, UserPassword)>> {
        let accounts = self.inner.lock().await;
        Ok(accounts
            .users
            .values()
            .find(|(u, _)| &u.email == email)
            .cloned())
    }

    async fn update(&self, user: &User) -> AuthResult<()> {
        let mut accounts = self.inner.lock().await;
        let (stored, _) = accounts
            .users
            .get_mut(&user.id)
            .ok_or(AuthError::UserNotFound)?;
        *stored = user.clone();
        Ok(())
    }

    async fn list(&self, search: Option<&str>, page: PageRequest) -> AuthResult<Page<User>> {
        let needle = search.map(str::to_lowercase);
        let accounts = self.inner.lock().await;
        let mut users: Vec<User> = accounts
            .users
            .values()
            .map(|(u, _)| u.clone())
            .filter(|u| match &needle {
                Some(n) => u.email.as_str().contains(n.as_str()) || u.user_name.canonical().contains(n.as_str()),
                None => true,
            })
            .collect();
        users.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(Page::from_vec(users, page))
    }
}

impl ProfileRepository for MemoryAuthRepository {
    async fn find_by_user_id(&self, user_id: UserId) -> AuthResult<Option<Profile>> {
        let accounts = self.inner.lock().await;
        Ok(accounts.profiles.get(&user_id).cloned())
    }

    async fn update(&self, profile: &Profile) -> AuthResult<()> {
        let mut accounts = self.inner.lock().await;
        accounts.profiles.insert(profile.user_id, profile.clone());
        Ok(())
    }
}

#[derive(Default)]
struct Sessions {
    records: HashMap<String, (SessionRecord, Instant)>,
    index: HashMap<UserId, UserIndex>,
}

/// Mirrors the Redis `user_sessions:{id}` list, which expires as a whole
struct UserIndex {
    digests: VecDeque<String>,
    expires_at: Instant,
}

#[derive(Clone)]
pub struct MemorySessionStore {
    inner: Arc<Mutex<Sessions>>,
    max_indexed_sessions: usize,
}

impl Default for MemorySessionStore {
    fn default() -> Self {
        Self::new(10)
    }
}

impl MemorySessionStore {
    pub fn new(max_indexed_sessions: usize) -> Self {
        Self {
            inner: Arc::new(Mutex::new(Sessions::default())),
            max_indexed_sessions: max_indexed_sessions.max(1),
        }
    }

    /// Live (unexpired) sessions, across all users.
    pub async fn live_count(&self) -> usize {
        let now = Instant::now();
        let sessions = self.inner.lock().await;
        sessions.records.values().filter(|(_, exp)| *exp > now).count()
    }
}

impl SessionStore for MemorySessionStore {
    async fn create(
        &self,
        token: &SessionToken,
        record: &SessionRecord,
        ttl: Duration,
    ) -> AuthResult<()> {
        let digest = token.digest();
        let now = Instant::now();
        let mut sessions = self.inner.lock().await;
        sessions
            .records
            .insert(digest.clone(), (record.clone(), now + ttl));
        let index = sessions
            .index
            .entry(record.user_id)
            .or_insert_with(|| UserIndex {
                digests: VecDeque::new(),
                expires_at: now,
            });
        if index.expires_at <= now {
            index.digests.clear();
        }
        index.digests.push_front(digest);
        index.digests.truncate(self.max_indexed_sessions);
        index.expires_at = now + ttl;
        Ok(())
    }

    async fn get(&self, token: &SessionToken) -> AuthResult<Option<SessionRecord>> {
        let digest = token.digest();
        let mut sessions = self.inner.lock().await;
        match sessions.records.get(&digest) {
            Some((record, exp)) if *exp > Instant::now() => Ok(Some(record.clone())),
            Some(_) => {
                sessions.records.remove(&digest);
                Ok(None)
            }
            None => Ok(None),
        }
    }

    async fn refresh(
        &self,
        token: &SessionToken,
        user_id: UserId,
        ttl: Duration,
    ) -> AuthResult<bool> {
        let now = Instant::now();
        let mut sessions = self.inner.lock().await;
        let refreshed = match sessions.records.get_mut(&token.digest()) {
            Some((_, exp)) if *exp > now => {
                *exp = now + ttl;
                true
            }
            _ => false,
        };
        if let Some(index) = sessions.index.get_mut(&user_id) {
            if index.expires_at > now {
                index.expires_at = now + ttl;
            }
        }
        Ok(refreshed)
    }

    async fn delete(&self, token: &SessionToken) -> AuthResult<()> {
        let mut sessions = self.inner.lock().await;
        sessions.records.remove(&token.digest());
        Ok(())
    }

    async fn delete_all_for_user(&self, user_id: UserId) -> AuthResult<u64> {
        let now = Instant::now();
        let mut sessions = self.inner.lock().await;
        let digests = match sessions.index.remove(&user_id) {
            Some(index) if index.expires_at > now => index.digests,
            _ => VecDeque::new(),
        };
        let removed = digests
            .iter()
            .filter(|d| sessions.records.remove(d.as_str()).is_some())
            .count();
        Ok(removed as u64)
    }
}
