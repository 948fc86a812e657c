//! PostgreSQL Repository Implementations

use chrono::{DateTime, Utc};
use kernel::id::UserId;
use kernel::pagination::{Page, PageRequest};
use sqlx::PgPool;
use uuid::Uuid;

use crate::domain::entity::{NewAccount, Profile, User};
use crate::domain::repository::{ProfileRepository, UserRepository};
use crate::domain::value_object::{Email, UserName, UserPassword, UserRole};
use crate::error::{AuthError, AuthResult};

const USER_COLUMNS: &str = r#"
    id,
    email,
    user_name,
    role,
    email_verified,
    identity_verified,
    is_suspended,
    suspended_reason,
    last_login_at,
    created_at,
    updated_at
"#;

/// PostgreSQL-backed auth repository
#[derive(Clone)]
pub struct PgAuthRepository {
    pool: PgPool,
}

impl PgAuthRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    async fn fetch_user(&self, filter: &str, value: &str) -> AuthResult<Option<User>> {
        let sql = format!("SELECT {USER_COLUMNS} FROM users WHERE {filter} = $1");
        let row = sqlx::query_as::<_, UserRow>(&sql)
            .bind(value)
            .fetch_optional(&self.pool)
            .await?;

        row.map(UserRow::into_user).transpose()
    }
}

/// Unique violations on sign-up races surface as the matching conflict.
fn map_unique_violation(err: sqlx::Error) -> AuthError {
    if let sqlx::Error::Database(db_err) = &err {
        match db_err.constraint() {
            Some("users_email_key") => return AuthError::EmailTaken,
            Some("users_user_name_canonical_key") => return AuthError::UserNameTaken,
            _ => {}
        }
    }
    AuthError::Database(err)
}

// ============================================================================
// User Repository Implementation
// ============================================================================

impl UserRepository for PgAuthRepository {
    async fn create_account(&self, account: &NewAccount) -> AuthResult<()> {
        let user = &account.user;
        let profile = &account.profile;
        let mut tx = self.pool.begin().await?;

        sqlx::query(
            r#"
            INSERT INTO users (
                id,
                email,
                user_name,
                user_name_canonical,
                password_hash,
                role,
                email_verified,
                identity_verified,
                is_suspended,
                created_at,
                updated_at
            ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, FALSE, $9, $9)
            "#,
        )
        .bind(user.id.as_uuid())
        .bind(user.email.as_str())
        .bind(user.user_name.as_str())
        .bind(user.user_name.canonical())
        .bind(account.password_hash.as_phc_string())
        .bind(user.role.code())
        .bind(user.email_verified)
        .bind(user.identity_verified)
        .bind(user.created_at)
        .execute(&mut *tx)
        .await
        .map_err(map_unique_violation)?;

        sqlx::query(
            r#"
            INSERT INTO profiles (user_id, display_name, headline, bio, location, skills, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            "#,
        )
        .bind(user.id.as_uuid())
        .bind(&profile.display_name)
        .bind(&profile.headline)
        .bind(&profile.bio)
        .bind(&profile.location)
        .bind(&profile.skills)
        .bind(profile.updated_at)
        .execute(&mut *tx)
        .await?;

        // Free plan, never expires
        sqlx::query(
            r#"
            INSERT INTO subscriptions (id, user_id, plan, status, period_start, created_at, updated_at)
            VALUES ($1, $2, 'free', 'active', $3, $3, $3)
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(user.id.as_uuid())
        .bind(user.created_at)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(())
    }

    async fn find_by_id(&self, user_id: UserId) -> AuthResult<Option<User>> {
        let sql = format!("SELECT {USER_COLUMNS} FROM users WHERE id = $1");
        let row = sqlx::query_as::<_, UserRow>(&sql)
            .bind(user_id.as_uuid())
            .fetch_optional(&self.pool)
            .await?;

        row.map(UserRow::into_user).transpose()
    }

    async fn find_by_email(&self, email: &Email) -> AuthResult<Option<User>> {
        self.fetch_user("email", email.as_str()).await
    }

    async fn find_by_user_name(&self, user_name: &UserName) -> AuthResult<Option<User>> {
        self.fetch_user("user_name_canonical", &user_name.canonical())
            .await
    }

    async fn exists_by_email(&self, email: &Email) -> AuthResult<bool> {
        let exists =
            sqlx::query_scalar::<_, bool>("SELECT EXISTS(SELECT 1 FROM users WHERE email = $1)")
                .bind(email.as_str())
                .fetch_one(&self.pool)
                .await?;

        Ok(exists)
    }

    async fn exists_by_user_name(&self, user_name: &UserName) -> AuthResult<bool> {
        let exists = sqlx::query_scalar::<_, bool>(
            "SELECT EXISTS(SELECT 1 FROM users WHERE user_name_canonical = $1)",
        )
        .bind(user_name.canonical())
        .fetch_one(&self.pool)
        .await?;

        Ok(exists)
    }

    async fn find_credentials(&self, email: &Email) -> AuthResult<Option<(User, UserPassword)>> {
        let sql = format!("SELECT {USER_COLUMNS}, password_hash FROM users WHERE email = $1");
        let row = sqlx::query_as::<_, CredentialsRow>(&sql)
            .bind(email.as_str())
            .fetch_optional(&self.pool)
            .await?;

        let Some(row) = row else {
            return Ok(None);
        };
        let password = UserPassword::from_db(row.password_hash)?;
        Ok(Some((row.user.into_user()?, password)))
    }

    async fn update(&self, user: &User) -> AuthResult<()> {
        sqlx::query(
            r#"
            UPDATE users SET
                role = $2,
                email_verified = $3,
                identity_verified = $4,
                is_suspended = $5,
                suspended_reason = $6,
                last_login_at = $7,
                updated_at = $8
            WHERE id = $1
            "#,
        )
        .bind(user.id.as_uuid())
        .bind(user.role.code())
        .bind(user.email_verified)
        .bind(user.identity_verified)
        .bind(user.is_suspended)
        .bind(&user.suspended_reason)
        .bind(user.last_login_at)
        .bind(user.updated_at)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn list(&self, search: Option<&str>, page: PageRequest) -> AuthResult<Page<User>> {
        let pattern = search.map(|s| format!("%{}%", s.to_lowercase()));

        let total = sqlx::query_scalar::<_, i64>(
            r#"
            SELECT COUNT(*) FROM users
            WHERE $1::TEXT IS NULL OR email LIKE $1 OR user_name_canonical LIKE $1
            "#,
        )
        .bind(&pattern)
        .fetch_one(&self.pool)
        .await?;

        let sql = format!(
            r#"
            SELECT {USER_COLUMNS} FROM users
            WHERE $1::TEXT IS NULL OR email LIKE $1 OR user_name_canonical LIKE $1
            ORDER BY created_at DESC
            LIMIT $2 OFFSET $3
            "#
        );
        let rows = sqlx::query_as::<_, UserRow>(&sql)
            .bind(&pattern)
            .bind(page.limit())
            .bind(page.offset())
            .fetch_all(&self.pool)
            .await?;

        let users = rows
            .into_iter()
            .map(UserRow::into_user)
            .collect::<AuthResult<Vec<_>>>()?;

        Ok(Page::new(users, total, page))
    }
}

// ============================================================================
// Profile Repository Implementation
// ============================================================================

impl ProfileRepository for PgAuthRepository {
    async fn find_by_user_id(&self, user_id: UserId) -> AuthResult<Option<Profile>> {
        let row = sqlx::query_as::<_, ProfileRow>(
            r#"
            SELECT user_id, display_name, headline, bio, location, skills, updated_at
            FROM profiles
            WHERE user_id = $1
            "#,
        )
        .bind(user_id.as_uuid())
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(ProfileRow::into_profile))
    }

    async fn update(&self, profile: &Profile) -> AuthResult<()> {
        sqlx::query(
            r#"
            UPDATE profiles SET
                display_name = $2,
                headline = $3,
                bio = $4,
                location = $5,
                skills = $6,
                updated_at = $7
            WHERE user_id = $1
            "#,
        )
        .bind(profile.user_id.as_uuid())
        .bind(&profile.display_name)
        .bind(&profile.headline)
        .bind(&profile.bio)
        .bind(&profile.location)
        .bind(&profile.skills)
        .bind(profile.updated_at)
        .execute(&self.pool)
        .await?;

        Ok(())
    }
}

// ============================================================================
// Row Types
// ============================================================================

#[derive(sqlx::FromRow)]
struct UserRow {
    id: Uuid,
    email: String,
    user_name: String,
    role: String,
    email_verified: bool,
    identity_verified: bool,
    is_suspended: bool,
    suspended_reason: Option<String>,
    last_login_at: Option<DateTime<Utc>>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl UserRow {
    fn into_user(self) -> AuthResult<User> {
        let role = self
            .role
            .parse::<UserRole>()
            .map_err(|e| AuthError::Internal(format!("Invalid role in users.role: {e}")))?;

        Ok(User {
            id: UserId::from_uuid(self.id),
            email: Email::from_db(self.email),
            user_name: UserName::from_db(self.user_name),
            role,
            email_verified: self.email_verified,
            identity_verified: self.identity_verified,
            is_suspended: self.is_suspended,
            suspended_reason: self.suspended_reason,
            last_login_at: self.last_login_at,
            created_at: self.created_at,
            updated_at: self.updated_at,
        })
    }
}

#[derive(sqlx::FromRow)]
struct CredentialsRow {
    #[sqlx(flatten)]
    user: UserRow,
    password_hash: String,
}

#[derive(sqlx::FromRow)]
struct ProfileRow {
    user_id: Uuid,
    display_name: String,
    headline: Option<String>,
    bio: Option<String>,
    location: Option<String>,
    skills: Vec<String>,
    updated_at: DateTime<Utc>,
}

impl ProfileRow {
    fn into_profile(self) -> Profile {
        Profile {
            user_id: UserId::from_uuid(self.user_id),
            display_name: self.display_name,
            headline: self.headline,
            bio: self.bio,
            location: self.location,
            skills: self.skills,
            updated_at: self.updated_at,
        }
    }
}
