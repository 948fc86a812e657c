//! Application Configuration
//!
//! Configuration for the Auth application layer.

use std::time::Duration;

use platform::cookie::CookieConfig;
/// Re-export SameSite from platform
pub use platform::cookie::SameSite;

/// Auth application configuration
#[derive(Debug, Clone)]
pub struct AuthConfig {
    /// Session cookie name
    pub session_cookie_name: String,
    /// Session TTL, refreshed on every successful lookup (7 days)
    pub session_ttl: Duration,
    /// Most recent sessions kept in the per-user revocation index
    pub max_indexed_sessions: usize,
    /// Whether to require Secure cookie
    pub cookie_secure: bool,
    /// SameSite policy
    pub cookie_same_site: SameSite,
    /// Password pepper (optional, application-wide secret)
    pub password_pepper: Option<Vec<u8>>,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            session_cookie_name: "zomieks_session".to_string(),
            session_ttl: Duration::from_secs(7 * 24 * 3600),
            max_indexed_sessions: 10,
            cookie_secure: true,
            cookie_same_site: SameSite::Lax,
            password_pepper: None,
        }
    }
}

impl AuthConfig {
    /// Create config for development (insecure cookie)
    pub fn development() -> Self {
        Self {
            cookie_secure: false,
            ..Default::default()
        }
    }

    /// Get password pepper as slice
    pub fn pepper(&self) -> Option<&[u8]> {
        self.password_pepper.as_deref()
    }

    /// Session cookie attributes
    pub fn cookie(&self) -> CookieConfig {
        CookieConfig {
            same_site: self.cookie_same_site,
            ..CookieConfig::session(
                self.session_cookie_name.clone(),
                self.cookie_secure,
                self.session_ttl.as_secs(),
            )
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn development_cookie_is_not_secure() {
        let cookie = AuthConfig::development().cookie().build_set_cookie("t0k3n");
        assert!(cookie.starts_with("zomieks_session=t0k3n"));
        assert!(cookie.contains("HttpOnly"));
        assert!(cookie.contains("SameSite=Lax"));
        assert!(!cookie.contains("Secure"));
        assert!(cookie.contains("Max-Age=604800"));
    }

    #[test]
    fn production_cookie_is_secure() {
        assert!(AuthConfig::default().cookie().build_set_cookie("x").contains("; Secure"));
    }
}
