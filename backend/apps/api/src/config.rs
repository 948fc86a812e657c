//! Server Configuration
//!
//! Reads the environment (after `.env`) into the typed configs of each crate.
//! `APP_ENV=production` starts from the secure defaults; anything else starts
//! from `development()`.

use std::env;
use std::net::SocketAddr;

use anyhow::Context;
use auth::config::AuthConfig;
use marketplace::MarketplaceConfig;
use payments::PaymentsConfig;

pub struct ServerConfig {
    pub database_url: String,
    pub redis_url: String,
    pub bind_addr: SocketAddr,
    pub frontend_origins: Vec<String>,
    pub auth: AuthConfig,
    pub marketplace: MarketplaceConfig,
    pub payments: PaymentsConfig,
}

impl ServerConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        let production = var("APP_ENV").is_some_and(|v| v.eq_ignore_ascii_case("production"));

        let database_url = var("DATABASE_URL").context("DATABASE_URL must be set")?;
        let redis_url = var("REDIS_URL").unwrap_or_else(|| "redis://127.0.0.1:6379".to_string());
        let bind_addr = var("BIND_ADDR")
            .unwrap_or_else(|| "0.0.0.0:8080".to_string())
            .parse()
            .context("BIND_ADDR must be host:port")?;
        let frontend_origins = var("FRONTEND_ORIGINS")
            .unwrap_or_else(|| "http://localhost:3000".to_string())
            .split(',')
            .map(|origin| origin.trim().to_string())
            .filter(|origin| !origin.is_empty())
            .collect();

        let mut auth = if production {
            AuthConfig::default()
        } else {
            AuthConfig::development()
        };
        auth.password_pepper = var("PASSWORD_PEPPER").map(String::into_bytes);

        let mut payments = if production {
            PaymentsConfig::default()
        } else {
            PaymentsConfig::development()
        };
        if let Some(base_url) = var("PUBLIC_BASE_URL") {
            payments.public_base_url = base_url.trim_end_matches('/').to_string();
        }
        if let Some(merchant_id) = var("PAYFAST_MERCHANT_ID") {
            payments.payfast.merchant_id = merchant_id;
        }
        if let Some(merchant_key) = var("PAYFAST_MERCHANT_KEY") {
            payments.payfast.merchant_key = merchant_key;
        }
        payments.payfast.passphrase = var("PAYFAST_PASSPHRASE").or(payments.payfast.passphrase);
        if let Some(validate) = var("PAYFAST_VALIDATE") {
            payments.payfast.validate_with_server = matches!(validate.as_str(), "1" | "true");
        }
        if let Some(site_code) = var("OZOW_SITE_CODE") {
            payments.ozow.site_code = site_code;
        }
        if let Some(private_key) = var("OZOW_PRIVATE_KEY") {
            payments.ozow.private_key = private_key;
        }

        if production && !payments.payfast.is_configured() {
            tracing::warn!("PayFast credentials missing, PayFast webhooks will be rejected");
        }
        if !payments.ozow.is_configured() {
            tracing::warn!("Ozow credentials missing, Ozow webhooks will be rejected");
        }

        Ok(Self {
            database_url,
            redis_url,
            bind_addr,
            frontend_origins,
            auth,
            marketplace: if production {
                MarketplaceConfig::default()
            } else {
                MarketplaceConfig::development()
            },
            payments,
        })
    }
}

/// Set and non-empty
fn var(key: &str) -> Option<String> {
    env::var(key).ok().filter(|v| !v.trim().is_empty())
}
