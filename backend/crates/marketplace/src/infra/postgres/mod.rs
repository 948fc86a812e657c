//! PostgreSQL Repository Implementations
//!
//! One repository type, split by area. Row structs map columns and are
//! converted into domain entities with `into_entity`.

mod billing;
mod catalogue;
mod messaging;
mod orders;
mod projects;

use std::str::FromStr;

use sqlx::PgPool;

use crate::error::{MarketplaceError, MarketplaceResult};

/// PostgreSQL-backed marketplace repository
#[derive(Clone)]
pub struct PgMarketplaceRepository {
    pool: PgPool,
}

impl PgMarketplaceRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

/// Parse a status/enum column. A bad value means the row was written by
/// something other than this crate.
fn decode<T>(column: &'static str, value: &str) -> MarketplaceResult<T>
where
    T: FromStr<Err = String>,
{
    value
        .parse()
        .map_err(|e: String| MarketplaceError::Internal(format!("{column}: {e}")))
}

/// Unique violations on the named constraint become a conflict.
fn conflict_on(constraint: &'static str, message: &'static str) -> impl Fn(sqlx::Error) -> MarketplaceError {
    move |err| {
        if let sqlx::Error::Database(db_err) = &err {
            if db_err.constraint() == Some(constraint) {
                return MarketplaceError::conflict(message);
            }
        }
        MarketplaceError::Database(err)
    }
}

/// `ILIKE` pattern with the wildcards in the needle escaped
fn like_pattern(needle: &str) -> String {
    let escaped = needle
        .replace('\\', "\\\\")
        .replace('%', "\\%")
        .replace('_', "\\_");
    format!("%{escaped}%")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::entity::OrderStatus;

    #[test]
    fn decodes_known_codes() {
        let status: OrderStatus = decode("orders.status", "awaiting_payment").unwrap();
        assert_eq!(status, OrderStatus::AwaitingPayment);
        let err = decode::<OrderStatus>("orders.status", "shipped").unwrap_err();
        assert!(matches!(err, MarketplaceError::Internal(_)));
    }

    #[test]
    fn escapes_like_wildcards() {
        assert_eq!(like_pattern("logo"), "%logo%");
        assert_eq!(like_pattern("100%_off"), "%100\\%\\_off%");
    }
}
