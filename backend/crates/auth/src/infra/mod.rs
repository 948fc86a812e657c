//! Infrastructure Layer
//!
//! Postgres for accounts, Redis for sessions, in-memory stores for tests.

pub mod memory;
pub mod postgres;
pub mod redis;

pub use memory::{MemoryAuthRepository, MemorySessionStore};
pub use postgres::PgAuthRepository;
pub use redis::RedisSessionStore;
