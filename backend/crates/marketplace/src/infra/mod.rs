//! Infrastructure Layer

pub mod memory;
pub mod postgres;

pub use memory::MemoryMarketplaceRepository;
pub use postgres::PgMarketplaceRepository;
