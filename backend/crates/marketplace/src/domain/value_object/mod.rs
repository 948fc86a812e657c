//! Value Object Module

pub mod money;
pub mod text;

pub use money::{Cents, InvalidAmount};
pub use text::{Slug, bounded_text};
