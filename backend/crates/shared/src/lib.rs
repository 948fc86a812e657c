//! Shared kernel for the marketplace backend.
//!
//! Holds the vocabulary every bounded context agrees on:
//! - the unified [`error::app_error::AppError`] and its [`error::kind::ErrorKind`]
//! - typed entity identifiers ([`id::Id`])
//! - pagination primitives shared by list endpoints
//!
//! Nothing here knows about users, orders or payments beyond their ids.

pub mod error {
    pub mod app_error;
    pub mod conversions;
    pub mod kind;
}
pub mod id;
pub mod pagination;
