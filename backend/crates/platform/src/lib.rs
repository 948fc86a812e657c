//! Platform Crate - Technical Infrastructure
//!
//! Shared technical foundations with no business meaning:
//! - Digests and random tokens (SHA-256, SHA-512, MD5, URL-safe Base64)
//! - Password policy and Argon2id hashing
//! - Session cookie construction and parsing
//! - Client IP extraction and CIDR allow lists

pub mod client;
pub mod cookie;
pub mod crypto;
pub mod password;
