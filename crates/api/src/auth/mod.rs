//! Authentication primitives.
//!
//! - [`password`] -- Argon2id password hashing and verification.
//! - [`jwt`] -- access- and refresh-token generation and validation.
//! - [`cookie`] -- the httpOnly refresh-token cookie.

pub mod cookie;
pub mod jwt;
pub mod password;
