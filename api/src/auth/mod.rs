//! Admin authentication

pub mod admin_token;

pub use admin_token::{admin_auth_middleware, hash_admin_token, Reviewer};
