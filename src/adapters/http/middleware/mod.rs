//! HTTP middleware for axum.
//!
//! This module contains middleware layers for cross-cutting concerns:
//!
//! - `identity` - Caller identity extraction from the gateway header

pub mod identity;

pub use identity::{CallerIdentity, IdentityRejection, USER_ID_HEADER};
