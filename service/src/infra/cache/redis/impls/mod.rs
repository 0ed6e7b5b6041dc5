//! Implementations of [`Cache`] operations for a [`Redis`] client.
//!
//! [`Cache`]: crate::infra::cache::Cache
//! [`Redis`]: super::Redis

mod session;
mod user;
