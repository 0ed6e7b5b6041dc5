//! Infrastructure layer.

pub mod cache;
pub mod database;

#[cfg(feature = "redis")]
pub use self::cache::{redis, Redis};
pub use self::cache::Cache;
#[cfg(feature = "postgres")]
pub use self::database::{postgres, Postgres};
pub use self::database::Database;
