//! [Redis] implementation of a [`Cache`].
//!
//! [Redis]: https://redis.io
//! [`Cache`]: cache::Cache

mod impls;

use std::time::Duration;

use deadpool_redis::{redis::AsyncCommands as _, Pool, Runtime};
use derive_more::{Debug, Display, Error as StdError, From};
use tracerr::Traced;

use crate::infra::cache;

pub use deadpool_redis::Config;

/// [Redis] client of a [`Cache`].
///
/// [Redis]: https://redis.io
/// [`Cache`]: cache::Cache
#[derive(Clone, Debug)]
pub struct Redis {
    /// Pool of [Redis] connections.
    ///
    /// [Redis]: https://redis.io
    #[debug(skip)]
    pool: Pool,
}

impl Redis {
    /// Creates a new [`Redis`] client out of the provided [`Config`].
    ///
    /// # Errors
    ///
    /// If the provided [`Config`] is invalid.
    pub fn new(conf: &Config) -> Result<Self, Traced<cache::Error>> {
        Ok(Self {
            pool: conf
                .create_pool(Some(Runtime::Tokio1))
                .map_err(Error::from)
                .map_err(tracerr::from_and_wrap!(=> cache::Error))?,
        })
    }

    /// Returns the value stored under the provided `key`, if any.
    pub(crate) async fn get(
        &self,
        key: &str,
    ) -> Result<Option<String>, Traced<cache::Error>> {
        self.pool
            .get()
            .await
            .map_err(Error::from)
            .map_err(tracerr::from_and_wrap!(=> cache::Error))?
            .get(key)
            .await
            .map_err(Error::from)
            .map_err(tracerr::from_and_wrap!(=> cache::Error))
    }

    /// Stores the provided `value` under the provided `key`, expiring it
    /// after the provided `ttl`.
    pub(crate) async fn set_ex(
        &self,
        key: &str,
        value: &str,
        ttl: Duration,
    ) -> Result<(), Traced<cache::Error>> {
        self.pool
            .get()
            .await
            .map_err(Error::from)
            .map_err(tracerr::from_and_wrap!(=> cache::Error))?
            .set_ex(key, value, ttl.as_secs().max(1))
            .await
            .map_err(Error::from)
            .map_err(tracerr::from_and_wrap!(=> cache::Error))
    }

    /// Removes the value stored under the provided `key`.
    ///
    /// No-op if no value is stored under the provided `key`.
    pub(crate) async fn del(
        &self,
        key: &str,
    ) -> Result<(), Traced<cache::Error>> {
        self.pool
            .get()
            .await
            .map_err(Error::from)
            .map_err(tracerr::from_and_wrap!(=> cache::Error))?
            .del(key)
            .await
            .map_err(Error::from)
            .map_err(tracerr::from_and_wrap!(=> cache::Error))
    }
}

/// Possible errors of a [`Redis`] client.
#[derive(Debug, Display, From, StdError)]
pub enum Error {
    /// Failed to execute a [Redis] command.
    ///
    /// [Redis]: https://redis.io
    #[display("Failed to execute Redis command: {_0}")]
    Command(deadpool_redis::redis::RedisError),

    /// Failed to decode a cached value.
    #[display("Failed to decode cached value: {_0}")]
    Decode(serde_json::Error),

    /// Failed to create a [`Pool`] of [Redis] connections.
    ///
    /// [Redis]: https://redis.io
    #[display("Failed to create Redis connections pool: {_0}")]
    Creation(deadpool_redis::CreatePoolError),

    /// Failed to acquire a [Redis] connection from a [`Pool`].
    ///
    /// [Redis]: https://redis.io
    #[display("Failed to acquire Redis connection: {_0}")]
    Pool(deadpool_redis::PoolError),
}
