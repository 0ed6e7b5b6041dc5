//! [`Cache`] and session store implementations.

#[cfg(feature = "redis")]
pub mod redis;

use derive_more::{Display, Error as StdError, From};

#[cfg(feature = "redis")]
pub use self::redis::Redis;

/// Cache (or session store) operation.
pub use common::Handler as Cache;

/// [`Cache`] error.
#[derive(Debug, Display, From, StdError)]
pub enum Error {
    #[cfg(feature = "redis")]
    /// [`Redis`] error.
    Redis(redis::Error),
}
