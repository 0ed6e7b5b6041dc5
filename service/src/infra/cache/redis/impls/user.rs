//! Implementations of [`User`]s caching operations for a [`Redis`] client.

use std::time::Duration;

use common::{
    operations::{By, Delete, Insert, Select},
    Handler,
};
use tracerr::Traced;

use crate::{
    domain::{user, User},
    infra::cache,
};

use super::super::{Error, Redis};

/// [TTL] of a cached [`User`] snapshot.
///
/// [TTL]: https://en.wikipedia.org/wiki/Time_to_live
const TTL: Duration = Duration::from_secs(60 * 60);

/// Returns the cache key of the [`User`] identified by the provided
/// [`user::Id`].
fn key(id: user::Id) -> String {
    format!("users:{id}")
}

impl Handler<Select<By<Option<User>, user::Id>>> for Redis {
    type Ok = Option<User>;
    type Err = Traced<cache::Error>;

    async fn execute(
        &self,
        Select(by): Select<By<Option<User>, user::Id>>,
    ) -> Result<Self::Ok, Self::Err> {
        self.get(&key(by.into_inner()))
            .await?
            .map(|json| serde_json::from_str(&json))
            .transpose()
            .map_err(Error::Decode)
            .map_err(tracerr::from_and_wrap!(=> cache::Error))
    }
}

impl<'u> Handler<Insert<&'u User>> for Redis {
    type Ok = ();
    type Err = Traced<cache::Error>;

    async fn execute(
        &self,
        Insert(user): Insert<&'u User>,
    ) -> Result<Self::Ok, Self::Err> {
        let json = serde_json::to_string(user)
            .map_err(Error::Decode)
            .map_err(tracerr::from_and_wrap!(=> cache::Error))?;
        self.set_ex(&key(user.id), &json, TTL).await
    }
}

impl Handler<Delete<By<User, user::Id>>> for Redis {
    type Ok = ();
    type Err = Traced<cache::Error>;

    async fn execute(
        &self,
        Delete(by): Delete<By<User, user::Id>>,
    ) -> Result<Self::Ok, Self::Err> {
        self.del(&key(by.into_inner())).await
    }
}
