//! [`Query`] collection related to a single [`User`].

use common::operations::{By, Insert, Select};
use derive_more::{Display, Error, From};
use tracerr::Traced;

use crate::{
    domain::{user, User},
    infra::{cache, database, Cache, Database},
    Service,
};

use super::{DatabaseQuery, Query};

/// Queries a [`User`] by its [`user::Id`], straight from the
/// [`Database`].
pub type ById = DatabaseQuery<By<Option<User>, user::Id>>;

/// Queries a [`User`] by its [`user::Email`].
pub type ByEmail = DatabaseQuery<By<Option<User>, user::Email>>;

/// Queries a [`User`] by its [`user::Id`], checking the [`Cache`]
/// first.
///
/// A [`Database`] hit repopulates the [`Cache`]. [`Cache`] failures are
/// logged and degrade to a [`Database`] round trip.
#[derive(Clone, Copy, Debug, From)]
pub struct ByIdCached(pub user::Id);

impl<Db, C, S> Query<ByIdCached> for Service<Db, C, S>
where
    Db: Database<
        Select<By<Option<User>, user::Id>>,
        Ok = Option<User>,
        Err = Traced<database::Error>,
    >,
    C: Cache<
            Select<By<Option<User>, user::Id>>,
            Ok = Option<User>,
            Err = Traced<cache::Error>,
        > + for<'u> Cache<Insert<&'u User>, Ok = (), Err = Traced<cache::Error>>,
{
    type Ok = Option<User>;
    type Err = Traced<ExecutionError>;

    async fn execute(
        &self,
        ByIdCached(id): ByIdCached,
    ) -> Result<Self::Ok, Self::Err> {
        use ExecutionError as E;

        let cached = self
            .cache()
            .execute(Select(By::new(id)))
            .await
            .unwrap_or_else(|e| {
                tracing::warn!(error = %e, "`User` cache lookup failed");
                None
            });
        if cached.is_some() {
            return Ok(cached);
        }

        let user = self
            .database()
            .execute(Select(By::new(id)))
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))?;
        if let Some(user) = &user {
            if let Err(e) = self.cache().execute(Insert(user)).await {
                tracing::warn!(error = %e, "`User` cache population failed");
            }
        }

        Ok(user)
    }
}

/// Error of [`ByIdCached`] [`Query`] execution.
#[derive(Debug, Display, Error, From)]
pub enum ExecutionError {
    /// [`Database`] error.
    #[display("`Database` operation failed: {_0}")]
    Db(database::Error),
}
