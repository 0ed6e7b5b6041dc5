//! [`Command`] for deleting a [`User`].

use common::operations::{By, Delete};
use derive_more::{Display, Error, From};
use tracerr::Traced;

use crate::{
    domain::{user, User},
    infra::{cache, database, Cache, Database},
    Service,
};

use super::Command;

/// [`Command`] for deleting a [`User`].
///
/// Live [`Session`]s of the deleted [`User`] are not terminated: they
/// stop authorizing anyway, as the [`User`] no longer resolves.
///
/// [`Session`]: crate::domain::user::Session
#[derive(Clone, Copy, Debug, From)]
pub struct DeleteUser {
    /// ID of the [`User`] to delete.
    pub id: user::Id,
}

impl<Db, C, S> Command<DeleteUser> for Service<Db, C, S>
where
    Db: Database<
        Delete<By<User, user::Id>>,
        Ok = u64,
        Err = Traced<database::Error>,
    >,
    C: Cache<Delete<By<User, user::Id>>, Ok = (), Err = Traced<cache::Error>>,
{
    type Ok = ();
    type Err = Traced<ExecutionError>;

    async fn execute(&self, cmd: DeleteUser) -> Result<Self::Ok, Self::Err> {
        use ExecutionError as E;

        let DeleteUser { id } = cmd;

        let affected = self
            .database()
            .execute(Delete(By::new(id)))
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))?;
        if affected == 0 {
            return Err(tracerr::new!(E::UserNotExists(id)));
        }

        // Snapshot eviction is best effort: an unevicted snapshot only
        // lives until its TTL.
        if let Err(e) = self.cache().execute(Delete(By::new(id))).await {
            tracing::warn!(error = %e, "`User` cache eviction failed");
        }

        Ok(())
    }
}

/// Error of [`DeleteUser`] [`Command`] execution.
#[derive(Debug, Display, Error, From)]
pub enum ExecutionError {
    /// [`Database`] error.
    #[display("`Database` operation failed: {_0}")]
    Db(database::Error),

    /// [`User`] does not exist.
    #[display("`User(id: {_0})` does not exist")]
    #[from(ignore)]
    UserNotExists(#[error(not(source))] user::Id),
}
