//! [`Command`] for updating a [`User`] profile.

use common::{
    operations::{By, Commit, Insert, Lock, Select, Transact, Transacted, Update},
    DateTime,
};
use derive_more::{Display, Error, From};
use secrecy::{ExposeSecret as _, SecretBox};
use tracerr::Traced;

#[cfg(doc)]
use crate::domain::user::{Avatar, Name, Password};
use crate::{
    domain::{user, User},
    infra::{cache, database, Cache, Database},
    Service,
};

use super::Command;

/// [`Command`] for updating a [`User`] profile.
///
/// Fields left as [`None`] are kept unchanged. The returned [`User`] is
/// [`User::redact()`]ed.
#[derive(Debug)]
pub struct UpdateUser {
    /// ID of the [`User`] to update.
    pub id: user::Id,

    /// New first [`Name`] of the [`User`].
    pub first_name: Option<user::Name>,

    /// New last [`Name`] of the [`User`].
    pub last_name: Option<user::Name>,

    /// New [`Avatar`] of the [`User`].
    pub avatar: Option<user::Avatar>,

    /// New [`Password`] of the [`User`].
    pub password: Option<SecretBox<user::Password>>,
}

impl<Db, C, S> Command<UpdateUser> for Service<Db, C, S>
where
    Db: Database<Transact, Err = Traced<database::Error>>,
    Transacted<Db>: Database<
            Select<By<Option<User>, user::Id>>,
            Ok = Option<User>,
            Err = Traced<database::Error>,
        > + Database<
            Lock<By<User, user::Id>>,
            Ok = (),
            Err = Traced<database::Error>,
        > + Database<Update<User>, Ok = u64, Err = Traced<database::Error>>
        + Database<Commit, Ok = (), Err = Traced<database::Error>>,
    C: for<'u> Cache<Insert<&'u User>, Ok = (), Err = Traced<cache::Error>>,
{
    type Ok = User;
    type Err = Traced<ExecutionError>;

    async fn execute(&self, cmd: UpdateUser) -> Result<Self::Ok, Self::Err> {
        use ExecutionError as E;

        let UpdateUser {
            id,
            first_name,
            last_name,
            avatar,
            password,
        } = cmd;

        let tx = self
            .database()
            .execute(Transact)
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))?;

        // Avoid concurrent actions upon the same `User`.
        tx.execute(Lock(By::new(id)))
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))
            .map(drop)?;

        let mut user = tx
            .execute(Select(By::<Option<User>, _>::new(id)))
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))?
            .ok_or(E::UserNotExists(id))
            .map_err(tracerr::wrap!())?;

        if let Some(first_name) = first_name {
            user.first_name = first_name;
        }
        if let Some(last_name) = last_name {
            user.last_name = last_name;
        }
        if let Some(avatar) = avatar {
            user.avatar = Some(avatar);
        }
        if let Some(password) = password {
            user.password_hash =
                user::PasswordHash::new(password.expose_secret())
                    .map_err(tracerr::from_and_wrap!(=> E))?;
        }
        user.updated_at = DateTime::now().coerce();

        let affected = tx
            .execute(Update(user.clone()))
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))?;
        if affected == 0 {
            return Err(tracerr::new!(E::UserNotExists(id)));
        }

        tx.execute(Commit)
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))?;

        // A stale snapshot would undo the update for up to its TTL, so
        // overwrite it. Failures here leave correctness intact.
        if let Err(e) = self.cache().execute(Insert(&user)).await {
            tracing::warn!(error = %e, "`User` cache refresh failed");
        }

        Ok(user.redact())
    }
}

/// Error of [`UpdateUser`] [`Command`] execution.
#[derive(Debug, Display, Error, From)]
pub enum ExecutionError {
    /// [`Database`] error.
    #[display("`Database` operation failed: {_0}")]
    Db(database::Error),

    /// Failed to hash the provided [`Password`].
    #[display("Failed to hash password: {_0}")]
    HashPassword(user::HashingError),

    /// [`User`] does not exist.
    #[display("`User(id: {_0})` does not exist")]
    #[from(ignore)]
    UserNotExists(#[error(not(source))] user::Id),
}
