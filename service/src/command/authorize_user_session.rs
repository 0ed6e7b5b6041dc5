//! [`Command`] for authorizing a [`User`] request.

use common::operations::{By, Insert, Select};
use derive_more::{Display, Error, From};
use tracerr::Traced;

use crate::{
    domain::{
        user::{self, session, Session},
        User,
    },
    infra::{cache, database, Cache, Database},
    query,
    token,
    Service,
};

use super::Command;

/// [`Command`] for authorizing a [`User`] request.
///
/// A cryptographically valid token is not sufficient on its own: the
/// [`Session`] it names must still resolve in the session store.
#[derive(Debug, From)]
pub enum AuthorizeUserSession {
    /// Authorize by an [`token::AccessToken`].
    ByToken(token::AccessToken),

    /// Authorize by a known [`session::Id`].
    BySessionId(session::Id),
}

/// Output of [`AuthorizeUserSession`] [`Command`].
#[derive(Clone, Debug)]
pub struct Output {
    /// Authorized [`User`].
    pub user: User,

    /// Live [`Session`] of the [`User`].
    pub session: Session,
}

impl<Db, C, S> Command<AuthorizeUserSession> for Service<Db, C, S>
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
    S: Cache<
        Select<By<Option<Session>, session::Id>>,
        Ok = Option<Session>,
        Err = Traced<cache::Error>,
    >,
{
    type Ok = Output;
    type Err = Traced<ExecutionError>;

    async fn execute(
        &self,
        cmd: AuthorizeUserSession,
    ) -> Result<Self::Ok, Self::Err> {
        use AuthorizeUserSession as Cmd;
        use ExecutionError as E;

        let session_id = match cmd {
            Cmd::ByToken(token) => {
                self.config()
                    .tokens
                    .decode_access(&token)
                    .map_err(tracerr::from_and_wrap!(=> E))?
                    .session_id
            }
            Cmd::BySessionId(id) => id,
        };

        let session = self
            .sessions()
            .execute(Select(By::new(session_id)))
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))?
            .ok_or(E::SessionExpired)
            .map_err(tracerr::wrap!())?;

        let user = self
            .execute(query::user::ByIdCached(session.user_id))
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))?
            .ok_or(E::UserNotExists(session.user_id))
            .map_err(tracerr::wrap!())?;

        Ok(Output { user, session })
    }
}

/// Error of [`AuthorizeUserSession`] [`Command`] execution.
#[derive(Debug, Display, Error, From)]
pub enum ExecutionError {
    /// [`Database`] error.
    #[display("`Database` operation failed: {_0}")]
    Db(database::Error),

    /// [`Session`] store error.
    #[display("`Session` store operation failed: {_0}")]
    Sessions(cache::Error),

    /// Provided token is invalid.
    #[display("{_0}")]
    InvalidToken(token::InvalidTokenError),

    /// [`Session`] is expired or terminated.
    #[display("`Session` is expired")]
    SessionExpired,

    /// [`User`] the [`Session`] belongs to does not exist.
    #[display("`User(id: {_0})` does not exist")]
    #[from(ignore)]
    UserNotExists(#[error(not(source))] user::Id),
}

impl From<query::user::ExecutionError> for ExecutionError {
    fn from(e: query::user::ExecutionError) -> Self {
        match e {
            query::user::ExecutionError::Db(e) => Self::Db(e),
        }
    }
}
