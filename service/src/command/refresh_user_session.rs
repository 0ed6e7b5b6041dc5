//! [`Command`] for refreshing a [`Session`]s token pair.

use common::operations::{By, Select};
use derive_more::{Display, Error, From};
use tracerr::Traced;

use crate::{
    domain::{
        user::{self, Session},
        User,
    },
    infra::{cache, database, Cache, Database},
    token,
    Service,
};

use super::Command;

/// [`Command`] for exchanging a valid [`token::RefreshToken`] for a
/// fresh [`token::TokenPair`].
///
/// The [`Session`] itself is left untouched: refreshing extends token
/// validity, never the [`Session`] lifetime.
#[derive(Clone, Debug, From)]
pub struct RefreshUserSession {
    /// [`token::RefreshToken`] to exchange.
    pub token: token::RefreshToken,
}

/// Output of [`RefreshUserSession`] [`Command`].
#[derive(Clone, Debug)]
pub struct Output {
    /// [`User`] the [`Session`] belongs to.
    pub user: User,

    /// Refreshed [`Session`].
    pub session: Session,

    /// Newly issued [`token::TokenPair`], bound to the same
    /// [`Session`].
    pub tokens: token::TokenPair,
}

impl<Db, C, S> Command<RefreshUserSession> for Service<Db, C, S>
where
    Db: Database<
        Select<By<Option<User>, user::Id>>,
        Ok = Option<User>,
        Err = Traced<database::Error>,
    >,
    S: Cache<
        Select<By<Option<Session>, user::session::Id>>,
        Ok = Option<Session>,
        Err = Traced<cache::Error>,
    >,
{
    type Ok = Output;
    type Err = Traced<ExecutionError>;

    async fn execute(
        &self,
        cmd: RefreshUserSession,
    ) -> Result<Self::Ok, Self::Err> {
        use ExecutionError as E;

        let RefreshUserSession { token } = cmd;

        let claims = self
            .config()
            .tokens
            .decode_refresh(&token)
            .map_err(tracerr::from_and_wrap!(=> E))?;

        // A terminated or expired `Session` invalidates the still
        // cryptographically valid refresh token.
        let session = self
            .sessions()
            .execute(Select(By::new(claims.session_id)))
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))?
            .ok_or(E::SessionExpired)
            .map_err(tracerr::wrap!())?;

        let user = self
            .database()
            .execute(Select(By::new(session.user_id)))
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))?
            .ok_or(E::UserNotExists(session.user_id))
            .map_err(tracerr::wrap!())?;

        let tokens = self
            .config()
            .tokens
            .issue_pair(&user, session.id)
            .map_err(tracerr::from_and_wrap!(=> E))?;

        Ok(Output {
            user,
            session,
            tokens,
        })
    }
}

/// Error of [`RefreshUserSession`] [`Command`] execution.
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

    /// Failed to sign a [`token::TokenPair`].
    #[display("Failed to issue tokens: {_0}")]
    IssueTokens(token::IssueError),

    /// [`Session`] is expired or terminated.
    #[display("`Session` is expired")]
    SessionExpired,

    /// [`User`] the [`Session`] belongs to does not exist.
    #[display("`User(id: {_0})` does not exist")]
    #[from(ignore)]
    UserNotExists(#[error(not(source))] user::Id),
}
