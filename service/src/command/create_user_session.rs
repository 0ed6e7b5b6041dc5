//! [`Command`] for logging a [`User`] in.

use common::{
    operations::{By, Insert, Select},
    DateTime,
};
use derive_more::{Display, Error, From};
use secrecy::{ExposeSecret as _, SecretBox};
use tracerr::Traced;

#[cfg(doc)]
use crate::domain::user::{Email, Password};
use crate::{
    domain::{
        user::{self, session, Session},
        User,
    },
    infra::{cache, database, Cache, Database},
    token,
    Service,
};

use super::Command;

/// [`Command`] for logging a [`User`] in, creating a new [`Session`].
#[derive(Debug)]
pub struct CreateUserSession {
    /// [`Email`] of the [`User`] to log in.
    pub email: user::Email,

    /// [`Password`] of the [`User`] to log in.
    pub password: SecretBox<user::Password>,
}

/// Output of [`CreateUserSession`] [`Command`].
#[derive(Clone, Debug)]
pub struct Output {
    /// Logged in [`User`].
    pub user: User,

    /// Created [`Session`].
    pub session: Session,

    /// [`token::TokenPair`] bound to the created [`Session`].
    pub tokens: token::TokenPair,
}

impl<Db, C, S> Command<CreateUserSession> for Service<Db, C, S>
where
    Db: Database<
        Select<By<Option<User>, user::Email>>,
        Ok = Option<User>,
        Err = Traced<database::Error>,
    >,
    S: Cache<Insert<Session>, Ok = (), Err = Traced<cache::Error>>,
{
    type Ok = Output;
    type Err = Traced<ExecutionError>;

    async fn execute(
        &self,
        cmd: CreateUserSession,
    ) -> Result<Self::Ok, Self::Err> {
        use ExecutionError as E;

        let CreateUserSession { email, password } = cmd;

        // Whether the email is unknown or the password mismatches is
        // deliberately indistinguishable from outside.
        let user = self
            .database()
            .execute(Select(By::new(email)))
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))?
            .ok_or(E::WrongCredentials)
            .map_err(tracerr::wrap!())?;
        if !user.password_hash.verify(password.expose_secret()) {
            return Err(tracerr::new!(E::WrongCredentials));
        }

        let session = Session {
            id: session::Id::new(),
            user_id: user.id,
            expires_at: (DateTime::now() + self.config().session_ttl).coerce(),
        };
        self.sessions()
            .execute(Insert(session))
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))?;

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

/// Error of [`CreateUserSession`] [`Command`] execution.
#[derive(Debug, Display, Error, From)]
pub enum ExecutionError {
    /// [`Database`] error.
    #[display("`Database` operation failed: {_0}")]
    Db(database::Error),

    /// [`Session`] store error.
    #[display("`Session` store operation failed: {_0}")]
    Sessions(cache::Error),

    /// Failed to sign a [`token::TokenPair`].
    #[display("Failed to issue tokens: {_0}")]
    IssueTokens(token::IssueError),

    /// Wrong [`User`] credentials provided.
    #[display("Wrong `User` credentials")]
    WrongCredentials,
}
