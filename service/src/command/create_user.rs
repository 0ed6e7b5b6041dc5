//! [`Command`] for registering a new [`User`].

use common::{
    operations::{By, Insert, Select},
    DateTime,
};
use derive_more::{Display, Error, From};
use secrecy::{ExposeSecret as _, SecretBox};
use tracerr::Traced;

#[cfg(doc)]
use crate::domain::user::{Avatar, Email, Name, Password, Role};
use crate::{
    domain::{user, User},
    infra::{database, Database},
    Service,
};

use super::Command;

/// Name of the `UNIQUE` constraint guarding [`Email`] uniqueness.
const EMAIL_UNIQUE_CONSTRAINT: &str = "users_email_key";

/// [`Command`] for registering a new [`User`].
#[derive(Debug)]
pub struct CreateUser {
    /// [`Email`] of a new [`User`].
    pub email: user::Email,

    /// First [`Name`] of a new [`User`].
    pub first_name: user::Name,

    /// Last [`Name`] of a new [`User`].
    pub last_name: user::Name,

    /// [`Role`] of a new [`User`].
    pub role: user::Role,

    /// [`Password`] of a new [`User`].
    pub password: SecretBox<user::Password>,

    /// [`Avatar`] of a new [`User`].
    pub avatar: Option<user::Avatar>,
}

impl<Db, C, S> Command<CreateUser> for Service<Db, C, S>
where
    Db: Database<
            Select<By<Option<User>, user::Email>>,
            Ok = Option<User>,
            Err = Traced<database::Error>,
        > + Database<Insert<User>, Ok = (), Err = Traced<database::Error>>,
{
    type Ok = User;
    type Err = Traced<ExecutionError>;

    async fn execute(&self, cmd: CreateUser) -> Result<Self::Ok, Self::Err> {
        use ExecutionError as E;

        let CreateUser {
            email,
            first_name,
            last_name,
            role,
            password,
            avatar,
        } = cmd;

        let existing = self
            .database()
            .execute(Select(By::new(email.clone())))
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))?;
        if existing.is_some() {
            return Err(tracerr::new!(E::EmailOccupied(email)));
        }

        let now = DateTime::now();
        let user = User {
            id: user::Id::new(),
            email,
            first_name,
            last_name,
            role,
            password_hash: user::PasswordHash::new(password.expose_secret())
                .map_err(tracerr::from_and_wrap!(=> E))?,
            avatar,
            created_at: now.coerce(),
            updated_at: now.coerce(),
        };

        self.database()
            .execute(Insert(user.clone()))
            .await
            .map_err(|e| {
                // Pre-check above cannot rule out a concurrent
                // registration, so the constraint has the final word.
                if e.as_ref()
                    .is_unique_violation(Some(EMAIL_UNIQUE_CONSTRAINT))
                {
                    tracerr::new!(E::EmailOccupied(user.email.clone()))
                } else {
                    (tracerr::map_from_and_wrap!(=> E))(e)
                }
            })?;

        Ok(user)
    }
}

/// Error of [`CreateUser`] [`Command`] execution.
#[derive(Debug, Display, Error, From)]
pub enum ExecutionError {
    /// [`Database`] error.
    #[display("`Database` operation failed: {_0}")]
    Db(database::Error),

    /// [`Email`] is already occupied by another [`User`].
    #[display("`{_0}` email is occupied")]
    #[from(ignore)]
    EmailOccupied(#[error(not(source))] user::Email),

    /// Failed to hash the provided [`Password`].
    #[display("Failed to hash password: {_0}")]
    HashPassword(user::HashingError),
}
