//! [`Command`] for terminating a [`Session`].

use common::operations::{By, Delete};
use derive_more::{Display, Error, From};
use tracerr::Traced;

use crate::{
    domain::user::{session, Session},
    infra::{cache, Cache},
    Service,
};

use super::Command;

/// [`Command`] for terminating a [`Session`] (logging a [`User`] out).
///
/// Idempotent: terminating an already expired or unknown [`Session`]
/// succeeds.
///
/// [`User`]: crate::domain::User
#[derive(Clone, Copy, Debug, From)]
pub struct TerminateUserSession {
    /// ID of the [`Session`] to terminate.
    pub session_id: session::Id,
}

impl<Db, C, S> Command<TerminateUserSession> for Service<Db, C, S>
where
    S: Cache<
        Delete<By<Session, session::Id>>,
        Ok = (),
        Err = Traced<cache::Error>,
    >,
{
    type Ok = ();
    type Err = Traced<ExecutionError>;

    async fn execute(
        &self,
        cmd: TerminateUserSession,
    ) -> Result<Self::Ok, Self::Err> {
        use ExecutionError as E;

        let TerminateUserSession { session_id } = cmd;

        self.sessions()
            .execute(Delete(By::new(session_id)))
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))
    }
}

/// Error of [`TerminateUserSession`] [`Command`] execution.
#[derive(Debug, Display, Error, From)]
pub enum ExecutionError {
    /// [`Session`] store error.
    #[display("`Session` store operation failed: {_0}")]
    Sessions(cache::Error),
}
