//! Implementations of [`Session`]s storing operations for a [`Redis`]
//! client.

use std::time::Duration;

use common::{
    operations::{By, Delete, Insert, Select},
    DateTime, Handler,
};
use tracerr::Traced;

use crate::{
    domain::user::{session, Session},
    infra::cache,
};

use super::super::{Error, Redis};

/// Returns the store key of the [`Session`] identified by the provided
/// [`session::Id`].
fn key(id: session::Id) -> String {
    format!("sessions:{id}")
}

/// Returns the remaining lifetime of the [`Session`] at the `now`
/// instant.
///
/// An already expired [`Session`] yields [`Duration::ZERO`], which
/// `set_ex` floors to a single second, so the entry is still written
/// and evicts right away instead of never hitting the store.
fn remaining_ttl(
    session: &Session,
    now: session::ExpirationDateTime,
) -> Duration {
    if session.expires_at <= now {
        Duration::ZERO
    } else {
        session.expires_at - now
    }
}

impl Handler<Insert<Session>> for Redis {
    type Ok = ();
    type Err = Traced<cache::Error>;

    async fn execute(
        &self,
        Insert(session): Insert<Session>,
    ) -> Result<Self::Ok, Self::Err> {
        let ttl = remaining_ttl(&session, DateTime::now().coerce());

        let json = serde_json::to_string(&session)
            .map_err(Error::Decode)
            .map_err(tracerr::from_and_wrap!(=> cache::Error))?;
        self.set_ex(&key(session.id), &json, ttl).await
    }
}

impl Handler<Select<By<Option<Session>, session::Id>>> for Redis {
    type Ok = Option<Session>;
    type Err = Traced<cache::Error>;

    async fn execute(
        &self,
        Select(by): Select<By<Option<Session>, session::Id>>,
    ) -> Result<Self::Ok, Self::Err> {
        self.get(&key(by.into_inner()))
            .await?
            .map(|json| serde_json::from_str(&json))
            .transpose()
            .map_err(Error::Decode)
            .map_err(tracerr::from_and_wrap!(=> cache::Error))
    }
}

impl Handler<Delete<By<Session, session::Id>>> for Redis {
    type Ok = ();
    type Err = Traced<cache::Error>;

    async fn execute(
        &self,
        Delete(by): Delete<By<Session, session::Id>>,
    ) -> Result<Self::Ok, Self::Err> {
        self.del(&key(by.into_inner())).await
    }
}

#[cfg(test)]
mod remaining_ttl_spec {
    use std::time::Duration;

    use common::DateTime;
    use uuid::Uuid;

    use crate::domain::user::{session, Session};

    use super::remaining_ttl;

    fn session_expiring_at(expires_at: session::ExpirationDateTime) -> Session {
        Session {
            id: session::Id::new(),
            user_id: Uuid::new_v4().into(),
            expires_at,
        }
    }

    #[test]
    fn counts_down_to_the_expiry_instant() {
        let now = DateTime::now().coerce();
        let session = session_expiring_at(now + Duration::from_secs(30));

        assert_eq!(remaining_ttl(&session, now), Duration::from_secs(30));
    }

    #[test]
    fn is_zero_once_expired() {
        let now = DateTime::now().coerce();

        let expiring = session_expiring_at(now);
        assert_eq!(remaining_ttl(&expiring, now), Duration::ZERO);

        let expired = session_expiring_at(now);
        let later = now + Duration::from_secs(5);
        assert_eq!(remaining_ttl(&expired, later), Duration::ZERO);
    }
}
