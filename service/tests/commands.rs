//! [`Command`] and [`Query`] scenarios over in-memory stores.
//!
//! [`Command`]: service::Command
//! [`Query`]: service::Query

use std::{
    collections::HashMap,
    sync::{Arc, Mutex},
    time::Duration,
};

use common::{
    operations::{
        By, Commit, Delete, Insert, Lock, Select, Transact, Update,
    },
    pagination, DateTime, Handler,
};
use secrecy::SecretBox;
use service::{
    command::{
        AuthorizeUserSession, CreateUser, CreateUserSession, DeleteUser,
        RefreshUserSession, TerminateUserSession, UpdateUser,
    },
    domain::{
        user::{self, session, Session},
        User,
    },
    infra::{cache, database},
    query, read,
    token, Config, Service,
};
use tracerr::Traced;
use uuid::Uuid;

/// In-memory stand-in for a durable [`service::infra::Database`].
#[derive(Clone, Debug, Default)]
struct InMemDb(Arc<Mutex<HashMap<user::Id, User>>>);

impl Handler<Select<By<Option<User>, user::Id>>> for InMemDb {
    type Ok = Option<User>;
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Select(by): Select<By<Option<User>, user::Id>>,
    ) -> Result<Self::Ok, Self::Err> {
        Ok(self.0.lock().unwrap().get(&by.into_inner()).cloned())
    }
}

impl Handler<Select<By<Option<User>, user::Email>>> for InMemDb {
    type Ok = Option<User>;
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Select(by): Select<By<Option<User>, user::Email>>,
    ) -> Result<Self::Ok, Self::Err> {
        let email = by.into_inner();
        Ok(self
            .0
            .lock()
            .unwrap()
            .values()
            .find(|u| u.email == email)
            .cloned())
    }
}

impl Handler<Insert<User>> for InMemDb {
    type Ok = ();
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Insert(user): Insert<User>,
    ) -> Result<Self::Ok, Self::Err> {
        drop(self.0.lock().unwrap().insert(user.id, user));
        Ok(())
    }
}

impl Handler<Update<User>> for InMemDb {
    type Ok = u64;
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Update(user): Update<User>,
    ) -> Result<Self::Ok, Self::Err> {
        let mut users = self.0.lock().unwrap();
        Ok(match users.get_mut(&user.id) {
            Some(u) => {
                *u = user;
                1
            }
            None => 0,
        })
    }
}

impl Handler<Delete<By<User, user::Id>>> for InMemDb {
    type Ok = u64;
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Delete(by): Delete<By<User, user::Id>>,
    ) -> Result<Self::Ok, Self::Err> {
        Ok(u64::from(
            self.0.lock().unwrap().remove(&by.into_inner()).is_some(),
        ))
    }
}

impl Handler<Lock<By<User, user::Id>>> for InMemDb {
    type Ok = ();
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        _: Lock<By<User, user::Id>>,
    ) -> Result<Self::Ok, Self::Err> {
        Ok(())
    }
}

impl Handler<Transact> for InMemDb {
    type Ok = Self;
    type Err = Traced<database::Error>;

    async fn execute(&self, _: Transact) -> Result<Self::Ok, Self::Err> {
        Ok(self.clone())
    }
}

impl Handler<Commit> for InMemDb {
    type Ok = ();
    type Err = Traced<database::Error>;

    async fn execute(&self, _: Commit) -> Result<Self::Ok, Self::Err> {
        Ok(())
    }
}

impl Handler<Select<By<read::user::list::Page, read::user::list::Selector>>>
    for InMemDb
{
    type Ok = read::user::list::Page;
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Select(by): Select<
            By<read::user::list::Page, read::user::list::Selector>,
        >,
    ) -> Result<Self::Ok, Self::Err> {
        let read::user::list::Selector { arguments } = by.into_inner();

        let mut users: Vec<_> =
            self.0.lock().unwrap().values().cloned().collect();
        users.sort_by_key(|u| (u.created_at, Uuid::from(u.id)));

        let rest = users.split_off(arguments.offset().min(users.len()));
        let has_more = rest.len() > arguments.limit();
        Ok(read::user::list::Page::new(
            &arguments,
            rest.into_iter().take(arguments.limit()),
            has_more,
        ))
    }
}

impl Handler<Select<By<read::user::list::TotalCount, ()>>> for InMemDb {
    type Ok = read::user::list::TotalCount;
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        _: Select<By<read::user::list::TotalCount, ()>>,
    ) -> Result<Self::Ok, Self::Err> {
        let count = i32::try_from(self.0.lock().unwrap().len()).unwrap();
        Ok(count.into())
    }
}

/// In-memory stand-in for the [`User`] snapshot cache.
///
/// Holds serialized snapshots, so redaction-through-serialization works
/// the same way it does against a real cache.
#[derive(Clone, Debug, Default)]
struct InMemCache(Arc<Mutex<HashMap<user::Id, String>>>);

impl Handler<Select<By<Option<User>, user::Id>>> for InMemCache {
    type Ok = Option<User>;
    type Err = Traced<cache::Error>;

    async fn execute(
        &self,
        Select(by): Select<By<Option<User>, user::Id>>,
    ) -> Result<Self::Ok, Self::Err> {
        Ok(self
            .0
            .lock()
            .unwrap()
            .get(&by.into_inner())
            .map(|json| serde_json::from_str(json).unwrap()))
    }
}

impl<'u> Handler<Insert<&'u User>> for InMemCache {
    type Ok = ();
    type Err = Traced<cache::Error>;

    async fn execute(
        &self,
        Insert(user): Insert<&'u User>,
    ) -> Result<Self::Ok, Self::Err> {
        drop(
            self.0
                .lock()
                .unwrap()
                .insert(user.id, serde_json::to_string(user).unwrap()),
        );
        Ok(())
    }
}

impl Handler<Delete<By<User, user::Id>>> for InMemCache {
    type Ok = ();
    type Err = Traced<cache::Error>;

    async fn execute(
        &self,
        Delete(by): Delete<By<User, user::Id>>,
    ) -> Result<Self::Ok, Self::Err> {
        drop(self.0.lock().unwrap().remove(&by.into_inner()));
        Ok(())
    }
}

/// In-memory stand-in for the [`Session`] store, honoring expiry.
#[derive(Clone, Debug, Default)]
struct InMemSessions(Arc<Mutex<HashMap<session::Id, Session>>>);

impl Handler<Insert<Session>> for InMemSessions {
    type Ok = ();
    type Err = Traced<cache::Error>;

    async fn execute(
        &self,
        Insert(session): Insert<Session>,
    ) -> Result<Self::Ok, Self::Err> {
        drop(self.0.lock().unwrap().insert(session.id, session));
        Ok(())
    }
}

impl Handler<Select<By<Option<Session>, session::Id>>> for InMemSessions {
    type Ok = Option<Session>;
    type Err = Traced<cache::Error>;

    async fn execute(
        &self,
        Select(by): Select<By<Option<Session>, session::Id>>,
    ) -> Result<Self::Ok, Self::Err> {
        Ok(self
            .0
            .lock()
            .unwrap()
            .get(&by.into_inner())
            .filter(|s| s.expires_at > DateTime::now().coerce())
            .copied())
    }
}

impl Handler<Delete<By<Session, session::Id>>> for InMemSessions {
    type Ok = ();
    type Err = Traced<cache::Error>;

    async fn execute(
        &self,
        Delete(by): Delete<By<Session, session::Id>>,
    ) -> Result<Self::Ok, Self::Err> {
        drop(self.0.lock().unwrap().remove(&by.into_inner()));
        Ok(())
    }
}

type Svc = Service<InMemDb, InMemCache, InMemSessions>;

fn svc_with_session_ttl(session_ttl: Duration) -> Svc {
    Service::new(
        Config {
            tokens: token::Issuer::new(
                b"test-secret",
                token::Issuer::DEFAULT_ACCESS_TTL,
                token::Issuer::DEFAULT_REFRESH_TTL,
            ),
            session_ttl,
        },
        InMemDb::default(),
        InMemCache::default(),
        InMemSessions::default(),
    )
}

fn svc() -> Svc {
    svc_with_session_ttl(Duration::from_secs(60 * 60))
}

fn password(s: &str) -> SecretBox<user::Password> {
    SecretBox::new(Box::new(user::Password::new(s).unwrap()))
}

async fn register(svc: &Svc, email: &str) -> User {
    svc.execute(CreateUser {
        email: user::Email::new(email).unwrap(),
        first_name: user::Name::new("Alice").unwrap(),
        last_name: user::Name::new("Cooper").unwrap(),
        role: user::Role::User,
        password: password("s3cr3tpw"),
        avatar: None,
    })
    .await
    .unwrap()
}

async fn login(
    svc: &Svc,
    email: &str,
) -> service::command::create_user_session::Output {
    svc.execute(CreateUserSession {
        email: user::Email::new(email).unwrap(),
        password: password("s3cr3tpw"),
    })
    .await
    .unwrap()
}

#[tokio::test]
async fn register_login_and_authorize_round_trip() {
    let svc = svc();

    let registered = register(&svc, "alice@example.com").await;
    let logged_in = login(&svc, "alice@example.com").await;
    assert_eq!(logged_in.user.id, registered.id);

    let authorized = svc
        .execute(AuthorizeUserSession::ByToken(logged_in.tokens.access))
        .await
        .unwrap();
    assert_eq!(authorized.user.id, registered.id);
    assert_eq!(authorized.session.id, logged_in.session.id);
}

#[tokio::test]
async fn register_rejects_occupied_email() {
    use service::command::create_user::ExecutionError as E;

    let svc = svc();
    drop(register(&svc, "alice@example.com").await);

    let err = svc
        .execute(CreateUser {
            email: user::Email::new("alice@example.com").unwrap(),
            first_name: user::Name::new("Another").unwrap(),
            last_name: user::Name::new("Alice").unwrap(),
            role: user::Role::User,
            password: password("0th3rpw"),
            avatar: None,
        })
        .await
        .unwrap_err();
    assert!(matches!(err.as_ref(), E::EmailOccupied(_)));
}

#[tokio::test]
async fn login_rejects_unknown_email_and_wrong_password_alike() {
    use service::command::create_user_session::ExecutionError as E;

    let svc = svc();
    drop(register(&svc, "alice@example.com").await);

    let unknown = svc
        .execute(CreateUserSession {
            email: user::Email::new("nobody@example.com").unwrap(),
            password: password("s3cr3tpw"),
        })
        .await
        .unwrap_err();
    let mismatch = svc
        .execute(CreateUserSession {
            email: user::Email::new("alice@example.com").unwrap(),
            password: password("wr0ngpw"),
        })
        .await
        .unwrap_err();

    assert!(matches!(unknown.as_ref(), E::WrongCredentials));
    assert!(matches!(mismatch.as_ref(), E::WrongCredentials));
}

#[tokio::test]
async fn logout_invalidates_both_tokens() {
    use service::command::{
        authorize_user_session, refresh_user_session,
    };

    let svc = svc();
    drop(register(&svc, "alice@example.com").await);
    let logged_in = login(&svc, "alice@example.com").await;

    svc.execute(TerminateUserSession {
        session_id: logged_in.session.id,
    })
    .await
    .unwrap();

    let authorize = svc
        .execute(AuthorizeUserSession::ByToken(logged_in.tokens.access))
        .await
        .unwrap_err();
    assert!(matches!(
        authorize.as_ref(),
        authorize_user_session::ExecutionError::SessionExpired,
    ));

    let refresh = svc
        .execute(RefreshUserSession {
            token: logged_in.tokens.refresh,
        })
        .await
        .unwrap_err();
    assert!(matches!(
        refresh.as_ref(),
        refresh_user_session::ExecutionError::SessionExpired,
    ));
}

#[tokio::test]
async fn logout_is_idempotent() {
    let svc = svc();
    drop(register(&svc, "alice@example.com").await);
    let logged_in = login(&svc, "alice@example.com").await;

    for _ in 0..2 {
        svc.execute(TerminateUserSession {
            session_id: logged_in.session.id,
        })
        .await
        .unwrap();
    }
}

#[tokio::test]
async fn expired_session_stops_authorizing() {
    use service::command::authorize_user_session::ExecutionError as E;

    let svc = svc_with_session_ttl(Duration::ZERO);
    drop(register(&svc, "alice@example.com").await);
    let logged_in = login(&svc, "alice@example.com").await;

    let err = svc
        .execute(AuthorizeUserSession::BySessionId(logged_in.session.id))
        .await
        .unwrap_err();
    assert!(matches!(err.as_ref(), E::SessionExpired));
}

#[tokio::test]
async fn authorize_populates_user_snapshot_cache() {
    let cache = InMemCache::default();
    let svc = Service::new(
        Config {
            tokens: token::Issuer::new(
                b"test-secret",
                token::Issuer::DEFAULT_ACCESS_TTL,
                token::Issuer::DEFAULT_REFRESH_TTL,
            ),
            session_ttl: Duration::from_secs(60 * 60),
        },
        InMemDb::default(),
        cache.clone(),
        InMemSessions::default(),
    );

    let registered = register(&svc, "alice@example.com").await;
    let logged_in = login(&svc, "alice@example.com").await;
    assert!(cache.0.lock().unwrap().is_empty());

    let authorized = svc
        .execute(AuthorizeUserSession::ByToken(logged_in.tokens.access))
        .await
        .unwrap();
    assert_eq!(authorized.user.id, registered.id);
    assert!(cache.0.lock().unwrap().contains_key(&registered.id));
}

#[tokio::test]
async fn refresh_issues_pair_bound_to_same_session() {
    let svc = svc();
    drop(register(&svc, "alice@example.com").await);
    let logged_in = login(&svc, "alice@example.com").await;

    let refreshed = svc
        .execute(RefreshUserSession {
            token: logged_in.tokens.refresh,
        })
        .await
        .unwrap();
    assert_eq!(refreshed.session.id, logged_in.session.id);

    let authorized = svc
        .execute(AuthorizeUserSession::ByToken(refreshed.tokens.access))
        .await
        .unwrap();
    assert_eq!(authorized.session.id, logged_in.session.id);
}

#[tokio::test]
async fn update_overwrites_cached_snapshot() {
    let svc = svc();
    let registered = register(&svc, "alice@example.com").await;

    // Populate the cache with the pre-update snapshot.
    drop(
        svc.execute(query::user::ByIdCached(registered.id))
            .await
            .unwrap(),
    );

    let updated = svc
        .execute(UpdateUser {
            id: registered.id,
            first_name: Some(user::Name::new("Alicia").unwrap()),
            last_name: None,
            avatar: None,
            password: None,
        })
        .await
        .unwrap();
    assert_eq!(updated.first_name, user::Name::new("Alicia").unwrap());

    let cached = svc
        .execute(query::user::ByIdCached(registered.id))
        .await
        .unwrap()
        .unwrap();
    assert_eq!(cached.first_name, updated.first_name);
}

#[tokio::test]
async fn cached_snapshot_never_carries_password_hash() {
    let svc = svc();
    let registered = register(&svc, "alice@example.com").await;
    assert!(!registered.password_hash.is_redacted());

    // First lookup misses and repopulates, second one hits the cache.
    drop(
        svc.execute(query::user::ByIdCached(registered.id))
            .await
            .unwrap(),
    );
    let cached = svc
        .execute(query::user::ByIdCached(registered.id))
        .await
        .unwrap()
        .unwrap();

    assert!(cached.password_hash.is_redacted());
}

#[tokio::test]
async fn delete_evicts_and_rejects_repeat() {
    use service::command::delete_user::ExecutionError as E;

    let svc = svc();
    let registered = register(&svc, "alice@example.com").await;
    drop(
        svc.execute(query::user::ByIdCached(registered.id))
            .await
            .unwrap(),
    );

    svc.execute(DeleteUser { id: registered.id }).await.unwrap();
    assert!(svc
        .execute(query::user::ByIdCached(registered.id))
        .await
        .unwrap()
        .is_none());

    let err = svc
        .execute(DeleteUser { id: registered.id })
        .await
        .unwrap_err();
    assert!(matches!(err.as_ref(), E::UserNotExists(_)));
}

#[tokio::test]
async fn listing_empty_store_yields_empty_page() {
    let svc = svc();

    let page = svc
        .execute(query::users::List::by(
            read::user::list::Selector::default(),
        ))
        .await
        .unwrap();
    assert!(page.items.is_empty());
    assert!(!page.has_more);

    let total =
        svc.execute(query::users::TotalCount::by(())).await.unwrap();
    assert_eq!(i32::from(total), 0);
}

#[tokio::test]
async fn listing_detects_more_items_past_a_full_page_only() {
    let svc = svc();
    for i in 0..3 {
        drop(register(&svc, &format!("user{i}@example.com")).await);
    }
    let selector = |limit, offset| read::user::list::Selector {
        arguments: pagination::Arguments::new(Some(limit), Some(offset)),
    };

    // An exactly-full page has nothing past it.
    let full = svc
        .execute(query::users::List::by(selector(3, 0)))
        .await
        .unwrap();
    assert_eq!(full.items.len(), 3);
    assert!(!full.has_more);

    // A single item past the page flips the indicator.
    let first = svc
        .execute(query::users::List::by(selector(2, 0)))
        .await
        .unwrap();
    assert_eq!(first.items.len(), 2);
    assert!(first.has_more);

    let last = svc
        .execute(query::users::List::by(selector(2, 2)))
        .await
        .unwrap();
    assert_eq!(last.items.len(), 1);
    assert!(!last.has_more);
    assert_eq!(
        last.items[0].email,
        user::Email::new("user2@example.com").unwrap(),
    );

    let total =
        svc.execute(query::users::TotalCount::by(())).await.unwrap();
    assert_eq!(i32::from(total), 3);
}

#[tokio::test]
async fn updating_password_rehashes_it() {
    use service::command::create_user_session::ExecutionError as E;

    let svc = svc();
    let registered = register(&svc, "alice@example.com").await;

    drop(
        svc.execute(UpdateUser {
            id: registered.id,
            first_name: None,
            last_name: None,
            avatar: None,
            password: Some(password("n3w-s3cr3t")),
        })
        .await
        .unwrap(),
    );

    let stale = svc
        .execute(CreateUserSession {
            email: user::Email::new("alice@example.com").unwrap(),
            password: password("s3cr3tpw"),
        })
        .await
        .unwrap_err();
    assert!(matches!(stale.as_ref(), E::WrongCredentials));

    drop(
        svc.execute(CreateUserSession {
            email: user::Email::new("alice@example.com").unwrap(),
            password: password("n3w-s3cr3t"),
        })
        .await
        .unwrap(),
    );
}
