//! Request authentication definitions.

use axum::{async_trait, extract::FromRequestParts, RequestPartsExt as _};
use axum_extra::{
    headers::{authorization::Bearer, Authorization},
    TypedHeader,
};
use service::{
    command::{self, Command as _},
    domain::{
        user::{self, Session},
        User,
    },
    token,
};

use crate::{define_error, AsError, Error, Service};

/// Authenticated request context.
///
/// Extracting it authorizes the request: the access token from the
/// `Authorization: Bearer` header must verify, and the [`Session`] it
/// names must still be alive.
#[derive(Clone, Debug)]
pub struct Auth {
    /// Authenticated [`User`].
    pub user: User,

    /// Live [`Session`] the request runs under.
    pub session: Session,
}

#[async_trait]
impl<S> FromRequestParts<S> for Auth
where
    S: Send + Sync,
{
    type Rejection = Error;

    async fn from_request_parts(
        parts: &mut http::request::Parts,
        _: &S,
    ) -> Result<Self, Self::Rejection> {
        let service =
            parts.extensions.get::<Service>().cloned().ok_or_else(|| {
                Error::internal(&"missing `Service` extension")
            })?;

        match parts.extract::<TypedHeader<Authorization<Bearer>>>().await {
            Ok(TypedHeader(Authorization(bearer))) => {
                #[expect(unsafe_code, reason = "specified in correct header")]
                let token = unsafe {
                    token::AccessToken::new_unchecked(
                        bearer.token().to_owned(),
                    )
                };
                service
                    .execute(command::AuthorizeUserSession::ByToken(token))
                    .await
                    .map(|out| Self {
                        user: out.user,
                        session: out.session,
                    })
                    .map_err(AsError::into_error)
            }
            Err(e) => Err(if e.is_missing() {
                AuthError::AuthorizationRequired.into()
            } else {
                e.into_error()
            }),
        }
    }
}

/// [`Auth`] restricted to [`user::Role::Admin`] [`User`]s.
#[derive(Clone, Debug)]
pub struct AdminAuth(pub Auth);

#[async_trait]
impl<S> FromRequestParts<S> for AdminAuth
where
    S: Send + Sync,
{
    type Rejection = Error;

    async fn from_request_parts(
        parts: &mut http::request::Parts,
        state: &S,
    ) -> Result<Self, Self::Rejection> {
        let auth = Auth::from_request_parts(parts, state).await?;
        if auth.user.role == user::Role::Admin {
            Ok(Self(auth))
        } else {
            Err(PrivilegeError::Admin.into())
        }
    }
}

impl AsError for command::authorize_user_session::ExecutionError {
    fn try_as_error(&self) -> Option<Error> {
        match self {
            Self::Db(e) => e.try_as_error(),
            Self::Sessions(e) => e.try_as_error(),
            Self::InvalidToken(_) => Some(AuthError::InvalidToken.into()),
            // A live token for a gone `User` must not reveal more than
            // an expired one.
            Self::SessionExpired | Self::UserNotExists(_) => {
                Some(AuthError::SessionExpired.into())
            }
        }
    }
}

impl AsError for command::refresh_user_session::ExecutionError {
    fn try_as_error(&self) -> Option<Error> {
        match self {
            Self::Db(e) => e.try_as_error(),
            Self::Sessions(e) => e.try_as_error(),
            Self::IssueTokens(_) => None,
            Self::InvalidToken(_) => Some(AuthError::InvalidToken.into()),
            Self::SessionExpired | Self::UserNotExists(_) => {
                Some(AuthError::SessionExpired.into())
            }
        }
    }
}

impl AsError for command::terminate_user_session::ExecutionError {
    fn try_as_error(&self) -> Option<Error> {
        match self {
            Self::Sessions(e) => e.try_as_error(),
        }
    }
}

define_error! {
    enum AuthError {
        #[code = "AUTHORIZATION_REQUIRED"]
        #[status = UNAUTHORIZED]
        #[message = "Authorization required"]
        AuthorizationRequired,

        #[code = "INVALID_TOKEN"]
        #[status = UNAUTHORIZED]
        #[message = "Invalid authorization token"]
        InvalidToken,

        #[code = "SESSION_EXPIRED"]
        #[status = UNAUTHORIZED]
        #[message = "`Session` is expired"]
        SessionExpired,
    }
}

define_error! {
    enum PrivilegeError {
        #[code = "NOT_ADMIN"]
        #[status = FORBIDDEN]
        #[message = "Authenticated `User` must be an admin"]
        Admin,
    }
}
