//! REST API operating on [`Session`]s.
//!
//! [`Session`]: service::domain::user::Session

use axum::{Extension, Json};
use secrecy::SecretBox;
use serde::{Deserialize, Serialize};
use service::{
    command::{self, Command as _},
    domain::{user, User},
    token,
};

use crate::{define_error, AsError, Auth, Error, Service};

/// Request of logging a [`User`] in.
#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    /// Email address of the [`User`].
    pub email: String,

    /// Password of the [`User`].
    pub password: String,
}

/// Signed token pair of a [`Session`].
///
/// [`Session`]: service::domain::user::Session
#[derive(Debug, Serialize)]
pub struct TokensResponse {
    /// Access token, sent as `Authorization: Bearer` on requests.
    pub access_token: String,

    /// Refresh token, exchanged via `POST /refresh`.
    pub refresh_token: String,
}

impl From<token::TokenPair> for TokensResponse {
    fn from(pair: token::TokenPair) -> Self {
        Self {
            access_token: pair.access.to_string(),
            refresh_token: pair.refresh.to_string(),
        }
    }
}

/// Response of the [`login`] handler.
#[derive(Debug, Serialize)]
pub struct LoginResponse {
    /// Logged in [`User`].
    pub user: User,

    /// Issued token pair.
    pub tokens: TokensResponse,
}

/// `POST /login` handler.
pub async fn login(
    Extension(service): Extension<Service>,
    Json(req): Json<LoginRequest>,
) -> Result<Json<LoginResponse>, Error> {
    let LoginRequest { email, password } = req;

    // Malformed credentials cannot possibly match, and reporting them
    // as malformed would leak the email format check.
    let email = user::Email::new(email)
        .ok_or_else(|| Error::from(SessionError::WrongCredentials))?;
    let password = user::Password::new(password)
        .ok_or_else(|| Error::from(SessionError::WrongCredentials))?;

    let out = service
        .execute(command::CreateUserSession {
            email,
            password: SecretBox::new(Box::new(password)),
        })
        .await
        .map_err(AsError::into_error)?;

    Ok(Json(LoginResponse {
        user: out.user,
        tokens: out.tokens.into(),
    }))
}

/// Request of refreshing a [`Session`]s token pair.
///
/// [`Session`]: service::domain::user::Session
#[derive(Debug, Deserialize)]
pub struct RefreshRequest {
    /// Refresh token obtained on login or a previous refresh.
    pub refresh_token: String,
}

/// `POST /refresh` handler.
pub async fn refresh(
    Extension(service): Extension<Service>,
    Json(req): Json<RefreshRequest>,
) -> Result<Json<TokensResponse>, Error> {
    #[expect(unsafe_code, reason = "opaque token, verified downstream")]
    let token =
        unsafe { token::RefreshToken::new_unchecked(req.refresh_token) };

    let out = service
        .execute(command::RefreshUserSession { token })
        .await
        .map_err(AsError::into_error)?;

    Ok(Json(TokensResponse::from(out.tokens)))
}

/// `GET /me` handler.
#[expect(
    clippy::unused_async,
    reason = "`async` is required to match signature"
)]
pub async fn me(auth: Auth) -> Json<User> {
    Json(auth.user)
}

/// `POST /logout` handler.
pub async fn logout(
    auth: Auth,
    Extension(service): Extension<Service>,
) -> Result<http::StatusCode, Error> {
    service
        .execute(command::TerminateUserSession {
            session_id: auth.session.id,
        })
        .await
        .map_err(AsError::into_error)?;

    Ok(http::StatusCode::NO_CONTENT)
}

impl AsError for command::create_user_session::ExecutionError {
    fn try_as_error(&self) -> Option<Error> {
        match self {
            Self::Db(e) => e.try_as_error(),
            Self::Sessions(e) => e.try_as_error(),
            Self::IssueTokens(_) => None,
            Self::WrongCredentials => {
                Some(SessionError::WrongCredentials.into())
            }
        }
    }
}

define_error! {
    enum SessionError {
        #[code = "WRONG_CREDENTIALS"]
        #[status = UNAUTHORIZED]
        #[message = "Wrong email or password"]
        WrongCredentials,
    }
}
