//! REST API operating on [`User`]s.

use axum::{
    extract::{Path, Query},
    Extension, Json,
};
use common::pagination;
use secrecy::SecretBox;
use serde::{Deserialize, Serialize};
use service::{
    command::{self, Command as _},
    domain::{user, User},
    query::{self, Query as _},
    read,
};

use crate::{define_error, AdminAuth, AsError, Error, Service};

/// Request of registering a new [`User`].
#[derive(Debug, Deserialize)]
pub struct RegisterRequest {
    /// Email address of the new [`User`].
    pub email: String,

    /// First name of the new [`User`].
    pub first_name: String,

    /// Last name of the new [`User`].
    pub last_name: String,

    /// Password of the new [`User`].
    pub password: String,

    /// Role of the new [`User`], `user` if omitted.
    #[serde(default)]
    pub role: Option<String>,

    /// Avatar of the new [`User`].
    #[serde(default)]
    pub avatar: Option<String>,
}

impl TryFrom<RegisterRequest> for command::CreateUser {
    type Error = Error;

    fn try_from(req: RegisterRequest) -> Result<Self, Self::Error> {
        let RegisterRequest {
            email,
            first_name,
            last_name,
            password,
            role,
            avatar,
        } = req;

        Ok(Self {
            email: user::Email::new(email)
                .ok_or_else(|| Error::invalid_input(&"invalid email"))?,
            first_name: user::Name::new(first_name)
                .ok_or_else(|| Error::invalid_input(&"invalid first name"))?,
            last_name: user::Name::new(last_name)
                .ok_or_else(|| Error::invalid_input(&"invalid last name"))?,
            role: role
                .map(|r| r.parse())
                .transpose()
                .map_err(|e| Error::invalid_input(&e))?
                .unwrap_or(user::Role::User),
            password: SecretBox::new(Box::new(
                user::Password::new(password).ok_or_else(|| {
                    Error::invalid_input(&"invalid password")
                })?,
            )),
            avatar: avatar
                .map(|a| {
                    user::Avatar::new(a).ok_or_else(|| {
                        Error::invalid_input(&"invalid avatar")
                    })
                })
                .transpose()?,
        })
    }
}

/// `POST /register` handler.
pub async fn register(
    Extension(service): Extension<Service>,
    Json(req): Json<RegisterRequest>,
) -> Result<(http::StatusCode, Json<User>), Error> {
    let user = service
        .execute(command::CreateUser::try_from(req)?)
        .await
        .map_err(AsError::into_error)?;

    Ok((http::StatusCode::CREATED, Json(user)))
}

/// `GET /users/{id}` handler.
pub async fn find_by_id(
    _: AdminAuth,
    Extension(service): Extension<Service>,
    Path(id): Path<user::Id>,
) -> Result<Json<User>, Error> {
    service
        .execute(query::user::ByIdCached(id))
        .await
        .map_err(AsError::into_error)?
        .map(Json)
        .ok_or_else(|| UserError::NotFound.into())
}

/// Pagination parameters of the [`list`] handler.
#[derive(Clone, Copy, Debug, Default, Deserialize)]
pub struct ListParams {
    /// Maximum number of [`User`]s per page.
    #[serde(default)]
    pub limit: Option<usize>,

    /// Number of [`User`]s to skip.
    #[serde(default)]
    pub offset: Option<usize>,
}

/// Response of the [`list`] handler.
#[derive(Debug, Serialize)]
pub struct ListResponse {
    /// [`User`]s on the requested page.
    pub users: Vec<User>,

    /// Indicator whether more [`User`]s exist past this page.
    pub has_more: bool,

    /// Total count of [`User`]s.
    pub total: i32,
}

/// `GET /users` handler.
pub async fn list(
    _: AdminAuth,
    Extension(service): Extension<Service>,
    Query(params): Query<ListParams>,
) -> Result<Json<ListResponse>, Error> {
    let arguments = pagination::Arguments::new(params.limit, params.offset);

    let page = service
        .execute(query::users::List::by(read::user::list::Selector {
            arguments,
        }))
        .await
        .map_err(AsError::into_error)?;
    let total = service
        .execute(query::users::TotalCount::by(()))
        .await
        .map_err(AsError::into_error)?;

    Ok(Json(ListResponse {
        users: page.items,
        has_more: page.has_more,
        total: total.into(),
    }))
}

/// Request of updating a [`User`].
///
/// Omitted fields are kept unchanged.
#[derive(Debug, Default, Deserialize)]
pub struct UpdateRequest {
    /// New first name of the [`User`].
    #[serde(default)]
    pub first_name: Option<String>,

    /// New last name of the [`User`].
    #[serde(default)]
    pub last_name: Option<String>,

    /// New avatar of the [`User`].
    #[serde(default)]
    pub avatar: Option<String>,

    /// New password of the [`User`].
    #[serde(default)]
    pub password: Option<String>,
}

/// `PUT /users/{id}` handler.
pub async fn update(
    _: AdminAuth,
    Extension(service): Extension<Service>,
    Path(id): Path<user::Id>,
    Json(req): Json<UpdateRequest>,
) -> Result<Json<User>, Error> {
    let UpdateRequest {
        first_name,
        last_name,
        avatar,
        password,
    } = req;

    let cmd = command::UpdateUser {
        id,
        first_name: first_name
            .map(|n| {
                user::Name::new(n).ok_or_else(|| {
                    Error::invalid_input(&"invalid first name")
                })
            })
            .transpose()?,
        last_name: last_name
            .map(|n| {
                user::Name::new(n).ok_or_else(|| {
                    Error::invalid_input(&"invalid last name")
                })
            })
            .transpose()?,
        avatar: avatar
            .map(|a| {
                user::Avatar::new(a)
                    .ok_or_else(|| Error::invalid_input(&"invalid avatar"))
            })
            .transpose()?,
        password: password
            .map(|p| {
                user::Password::new(p)
                    .map(|p| SecretBox::new(Box::new(p)))
                    .ok_or_else(|| Error::invalid_input(&"invalid password"))
            })
            .transpose()?,
    };

    service
        .execute(cmd)
        .await
        .map(Json)
        .map_err(AsError::into_error)
}

/// `DELETE /users/{id}` handler.
pub async fn delete(
    _: AdminAuth,
    Extension(service): Extension<Service>,
    Path(id): Path<user::Id>,
) -> Result<http::StatusCode, Error> {
    service
        .execute(command::DeleteUser { id })
        .await
        .map_err(AsError::into_error)?;

    Ok(http::StatusCode::NO_CONTENT)
}

impl AsError for command::create_user::ExecutionError {
    fn try_as_error(&self) -> Option<Error> {
        match self {
            Self::Db(e) => e.try_as_error(),
            Self::EmailOccupied(_) => Some(UserError::EmailOccupied.into()),
            Self::HashPassword(_) => None,
        }
    }
}

impl AsError for command::update_user::ExecutionError {
    fn try_as_error(&self) -> Option<Error> {
        match self {
            Self::Db(e) => e.try_as_error(),
            Self::HashPassword(_) => None,
            Self::UserNotExists(_) => Some(UserError::NotFound.into()),
        }
    }
}

impl AsError for command::delete_user::ExecutionError {
    fn try_as_error(&self) -> Option<Error> {
        match self {
            Self::Db(e) => e.try_as_error(),
            Self::UserNotExists(_) => Some(UserError::NotFound.into()),
        }
    }
}

impl AsError for query::user::ExecutionError {
    fn try_as_error(&self) -> Option<Error> {
        match self {
            Self::Db(e) => e.try_as_error(),
        }
    }
}

define_error! {
    enum UserError {
        #[code = "EMAIL_ALREADY_EXISTS"]
        #[status = CONFLICT]
        #[message = "`User` with such email already exists"]
        EmailOccupied,

        #[code = "USER_NOT_FOUND"]
        #[status = NOT_FOUND]
        #[message = "`User` not found"]
        NotFound,
    }
}
