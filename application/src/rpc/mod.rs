//! gRPC API definitions.

pub mod proto {
    //! Generated protocol types.

    #![allow(
        clippy::allow_attributes,
        clippy::pedantic,
        missing_copy_implementations,
        missing_docs,
        reason = "generated code"
    )]

    tonic::include_proto!("accounts");
}

use common::pagination;
use secrecy::SecretBox;
use tonic::{Request, Response, Status};

use service::{
    command::{self, Command as _},
    domain::{
        user::{self, session},
        User,
    },
    query::{self, Query as _},
    read, token,
};

use crate::{api, AsError as _, Error, Service};

use self::proto::accounts_server;

/// gRPC implementation of the accounts API.
#[derive(Clone, Debug)]
pub struct AccountsService {
    /// [`Service`] executing the requests.
    service: Service,
}

impl AccountsService {
    /// Creates a new [`AccountsService`] on top of the provided
    /// [`Service`].
    #[must_use]
    pub fn new(service: Service) -> Self {
        Self { service }
    }
}

#[tonic::async_trait]
impl accounts_server::Accounts for AccountsService {
    async fn register(
        &self,
        req: Request<proto::RegisterRequest>,
    ) -> Result<Response<proto::RegisterResponse>, Status> {
        let cmd = command::CreateUser::try_from(req.into_inner())?;

        let user = self
            .service
            .execute(cmd)
            .await
            .map_err(|e| e.as_error().into_status())?;

        Ok(Response::new(proto::RegisterResponse {
            user: Some(encode_user(&user)),
        }))
    }

    async fn login(
        &self,
        req: Request<proto::LoginRequest>,
    ) -> Result<Response<proto::LoginResponse>, Status> {
        let proto::LoginRequest { email, password } = req.into_inner();

        let email = user::Email::new(email)
            .ok_or_else(|| Status::unauthenticated("wrong credentials"))?;
        let password = user::Password::new(password)
            .ok_or_else(|| Status::unauthenticated("wrong credentials"))?;

        let out = self
            .service
            .execute(command::CreateUserSession {
                email,
                password: SecretBox::new(Box::new(password)),
            })
            .await
            .map_err(|e| e.as_error().into_status())?;

        Ok(Response::new(proto::LoginResponse {
            user: Some(encode_user(&out.user)),
            session_id: out.session.id.to_string(),
            access_token: out.tokens.access.to_string(),
            refresh_token: out.tokens.refresh.to_string(),
        }))
    }

    async fn find_by_id(
        &self,
        req: Request<proto::FindByIdRequest>,
    ) -> Result<Response<proto::FindByIdResponse>, Status> {
        let id = req
            .into_inner()
            .id
            .parse::<user::Id>()
            .map_err(|e| Status::invalid_argument(e.to_string()))?;

        let user = self
            .service
            .execute(query::user::ByIdCached(id))
            .await
            .map_err(|e| e.as_error().into_status())?
            .ok_or_else(|| Status::not_found("`User` not found"))?;

        Ok(Response::new(proto::FindByIdResponse {
            user: Some(encode_user(&user)),
        }))
    }

    async fn find_by_email(
        &self,
        req: Request<proto::FindByEmailRequest>,
    ) -> Result<Response<proto::FindByEmailResponse>, Status> {
        let email = user::Email::new(req.into_inner().email)
            .ok_or_else(|| Status::invalid_argument("invalid email"))?;

        let user = self
            .service
            .execute(query::user::ByEmail::by(email))
            .await
            .map_err(|e| e.as_error().into_status())?
            .ok_or_else(|| Status::not_found("`User` not found"))?;

        Ok(Response::new(proto::FindByEmailResponse {
            user: Some(encode_user(&user)),
        }))
    }

    async fn find_all(
        &self,
        req: Request<proto::FindAllRequest>,
    ) -> Result<Response<proto::FindAllResponse>, Status> {
        let proto::FindAllRequest { limit, offset } = req.into_inner();

        let arguments = pagination::Arguments::new(
            limit.map(|l| usize::try_from(l).unwrap_or(usize::MAX)),
            offset.map(|o| usize::try_from(o).unwrap_or(usize::MAX)),
        );

        let page = self
            .service
            .execute(query::users::List::by(read::user::list::Selector {
                arguments,
            }))
            .await
            .map_err(|e| e.as_error().into_status())?;
        let total = self
            .service
            .execute(query::users::TotalCount::by(()))
            .await
            .map_err(|e| e.as_error().into_status())?;

        Ok(Response::new(proto::FindAllResponse {
            users: page.items.iter().map(encode_user).collect(),
            has_more: page.has_more,
            total: total.into(),
        }))
    }

    async fn update_by_id(
        &self,
        req: Request<proto::UpdateByIdRequest>,
    ) -> Result<Response<proto::UpdateByIdResponse>, Status> {
        let cmd = command::UpdateUser::try_from(req.into_inner())?;

        let user = self
            .service
            .execute(cmd)
            .await
            .map_err(|e| e.as_error().into_status())?;

        Ok(Response::new(proto::UpdateByIdResponse {
            user: Some(encode_user(&user)),
        }))
    }

    async fn delete_by_id(
        &self,
        req: Request<proto::DeleteByIdRequest>,
    ) -> Result<Response<proto::DeleteByIdResponse>, Status> {
        let id = req
            .into_inner()
            .id
            .parse::<user::Id>()
            .map_err(|e| Status::invalid_argument(e.to_string()))?;

        self.service
            .execute(command::DeleteUser { id })
            .await
            .map_err(|e| e.as_error().into_status())?;

        Ok(Response::new(proto::DeleteByIdResponse {}))
    }

    async fn get_me(
        &self,
        req: Request<proto::GetMeRequest>,
    ) -> Result<Response<proto::GetMeResponse>, Status> {
        let session_id = session_id_from_metadata(&req)?;

        let out = self
            .service
            .execute(command::AuthorizeUserSession::BySessionId(session_id))
            .await
            .map_err(|e| e.as_error().into_status())?;

        Ok(Response::new(proto::GetMeResponse {
            user: Some(encode_user(&out.user)),
        }))
    }

    async fn logout(
        &self,
        req: Request<proto::LogoutRequest>,
    ) -> Result<Response<proto::LogoutResponse>, Status> {
        let session_id = session_id_from_metadata(&req)?;

        self.service
            .execute(command::TerminateUserSession { session_id })
            .await
            .map_err(|e| e.as_error().into_status())?;

        Ok(Response::new(proto::LogoutResponse {}))
    }

    async fn refresh_session(
        &self,
        req: Request<proto::RefreshSessionRequest>,
    ) -> Result<Response<proto::RefreshSessionResponse>, Status> {
        #[expect(unsafe_code, reason = "opaque token, verified downstream")]
        let token = unsafe {
            token::RefreshToken::new_unchecked(
                req.into_inner().refresh_token,
            )
        };

        let out = self
            .service
            .execute(command::RefreshUserSession { token })
            .await
            .map_err(|e| e.as_error().into_status())?;

        Ok(Response::new(proto::RefreshSessionResponse {
            access_token: out.tokens.access.to_string(),
            refresh_token: out.tokens.refresh.to_string(),
        }))
    }
}

impl TryFrom<proto::RegisterRequest> for command::CreateUser {
    type Error = Status;

    fn try_from(req: proto::RegisterRequest) -> Result<Self, Self::Error> {
        let api_req = api::user::RegisterRequest {
            email: req.email,
            first_name: req.first_name,
            last_name: req.last_name,
            password: req.password,
            role: (!req.role.is_empty()).then_some(req.role),
            avatar: req.avatar,
        };
        Self::try_from(api_req).map_err(Error::into_status)
    }
}

impl TryFrom<proto::UpdateByIdRequest> for command::UpdateUser {
    type Error = Status;

    fn try_from(req: proto::UpdateByIdRequest) -> Result<Self, Self::Error> {
        let id = req
            .id
            .parse::<user::Id>()
            .map_err(|e| Status::invalid_argument(e.to_string()))?;

        Ok(Self {
            id,
            first_name: req
                .first_name
                .map(|n| {
                    user::Name::new(n).ok_or_else(|| {
                        Status::invalid_argument("invalid first name")
                    })
                })
                .transpose()?,
            last_name: req
                .last_name
                .map(|n| {
                    user::Name::new(n).ok_or_else(|| {
                        Status::invalid_argument("invalid last name")
                    })
                })
                .transpose()?,
            avatar: req
                .avatar
                .map(|a| {
                    user::Avatar::new(a).ok_or_else(|| {
                        Status::invalid_argument("invalid avatar")
                    })
                })
                .transpose()?,
            password: req
                .password
                .map(|p| {
                    user::Password::new(p)
                        .map(|p| SecretBox::new(Box::new(p)))
                        .ok_or_else(|| {
                            Status::invalid_argument("invalid password")
                        })
                })
                .transpose()?,
        })
    }
}

/// Extracts the [`session::Id`] from the `session_id` request metadata.
fn session_id_from_metadata<T>(
    req: &Request<T>,
) -> Result<session::Id, Status> {
    req.metadata()
        .get("session_id")
        .ok_or_else(|| Status::unauthenticated("missing `session_id`"))?
        .to_str()
        .ok()
        .and_then(|id| id.parse().ok())
        .ok_or_else(|| Status::unauthenticated("invalid `session_id`"))
}

/// Encodes the provided [`User`] into its wire representation.
fn encode_user(user: &User) -> proto::User {
    proto::User {
        id: user.id.to_string(),
        email: user.email.to_string(),
        first_name: user.first_name.to_string(),
        last_name: user.last_name.to_string(),
        role: user.role.to_string(),
        avatar: user.avatar.as_ref().map(ToString::to_string),
        created_at: Some(prost_types::Timestamp {
            seconds: user.created_at.unix_timestamp(),
            nanos: 0,
        }),
        updated_at: Some(prost_types::Timestamp {
            seconds: user.updated_at.unix_timestamp(),
            nanos: 0,
        }),
    }
}
