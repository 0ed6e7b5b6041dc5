//! Signed token issuing and verification.

use std::time::Duration;

use common::{unit, DateTime, DateTimeOf};
use derive_more::{AsRef, Debug, Display, Error as StdError, FromStr};
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};

use crate::domain::{
    user::{self, session},
    User,
};
#[cfg(doc)]
use crate::domain::user::Session;

/// Issuer of [`TokenPair`]s, bound to the process-wide signing secret.
///
/// Signing is symmetric (HMAC-SHA256) and verification is pinned to
/// the same algorithm: tokens claiming any other algorithm are
/// rejected outright.
#[derive(Clone, Debug)]
pub struct Issuer {
    /// Key the issued tokens are signed with.
    #[debug(skip)]
    encoding_key: EncodingKey,

    /// Key the verified tokens are checked against.
    #[debug(skip)]
    decoding_key: DecodingKey,

    /// [`Validation`] pinning the expected algorithm and expiry rules.
    validation: Validation,

    /// [`Duration`] an [`AccessToken`] lives for.
    access_ttl: Duration,

    /// [`Duration`] a [`RefreshToken`] lives for.
    refresh_ttl: Duration,
}

impl Issuer {
    /// Default [`AccessToken`] lifetime.
    pub const DEFAULT_ACCESS_TTL: Duration = Duration::from_secs(15 * 60);

    /// Default [`RefreshToken`] lifetime.
    pub const DEFAULT_REFRESH_TTL: Duration = Duration::from_secs(24 * 60 * 60);

    /// Creates a new [`Issuer`] signing with the provided `secret`.
    #[must_use]
    pub fn new(
        secret: &[u8],
        access_ttl: Duration,
        refresh_ttl: Duration,
    ) -> Self {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.leeway = 0;

        Self {
            encoding_key: EncodingKey::from_secret(secret),
            decoding_key: DecodingKey::from_secret(secret),
            validation,
            access_ttl,
            refresh_ttl,
        }
    }

    /// Issues a new [`TokenPair`] for the provided [`User`], bound to
    /// the provided [`session::Id`].
    ///
    /// # Errors
    ///
    /// If signing fails (misconfigured secret). Such an error is fatal
    /// to the calling request, not to the process.
    pub fn issue_pair(
        &self,
        user: &User,
        session_id: session::Id,
    ) -> Result<TokenPair, IssueError> {
        let now = DateTime::now();

        let access = jsonwebtoken::encode(
            &Header::default(),
            &AccessClaims {
                session_id,
                user_id: user.id,
                email: user.email.clone(),
                role: user.role,
                expires_at: (now + self.access_ttl).coerce(),
            },
            &self.encoding_key,
        )
        .map_err(IssueError)?;

        let refresh = jsonwebtoken::encode(
            &Header::default(),
            &RefreshClaims {
                session_id,
                expires_at: (now + self.refresh_ttl).coerce(),
            },
            &self.encoding_key,
        )
        .map_err(IssueError)?;

        // SAFETY: `jsonwebtoken::encode` always returns a valid token
        //         representation.
        #[expect(unsafe_code, reason = "invariants are preserved")]
        Ok(unsafe {
            TokenPair {
                access: AccessToken::new_unchecked(access),
                refresh: RefreshToken::new_unchecked(refresh),
            }
        })
    }

    /// Verifies the provided [`AccessToken`] and decodes its
    /// [`AccessClaims`].
    ///
    /// # Errors
    ///
    /// If the token is expired, malformed, signed with an unexpected
    /// algorithm or secret, or misses a required claim.
    pub fn decode_access(
        &self,
        token: &AccessToken,
    ) -> Result<AccessClaims, InvalidTokenError> {
        jsonwebtoken::decode(token.as_ref(), &self.decoding_key, &self.validation)
            .map(|data| data.claims)
            .map_err(InvalidTokenError)
    }

    /// Verifies the provided [`RefreshToken`] and decodes its
    /// [`RefreshClaims`].
    ///
    /// # Errors
    ///
    /// If the token is expired, malformed, signed with an unexpected
    /// algorithm or secret, or misses a required claim.
    pub fn decode_refresh(
        &self,
        token: &RefreshToken,
    ) -> Result<RefreshClaims, InvalidTokenError> {
        jsonwebtoken::decode(token.as_ref(), &self.decoding_key, &self.validation)
            .map(|data| data.claims)
            .map_err(InvalidTokenError)
    }
}

/// Pair of tokens issued on a successful login or refresh.
///
/// Both tokens are bound to the same [`session::Id`]: cryptographic
/// validity alone is never sufficient, the [`Session`] must still
/// resolve in the session store.
#[derive(Clone, Debug)]
pub struct TokenPair {
    /// Short-lived credential for per-request authorization.
    pub access: AccessToken,

    /// Longer-lived credential used solely to obtain a new pair.
    pub refresh: RefreshToken,
}

/// Claims of an [`AccessToken`].
#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct AccessClaims {
    /// ID of the [`Session`] the token is bound to.
    pub session_id: session::Id,

    /// ID of the [`User`] the token was issued for.
    pub user_id: user::Id,

    /// [`user::Email`] of the [`User`] the token was issued for.
    pub email: user::Email,

    /// [`user::Role`] of the [`User`] the token was issued for.
    pub role: user::Role,

    /// [`DateTime`] when the token expires.
    ///
    /// [`DateTime`]: common::DateTime
    #[serde(rename = "exp", with = "common::datetime::serde::unix_timestamp")]
    pub expires_at: ExpirationDateTime,
}

/// Claims of a [`RefreshToken`].
#[derive(Clone, Copy, Debug, Deserialize, Serialize)]
pub struct RefreshClaims {
    /// ID of the [`Session`] the token is bound to.
    pub session_id: session::Id,

    /// [`DateTime`] when the token expires.
    ///
    /// [`DateTime`]: common::DateTime
    #[serde(rename = "exp", with = "common::datetime::serde::unix_timestamp")]
    pub expires_at: ExpirationDateTime,
}

/// Access token of a [`Session`].
#[derive(AsRef, Clone, Debug, Display, FromStr)]
pub struct AccessToken(String);

impl AccessToken {
    /// Creates a new [`AccessToken`] without checking its contents.
    ///
    /// # Safety
    ///
    /// The provided `token` must be a valid [`AccessToken`]
    /// representation.
    #[expect(unsafe_code, reason = "bypass")]
    #[must_use]
    pub const unsafe fn new_unchecked(token: String) -> Self {
        Self(token)
    }
}

/// Refresh token of a [`Session`].
#[derive(AsRef, Clone, Debug, Display, FromStr)]
pub struct RefreshToken(String);

impl RefreshToken {
    /// Creates a new [`RefreshToken`] without checking its contents.
    ///
    /// # Safety
    ///
    /// The provided `token` must be a valid [`RefreshToken`]
    /// representation.
    #[expect(unsafe_code, reason = "bypass")]
    #[must_use]
    pub const unsafe fn new_unchecked(token: String) -> Self {
        Self(token)
    }
}

/// [`DateTime`] of a token expiration.
///
/// [`DateTime`]: common::DateTime
pub type ExpirationDateTime = DateTimeOf<unit::Expiration>;

/// Error of signing a token.
#[derive(Debug, Display, StdError)]
#[display("failed to sign token: {_0}")]
pub struct IssueError(jsonwebtoken::errors::Error);

/// Error of verifying a token.
#[derive(Debug, Display, StdError)]
#[display("invalid token: {_0}")]
pub struct InvalidTokenError(jsonwebtoken::errors::Error);

#[cfg(test)]
mod issuer_spec {
    use std::time::Duration;

    use common::DateTime;

    use crate::domain::{user, User};

    use super::{AccessToken, Issuer, RefreshToken};

    fn issuer(secret: &str) -> Issuer {
        Issuer::new(
            secret.as_bytes(),
            Issuer::DEFAULT_ACCESS_TTL,
            Issuer::DEFAULT_REFRESH_TTL,
        )
    }

    fn user() -> User {
        let password = user::Password::new("secret1").unwrap();
        User {
            id: user::Id::new(),
            email: user::Email::new("a@x.com").unwrap(),
            first_name: user::Name::new("A").unwrap(),
            last_name: user::Name::new("B").unwrap(),
            role: user::Role::User,
            password_hash: user::PasswordHash::new(&password).unwrap(),
            avatar: None,
            created_at: DateTime::now().coerce(),
            updated_at: DateTime::now().coerce(),
        }
    }

    #[test]
    fn pair_is_bound_to_one_session() {
        let user = user();
        let session_id = user::session::Id::new();

        let pair = issuer("s3cr3t").issue_pair(&user, session_id).unwrap();

        let access = issuer("s3cr3t").decode_access(&pair.access).unwrap();
        let refresh = issuer("s3cr3t").decode_refresh(&pair.refresh).unwrap();

        assert_eq!(access.session_id, session_id);
        assert_eq!(refresh.session_id, session_id);
        assert_eq!(access.user_id, user.id);
        assert_eq!(access.email, user.email);
        assert_eq!(access.role, user.role);
        assert!(access.expires_at <= refresh.expires_at);
    }

    #[test]
    fn rejects_foreign_signature() {
        let pair = issuer("s3cr3t")
            .issue_pair(&user(), user::session::Id::new())
            .unwrap();

        assert!(issuer("another").decode_access(&pair.access).is_err());
        assert!(issuer("another").decode_refresh(&pair.refresh).is_err());
    }

    #[test]
    fn rejects_expired() {
        let expired = Issuer::new(
            "s3cr3t".as_bytes(),
            Duration::ZERO,
            Duration::ZERO,
        )
        .issue_pair(&user(), user::session::Id::new())
        .unwrap();

        std::thread::sleep(Duration::from_secs(1));

        assert!(issuer("s3cr3t").decode_access(&expired.access).is_err());
        assert!(issuer("s3cr3t").decode_refresh(&expired.refresh).is_err());
    }

    #[test]
    fn rejects_unexpected_algorithm() {
        let token = jsonwebtoken::encode(
            &jsonwebtoken::Header::new(jsonwebtoken::Algorithm::HS384),
            &serde_json::json!({
                "session_id": user::session::Id::new(),
                "exp": DateTime::now().unix_timestamp() + 3600,
            }),
            &jsonwebtoken::EncodingKey::from_secret(b"s3cr3t"),
        )
        .unwrap();

        // SAFETY: `jsonwebtoken::encode` output is a valid token.
        #[expect(unsafe_code, reason = "test input")]
        let token = unsafe { RefreshToken::new_unchecked(token) };

        assert!(issuer("s3cr3t").decode_refresh(&token).is_err());
    }

    #[test]
    fn rejects_missing_session_id() {
        let token = jsonwebtoken::encode(
            &jsonwebtoken::Header::default(),
            &serde_json::json!({
                "exp": DateTime::now().unix_timestamp() + 3600,
            }),
            &jsonwebtoken::EncodingKey::from_secret(b"s3cr3t"),
        )
        .unwrap();

        // SAFETY: `jsonwebtoken::encode` output is a valid token.
        #[expect(unsafe_code, reason = "test input")]
        let token = unsafe { AccessToken::new_unchecked(token) };

        assert!(issuer("s3cr3t").decode_access(&token).is_err());
    }
}
