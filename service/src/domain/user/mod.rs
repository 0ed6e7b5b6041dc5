//! [`User`] definitions.

pub mod session;

use std::sync::LazyLock;

use argon2::{
    password_hash::{rand_core::OsRng, PasswordHash as ParsedHash, SaltString},
    Argon2, PasswordHasher as _, PasswordVerifier as _,
};
#[cfg(doc)]
use common::DateTime;
use common::{unit, DateTimeOf};
use derive_more::{AsRef, Display, Error as StdError, From, FromStr, Into};
#[cfg(feature = "postgres")]
use postgres_types::{FromSql, ToSql};
use regex::Regex;
use secrecy::{zeroize::Zeroize, CloneableSecret};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

pub use self::session::Session;

/// Account of the platform.
#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct User {
    /// ID of this [`User`].
    pub id: Id,

    /// [`Email`] of this [`User`], unique across all [`User`]s.
    pub email: Email,

    /// First [`Name`] of this [`User`].
    pub first_name: Name,

    /// Last [`Name`] of this [`User`].
    pub last_name: Name,

    /// [`Role`] of this [`User`].
    pub role: Role,

    /// [`PasswordHash`] of this [`User`].
    ///
    /// Never serialized: no [`User`] snapshot crossing a process
    /// boundary may carry it.
    #[serde(default, skip)]
    pub password_hash: PasswordHash,

    /// [`Avatar`] of this [`User`].
    pub avatar: Option<Avatar>,

    /// [`DateTime`] when this [`User`] was created.
    #[serde(with = "common::datetime::serde::unix_timestamp")]
    pub created_at: CreationDateTime,

    /// [`DateTime`] when this [`User`] was updated the last time.
    #[serde(with = "common::datetime::serde::unix_timestamp")]
    pub updated_at: UpdateDateTime,
}

impl User {
    /// Strips the [`PasswordHash`] out of this [`User`], so the record
    /// may cross the trust boundary outward.
    #[must_use]
    pub fn redact(mut self) -> Self {
        self.password_hash = PasswordHash::default();
        self
    }
}

/// ID of a [`User`].
#[derive(
    Clone,
    Copy,
    Debug,
    Default,
    Deserialize,
    Display,
    Eq,
    From,
    FromStr,
    Hash,
    Into,
    PartialEq,
    Serialize,
)]
#[cfg_attr(feature = "postgres", derive(ToSql, FromSql), postgres(transparent))]
pub struct Id(Uuid);

impl Id {
    /// Creates a new random [`Id`].
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

/// Role of a [`User`].
#[derive(
    Clone,
    Copy,
    Debug,
    Deserialize,
    Eq,
    PartialEq,
    Serialize,
    strum::Display,
    strum::EnumString,
)]
#[repr(u8)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
pub enum Role {
    /// Administrator of the platform.
    Admin = 1,

    /// Regular [`User`].
    User = 2,
}

impl Role {
    /// Converts this [`Role`] into its [`u8`] representation.
    #[must_use]
    pub const fn u8(self) -> u8 {
        self as u8
    }
}

#[cfg(feature = "postgres")]
impl FromSql<'_> for Role {
    postgres_types::accepts!(INT2);

    fn from_sql(
        ty: &postgres_types::Type,
        raw: &[u8],
    ) -> Result<Self, Box<dyn std::error::Error + Sync + Send>> {
        match u8::try_from(i16::from_sql(ty, raw)?)? {
            v if Self::Admin.u8() == v => Ok(Self::Admin),
            v if Self::User.u8() == v => Ok(Self::User),
            v => Err(format!("invalid `Role` value: {v}").into()),
        }
    }
}

#[cfg(feature = "postgres")]
impl ToSql for Role {
    postgres_types::accepts!(INT2);
    postgres_types::to_sql_checked!();

    fn to_sql(
        &self,
        ty: &postgres_types::Type,
        w: &mut postgres_types::private::BytesMut,
    ) -> Result<
        postgres_types::IsNull,
        Box<dyn std::error::Error + Sync + Send>,
    > {
        i16::from(self.u8()).to_sql(ty, w)
    }
}

/// First or last name of a [`User`].
#[derive(
    AsRef, Clone, Debug, Deserialize, Display, Eq, PartialEq, Serialize,
)]
#[as_ref(str, String)]
#[cfg_attr(feature = "postgres", derive(FromSql, ToSql), postgres(transparent))]
pub struct Name(String);

impl Name {
    /// Maximum length of a [`Name`], in bytes.
    pub const MAX_LEN: usize = 30;

    /// Creates a new [`Name`].
    ///
    /// # Safety
    ///
    /// The caller must ensure that the given `name` matches the format.
    #[expect(unsafe_code, reason = "bypass")]
    #[must_use]
    pub unsafe fn new_unchecked(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    /// Creates a new [`Name`] if the given `name` is valid.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Option<Self> {
        let name = name.into();
        Self::check(&name).then_some(Self(name))
    }

    /// Checks whether the given `name` is a valid [`Name`].
    fn check(name: impl AsRef<str>) -> bool {
        let name = name.as_ref();
        name.trim() == name && !name.is_empty() && name.len() <= Self::MAX_LEN
    }
}

impl FromStr for Name {
    type Err = &'static str;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s).ok_or("invalid `Name`")
    }
}

/// Password of a [`User`].
#[derive(Clone, Debug, Display, Eq, PartialEq)]
pub struct Password(String);

impl Password {
    /// Minimum length of a [`Password`], in bytes.
    pub const MIN_LEN: usize = 6;

    /// Maximum length of a [`Password`], in bytes.
    pub const MAX_LEN: usize = 128;

    /// Creates a new [`Password`].
    ///
    /// # Safety
    ///
    /// The caller must ensure that the given `password` matches the format.
    #[expect(unsafe_code, reason = "bypass")]
    #[must_use]
    pub unsafe fn new_unchecked(password: impl Into<String>) -> Self {
        Self(password.into())
    }

    /// Creates a new [`Password`] if the given `password` is valid.
    ///
    /// Surrounding whitespace is trimmed before validation.
    #[must_use]
    pub fn new(password: impl Into<String>) -> Option<Self> {
        let password = password.into().trim().to_owned();
        Self::check(&password).then_some(Self(password))
    }

    /// Checks whether the given `password` is a valid [`Password`].
    fn check(password: impl AsRef<str>) -> bool {
        let password = password.as_ref();
        (Self::MIN_LEN..=Self::MAX_LEN).contains(&password.len())
    }

    /// Returns this [`Password`] as bytes.
    pub(crate) fn as_bytes(&self) -> &[u8] {
        self.0.as_bytes()
    }
}

impl FromStr for Password {
    type Err = &'static str;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s).ok_or("invalid `Password`")
    }
}

impl CloneableSecret for Password {}
impl Zeroize for Password {
    fn zeroize(&mut self) {
        self.0.zeroize();
    }
}

/// Password hash of a [`User`].
///
/// Holds an [argon2] digest with a per-call random salt, or nothing at
/// all once [`User::redact()`]ed.
#[derive(Clone, Debug, Default, Display, Eq, PartialEq)]
#[cfg_attr(feature = "postgres", derive(FromSql, ToSql), postgres(transparent))]
pub struct PasswordHash(String);

impl PasswordHash {
    /// Creates a new [`PasswordHash`] of the given [`Password`].
    ///
    /// # Errors
    ///
    /// If the hashing primitive fails (entropy or resource exhaustion).
    pub fn new(password: &Password) -> Result<Self, HashingError> {
        let salt = SaltString::generate(&mut OsRng);
        Argon2::default()
            .hash_password(password.as_bytes(), &salt)
            .map(|h| Self(h.to_string()))
            .map_err(HashingError)
    }

    /// Verifies the given [`Password`] against this [`PasswordHash`] in
    /// constant time.
    ///
    /// A redacted or malformed hash never verifies.
    #[must_use]
    pub fn verify(&self, password: &Password) -> bool {
        ParsedHash::new(&self.0).is_ok_and(|parsed| {
            Argon2::default()
                .verify_password(password.as_bytes(), &parsed)
                .is_ok()
        })
    }

    /// Indicates whether this [`PasswordHash`] has been
    /// [`User::redact()`]ed.
    #[must_use]
    pub fn is_redacted(&self) -> bool {
        self.0.is_empty()
    }
}

/// Error of hashing a [`Password`].
#[derive(Clone, Copy, Debug, Display, StdError)]
#[display("failed to hash password: {_0}")]
pub struct HashingError(#[error(not(source))] argon2::password_hash::Error);

/// Email address of a [`User`], unique across the platform.
#[derive(
    AsRef, Clone, Debug, Deserialize, Display, Eq, Hash, PartialEq, Serialize,
)]
#[as_ref(str, String)]
#[cfg_attr(feature = "postgres", derive(FromSql, ToSql), postgres(transparent))]
pub struct Email(String);

impl Email {
    /// Maximum length of an [`Email`], in bytes.
    pub const MAX_LEN: usize = 60;

    /// Creates a new [`Email`].
    ///
    /// # Safety
    ///
    /// The caller must ensure that the given `address` matches the format.
    #[expect(unsafe_code, reason = "bypass")]
    #[must_use]
    pub unsafe fn new_unchecked(address: impl Into<String>) -> Self {
        Self(address.into())
    }

    /// Creates a new [`Email`] if the given `address` is valid.
    ///
    /// The `address` is case-folded: surrounding whitespace is trimmed
    /// and the address is lowercased, so equal addresses compare equal.
    #[must_use]
    pub fn new(address: impl Into<String>) -> Option<Self> {
        let address = address.into().trim().to_lowercase();
        Self::check(&address).then_some(Self(address))
    }

    /// Checks whether the given `address` is a valid [`Email`].
    fn check(address: impl AsRef<str>) -> bool {
        /// Regular expression checking [`Email`] format.
        static REGEX: LazyLock<Regex> = LazyLock::new(|| {
            Regex::new(
                "^([^\\x00-\\x20\\x22\\x28\\x29\\x2c\\x2e\\x3a-\
                     \\x3c\\x3e\\x40\\x5b-\\x5d\\x7f-\\xff]+\
                  |\\x22([^\\x0d\\x22\\x5c\\x80-\\xff]\
                  |\\x5c[\\x00-\\x7f])*\\x22)\
                  (\\x2e([^\\x00-\\x20\\x22\\x28\\x29\\x2c\\x2e\\x3a-\
                           \\x3c\\x3e\\x40\\x5b-\\x5d\\x7f-\\xff]+\
                        |\\x22([^\\x0d\\x22\\x5c\\x80-\\xff]\
                        |\\x5c[\\x00-\\x7f])*\\x22))*\\x40\
                  ([^\\x00-\\x20\\x22\\x28\\x29\\x2c\\x2e\\x3a-\
                     \\x3c\\x3e\\x40\\x5b-\\x5d\\x7f-\\xff]+\
                  |\\x5b([^\\x0d\\x5b-\\x5d\\x80-\\xff]\
                        |\\x5c[\\x00-\\x7f])*\\x5d)\
                  (\\x2e([^\\x00-\\x20\\x22\\x28\\x29\\x2c\\x2e\\x3a-\
                           \\x3c\\x3e\\x40\\x5b-\\x5d\\x7f-\\xff]+\
                        |\\x5b([^\\x0d\\x5b-\\x5d\\x80-\\xff]\
                        |\\x5c[\\x00-\\x7f])*\\x5d))*$",
            )
            .expect("valid regex")
        });

        let address = address.as_ref();
        address.len() <= Self::MAX_LEN && REGEX.is_match(address)
    }
}

impl FromStr for Email {
    type Err = &'static str;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s).ok_or("invalid `Email`")
    }
}

/// Avatar image reference of a [`User`].
#[derive(
    AsRef, Clone, Debug, Deserialize, Display, Eq, PartialEq, Serialize,
)]
#[as_ref(str, String)]
#[cfg_attr(feature = "postgres", derive(FromSql, ToSql), postgres(transparent))]
pub struct Avatar(String);

impl Avatar {
    /// Maximum length of an [`Avatar`] reference, in bytes.
    pub const MAX_LEN: usize = 512;

    /// Creates a new [`Avatar`] if the given `reference` is valid.
    #[must_use]
    pub fn new(reference: impl Into<String>) -> Option<Self> {
        let reference = reference.into();
        Self::check(&reference).then_some(Self(reference))
    }

    /// Checks whether the given `reference` is a valid [`Avatar`].
    fn check(reference: impl AsRef<str>) -> bool {
        let reference = reference.as_ref();
        reference.trim() == reference
            && !reference.is_empty()
            && reference.len() <= Self::MAX_LEN
    }
}

impl FromStr for Avatar {
    type Err = &'static str;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s).ok_or("invalid `Avatar`")
    }
}

/// [`DateTime`] when a [`User`] was created.
pub type CreationDateTime = DateTimeOf<(User, unit::Creation)>;

/// [`DateTime`] when a [`User`] was updated the last time.
pub type UpdateDateTime = DateTimeOf<(User, unit::Update)>;

#[cfg(test)]
mod email_spec {
    use super::Email;

    #[test]
    fn case_folds() {
        let email = Email::new("  John.Doe@Example.COM ").unwrap();

        let email: &str = email.as_ref();
        assert_eq!(email, "john.doe@example.com");
    }

    #[test]
    fn rejects_malformed() {
        assert!(Email::new("not-an-email").is_none());
        assert!(Email::new("a@").is_none());
        assert!(Email::new("@x.com").is_none());
        assert!(Email::new("").is_none());
    }

    #[test]
    fn rejects_overlong() {
        let local = "a".repeat(Email::MAX_LEN);
        assert!(Email::new(format!("{local}@x.com")).is_none());
    }
}

#[cfg(test)]
mod role_spec {
    use std::str::FromStr as _;

    use super::Role;

    #[test]
    fn parses_known_roles_only() {
        assert_eq!(Role::from_str("admin").unwrap(), Role::Admin);
        assert_eq!(Role::from_str("user").unwrap(), Role::User);
        assert_eq!(Role::from_str("User").unwrap(), Role::User);
        assert!(Role::from_str("superuser").is_err());
        assert!(Role::from_str("").is_err());
    }
}

#[cfg(test)]
mod password_hash_spec {
    use super::{Password, PasswordHash, User};

    #[test]
    fn round_trips() {
        let password = Password::new("secret1").unwrap();
        let hash = PasswordHash::new(&password).unwrap();

        assert!(hash.verify(&password));
        assert!(!hash.verify(&Password::new("secret2").unwrap()));
    }

    #[test]
    fn salts_every_call() {
        let password = Password::new("secret1").unwrap();

        assert_ne!(
            PasswordHash::new(&password).unwrap(),
            PasswordHash::new(&password).unwrap(),
        );
    }

    #[test]
    fn redacted_hash_never_verifies() {
        let password = Password::new("secret1").unwrap();

        assert!(!PasswordHash::default().verify(&password));
    }

    #[test]
    fn never_serialized() {
        let password = Password::new("secret1").unwrap();
        let user = User {
            id: super::Id::new(),
            email: super::Email::new("a@x.com").unwrap(),
            first_name: super::Name::new("A").unwrap(),
            last_name: super::Name::new("B").unwrap(),
            role: super::Role::User,
            password_hash: PasswordHash::new(&password).unwrap(),
            avatar: None,
            created_at: common::DateTime::now().coerce(),
            updated_at: common::DateTime::now().coerce(),
        };

        let json = serde_json::to_string(&user).unwrap();
        assert!(!json.contains("password"));
        assert!(!json.contains("argon2"));

        let user = user.redact();
        assert!(user.password_hash.is_redacted());
    }
}
