//! [`User`] read model definition.
//!
//! [`User`]: crate::domain::User

pub mod list {
    //! [`User`]s list definitions.

    use common::pagination;
    use derive_more::{From, Into};

    use crate::domain::User;

    /// Selector of a [`Page`].
    #[derive(Clone, Copy, Debug, Default)]
    pub struct Selector {
        /// Pagination [`Arguments`] of the selection.
        ///
        /// [`Arguments`]: pagination::Arguments
        pub arguments: pagination::Arguments,
    }

    /// Page of [`User`]s, ordered by their creation.
    pub type Page = pagination::Page<User>;

    /// Total count of [`User`]s.
    #[derive(Clone, Copy, Debug, Eq, From, Hash, Into, PartialEq)]
    pub struct TotalCount(i32);
}
