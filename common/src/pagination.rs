//! Abstractions for offset/limit pagination.

/// Arguments of an offset/limit pagination.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct Arguments {
    /// Maximum number of items on a page.
    limit: usize,

    /// Number of items to skip before the page starts.
    offset: usize,
}

impl Arguments {
    /// Default [`Arguments::limit`] applied when none is requested.
    pub const DEFAULT_LIMIT: usize = 10;

    /// Maximum allowed [`Arguments::limit`].
    pub const MAX_LIMIT: usize = 100;

    /// Creates new [`Arguments`], clamping the `limit` into the
    /// `1..=`[`MAX_LIMIT`] range.
    ///
    /// [`MAX_LIMIT`]: Self::MAX_LIMIT
    #[must_use]
    pub fn new(limit: Option<usize>, offset: Option<usize>) -> Self {
        Self {
            limit: limit
                .unwrap_or(Self::DEFAULT_LIMIT)
                .clamp(1, Self::MAX_LIMIT),
            offset: offset.unwrap_or_default(),
        }
    }

    /// Returns the maximum number of items on a page.
    #[must_use]
    pub fn limit(&self) -> usize {
        self.limit
    }

    /// Returns the number of items to skip before the page starts.
    #[must_use]
    pub fn offset(&self) -> usize {
        self.offset
    }
}

impl Default for Arguments {
    fn default() -> Self {
        Self::new(None, None)
    }
}

/// A single page of `I` items.
#[derive(Clone, Debug)]
pub struct Page<I> {
    /// Items on this [`Page`].
    pub items: Vec<I>,

    /// [`Arguments`] this [`Page`] was selected with.
    pub arguments: Arguments,

    /// Indicator whether more items exist past this [`Page`].
    pub has_more: bool,
}

impl<I> Page<I> {
    /// Creates a new [`Page`] from the provided items.
    #[must_use]
    pub fn new(
        arguments: &Arguments,
        items: impl IntoIterator<Item = I>,
        has_more: bool,
    ) -> Self {
        Self {
            items: items.into_iter().collect(),
            arguments: *arguments,
            has_more,
        }
    }
}

#[cfg(test)]
mod arguments_spec {
    use super::Arguments;

    #[test]
    fn applies_defaults() {
        let args = Arguments::new(None, None);

        assert_eq!(args.limit(), Arguments::DEFAULT_LIMIT);
        assert_eq!(args.offset(), 0);
    }

    #[test]
    fn clamps_limit() {
        assert_eq!(Arguments::new(Some(0), None).limit(), 1);
        assert_eq!(
            Arguments::new(Some(10_000), None).limit(),
            Arguments::MAX_LIMIT,
        );
        assert_eq!(Arguments::new(Some(25), Some(50)).limit(), 25);
    }

    #[test]
    fn keeps_offset() {
        assert_eq!(Arguments::new(None, Some(40)).offset(), 40);
    }
}
