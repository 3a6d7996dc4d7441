//! Bitmask queries over archetype component masks.
//!
//! A [`Query`] names three component sets:
//!
//! - **used**: components the caller reads or writes, which must be present,
//! - **required**: components that must be present but are not touched,
//! - **excluded**: components that must be absent.
//!
//! An archetype matches when its mask is a superset of `used` and `required` and shares no bit
//! with `excluded`. `used` and `required` match identically; the distinction is kept so callers
//! can tell which components a query actually accesses.
//!
//! The three sets are packed into a single word array so queries can be compared and hashed
//! cheaply as cache keys:
//!
//! ```text
//!   [ header | used words ... | required words ... | excluded words ... ]
//!
//!   header = required_len << 32 | used_len        (lengths in words)
//! ```
//!
//! Trailing zero words are trimmed from each section, so equal sets always encode equally.

use std::fmt;

use crate::ecs::{bits, bits::Mask, component};

/// An encoded `{used, required, excluded}` component query.
#[derive(Clone, PartialEq, Eq, Hash)]
pub struct Query {
    words: Box<[u64]>,
}

impl Query {
    /// Start building a query.
    #[inline]
    pub fn builder() -> Builder {
        Builder::default()
    }

    /// A query using exactly the given components.
    pub fn of(components: impl IntoIterator<Item = component::Id>) -> Self {
        Self::encode(&components.into_iter().collect::<Mask>(), &Mask::new(), &Mask::new())
    }

    /// A query matching every archetype.
    pub fn all() -> Self {
        Self::encode(&Mask::new(), &Mask::new(), &Mask::new())
    }

    /// Pack the three sections into one word array.
    pub fn encode(used: &Mask, required: &Mask, excluded: &Mask) -> Self {
        let used = bits::significant(used.words());
        let required = bits::significant(required.words());
        let excluded = bits::significant(excluded.words());

        let mut words = Vec::with_capacity(1 + used.len() + required.len() + excluded.len());
        words.push(((required.len() as u64) << 32) | used.len() as u64);
        words.extend_from_slice(used);
        words.extend_from_slice(required);
        words.extend_from_slice(excluded);

        Self {
            words: words.into_boxed_slice(),
        }
    }

    #[inline]
    fn used_len(&self) -> usize {
        (self.words[0] & u32::MAX as u64) as usize
    }

    #[inline]
    fn required_len(&self) -> usize {
        (self.words[0] >> 32) as usize
    }

    /// Words of the `used` section.
    #[inline]
    pub fn used(&self) -> &[u64] {
        &self.words[1..1 + self.used_len()]
    }

    /// Words of the `required` section.
    #[inline]
    pub fn required(&self) -> &[u64] {
        let start = 1 + self.used_len();
        &self.words[start..start + self.required_len()]
    }

    /// Words of the `excluded` section.
    #[inline]
    pub fn excluded(&self) -> &[u64] {
        &self.words[1 + self.used_len() + self.required_len()..]
    }

    /// Check whether an archetype with component mask `mask` satisfies this query.
    ///
    /// A mask shorter than a section is treated as zero-extended.
    #[inline]
    pub fn matches(&self, mask: &Mask) -> bool {
        let words = mask.words();
        bits::is_subset(words, self.used())
            && bits::is_subset(words, self.required())
            && bits::is_disjoint(words, self.excluded())
    }
}

impl fmt::Debug for Query {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        struct Set<'a>(&'a [u64]);
        impl fmt::Debug for Set<'_> {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.debug_set().entries(bits::ones(self.0)).finish()
            }
        }

        f.debug_struct("Query")
            .field("used", &Set(self.used()))
            .field("required", &Set(self.required()))
            .field("excluded", &Set(self.excluded()))
            .finish()
    }
}

/// Builds a [`Query`] from component lists.
///
/// ```rust,ignore
/// let query = Query::builder()
///     .uses([position, velocity])
///     .requires([alive])
///     .excludes([frozen])
///     .build();
/// ```
#[derive(Debug, Clone, Default)]
pub struct Builder {
    used: Mask,
    required: Mask,
    excluded: Mask,
}

impl Builder {
    /// Components the query reads or writes.
    pub fn uses(mut self, components: impl IntoIterator<Item = component::Id>) -> Self {
        self.used.extend(components.into_iter().map(|c| c.index()));
        self
    }

    /// Components that must be present without being accessed.
    pub fn requires(mut self, components: impl IntoIterator<Item = component::Id>) -> Self {
        self.required
            .extend(components.into_iter().map(|c| c.index()));
        self
    }

    /// Components that must be absent.
    pub fn excludes(mut self, components: impl IntoIterator<Item = component::Id>) -> Self {
        self.excluded
            .extend(components.into_iter().map(|c| c.index()));
        self
    }

    pub fn build(self) -> Query {
        Query::encode(&self.used, &self.required, &self.excluded)
    }
}
