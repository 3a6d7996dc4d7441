//! Word-level bitmask arithmetic.
//!
//! Every structural decision in the world is a bitmask decision: an archetype is identified by
//! the set of component ids it stores, a query is a triple of component sets, and the scheduler
//! tracks system state and claimed component access as sets of ids. All of them share the
//! representation in this module: a growable run of `u64` words where bit `i` lives in word
//! `i / 64` at position `i % 64`.
//!
//! ```text
//!   word 0                          word 1
//!   ┌───────────────────────────┐   ┌───────────────────────────┐
//!   │ 63 ...            2  1  0 │   │ 127 ...                64 │
//!   └───────────────────────────┘   └───────────────────────────┘
//! ```
//!
//! The free functions work on raw word slices and accept operands of unequal length: the
//! shorter operand is treated as if it were zero-extended, and no function reads past the end
//! of either operand. Operations producing a result grow their output as needed. Storage is
//! never trimmed.
//!
//! [`Mask`] wraps a word vector and is the canonical set type used by the rest of the crate.
//! Equality and hashing ignore trailing zero words, so two masks holding the same bits compare
//! equal regardless of how much storage either one grew. `fixedbitset::FixedBitSet` includes
//! its bit length in `Eq` and `Hash`, so it cannot key the archetype table.

use std::{
    fmt,
    hash::{Hash, Hasher},
};

/// Number of bits held by a single word.
pub const WORD_BITS: usize = u64::BITS as usize;

/// Number of words required to hold `bits` bits.
#[inline]
pub const fn words_for(bits: usize) -> usize {
    bits.div_ceil(WORD_BITS)
}

/// Split a bit index into its word index and the single-bit mask within that word.
#[inline]
const fn locate(bit: usize) -> (usize, u64) {
    (bit / WORD_BITS, 1u64 << (bit % WORD_BITS))
}

/// Build a word vector with every bit in `bits` set.
pub fn encode(bits: impl IntoIterator<Item = usize>) -> Vec<u64> {
    let mut words = Vec::new();
    for bit in bits {
        insert(&mut words, bit);
    }
    words
}

/// Check whether `bit` is set. Bits beyond the stored words are clear.
#[inline]
pub fn contains(words: &[u64], bit: usize) -> bool {
    let (word, mask) = locate(bit);
    words.get(word).is_some_and(|w| w & mask != 0)
}

/// Set `bit`, growing the storage when the bit lies beyond it.
#[inline]
pub fn insert(words: &mut Vec<u64>, bit: usize) {
    let (word, mask) = locate(bit);
    if word >= words.len() {
        words.resize(word + 1, 0);
    }
    words[word] |= mask;
}

/// Clear `bit`. A bit beyond the stored words is already clear, so nothing happens.
#[inline]
pub fn remove(words: &mut [u64], bit: usize) {
    let (word, mask) = locate(bit);
    if let Some(w) = words.get_mut(word) {
        *w &= !mask;
    }
}

/// Flip `bit`, growing the storage when the bit lies beyond it.
#[inline]
pub fn toggle(words: &mut Vec<u64>, bit: usize) {
    let (word, mask) = locate(bit);
    if word >= words.len() {
        words.resize(word + 1, 0);
    }
    words[word] ^= mask;
}

/// Clear every bit, keeping the storage.
#[inline]
pub fn clear(words: &mut [u64]) {
    words.fill(0);
}

/// `target |= other`, growing `target` to the length of `other` when needed.
pub fn union_with(target: &mut Vec<u64>, other: &[u64]) {
    if other.len() > target.len() {
        target.resize(other.len(), 0);
    }
    for (t, o) in target.iter_mut().zip(other) {
        *t |= o;
    }
}

/// `target &= !other`. Words of `target` beyond `other` are left untouched.
pub fn difference_with(target: &mut [u64], other: &[u64]) {
    for (t, o) in target.iter_mut().zip(other) {
        *t &= !o;
    }
}

/// `a | b` as a new word vector as long as the longer operand.
pub fn union(a: &[u64], b: &[u64]) -> Vec<u64> {
    let mut out = a.to_vec();
    union_with(&mut out, b);
    out
}

/// `a & !b` as a new word vector as long as `a`.
pub fn difference(a: &[u64], b: &[u64]) -> Vec<u64> {
    let mut out = a.to_vec();
    difference_with(&mut out, b);
    out
}

/// `(base | add) & !sub` as a new word vector.
pub fn union_and_difference(base: &[u64], add: &[u64], sub: &[u64]) -> Vec<u64> {
    let mut out = union(base, add);
    difference_with(&mut out, sub);
    out
}

/// Check whether every bit of `subset` is also set in `superset`.
pub fn is_subset(superset: &[u64], subset: &[u64]) -> bool {
    subset.iter().enumerate().all(|(i, &word)| {
        let sup = superset.get(i).copied().unwrap_or(0);
        word & !sup == 0
    })
}

/// Check whether `a` and `b` share no set bit.
pub fn is_disjoint(a: &[u64], b: &[u64]) -> bool {
    a.iter().zip(b).all(|(x, y)| x & y == 0)
}

/// Find the first set bit at or after `from`.
///
/// `from` is unsigned so a negative start cannot be expressed. Starting beyond the stored
/// words yields `None`.
pub fn next_set_bit(words: &[u64], from: usize) -> Option<usize> {
    let (mut index, _) = locate(from);
    if index >= words.len() {
        return None;
    }

    // Mask off the bits below `from` in the first word.
    let mut word = words[index] & (u64::MAX << (from % WORD_BITS));
    loop {
        if word != 0 {
            return Some(index * WORD_BITS + word.trailing_zeros() as usize);
        }
        index += 1;
        word = *words.get(index)?;
    }
}

/// Count the set bits.
#[inline]
pub fn count_ones(words: &[u64]) -> usize {
    words.iter().map(|w| w.count_ones() as usize).sum()
}

/// Iterate over the set bits in ascending order.
#[inline]
pub fn ones(words: &[u64]) -> Ones<'_> {
    Ones { words, next: 0 }
}

/// Ascending iterator over the set bits of a word slice.
#[derive(Debug, Clone)]
pub struct Ones<'a> {
    words: &'a [u64],
    next: usize,
}

impl Iterator for Ones<'_> {
    type Item = usize;

    #[inline]
    fn next(&mut self) -> Option<usize> {
        let bit = next_set_bit(self.words, self.next)?;
        self.next = bit + 1;
        Some(bit)
    }
}

/// Strip trailing zero words so the slice is canonical for comparison.
#[inline]
pub(crate) fn significant(words: &[u64]) -> &[u64] {
    let len = words.iter().rposition(|&w| w != 0).map_or(0, |i| i + 1);
    &words[..len]
}

/// A growable set of small non-negative integers stored as a bitmask.
///
/// Used for component masks, query sections and scheduler state. Two masks are equal when
/// they hold the same bits, independent of their storage length.
///
/// # Example
///
/// ```rust,ignore
/// let a = Mask::of([1usize, 3]);
/// let b = Mask::of([3usize]);
/// assert!(a.is_superset_of(&b));
/// assert_eq!(a.difference(&b), Mask::of([1usize]));
/// ```
#[derive(Clone, Default)]
pub struct Mask {
    words: Vec<u64>,
}

impl Mask {
    /// Create an empty mask.
    #[inline]
    pub const fn new() -> Self {
        Self { words: Vec::new() }
    }

    /// Create an empty mask with storage for at least `bits` bits.
    #[inline]
    pub fn with_capacity(bits: usize) -> Self {
        Self {
            words: vec![0; words_for(bits)],
        }
    }

    /// Create a mask from raw words.
    #[inline]
    pub fn from_words(words: Vec<u64>) -> Self {
        Self { words }
    }

    /// Create a mask holding each of the given bits.
    pub fn of<I>(bits: I) -> Self
    where
        I: IntoIterator,
        I::Item: Into<usize>,
    {
        bits.into_iter().map(Into::<usize>::into).collect()
    }

    /// The raw backing words.
    #[inline]
    pub fn words(&self) -> &[u64] {
        &self.words
    }

    #[inline]
    pub fn contains(&self, bit: usize) -> bool {
        contains(&self.words, bit)
    }

    #[inline]
    pub fn insert(&mut self, bit: usize) {
        insert(&mut self.words, bit);
    }

    #[inline]
    pub fn remove(&mut self, bit: usize) {
        remove(&mut self.words, bit);
    }

    #[inline]
    pub fn toggle(&mut self, bit: usize) {
        toggle(&mut self.words, bit);
    }

    #[inline]
    pub fn clear(&mut self) {
        clear(&mut self.words);
    }

    /// Number of set bits.
    #[inline]
    pub fn len(&self) -> usize {
        count_ones(&self.words)
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.words.iter().all(|&w| w == 0)
    }

    #[inline]
    pub fn union(&self, other: &Mask) -> Mask {
        Mask::from_words(union(&self.words, &other.words))
    }

    #[inline]
    pub fn difference(&self, other: &Mask) -> Mask {
        Mask::from_words(difference(&self.words, &other.words))
    }

    /// `(self | add) & !sub`.
    #[inline]
    pub fn union_and_difference(&self, add: &Mask, sub: &Mask) -> Mask {
        Mask::from_words(union_and_difference(&self.words, &add.words, &sub.words))
    }

    #[inline]
    pub fn union_with(&mut self, other: &Mask) {
        union_with(&mut self.words, &other.words);
    }

    #[inline]
    pub fn difference_with(&mut self, other: &Mask) {
        difference_with(&mut self.words, &other.words);
    }

    /// Check whether every bit of `other` is set in `self`.
    #[inline]
    pub fn is_superset_of(&self, other: &Mask) -> bool {
        is_subset(&self.words, &other.words)
    }

    /// Check whether every bit of `self` is set in `other`.
    #[inline]
    pub fn is_subset_of(&self, other: &Mask) -> bool {
        is_subset(&other.words, &self.words)
    }

    #[inline]
    pub fn is_disjoint(&self, other: &Mask) -> bool {
        is_disjoint(&self.words, &other.words)
    }

    #[inline]
    pub fn next_set_bit(&self, from: usize) -> Option<usize> {
        next_set_bit(&self.words, from)
    }

    /// Iterate over the set bits in ascending order.
    #[inline]
    pub fn ones(&self) -> Ones<'_> {
        ones(&self.words)
    }
}

impl PartialEq for Mask {
    fn eq(&self, other: &Self) -> bool {
        significant(&self.words) == significant(&other.words)
    }
}

impl Eq for Mask {}

impl Hash for Mask {
    fn hash<H: Hasher>(&self, state: &mut H) {
        significant(&self.words).hash(state);
    }
}

impl fmt::Debug for Mask {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_set().entries(self.ones()).finish()
    }
}

impl FromIterator<usize> for Mask {
    fn from_iter<T: IntoIterator<Item = usize>>(iter: T) -> Self {
        Mask::from_words(encode(iter))
    }
}

impl Extend<usize> for Mask {
    fn extend<T: IntoIterator<Item = usize>>(&mut self, iter: T) {
        for bit in iter {
            self.insert(bit);
        }
    }
}
