//! Column storage for a single component inside an archetype.
//!
//! Every archetype stores one [`Column`] per component. A column is a fixed-capacity run of
//! slots; the first `population` slots hold live rows, every slot beyond holds the kind's
//! zero value. The archetype decides capacity and population, the column only knows how to
//! move values around:
//!
//! ```text
//!   row:      0     1     2     3   │  4     5     6     7
//!             ─────────────────────┼─────────────────────
//!   values:  12    40     7    19   │  0     0     0     0
//!                   populated       │   zeroed capacity
//! ```
//!
//! The set of storage kinds is closed ([`ColumnKind`]). Each kind implements the
//! [`Storage`] capability trait and [`Column`] dispatches over them. Scalar kinds share one
//! generic implementation over `Vec<T>`; objects are boxed `Any` values and packed bits are
//! held in a [`FixedBitSet`].
//!
//! Typed access does not happen on `Column` directly but through the borrow-tracked guards in
//! [`cell`], which also check the requested kind.

pub mod cell;

use std::{any::Any, fmt};

use fixedbitset::FixedBitSet;

pub use cell::{ColumnCell, ColumnMut, ColumnRef};

/// A boxed value stored in an [`ColumnKind::Object`] column.
pub type Object = Box<dyn Any + Send + Sync>;

/// The storage shape of a component column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ColumnKind {
    I32,
    I64,
    F32,
    F64,
    /// Two packed `f32` values per row.
    F32x2,
    /// Arbitrary boxed values, empty by default.
    Object,
    /// One packed bit per row.
    Bit,
}

impl ColumnKind {
    pub const fn name(&self) -> &'static str {
        match self {
            ColumnKind::I32 => "i32",
            ColumnKind::I64 => "i64",
            ColumnKind::F32 => "f32",
            ColumnKind::F64 => "f64",
            ColumnKind::F32x2 => "f32x2",
            ColumnKind::Object => "object",
            ColumnKind::Bit => "bit",
        }
    }
}

impl fmt::Display for ColumnKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// The operations an archetype needs from a column's backing storage.
///
/// All indices are assumed to be below the current capacity; the archetype guarantees this.
pub trait Storage {
    /// Create storage with `capacity` zeroed slots.
    fn create(capacity: usize) -> Self
    where
        Self: Sized;

    /// Number of slots.
    fn capacity(&self) -> usize;

    /// Grow to `capacity` slots; new slots are zeroed.
    fn grow(&mut self, capacity: usize);

    /// Reset the slot at `index` to the zero value, dropping whatever it held.
    fn remove(&mut self, index: usize);

    /// Relocate the value at `from` into `to` and zero `from`.
    ///
    /// This is the swap-remove primitive: `from` is the last populated row and `to` the hole.
    fn move_within(&mut self, from: usize, to: usize);

    /// Copy the value at `index` into `dst` at `dst_index`.
    ///
    /// Scalar and bit storage leave the source untouched. Object storage moves the value
    /// out, leaving the source slot empty; callers discard the source row right after.
    fn transfer(&mut self, index: usize, dst: &mut Self, dst_index: usize)
    where
        Self: Sized;
}

/// Plain-old-data values stored in a `Vec` column.
pub trait Scalar: Copy + Default + Send + Sync + 'static {}

impl Scalar for i32 {}
impl Scalar for i64 {}
impl Scalar for f32 {}
impl Scalar for f64 {}
impl Scalar for [f32; 2] {}

impl<T: Scalar> Storage for Vec<T> {
    fn create(capacity: usize) -> Self {
        vec![T::default(); capacity]
    }

    #[inline]
    fn capacity(&self) -> usize {
        self.len()
    }

    fn grow(&mut self, capacity: usize) {
        if capacity > self.len() {
            self.resize(capacity, T::default());
        }
    }

    #[inline]
    fn remove(&mut self, index: usize) {
        self[index] = T::default();
    }

    #[inline]
    fn move_within(&mut self, from: usize, to: usize) {
        self[to] = self[from];
        self[from] = T::default();
    }

    #[inline]
    fn transfer(&mut self, index: usize, dst: &mut Self, dst_index: usize) {
        dst[dst_index] = self[index];
    }
}

/// Storage for [`ColumnKind::Object`] columns.
#[derive(Default)]
pub struct Objects(Vec<Option<Object>>);

impl Objects {
    #[inline]
    pub fn get(&self, index: usize) -> Option<&Object> {
        self.0.get(index).and_then(Option::as_ref)
    }

    #[inline]
    pub fn get_mut(&mut self, index: usize) -> Option<&mut Object> {
        self.0.get_mut(index).and_then(Option::as_mut)
    }

    /// Store `value` at `index`, returning the previous value.
    #[inline]
    pub fn replace(&mut self, index: usize, value: Option<Object>) -> Option<Object> {
        std::mem::replace(&mut self.0[index], value)
    }
}

impl fmt::Debug for Objects {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list()
            .entries(self.0.iter().map(|slot| slot.as_ref().map(|_| "..")))
            .finish()
    }
}

impl Storage for Objects {
    fn create(capacity: usize) -> Self {
        let mut slots = Vec::with_capacity(capacity);
        slots.resize_with(capacity, || None);
        Self(slots)
    }

    #[inline]
    fn capacity(&self) -> usize {
        self.0.len()
    }

    fn grow(&mut self, capacity: usize) {
        if capacity > self.0.len() {
            self.0.resize_with(capacity, || None);
        }
    }

    #[inline]
    fn remove(&mut self, index: usize) {
        self.0[index] = None;
    }

    #[inline]
    fn move_within(&mut self, from: usize, to: usize) {
        self.0[to] = self.0[from].take();
    }

    #[inline]
    fn transfer(&mut self, index: usize, dst: &mut Self, dst_index: usize) {
        dst.0[dst_index] = self.0[index].take();
    }
}

impl Storage for FixedBitSet {
    fn create(capacity: usize) -> Self {
        FixedBitSet::with_capacity(capacity)
    }

    #[inline]
    fn capacity(&self) -> usize {
        self.len()
    }

    fn grow(&mut self, capacity: usize) {
        FixedBitSet::grow(self, capacity);
    }

    #[inline]
    fn remove(&mut self, index: usize) {
        self.set(index, false);
    }

    #[inline]
    fn move_within(&mut self, from: usize, to: usize) {
        let value = self.contains(from);
        self.set(to, value);
        self.set(from, false);
    }

    #[inline]
    fn transfer(&mut self, index: usize, dst: &mut Self, dst_index: usize) {
        dst.set(dst_index, self.contains(index));
    }
}

/// One component's storage, tagged with its kind.
#[derive(Debug)]
pub enum Column {
    I32(Vec<i32>),
    I64(Vec<i64>),
    F32(Vec<f32>),
    F64(Vec<f64>),
    F32x2(Vec<[f32; 2]>),
    Object(Objects),
    Bit(FixedBitSet),
}

/// Forward a call to the storage behind every variant.
macro_rules! dispatch {
    ($column:expr, $storage:ident => $body:expr) => {
        match $column {
            Column::I32($storage) => $body,
            Column::I64($storage) => $body,
            Column::F32($storage) => $body,
            Column::F64($storage) => $body,
            Column::F32x2($storage) => $body,
            Column::Object($storage) => $body,
            Column::Bit($storage) => $body,
        }
    };
}

impl Column {
    /// Create a zeroed column of the given kind.
    pub fn new(kind: ColumnKind, capacity: usize) -> Self {
        match kind {
            ColumnKind::I32 => Column::I32(Storage::create(capacity)),
            ColumnKind::I64 => Column::I64(Storage::create(capacity)),
            ColumnKind::F32 => Column::F32(Storage::create(capacity)),
            ColumnKind::F64 => Column::F64(Storage::create(capacity)),
            ColumnKind::F32x2 => Column::F32x2(Storage::create(capacity)),
            ColumnKind::Object => Column::Object(Storage::create(capacity)),
            ColumnKind::Bit => Column::Bit(Storage::create(capacity)),
        }
    }

    pub fn kind(&self) -> ColumnKind {
        match self {
            Column::I32(_) => ColumnKind::I32,
            Column::I64(_) => ColumnKind::I64,
            Column::F32(_) => ColumnKind::F32,
            Column::F64(_) => ColumnKind::F64,
            Column::F32x2(_) => ColumnKind::F32x2,
            Column::Object(_) => ColumnKind::Object,
            Column::Bit(_) => ColumnKind::Bit,
        }
    }

    #[inline]
    pub fn capacity(&self) -> usize {
        dispatch!(self, s => Storage::capacity(s))
    }

    #[inline]
    pub fn grow(&mut self, capacity: usize) {
        dispatch!(self, s => Storage::grow(s, capacity))
    }

    #[inline]
    pub fn remove(&mut self, index: usize) {
        dispatch!(self, s => Storage::remove(s, index))
    }

    #[inline]
    pub fn move_within(&mut self, from: usize, to: usize) {
        dispatch!(self, s => Storage::move_within(s, from, to))
    }

    /// Transfer the value at `index` into `dst` at `dst_index`.
    ///
    /// # Panics
    /// When `dst` is of a different kind. Columns of one component always share a kind.
    pub fn transfer(&mut self, index: usize, dst: &mut Column, dst_index: usize) {
        match (self, dst) {
            (Column::I32(src), Column::I32(dst)) => src.transfer(index, dst, dst_index),
            (Column::I64(src), Column::I64(dst)) => src.transfer(index, dst, dst_index),
            (Column::F32(src), Column::F32(dst)) => src.transfer(index, dst, dst_index),
            (Column::F64(src), Column::F64(dst)) => src.transfer(index, dst, dst_index),
            (Column::F32x2(src), Column::F32x2(dst)) => src.transfer(index, dst, dst_index),
            (Column::Object(src), Column::Object(dst)) => src.transfer(index, dst, dst_index),
            (Column::Bit(src), Column::Bit(dst)) => src.transfer(index, dst, dst_index),
            (src, dst) => unreachable!(
                "transfer between a {} and a {} column",
                src.kind(),
                dst.kind()
            ),
        }
    }
}
