//! Borrow-tracked access to a column shared between worker threads.
//!
//! Parallel systems all receive `&World`. Which system may touch which column is decided up
//! front by the scheduler from declared reads and writes, so under correct declarations a
//! [`ColumnCell`] never sees contention. The cell still tracks borrows with a single atomic
//! word so that an under-declared system gets an error instead of a data race:
//!
//! | State           | Meaning                         |
//! |----------------:|---------------------------------|
//! | `0`             | Unborrowed                      |
//! | `1..UNIQUE`     | That many shared borrows        |
//! | `UNIQUE`        | One exclusive borrow            |
//!
//! Borrowing never blocks or spins. A conflicting request fails immediately with
//! [`Error::ColumnBorrowed`].
//!
//! The guards ([`ColumnRef`], [`ColumnMut`]) expose typed views of the populated rows and
//! report [`Error::StorageKindMismatch`] when the column is accessed as the wrong kind.

use std::{
    any::Any,
    cell::UnsafeCell,
    sync::atomic::{AtomicUsize, Ordering},
};

use crate::ecs::{
    archetype,
    column::{Column, ColumnKind, Object},
    component,
    error::{Error, Result},
};

const UNIQUE: usize = !(usize::MAX >> 1);

/// A column with an atomic reader/writer flag.
pub struct ColumnCell {
    column: UnsafeCell<Column>,
    kind: ColumnKind,
    borrow: AtomicUsize,
}

// SAFETY: The column is only reached through `&mut ColumnCell` or through a guard acquired
// from the borrow flag, which upholds the shared-xor-exclusive rule across threads. Every
// storage kind is itself `Send + Sync`.
unsafe impl Sync for ColumnCell {}

impl ColumnCell {
    pub fn new(column: Column) -> Self {
        Self {
            kind: column.kind(),
            column: UnsafeCell::new(column),
            borrow: AtomicUsize::new(0),
        }
    }

    /// Direct access when the caller already holds the archetype exclusively.
    #[inline]
    pub fn get_mut(&mut self) -> &mut Column {
        self.column.get_mut()
    }

    #[inline]
    pub fn kind(&self) -> ColumnKind {
        self.kind
    }

    fn acquire(&self) -> bool {
        let previous = self.borrow.fetch_add(1, Ordering::Acquire);
        if previous & UNIQUE != 0 {
            self.borrow.fetch_sub(1, Ordering::Release);
            return false;
        }
        debug_assert!(previous + 1 < UNIQUE, "shared borrow counter overflow");
        true
    }

    fn acquire_mut(&self) -> bool {
        self.borrow
            .compare_exchange(0, UNIQUE, Ordering::Acquire, Ordering::Relaxed)
            .is_ok()
    }

    #[inline]
    fn release(&self) {
        let previous = self.borrow.fetch_sub(1, Ordering::Release);
        debug_assert!(previous != 0 && previous & UNIQUE == 0, "unbalanced release");
    }

    #[inline]
    fn release_mut(&self) {
        let previous = self.borrow.swap(0, Ordering::Release);
        debug_assert_eq!(previous, UNIQUE, "unbalanced exclusive release");
    }

    /// Borrow the column for reading.
    pub fn borrow(
        &self,
        archetype: archetype::Id,
        component: component::Id,
        len: usize,
    ) -> Result<ColumnRef<'_>> {
        if !self.acquire() {
            return Err(Error::ColumnBorrowed {
                archetype,
                component,
            });
        }
        Ok(ColumnRef {
            cell: self,
            component,
            len,
        })
    }

    /// Borrow the column for writing.
    pub fn borrow_mut(
        &self,
        archetype: archetype::Id,
        component: component::Id,
        len: usize,
    ) -> Result<ColumnMut<'_>> {
        if !self.acquire_mut() {
            return Err(Error::ColumnBorrowed {
                archetype,
                component,
            });
        }
        Ok(ColumnMut {
            cell: self,
            component,
            len,
        })
    }
}

impl std::fmt::Debug for ColumnCell {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ColumnCell")
            .field("kind", &self.kind())
            .field("borrow", &self.borrow.load(Ordering::Relaxed))
            .finish()
    }
}

/// Shared access to the populated rows of a column.
pub struct ColumnRef<'a> {
    cell: &'a ColumnCell,
    component: component::Id,
    len: usize,
}

/// Exclusive access to the populated rows of a column.
pub struct ColumnMut<'a> {
    cell: &'a ColumnCell,
    component: component::Id,
    len: usize,
}

impl Drop for ColumnRef<'_> {
    fn drop(&mut self) {
        self.cell.release();
    }
}

impl Drop for ColumnMut<'_> {
    fn drop(&mut self) {
        self.cell.release_mut();
    }
}

fn mismatch(component: component::Id, expected: ColumnKind, found: &Column) -> Error {
    Error::StorageKindMismatch {
        component,
        expected,
        found: found.kind(),
    }
}

fn check_row(row: usize, len: usize) -> Result<()> {
    if row < len {
        Ok(())
    } else {
        Err(Error::InvalidRow { row, len })
    }
}

fn downcast_ref<T: Any>(component: component::Id, object: &Object) -> Result<&T> {
    object
        .downcast_ref::<T>()
        .ok_or(Error::ObjectTypeMismatch {
            component,
            expected: std::any::type_name::<T>(),
        })
}

/// Typed slice getters shared by both guards.
macro_rules! scalar_getters {
    ($($name:ident: $variant:ident => $ty:ty),* $(,)?) => {
        $(
            #[doc = concat!("The populated rows as `", stringify!($ty), "` values.")]
            pub fn $name(&self) -> Result<&[$ty]> {
                match self.column() {
                    Column::$variant(values) => Ok(&values[..self.len]),
                    other => Err(mismatch(self.component, ColumnKind::$variant, other)),
                }
            }
        )*
    };
}

/// Typed mutable slice getters for [`ColumnMut`].
macro_rules! scalar_setters {
    ($($name:ident: $variant:ident => $ty:ty),* $(,)?) => {
        $(
            #[doc = concat!("The populated rows as mutable `", stringify!($ty), "` values.")]
            pub fn $name(&mut self) -> Result<&mut [$ty]> {
                let (component, len) = (self.component, self.len);
                match self.column_mut() {
                    Column::$variant(values) => Ok(&mut values[..len]),
                    other => Err(mismatch(component, ColumnKind::$variant, other)),
                }
            }
        )*
    };
}

/// Read accessors shared by [`ColumnRef`] and [`ColumnMut`].
macro_rules! read_accessors {
    () => {
        /// The component this column stores.
        #[inline]
        pub fn component(&self) -> component::Id {
            self.component
        }

        /// Number of populated rows.
        #[inline]
        pub fn len(&self) -> usize {
            self.len
        }

        #[inline]
        pub fn is_empty(&self) -> bool {
            self.len == 0
        }

        #[inline]
        pub fn kind(&self) -> ColumnKind {
            self.cell.kind
        }

        scalar_getters! {
            i32s: I32 => i32,
            i64s: I64 => i64,
            f32s: F32 => f32,
            f64s: F64 => f64,
            f32x2s: F32x2 => [f32; 2],
        }

        /// Read one bit of a [`ColumnKind::Bit`] column.
        pub fn bit(&self, row: usize) -> Result<bool> {
            check_row(row, self.len)?;
            match self.column() {
                Column::Bit(bits) => Ok(bits.contains(row)),
                other => Err(mismatch(self.component, ColumnKind::Bit, other)),
            }
        }

        /// Read the object stored at `row`, `None` when the slot is empty.
        pub fn object<T: Any>(&self, row: usize) -> Result<Option<&T>> {
            check_row(row, self.len)?;
            match self.column() {
                Column::Object(objects) => objects
                    .get(row)
                    .map(|object| downcast_ref::<T>(self.component, object))
                    .transpose(),
                other => Err(mismatch(self.component, ColumnKind::Object, other)),
            }
        }
    };
}

impl<'a> ColumnRef<'a> {
    #[inline]
    fn column(&self) -> &Column {
        // SAFETY: This guard holds a shared borrow, so no exclusive guard exists.
        unsafe { &*self.cell.column.get() }
    }

    read_accessors!();
}

impl<'a> ColumnMut<'a> {
    #[inline]
    fn column(&self) -> &Column {
        // SAFETY: This guard holds the exclusive borrow.
        unsafe { &*self.cell.column.get() }
    }

    #[inline]
    fn column_mut(&mut self) -> &mut Column {
        // SAFETY: This guard holds the exclusive borrow and `&mut self` prevents aliasing
        // through the guard itself.
        unsafe { &mut *self.cell.column.get() }
    }

    read_accessors!();

    scalar_setters! {
        i32s_mut: I32 => i32,
        i64s_mut: I64 => i64,
        f32s_mut: F32 => f32,
        f64s_mut: F64 => f64,
        f32x2s_mut: F32x2 => [f32; 2],
    }

    /// Write one bit of a [`ColumnKind::Bit`] column.
    pub fn set_bit(&mut self, row: usize, value: bool) -> Result<()> {
        check_row(row, self.len)?;
        let component = self.component;
        match self.column_mut() {
            Column::Bit(bits) => {
                bits.set(row, value);
                Ok(())
            }
            other => Err(mismatch(component, ColumnKind::Bit, other)),
        }
    }

    /// Mutably access the object stored at `row`, `None` when the slot is empty.
    pub fn object_mut<T: Any>(&mut self, row: usize) -> Result<Option<&mut T>> {
        check_row(row, self.len)?;
        let component = self.component;
        match self.column_mut() {
            Column::Object(objects) => match objects.get_mut(row) {
                Some(object) => object
                    .downcast_mut::<T>()
                    .map(Some)
                    .ok_or(Error::ObjectTypeMismatch {
                        component,
                        expected: std::any::type_name::<T>(),
                    }),
                None => Ok(None),
            },
            other => Err(mismatch(component, ColumnKind::Object, other)),
        }
    }

    /// Store an object at `row`, returning whatever was there before.
    pub fn set_object<T: Any + Send + Sync>(
        &mut self,
        row: usize,
        value: T,
    ) -> Result<Option<Object>> {
        check_row(row, self.len)?;
        let component = self.component;
        match self.column_mut() {
            Column::Object(objects) => Ok(objects.replace(row, Some(Box::new(value)))),
            other => Err(mismatch(component, ColumnKind::Object, other)),
        }
    }

    /// Empty the object slot at `row`, returning its previous value.
    pub fn take_object(&mut self, row: usize) -> Result<Option<Object>> {
        check_row(row, self.len)?;
        let component = self.component;
        match self.column_mut() {
            Column::Object(objects) => Ok(objects.replace(row, None)),
            other => Err(mismatch(component, ColumnKind::Object, other)),
        }
    }
}
