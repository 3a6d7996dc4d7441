//! Typed access to a single entity's row.

use std::any::Any;

use crate::ecs::{
    archetype::Archetype,
    column::{Column, ColumnKind},
    component, entity,
    error::{Error, Result},
};

/// Typed getters shared by [`EntityRef`] and [`EntityMut`].
///
/// Reads go through the column borrow flags, so they fail with `ColumnBorrowed` while a
/// parallel system holds the column exclusively.
macro_rules! getters {
    ($($name:ident: $slice:ident => $ty:ty),* $(,)?) => {
        /// The entity id.
        #[inline]
        pub fn id(&self) -> entity::Id {
            self.id
        }

        /// The entity's row in its archetype.
        #[inline]
        pub fn row(&self) -> usize {
            self.row
        }

        /// The archetype currently holding the entity.
        #[inline]
        pub fn archetype(&self) -> &Archetype {
            &*self.archetype
        }

        /// Whether the entity has `component`.
        #[inline]
        pub fn has(&self, component: component::Id) -> bool {
            self.archetype.has(component)
        }

        $(
            #[doc = concat!("Read a `", stringify!($ty), "` component.")]
            pub fn $name(&self, component: component::Id) -> Result<$ty> {
                let column = self.archetype.column(component)?;
                let values = column.$slice()?;
                Ok(values[self.row])
            }
        )*

        /// Read a bit component.
        pub fn get_bit(&self, component: component::Id) -> Result<bool> {
            self.archetype.column(component)?.bit(self.row)
        }

        /// Inspect an object component. `f` receives `None` when the slot is empty.
        pub fn with_object<T: Any, R>(
            &self,
            component: component::Id,
            f: impl FnOnce(Option<&T>) -> R,
        ) -> Result<R> {
            let column = self.archetype.column(component)?;
            Ok(f(column.object::<T>(self.row)?))
        }
    };
}

/// Read-only access to one entity.
#[derive(Debug, Clone, Copy)]
pub struct EntityRef<'w> {
    archetype: &'w Archetype,
    id: entity::Id,
    row: usize,
}

impl<'w> EntityRef<'w> {
    pub(crate) fn new(archetype: &'w Archetype, id: entity::Id, row: usize) -> Self {
        Self { archetype, id, row }
    }

    getters! {
        get_i32: i32s => i32,
        get_i64: i64s => i64,
        get_f32: f32s => f32,
        get_f64: f64s => f64,
        get_f32x2: f32x2s => [f32; 2],
    }
}

/// Read-write access to one entity, holding its archetype exclusively.
///
/// Setters return `&mut Self` so writes chain:
///
/// ```rust,ignore
/// world
///     .spawn(&Mask::of([health, position]))?
///     .set_i32(health, 100)?
///     .set_f32x2(position, [0.0, 4.5])?;
/// ```
#[derive(Debug)]
pub struct EntityMut<'w> {
    archetype: &'w mut Archetype,
    id: entity::Id,
    row: usize,
}

/// Typed setters writing straight into the exclusively held column.
macro_rules! setters {
    ($($name:ident: $variant:ident => $ty:ty),* $(,)?) => {
        $(
            #[doc = concat!("Write a `", stringify!($ty), "` component.")]
            pub fn $name(&mut self, component: component::Id, value: $ty) -> Result<&mut Self> {
                match self.archetype.column_exclusive(component)? {
                    Column::$variant(values) => values[self.row] = value,
                    other => return Err(mismatch(component, ColumnKind::$variant, other)),
                }
                Ok(self)
            }
        )*
    };
}

fn mismatch(component: component::Id, expected: ColumnKind, found: &Column) -> Error {
    Error::StorageKindMismatch {
        component,
        expected,
        found: found.kind(),
    }
}

impl<'w> EntityMut<'w> {
    pub(crate) fn new(archetype: &'w mut Archetype, id: entity::Id, row: usize) -> Self {
        Self { archetype, id, row }
    }

    getters! {
        get_i32: i32s => i32,
        get_i64: i64s => i64,
        get_f32: f32s => f32,
        get_f64: f64s => f64,
        get_f32x2: f32x2s => [f32; 2],
    }

    setters! {
        set_i32: I32 => i32,
        set_i64: I64 => i64,
        set_f32: F32 => f32,
        set_f64: F64 => f64,
        set_f32x2: F32x2 => [f32; 2],
    }

    /// Write a bit component.
    pub fn set_bit(&mut self, component: component::Id, value: bool) -> Result<&mut Self> {
        match self.archetype.column_exclusive(component)? {
            Column::Bit(bits) => bits.set(self.row, value),
            other => return Err(mismatch(component, ColumnKind::Bit, other)),
        }
        Ok(self)
    }

    /// Store an object component, replacing and dropping any previous value.
    pub fn set_object<T: Any + Send + Sync>(
        &mut self,
        component: component::Id,
        value: T,
    ) -> Result<&mut Self> {
        match self.archetype.column_exclusive(component)? {
            Column::Object(objects) => {
                objects.replace(self.row, Some(Box::new(value)));
            }
            other => return Err(mismatch(component, ColumnKind::Object, other)),
        }
        Ok(self)
    }

    /// Mutably access an object component, `None` when the slot is empty.
    pub fn object_mut<T: Any>(&mut self, component: component::Id) -> Result<Option<&mut T>> {
        let row = self.row;
        match self.archetype.column_exclusive(component)? {
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

    /// Downgrade to read-only access.
    pub fn as_readonly(&self) -> EntityRef<'_> {
        EntityRef::new(self.archetype, self.id, self.row)
    }
}
