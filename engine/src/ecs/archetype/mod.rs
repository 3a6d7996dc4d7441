//! Archetypes: fixed-schema tables of entities sharing the same component set.
//!
//! Every distinct component mask in the world gets exactly one [`Archetype`]. It stores one
//! [`Column`] per component plus the dense array of entity ids occupying its rows:
//!
//! ```text
//!   Archetype { mask: {0, 2, 5} }
//!
//!   row │ entity │ #0 (i32) │ #2 (f32x2)   │ #5 (object)
//!   ────┼────────┼──────────┼──────────────┼─────────────
//!    0  │   e4   │    10    │ [1.0, 0.5]   │ Some(..)
//!    1  │   e9   │    -3    │ [0.0, 0.0]   │ None
//!    2  │   e1   │     7    │ [2.5, 1.0]   │ Some(..)
//!   ────┼────────┼──────────┼──────────────┼─────────────
//!    3  │        │     0    │ [0.0, 0.0]   │ None        ◄─ capacity, always zeroed
//! ```
//!
//! Rows are kept dense with swap-remove: removing a row moves the last row into the hole and
//! reports which entity moved so the caller can fix the entity directory.
//!
//! Column lookup by component id is a linear scan of the archetype's component list.
//! Archetypes are expected to hold few components (well under 64), where a scan beats a map.

mod registry;

use std::fmt;

use crate::ecs::{
    bits::Mask,
    column::{Column, ColumnCell, ColumnMut, ColumnRef},
    component, entity,
    error::{Error, Result},
};

pub use registry::Registry;

/// A unique identifier for an Archetype.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Id(u32);

impl Id {
    /// Create a new Id with the given unique identifier.
    #[inline]
    pub const fn new(id: u32) -> Self {
        Id(id)
    }

    /// Get the index of the Id as a usize to be used in collections.
    #[inline]
    pub const fn index(&self) -> usize {
        self.0 as usize
    }
}

impl fmt::Display for Id {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// A table of entities sharing one component mask.
#[derive(Debug)]
pub struct Archetype {
    /// The archetype's unique identifier.
    id: Id,

    /// The canonical component mask.
    mask: Mask,

    /// The component ids in ascending order, parallel to `columns`.
    components: Vec<component::Id>,

    /// One column per component.
    columns: Vec<ColumnCell>,

    /// The entity occupying each populated row.
    entities: Vec<entity::Id>,

    /// Number of slots in every column.
    capacity: usize,
}

impl Archetype {
    /// Create an empty archetype for `mask` with `capacity` zeroed rows per column.
    ///
    /// Fails when the mask names a component missing from `registry`.
    pub fn new(
        id: Id,
        mask: Mask,
        registry: &component::Registry,
        capacity: usize,
    ) -> Result<Self> {
        let capacity = capacity.max(1);
        let components: Vec<component::Id> = mask
            .ones()
            .map(|bit| component::Id::new(bit as u32))
            .collect();
        let columns = components
            .iter()
            .map(|&component| {
                let kind = registry.kind(component)?;
                Ok(ColumnCell::new(Column::new(kind, capacity)))
            })
            .collect::<Result<Vec<_>>>()?;

        Ok(Self {
            id,
            mask,
            components,
            columns,
            entities: Vec::with_capacity(capacity),
            capacity,
        })
    }

    #[inline]
    pub fn id(&self) -> Id {
        self.id
    }

    #[inline]
    pub fn mask(&self) -> &Mask {
        &self.mask
    }

    /// The component ids stored by this archetype, ascending.
    #[inline]
    pub fn components(&self) -> &[component::Id] {
        &self.components
    }

    /// The entity in each populated row.
    #[inline]
    pub fn entities(&self) -> &[entity::Id] {
        &self.entities
    }

    /// Number of populated rows.
    #[inline]
    pub fn len(&self) -> usize {
        self.entities.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.entities.is_empty()
    }

    /// Number of rows every column can hold before growing.
    #[inline]
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    #[inline]
    pub fn has(&self, component: component::Id) -> bool {
        self.mask.contains(component.index())
    }

    #[inline]
    fn column_index(&self, component: component::Id) -> Option<usize> {
        self.components.iter().position(|&c| c == component)
    }

    fn cell(&self, component: component::Id) -> Result<&ColumnCell> {
        self.column_index(component)
            .map(|index| &self.columns[index])
            .ok_or(Error::MissingColumn {
                archetype: self.id,
                component,
            })
    }

    /// Borrow a component column for reading.
    pub fn column(&self, component: component::Id) -> Result<ColumnRef<'_>> {
        self.cell(component)?
            .borrow(self.id, component, self.len())
    }

    /// Borrow a component column for writing.
    ///
    /// Takes `&self`: exclusivity is tracked by the column's borrow flag so that parallel
    /// systems holding `&World` can write the columns they were granted.
    pub fn column_mut(&self, component: component::Id) -> Result<ColumnMut<'_>> {
        self.cell(component)?
            .borrow_mut(self.id, component, self.len())
    }

    /// Direct access to a column when the archetype is held exclusively.
    pub(crate) fn column_exclusive(&mut self, component: component::Id) -> Result<&mut Column> {
        let id = self.id;
        match self.column_index(component) {
            Some(index) => Ok(self.columns[index].get_mut()),
            None => Err(Error::MissingColumn {
                archetype: id,
                component,
            }),
        }
    }

    /// Append `entity` and return its row, doubling the capacity when full.
    pub fn add(&mut self, entity: entity::Id) -> usize {
        let row = self.entities.len();
        if row == self.capacity {
            self.capacity *= 2;
            for cell in &mut self.columns {
                cell.get_mut().grow(self.capacity);
            }
        }
        self.entities.push(entity);
        row
    }

    /// Remove `entity` at `row`, keeping rows dense.
    ///
    /// When `row` is not the last row, the last row is moved into it and the moved entity is
    /// returned so the caller can update its location.
    pub fn remove(&mut self, entity: entity::Id, row: usize) -> Option<entity::Id> {
        debug_assert!(row < self.entities.len(), "row index out of bounds");
        debug_assert_eq!(
            self.entities[row], entity,
            "entity {entity} does not occupy row {row} of archetype {}",
            self.id
        );

        let last = self.entities.len() - 1;
        self.entities.swap_remove(row);
        if row == last {
            for cell in &mut self.columns {
                cell.get_mut().remove(last);
            }
            None
        } else {
            for cell in &mut self.columns {
                cell.get_mut().move_within(last, row);
            }
            Some(self.entities[row])
        }
    }

    /// Transfer every column shared with `dst` from `row` into `dst_row`.
    ///
    /// Columns `dst` has but `self` lacks are left at their zero value.
    pub fn transfer_row(&mut self, row: usize, dst: &mut Archetype, dst_row: usize) {
        debug_assert!(row < self.len(), "row index out of bounds");
        debug_assert!(dst_row < dst.len(), "destination row index out of bounds");

        for (index, component) in self.components.iter().enumerate() {
            if let Some(dst_index) = dst.column_index(*component) {
                self.columns[index].get_mut().transfer(
                    row,
                    dst.columns[dst_index].get_mut(),
                    dst_row,
                );
            }
        }
    }

    /// Check the structural invariants of this archetype, panicking on violation.
    ///
    /// Takes `&mut self` so no column guard can be outstanding while the columns are inspected.
    pub fn verify_invariants(&mut self) {
        assert_eq!(
            self.components.len(),
            self.columns.len(),
            "one column per component"
        );
        assert_eq!(
            self.components.iter().copied().collect::<Mask>(),
            self.mask,
            "component list matches the mask"
        );
        assert!(self.entities.len() <= self.capacity, "population within capacity");
        for (component, cell) in self.components.iter().zip(&mut self.columns) {
            assert_eq!(
                cell.get_mut().capacity(),
                self.capacity,
                "column {component} sized to capacity"
            );
        }
    }
}
