//! Component registration.
//!
//! A component is identified by a dense [`Id`] handed out in registration order. The only thing
//! the world knows about a component is its [`ColumnKind`], the storage shape every archetype
//! uses for that component's column. The [`Registry`] mapping ids to kinds is an ordinary value
//! owned by the [`World`](crate::ecs::World) and lent to archetype construction.
//!
//! ```rust,ignore
//! let mut world = World::new();
//! let health = world.register_component(ColumnKind::I32);
//! let name = world.register_component(ColumnKind::Object);
//! ```

use std::fmt;

use crate::ecs::{
    bits::Mask,
    column::ColumnKind,
    error::{Error, Result},
};

/// A component identifier, dense and assigned at registration.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Id(u32);

impl Id {
    /// Construct a new component Id from a raw u32 value.
    #[inline]
    pub const fn new(id: u32) -> Self {
        Self(id)
    }

    /// Get the index of this component if it were to live in indexable storage (e.g. Vec)
    #[inline]
    pub const fn index(&self) -> usize {
        self.0 as usize
    }
}

impl From<u32> for Id {
    #[inline]
    fn from(value: u32) -> Self {
        Self::new(value)
    }
}

impl From<Id> for usize {
    #[inline]
    fn from(id: Id) -> Self {
        id.index()
    }
}

impl fmt::Display for Id {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

impl FromIterator<Id> for Mask {
    fn from_iter<T: IntoIterator<Item = Id>>(iter: T) -> Self {
        iter.into_iter().map(|id| id.index()).collect()
    }
}

/// Registered component kinds, indexed by component id.
#[derive(Debug, Default, Clone)]
pub struct Registry {
    kinds: Vec<ColumnKind>,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a new component stored as `kind`, returning its id.
    pub fn register(&mut self, kind: ColumnKind) -> Id {
        let id = Id::new(self.kinds.len() as u32);
        self.kinds.push(kind);
        id
    }

    /// The storage kind of a registered component.
    #[inline]
    pub fn kind(&self, id: Id) -> Result<ColumnKind> {
        self.kinds
            .get(id.index())
            .copied()
            .ok_or(Error::InvalidComponent(id))
    }

    /// Ensure every component in `mask` has been registered.
    pub fn validate(&self, mask: &Mask) -> Result<()> {
        match mask.next_set_bit(self.kinds.len()) {
            Some(bit) => Err(Error::InvalidComponent(Id::new(bit as u32))),
            None => Ok(()),
        }
    }

    /// Number of registered components.
    #[inline]
    pub fn len(&self) -> usize {
        self.kinds.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.kinds.is_empty()
    }

    /// Iterate over every registered component and its kind.
    pub fn iter(&self) -> impl Iterator<Item = (Id, ColumnKind)> + '_ {
        self.kinds
            .iter()
            .enumerate()
            .map(|(i, kind)| (Id::new(i as u32), *kind))
    }
}
