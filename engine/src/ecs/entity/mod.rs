//! Entity ids and the directory that locates them.
//!
//! An entity is nothing but a dense [`Id`]. The [`Directory`] keeps one [`Slot`] per id ever
//! handed out. A live slot records where the entity's row currently lives; a removed slot is a
//! link in an intrusive free list threaded through the directory itself:
//!
//! ```text
//!   id:     0            1                 2            3
//!         ┌──────────┐ ┌───────────────┐ ┌──────────┐ ┌───────────────┐
//!         │ Alive    │ │ Removed       │ │ Alive    │ │ Removed       │
//!         │ (a1, r0) │ │ next: None    │ │ (a0, r3) │ │ next: Some(1) │
//!         └──────────┘ └───────────────┘ └──────────┘ └───────────────┘
//!   free head ─► 3 ─► 1 ─► ∅
//! ```
//!
//! Freed ids are reused last-in first-out, which keeps the id space compact. There is no
//! generation counter: an id refers to whichever entity currently occupies its slot.

use std::fmt;

use crate::ecs::{
    archetype,
    error::{Error, Result},
};

/// An entity identifier. Dense and reused after removal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Id(u32);

impl Id {
    #[inline]
    pub const fn new(id: u32) -> Self {
        Self(id)
    }

    /// Get the index of this entity if it were to live in indexable storage (e.g. Vec)
    #[inline]
    pub const fn index(&self) -> usize {
        self.0 as usize
    }
}

impl From<u32> for Id {
    #[inline]
    fn from(value: u32) -> Self {
        Self(value)
    }
}

impl fmt::Display for Id {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Where an entity's data lives: an archetype and a row inside it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Location {
    archetype: archetype::Id,
    row: usize,
}

impl Location {
    #[inline]
    pub const fn new(archetype: archetype::Id, row: usize) -> Self {
        Self { archetype, row }
    }

    #[inline]
    pub const fn archetype(&self) -> archetype::Id {
        self.archetype
    }

    #[inline]
    pub const fn row(&self) -> usize {
        self.row
    }
}

/// A directory entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Slot {
    Alive(Location),
    Removed { next_free: Option<Id> },
}

/// Maps entity ids to their current location and recycles removed ids.
#[derive(Debug, Default)]
pub struct Directory {
    slots: Vec<Slot>,
    free_head: Option<Id>,
    alive: usize,
}

impl Directory {
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            slots: Vec::with_capacity(capacity),
            free_head: None,
            alive: 0,
        }
    }

    /// Allocate an id and record the location `place` assigns to it.
    ///
    /// The id is taken from the free list when one is available, otherwise the id space
    /// grows by one. `place` receives the id before the slot is marked alive so the caller can
    /// store it in its archetype row.
    pub fn alloc(&mut self, place: impl FnOnce(Id) -> Location) -> Id {
        let id = match self.free_head {
            Some(id) => id,
            None => Id::new(self.slots.len() as u32),
        };
        let location = place(id);

        match self.free_head {
            Some(id) => {
                let Slot::Removed { next_free } = self.slots[id.index()] else {
                    unreachable!("free list head {id} is alive");
                };
                self.free_head = next_free;
                self.slots[id.index()] = Slot::Alive(location);
            }
            None => self.slots.push(Slot::Alive(location)),
        }
        self.alive += 1;
        id
    }

    /// The location of a live entity.
    #[inline]
    pub fn location(&self, id: Id) -> Result<Location> {
        match self.slots.get(id.index()) {
            Some(Slot::Alive(location)) => Ok(*location),
            _ => Err(Error::InvalidEntity(id)),
        }
    }

    #[inline]
    pub fn contains(&self, id: Id) -> bool {
        self.location(id).is_ok()
    }

    /// Re-point a live entity after its row moved.
    pub fn relocate(&mut self, id: Id, location: Location) -> Result<()> {
        match self.slots.get_mut(id.index()) {
            Some(slot @ Slot::Alive(_)) => {
                *slot = Slot::Alive(location);
                Ok(())
            }
            _ => Err(Error::InvalidEntity(id)),
        }
    }

    /// Mark an entity removed, push its id on the free list and return its last location.
    pub fn free(&mut self, id: Id) -> Result<Location> {
        let location = self.location(id)?;
        self.slots[id.index()] = Slot::Removed {
            next_free: self.free_head,
        };
        self.free_head = Some(id);
        self.alive -= 1;
        Ok(location)
    }

    /// Number of live entities.
    #[inline]
    pub fn len(&self) -> usize {
        self.alive
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.alive == 0
    }

    /// Iterate over every live entity and its location.
    pub fn iter(&self) -> impl Iterator<Item = (Id, Location)> + '_ {
        self.slots
            .iter()
            .enumerate()
            .filter_map(|(i, slot)| match slot {
                Slot::Alive(location) => Some((Id::new(i as u32), *location)),
                Slot::Removed { .. } => None,
            })
    }
}
