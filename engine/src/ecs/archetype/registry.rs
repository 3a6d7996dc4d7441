use std::collections::HashMap;

use crate::ecs::{
    archetype::{Archetype, Id},
    bits::Mask,
    component,
    error::{Error, Result},
};

/// Central registry of archetypes.
#[derive(Debug, Default)]
pub struct Registry {
    /// The archetypes stored by their unique identifier
    archetypes: Vec<Archetype>,

    /// The archetypes indexed by their component mask
    by_mask: HashMap<Mask, Id>,
}

impl Registry {
    /// Create an empty archetype registry.
    #[inline]
    pub fn new() -> Self {
        Self::default()
    }

    /// Find the archetype storing exactly `mask`.
    #[inline]
    pub fn find(&self, mask: &Mask) -> Option<Id> {
        self.by_mask.get(mask).copied()
    }

    /// Create a new archetype for `mask`. The mask must not have an archetype yet.
    pub fn create(
        &mut self,
        mask: Mask,
        components: &component::Registry,
        capacity: usize,
    ) -> Result<&Archetype> {
        debug_assert!(
            !self.by_mask.contains_key(&mask),
            "archetype for {mask:?} already exists"
        );

        let id = Id::new(self.archetypes.len() as u32);
        let archetype = Archetype::new(id, mask.clone(), components, capacity)?;
        self.archetypes.push(archetype);
        self.by_mask.insert(mask, id);
        Ok(&self.archetypes[id.index()])
    }

    /// Get an archetype by its archetype Id.
    #[inline]
    pub fn get(&self, id: Id) -> Result<&Archetype> {
        self.archetypes
            .get(id.index())
            .ok_or(Error::InvalidArchetype(id))
    }

    /// Get a mutable archetype by its archetype Id.
    #[inline]
    pub fn get_mut(&mut self, id: Id) -> Result<&mut Archetype> {
        self.archetypes
            .get_mut(id.index())
            .ok_or(Error::InvalidArchetype(id))
    }

    /// Borrow two distinct archetypes mutably at once.
    ///
    /// # Panics
    /// When `a == b`.
    pub fn pair_mut(&mut self, a: Id, b: Id) -> Result<(&mut Archetype, &mut Archetype)> {
        assert_ne!(a, b, "cannot borrow archetype {a} twice");
        let len = self.archetypes.len();
        for id in [a, b] {
            if id.index() >= len {
                return Err(Error::InvalidArchetype(id));
            }
        }

        if a.index() < b.index() {
            let (low, high) = self.archetypes.split_at_mut(b.index());
            Ok((&mut low[a.index()], &mut high[0]))
        } else {
            let (low, high) = self.archetypes.split_at_mut(a.index());
            Ok((&mut high[0], &mut low[b.index()]))
        }
    }

    /// Iterate over every archetype in creation order.
    #[inline]
    pub fn iter(&self) -> std::slice::Iter<'_, Archetype> {
        self.archetypes.iter()
    }

    #[inline]
    pub fn iter_mut(&mut self) -> std::slice::IterMut<'_, Archetype> {
        self.archetypes.iter_mut()
    }

    /// Number of archetypes.
    #[inline]
    pub fn len(&self) -> usize {
        self.archetypes.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.archetypes.is_empty()
    }
}
