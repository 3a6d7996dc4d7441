//! The World is the central container for all entities and their component data.
//!
//! A `World` owns the component registry, the entity directory, every archetype and the live
//! query cache. It provides the primary API for spawning and removing entities, changing the
//! component set of an entity and finding the archetypes a query matches.
//!
//! # Architecture
//!
//! ```text
//!   World
//!     ├── component::Registry   id ─► ColumnKind
//!     ├── entity::Directory     id ─► Alive(archetype, row) | Removed(next free)
//!     ├── archetype::Registry   mask ─► Archetype { columns, entities }
//!     └── query cache           Query ─► [archetype ids], appended as archetypes appear
//! ```
//!
//! Changing an entity's component set moves its row to the archetype for the new mask:
//!
//! ```text
//!   {A}         row 2 ──┐
//!                       │ transfer shared columns, new columns start at zero
//!   {A, B}              └─► row 0
//! ```
//!
//! The vacated source row is filled by swap-remove, and the directory entry of the entity that
//! moved into it is updated.
//!
//! # Example
//!
//! ```rust,ignore
//! let mut world = World::new();
//! let health = world.register_component(ColumnKind::I32);
//! let speed = world.register_component(ColumnKind::F32);
//!
//! let entity = world.spawn(&Mask::of([health]))?.set_i32(health, 10)?.id();
//! world.insert_components(entity, &Mask::of([speed]))?.set_f32(speed, 1.5)?;
//! assert_eq!(world.entity(entity)?.get_i32(health)?, 10);
//!
//! world.remove_entity(entity)?;
//! ```
mod entity_ref;

use dashmap::DashMap;

use crate::ecs::{
    archetype::{self, Archetype},
    bits::Mask,
    column::ColumnKind,
    component,
    config::Config,
    entity::{self, Location},
    error::Result,
    query::Query,
};

pub use entity_ref::{EntityMut, EntityRef};

/// The World is the central container for all entities, components, and their relationships.
#[derive(Debug)]
pub struct World {
    /// Initial sizing.
    config: Config,

    /// Registered component kinds.
    components: component::Registry,

    /// Entity id to location.
    entities: entity::Directory,

    /// All archetypes, one per distinct component mask.
    archetypes: archetype::Registry,

    /// Query to matching archetypes. Lists are built once and appended to afterwards.
    queries: DashMap<Query, Vec<archetype::Id>>,
}

impl Default for World {
    fn default() -> Self {
        Self::new()
    }
}

impl World {
    pub fn new() -> Self {
        Self::with_config(Config::default())
    }

    pub fn with_config(config: Config) -> Self {
        Self {
            config,
            components: component::Registry::new(),
            entities: entity::Directory::with_capacity(config.entity_capacity),
            archetypes: archetype::Registry::new(),
            queries: DashMap::new(),
        }
    }

    #[inline]
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Register a component stored as `kind`.
    pub fn register_component(&mut self, kind: ColumnKind) -> component::Id {
        let id = self.components.register(kind);
        log::debug!("registered component {id} as {kind}");
        id
    }

    #[inline]
    pub fn components(&self) -> &component::Registry {
        &self.components
    }

    /// Number of live entities.
    #[inline]
    pub fn len(&self) -> usize {
        self.entities.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.entities.is_empty()
    }

    /// Get an archetype by id.
    #[inline]
    pub fn archetype(&self, id: archetype::Id) -> Result<&Archetype> {
        self.archetypes.get(id)
    }

    /// Iterate over every archetype in creation order.
    #[inline]
    pub fn archetypes(&self) -> impl Iterator<Item = &Archetype> {
        self.archetypes.iter()
    }

    /// Spawn an entity holding exactly the components in `mask`, all at their zero value.
    ///
    /// Fails with `InvalidComponent` when `mask` names an unregistered component.
    pub fn spawn(&mut self, mask: &Mask) -> Result<EntityMut<'_>> {
        self.components.validate(mask)?;
        let archetype_id = self.archetype_for(mask)?;

        let archetype = self.archetypes.get_mut(archetype_id)?;
        let mut row = 0;
        let id = self.entities.alloc(|id| {
            row = archetype.add(id);
            Location::new(archetype_id, row)
        });
        log::trace!("spawned entity {id} in archetype {archetype_id} row {row}");

        Ok(EntityMut::new(archetype, id, row))
    }

    /// The current location of a live entity.
    #[inline]
    pub fn location(&self, id: entity::Id) -> Result<Location> {
        self.entities.location(id)
    }

    #[inline]
    pub fn contains(&self, id: entity::Id) -> bool {
        self.entities.contains(id)
    }

    /// Read access to a live entity.
    pub fn entity(&self, id: entity::Id) -> Result<EntityRef<'_>> {
        let location = self.entities.location(id)?;
        let archetype = self.archetypes.get(location.archetype())?;
        Ok(EntityRef::new(archetype, id, location.row()))
    }

    /// Write access to a live entity.
    pub fn entity_mut(&mut self, id: entity::Id) -> Result<EntityMut<'_>> {
        let location = self.entities.location(id)?;
        let archetype = self.archetypes.get_mut(location.archetype())?;
        Ok(EntityMut::new(archetype, id, location.row()))
    }

    /// Remove an entity and all of its components. The id becomes available for reuse.
    pub fn remove_entity(&mut self, id: entity::Id) -> Result<()> {
        let location = self.entities.free(id)?;
        let archetype = self.archetypes.get_mut(location.archetype())?;
        if let Some(moved) = archetype.remove(id, location.row()) {
            self.entities.relocate(moved, location)?;
        }
        log::trace!("removed entity {id} from archetype {}", location.archetype());
        Ok(())
    }

    /// Add the components in `mask` to an entity. Components it already has keep their values.
    pub fn insert_components(&mut self, id: entity::Id, mask: &Mask) -> Result<EntityMut<'_>> {
        self.modify_components(id, mask, &Mask::new())
    }

    /// Remove the components in `mask` from an entity. Components it lacks are ignored.
    pub fn remove_components(&mut self, id: entity::Id, mask: &Mask) -> Result<EntityMut<'_>> {
        self.modify_components(id, &Mask::new(), mask)
    }

    /// Add `add` and then remove `remove` from an entity's component set in one move.
    ///
    /// Values of components kept across the change are preserved, newly added components start
    /// at zero. When the resulting set equals the current one the entity stays where it is.
    pub fn modify_components(
        &mut self,
        id: entity::Id,
        add: &Mask,
        remove: &Mask,
    ) -> Result<EntityMut<'_>> {
        self.components.validate(add)?;
        let location = self.entities.location(id)?;
        let source = self.archetypes.get(location.archetype())?;
        let target = source.mask().union_and_difference(add, remove);

        let location = if &target == source.mask() {
            location
        } else {
            self.migrate(id, location, &target)?
        };

        let archetype = self.archetypes.get_mut(location.archetype())?;
        Ok(EntityMut::new(archetype, id, location.row()))
    }

    /// Move an entity's row into the archetype for `target`.
    fn migrate(&mut self, id: entity::Id, from: Location, target: &Mask) -> Result<Location> {
        let destination = self.archetype_for(target)?;
        let (src, dst) = self.archetypes.pair_mut(from.archetype(), destination)?;

        let row = dst.add(id);
        src.transfer_row(from.row(), dst, row);
        if let Some(moved) = src.remove(id, from.row()) {
            self.entities.relocate(moved, from)?;
        }

        let to = Location::new(destination, row);
        self.entities.relocate(id, to)?;
        log::trace!(
            "moved entity {id} from archetype {} to {destination}",
            from.archetype()
        );
        Ok(to)
    }

    /// Find the archetype for `mask`, creating it when missing.
    fn archetype_for(&mut self, mask: &Mask) -> Result<archetype::Id> {
        match self.archetypes.find(mask) {
            Some(id) => Ok(id),
            None => self.create_archetype(mask.clone()),
        }
    }

    /// Register a new archetype and append it to every cached query it satisfies.
    fn create_archetype(&mut self, mask: Mask) -> Result<archetype::Id> {
        let archetype =
            self.archetypes
                .create(mask, &self.components, self.config.archetype_capacity)?;
        let id = archetype.id();

        for mut cached in self.queries.iter_mut() {
            if cached.key().matches(archetype.mask()) {
                cached.value_mut().push(id);
            }
        }
        log::debug!("created archetype {id} for components {:?}", archetype.mask());
        Ok(id)
    }

    /// The archetypes matching `query`, in creation order.
    ///
    /// The first call for a query scans every archetype and caches the result; archetypes
    /// created later are appended to the cached list as they appear.
    pub fn matching(&self, query: &Query) -> Vec<archetype::Id> {
        if let Some(cached) = self.queries.get(query) {
            return cached.value().clone();
        }

        let ids: Vec<_> = self
            .archetypes
            .iter()
            .filter(|archetype| query.matches(archetype.mask()))
            .map(Archetype::id)
            .collect();
        self.queries
            .entry(query.clone())
            .or_insert(ids)
            .value()
            .clone()
    }

    /// A view over the archetypes matching `query`.
    pub fn matches(&self, query: &Query) -> Matches<'_> {
        Matches::new(self, self.matching(query))
    }

    /// Run `f` once over the archetypes matching `query`.
    pub fn run_once<R>(&self, query: &Query, f: impl FnOnce(&Matches<'_>) -> R) -> R {
        f(&self.matches(query))
    }

    /// Check that the directory and every archetype agree, panicking otherwise.
    pub fn verify_invariants(&mut self) {
        let mut population = 0;
        for archetype in self.archetypes.iter_mut() {
            archetype.verify_invariants();
            population += archetype.len();
        }
        assert_eq!(population, self.entities.len(), "live entities equal stored rows");

        for (id, location) in self.entities.iter() {
            let archetype = self.archetypes.get(location.archetype());
            assert!(archetype.is_ok(), "entity {id} points to a missing archetype");
            if let Ok(archetype) = archetype {
                assert_eq!(
                    archetype.entities().get(location.row()),
                    Some(&id),
                    "entity {id} is not at its recorded row"
                );
            }
        }
    }
}

/// The archetypes matched by a query, resolved against a world.
#[derive(Debug, Clone)]
pub struct Matches<'w> {
    world: &'w World,
    archetypes: Vec<archetype::Id>,
}

impl<'w> Matches<'w> {
    pub(crate) fn new(world: &'w World, archetypes: Vec<archetype::Id>) -> Self {
        Self { world, archetypes }
    }

    #[inline]
    pub fn world(&self) -> &'w World {
        self.world
    }

    /// The matched archetype ids.
    #[inline]
    pub fn ids(&self) -> &[archetype::Id] {
        &self.archetypes
    }

    /// Iterate over the matched archetypes.
    pub fn iter(&self) -> impl Iterator<Item = &'w Archetype> + '_ {
        let world = self.world;
        self.archetypes
            .iter()
            .filter_map(move |&id| world.archetypes.get(id).ok())
    }

    /// Number of matched archetypes.
    #[inline]
    pub fn len(&self) -> usize {
        self.archetypes.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.archetypes.is_empty()
    }

    /// Total number of entities across the matched archetypes.
    pub fn entity_count(&self) -> usize {
        self.iter().map(Archetype::len).sum()
    }
}
