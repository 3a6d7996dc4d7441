//! World sizing configuration.

/// Initial sizing for a [`World`](crate::ecs::World).
///
/// Both values are starting points only. The entity directory grows on demand and archetype
/// columns double whenever they fill up.
///
/// ```rust,ignore
/// let world = World::with_config(Config::default().with_archetype_capacity(1024));
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Config {
    /// Number of entity slots reserved up front in the directory.
    pub entity_capacity: usize,

    /// Number of rows every newly created archetype reserves in each column.
    pub archetype_capacity: usize,
}

impl Config {
    pub const DEFAULT_ENTITY_CAPACITY: usize = 512;
    pub const DEFAULT_ARCHETYPE_CAPACITY: usize = 8;

    #[inline]
    pub fn with_entity_capacity(mut self, capacity: usize) -> Self {
        self.entity_capacity = capacity;
        self
    }

    /// Set the initial row capacity of new archetypes. Zero is raised to one.
    #[inline]
    pub fn with_archetype_capacity(mut self, capacity: usize) -> Self {
        self.archetype_capacity = capacity.max(1);
        self
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            entity_capacity: Self::DEFAULT_ENTITY_CAPACITY,
            archetype_capacity: Self::DEFAULT_ARCHETYPE_CAPACITY,
        }
    }
}
