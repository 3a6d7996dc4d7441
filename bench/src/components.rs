//! Common components and world populations used across benchmarks.

use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use rusty_world::ecs::{ColumnKind, Mask, World, component, entity};

/// Components registered in every benchmark world.
#[derive(Debug, Clone, Copy)]
pub struct Components {
    pub position: component::Id,
    pub velocity: component::Id,
    pub health: component::Id,
    pub mass: component::Id,
    pub alive: component::Id,
    pub label: component::Id,
}

impl Components {
    /// Register the standard set in `world`.
    pub fn register(world: &mut World) -> Self {
        Self {
            position: world.register_component(ColumnKind::F32x2),
            velocity: world.register_component(ColumnKind::F32x2),
            health: world.register_component(ColumnKind::I32),
            mass: world.register_component(ColumnKind::F64),
            alive: world.register_component(ColumnKind::Bit),
            label: world.register_component(ColumnKind::Object),
        }
    }

    /// Position and velocity, the usual moving entity.
    pub fn moving(&self) -> Mask {
        Mask::of([self.position, self.velocity])
    }

    /// Every component but `label`.
    pub fn full(&self) -> Mask {
        Mask::of([
            self.position,
            self.velocity,
            self.health,
            self.mass,
            self.alive,
        ])
    }

    /// A random non-empty subset, weighted towards moving entities.
    fn random_mask(&self, rng: &mut impl Rng) -> Mask {
        let mut mask = Mask::of([self.position]);
        for (component, chance) in [
            (self.velocity, 0.8),
            (self.health, 0.5),
            (self.mass, 0.3),
            (self.alive, 0.5),
            (self.label, 0.1),
        ] {
            if rng.gen_bool(chance) {
                mask.insert(component.index());
            }
        }
        mask
    }
}

/// A world filled with `count` entities spread over random archetypes, reproducible by `seed`.
pub fn populated(count: usize, seed: u64) -> (World, Components, Vec<entity::Id>) {
    let mut world = World::new();
    let components = Components::register(&mut world);
    let mut rng = ChaCha8Rng::seed_from_u64(seed);

    let mut entities = Vec::with_capacity(count);
    for _ in 0..count {
        let mask = components.random_mask(&mut rng);
        let position = [rng.gen_range(-100.0..100.0), rng.gen_range(-100.0..100.0)];
        let mut entity = world.spawn(&mask).expect("components are registered");
        entity
            .set_f32x2(components.position, position)
            .expect("position is always present");
        entities.push(entity.id());
    }

    (world, components, entities)
}
