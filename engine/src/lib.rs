//! An in-memory archetype ECS world with a conflict-aware parallel scheduler.
//!
//! Entities are grouped into archetypes by their exact component set. Each archetype stores
//! one typed column per component, so systems iterate dense slices. Systems declare the
//! components they read and write, and a [`Schedule`](ecs::Schedule) runs every system whose
//! dependencies completed as long as it does not conflict with one already running.
//!
//! ```rust,ignore
//! use rusty_world::core::tasks::Executor;
//! use rusty_world::ecs::{ColumnKind, Context, Mask, Schedule, World};
//!
//! let mut world = World::new();
//! let position = world.register_component(ColumnKind::F32x2);
//! let velocity = world.register_component(ColumnKind::F32x2);
//! world
//!     .spawn(&Mask::of([position, velocity]))?
//!     .set_f32x2(velocity, [1.0, 0.5])?;
//!
//! let mut schedule = Schedule::new();
//! schedule
//!     .configure(move |ctx: &Context| -> rusty_world::ecs::Result<()> {
//!         for archetype in ctx.archetypes() {
//!             let velocities = archetype.column(velocity)?;
//!             let mut positions = archetype.column_mut(position)?;
//!             for (p, v) in positions.f32x2s_mut()?.iter_mut().zip(velocities.f32x2s()?) {
//!                 p[0] += v[0];
//!                 p[1] += v[1];
//!             }
//!         }
//!         Ok(())
//!     })
//!     .reads([velocity])
//!     .writes([position])
//!     .apply()?;
//!
//! schedule.run(&world, &Executor::new(4))?;
//! ```

pub mod core;
pub mod ecs;
