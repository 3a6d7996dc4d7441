//! Error types shared by the world and the schedulers.

use std::fmt;

use thiserror::Error;

use crate::ecs::{archetype, column::ColumnKind, component, entity, schedule::SystemId};

/// Result alias used throughout the crate.
pub type Result<T, E = Error> = std::result::Result<T, E>;

/// Everything that can go wrong when talking to a [`World`](crate::ecs::World) or a schedule.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Error {
    /// The entity id is out of range or refers to a removed slot.
    #[error("entity {0} is not alive")]
    InvalidEntity(entity::Id),

    /// The component id was never registered.
    #[error("component {0} is not registered")]
    InvalidComponent(component::Id),

    /// The archetype id does not exist in this world.
    #[error("archetype {0} does not exist")]
    InvalidArchetype(archetype::Id),

    /// The system id does not belong to this schedule.
    #[error("system {0} is not registered in this schedule")]
    InvalidSystem(SystemId),

    /// The archetype does not store the requested component.
    #[error("component {component} is not stored in archetype {archetype}")]
    MissingColumn {
        archetype: archetype::Id,
        component: component::Id,
    },

    /// The row is outside the populated part of a column.
    #[error("row {row} is outside the {len} populated rows")]
    InvalidRow { row: usize, len: usize },

    /// Explicit dependencies form one or more cycles. Every offending group is listed.
    #[error("dependency cycle between systems {}", Cycles(.cycles))]
    ConfigurationCycle { cycles: Vec<Vec<SystemId>> },

    /// A column was accessed as a kind other than the one it was registered with.
    #[error("component {component} is stored as {found}, not {expected}")]
    StorageKindMismatch {
        component: component::Id,
        expected: ColumnKind,
        found: ColumnKind,
    },

    /// An object column holds a value of a different Rust type.
    #[error("object in component {component} is not a {expected}")]
    ObjectTypeMismatch {
        component: component::Id,
        expected: &'static str,
    },

    /// A column is already borrowed in a conflicting way, usually because a system touches
    /// a component it did not declare.
    #[error("component {component} in archetype {archetype} is already borrowed")]
    ColumnBorrowed {
        archetype: archetype::Id,
        component: component::Id,
    },
}

/// Formats cycle groups as `[#0, #1]; [#3, #4]`.
struct Cycles<'a>(&'a [Vec<SystemId>]);

impl fmt::Display for Cycles<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, cycle) in self.0.iter().enumerate() {
            if i > 0 {
                f.write_str("; ")?;
            }
            f.write_str("[")?;
            for (j, system) in cycle.iter().enumerate() {
                if j > 0 {
                    f.write_str(", ")?;
                }
                write!(f, "{system}")?;
            }
            f.write_str("]")?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cycle_message_lists_every_group() {
        // Given
        let error = Error::ConfigurationCycle {
            cycles: vec![
                vec![SystemId::new(0), SystemId::new(1)],
                vec![SystemId::new(3), SystemId::new(4), SystemId::new(5)],
            ],
        };

        // Then
        assert_eq!(
            error.to_string(),
            "dependency cycle between systems [#0, #1]; [#3, #4, #5]"
        );
    }
}
