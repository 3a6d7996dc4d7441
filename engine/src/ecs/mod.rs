pub mod archetype;
pub mod bits;
pub mod column;
pub mod component;
pub mod config;
pub mod entity;
pub mod error;
pub mod query;
pub mod schedule;
pub mod world;

pub use archetype::Archetype;
pub use bits::Mask;
pub use column::{ColumnKind, ColumnMut, ColumnRef};
pub use config::Config;
pub use error::{Error, Result};
pub use query::Query;
pub use schedule::{
    BoxError, Context, FailureSink, LogSink, Schedule, Sequential, SystemFailure, SystemId,
};
pub use world::{EntityMut, EntityRef, Matches, World};
