use std::{any::Any, fmt};

use thiserror::Error;

use crate::ecs::{
    archetype::{self, Archetype},
    bits::Mask,
    component,
    error::Result,
    query::Query,
    world::{Matches, World},
};

/// Identifies a system within the schedule it was registered with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct SystemId(u32);

impl SystemId {
    #[inline]
    pub const fn new(index: u32) -> Self {
        Self(index)
    }

    #[inline]
    pub const fn index(&self) -> usize {
        self.0 as usize
    }
}

impl From<usize> for SystemId {
    #[inline]
    fn from(index: usize) -> Self {
        Self(index as u32)
    }
}

impl fmt::Display for SystemId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Error type a system body may return.
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Converts what a system body returns into a success or a failure.
pub trait IntoOutcome {
    fn into_outcome(self) -> std::result::Result<(), BoxError>;
}

impl IntoOutcome for () {
    #[inline]
    fn into_outcome(self) -> std::result::Result<(), BoxError> {
        Ok(())
    }
}

impl<E: Into<BoxError>> IntoOutcome for std::result::Result<(), E> {
    #[inline]
    fn into_outcome(self) -> std::result::Result<(), BoxError> {
        self.map_err(Into::into)
    }
}

/// A system run by the parallel [`Schedule`](super::Schedule).
///
/// Implemented for any `FnMut(&Context) -> R` closure where `R` is `()` or
/// `Result<(), E>`. The body only sees the world through a shared reference and reaches column
/// data through the borrow-checked column accessors.
pub trait System: Send {
    fn run(&mut self, context: &Context<'_>) -> std::result::Result<(), BoxError>;
}

impl<F, R> System for F
where
    F: FnMut(&Context<'_>) -> R + Send,
    R: IntoOutcome,
{
    #[inline]
    fn run(&mut self, context: &Context<'_>) -> std::result::Result<(), BoxError> {
        self(context).into_outcome()
    }
}

/// A system run by the [`Sequential`](super::Sequential) schedule, with exclusive access to the
/// world. It receives the archetypes matching its query at the moment it starts.
pub trait ExclusiveSystem {
    fn run(
        &mut self,
        world: &mut World,
        archetypes: &[archetype::Id],
    ) -> std::result::Result<(), BoxError>;
}

impl<F, R> ExclusiveSystem for F
where
    F: FnMut(&mut World, &[archetype::Id]) -> R,
    R: IntoOutcome,
{
    #[inline]
    fn run(
        &mut self,
        world: &mut World,
        archetypes: &[archetype::Id],
    ) -> std::result::Result<(), BoxError> {
        self(world, archetypes).into_outcome()
    }
}

/// What a running parallel system can see.
pub struct Context<'w> {
    system: SystemId,
    matches: Matches<'w>,
}

impl<'w> Context<'w> {
    pub(crate) fn new(system: SystemId, matches: Matches<'w>) -> Self {
        Self { system, matches }
    }

    /// The id of the running system.
    #[inline]
    pub fn system(&self) -> SystemId {
        self.system
    }

    #[inline]
    pub fn world(&self) -> &'w World {
        self.matches.world()
    }

    /// The archetypes matching the system's query.
    #[inline]
    pub fn matches(&self) -> &Matches<'w> {
        &self.matches
    }

    /// Shorthand for iterating the matching archetypes.
    #[inline]
    pub fn archetypes(&self) -> impl Iterator<Item = &'w Archetype> + '_ {
        self.matches.iter()
    }
}

impl fmt::Debug for Context<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Context")
            .field("system", &self.system)
            .field("archetypes", &self.matches.ids())
            .finish()
    }
}

/// Declared access and ordering of one system.
#[derive(Debug, Clone, Default)]
pub struct Access {
    name: Option<String>,
    writes: Mask,
    reads_and_writes: Mask,
    after: Vec<SystemId>,
    before: Vec<SystemId>,
    query: Option<Query>,
}

impl Access {
    #[inline]
    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    /// Components the system writes.
    #[inline]
    pub fn writes(&self) -> &Mask {
        &self.writes
    }

    /// Components the system reads or writes.
    #[inline]
    pub fn reads_and_writes(&self) -> &Mask {
        &self.reads_and_writes
    }

    #[inline]
    pub fn after(&self) -> &[SystemId] {
        &self.after
    }

    #[inline]
    pub fn before(&self) -> &[SystemId] {
        &self.before
    }

    /// The query selecting the system's archetypes: the explicit one, or every archetype that
    /// has all the components the system touches.
    pub fn query(&self) -> Query {
        match &self.query {
            Some(query) => query.clone(),
            None => Query::encode(&self.reads_and_writes, &Mask::new(), &Mask::new()),
        }
    }

    /// Whether a system with this access may start next to running systems whose combined
    /// accesses are `running_writes` and `running_reads_and_writes`.
    #[inline]
    pub fn admits(&self, running_writes: &Mask, running_reads_and_writes: &Mask) -> bool {
        self.writes.is_disjoint(running_reads_and_writes)
            && self.reads_and_writes.is_disjoint(running_writes)
    }
}

/// A schedule systems can be registered with through [`SystemConfig`].
pub trait Registrar {
    type Body;

    fn register(&mut self, body: Self::Body, access: Access) -> Result<SystemId>;
}

/// Builder describing a system before it is added to a schedule.
///
/// ```rust,ignore
/// let physics = schedule
///     .configure(|ctx: &Context| integrate(ctx))
///     .named("physics")
///     .reads([velocity])
///     .writes([position])
///     .apply()?;
/// ```
#[must_use = "systems are only registered once `apply` is called"]
pub struct SystemConfig<'s, S: Registrar> {
    schedule: &'s mut S,
    body: S::Body,
    access: Access,
}

impl<'s, S: Registrar> SystemConfig<'s, S> {
    pub(crate) fn new(schedule: &'s mut S, body: S::Body) -> Self {
        Self {
            schedule,
            body,
            access: Access::default(),
        }
    }

    /// Name used in failure reports and logs.
    pub fn named(mut self, name: impl Into<String>) -> Self {
        self.access.name = Some(name.into());
        self
    }

    /// Components the system reads.
    pub fn reads(mut self, components: impl IntoIterator<Item = component::Id>) -> Self {
        self.access
            .reads_and_writes
            .extend(components.into_iter().map(|c| c.index()));
        self
    }

    /// Components the system writes. Writing implies reading.
    pub fn writes(mut self, components: impl IntoIterator<Item = component::Id>) -> Self {
        for component in components {
            self.access.writes.insert(component.index());
            self.access.reads_and_writes.insert(component.index());
        }
        self
    }

    /// Run only after every one of `systems` completed.
    pub fn after(mut self, systems: impl IntoIterator<Item = SystemId>) -> Self {
        self.access.after.extend(systems);
        self
    }

    /// Run before every one of `systems` starts.
    pub fn before(mut self, systems: impl IntoIterator<Item = SystemId>) -> Self {
        self.access.before.extend(systems);
        self
    }

    /// Select archetypes with an explicit query instead of the declared components.
    pub fn query(mut self, query: Query) -> Self {
        self.access.query = Some(query);
        self
    }

    /// Register the system.
    ///
    /// Fails with `InvalidSystem` when an `after` or `before` id is not registered, in which
    /// case the schedule is left unchanged.
    pub fn apply(self) -> Result<SystemId> {
        self.schedule.register(self.body, self.access)
    }
}

/// A system that returned an error or panicked.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("system {system} failed: {message}")]
pub struct SystemFailure {
    pub system: SystemId,
    pub name: Option<String>,
    pub message: String,
}

/// Receives the failures of systems. A failure never stops the rest of a run.
pub trait FailureSink: Send {
    fn report(&self, failure: SystemFailure);
}

/// Logs failures at error level.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogSink;

impl FailureSink for LogSink {
    fn report(&self, failure: SystemFailure) {
        match &failure.name {
            Some(name) => log::error!("{failure} ({name})"),
            None => log::error!("{failure}"),
        }
    }
}

impl FailureSink for crossbeam::channel::Sender<SystemFailure> {
    fn report(&self, failure: SystemFailure) {
        // A dropped receiver means nobody is listening anymore.
        let _ = self.send(failure);
    }
}

/// Best effort text for a panic payload.
pub(crate) fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        format!("panicked: {message}")
    } else if let Some(message) = payload.downcast_ref::<String>() {
        format!("panicked: {message}")
    } else {
        "panicked".to_string()
    }
}
