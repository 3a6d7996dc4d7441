//! Dependency- and conflict-aware system scheduling.
//!
//! Systems declare the components they read and write plus explicit ordering edges. A run
//! starts every system whose dependencies completed, as long as it does not conflict with a
//! system already running:
//!
//! - a system writing `C` never runs next to another system reading or writing `C`,
//! - systems that only read `C` may run together.
//!
//! The coordinating thread owns all scheduling state. Workers only run system bodies and
//! report back over a channel, so no scheduling state is shared between threads.
//!
//! [`Schedule`] runs systems in parallel on a [`TaskPool`] with shared access to the world.
//! [`Sequential`] runs them one after another with exclusive access, so they may change the
//! structure of the world.

mod graph;
mod sequential;
mod system;

use std::panic::{AssertUnwindSafe, catch_unwind};

use crossbeam::channel::{Receiver, Sender, unbounded};

pub use graph::{Dependencies, DependencyGraph, strongly_connected_components};
pub use sequential::Sequential;
pub use system::{
    Access, BoxError, Context, ExclusiveSystem, FailureSink, IntoOutcome, LogSink, Registrar,
    System, SystemConfig, SystemFailure, SystemId,
};

use crate::{
    core::tasks::{Task, TaskPool},
    ecs::{bits::Mask, error::Result, query::Query, world::World},
};

/// A registered parallel system.
struct Slot {
    access: Access,
    query: Query,

    /// `None` while the body is out on a worker.
    body: Option<Box<dyn System>>,
}

/// Runs systems in parallel, honoring declared dependencies and component conflicts.
///
/// ```rust,ignore
/// let mut schedule = Schedule::new();
/// let spawn = schedule.configure(spawner).writes([position]).apply()?;
/// schedule.configure(render).reads([position]).after([spawn]).apply()?;
///
/// let executor = Executor::new(4);
/// schedule.run(&world, &executor)?;
/// ```
pub struct Schedule {
    systems: Vec<Slot>,
    dependencies: Dependencies,
    state: RunState,
    sink: Box<dyn FailureSink>,
}

impl Default for Schedule {
    fn default() -> Self {
        Self::new()
    }
}

impl Schedule {
    /// Create an empty schedule logging failures through [`LogSink`].
    pub fn new() -> Self {
        Self::with_sink(LogSink)
    }

    /// Create an empty schedule reporting failures to `sink`.
    pub fn with_sink(sink: impl FailureSink + 'static) -> Self {
        Self {
            systems: Vec::new(),
            dependencies: Dependencies::default(),
            state: RunState::default(),
            sink: Box::new(sink),
        }
    }

    /// Replace the failure sink.
    pub fn set_sink(&mut self, sink: impl FailureSink + 'static) {
        self.sink = Box::new(sink);
    }

    /// Start describing a new system.
    pub fn configure(&mut self, body: impl System + 'static) -> SystemConfig<'_, Self> {
        SystemConfig::new(self, Box::new(body))
    }

    /// The declared access of a system.
    pub fn access(&self, system: SystemId) -> Option<&Access> {
        self.systems.get(system.index()).map(|slot| &slot.access)
    }

    /// Add an ordering edge between two registered systems.
    pub fn add_dependency(&mut self, system: SystemId, after: SystemId) -> Result<()> {
        self.dependencies.add_edge(system, after)
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.systems.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.systems.is_empty()
    }

    /// Run every system once.
    ///
    /// Fails with `ConfigurationCycle` before running anything when explicit dependencies
    /// form a cycle. System failures go to the failure sink and do not fail the run; the
    /// failed system still counts as completed for its dependents.
    ///
    /// Blocks until every submitted system finished, so `pool` must eventually run or drop
    /// each task it accepts.
    pub fn run<P: TaskPool + ?Sized>(&mut self, world: &World, pool: &P) -> Result<()> {
        let Self {
            systems,
            dependencies,
            state,
            sink,
        } = self;
        let graph = dependencies.graph()?;
        state.reset(graph.dependency_counts());

        let (sender, receiver) = unbounded();
        let mut in_flight = InFlight::new(&receiver, systems);

        while state.completed_count < in_flight.systems.len() {
            let mut next = state.ready.next_set_bit(0);
            while let Some(index) = next {
                next = state.ready.next_set_bit(index + 1);

                let slot = &mut in_flight.systems[index];
                if !slot
                    .access
                    .admits(&state.running_writes, &state.running_reads_and_writes)
                {
                    continue;
                }

                state.start(index, &slot.access);
                let system = SystemId::from(index);
                log::trace!("starting system {system}");
                submit(
                    pool,
                    Job {
                        system,
                        body: slot.body.take(),
                        world,
                        query: slot.query.clone(),
                        outcome: None,
                        completions: sender.clone(),
                    },
                );
                in_flight.outstanding += 1;
            }

            let Some(completion) = in_flight.wait() else {
                // Acyclic graphs always leave a runnable system while work remains.
                unreachable!("no running system while systems remain");
            };
            complete(&mut *in_flight.systems, state, graph, &**sink, completion);
            while let Some(completion) = in_flight.try_next() {
                complete(&mut *in_flight.systems, state, graph, &**sink, completion);
            }
        }

        Ok(())
    }
}

impl Registrar for Schedule {
    type Body = Box<dyn System>;

    fn register(&mut self, body: Self::Body, access: Access) -> Result<SystemId> {
        let id = self.dependencies.add(access.after(), access.before())?;
        debug_assert_eq!(id.index(), self.systems.len());
        self.systems.push(Slot {
            query: access.query(),
            access,
            body: Some(body),
        });
        Ok(id)
    }
}

impl std::fmt::Debug for Schedule {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Schedule")
            .field(
                "systems",
                &self.systems.iter().map(|s| &s.access).collect::<Vec<_>>(),
            )
            .field("dependencies", &self.dependencies)
            .finish_non_exhaustive()
    }
}

/// Per-run bookkeeping, kept between runs to reuse its allocations.
#[derive(Debug, Default)]
struct RunState {
    /// Systems whose dependencies all completed and that have not started.
    ready: Mask,
    running: Mask,
    completed: Mask,
    completed_count: usize,

    /// Dependencies still to complete, per system.
    remaining: Vec<usize>,

    /// Union of the running systems' writes.
    running_writes: Mask,

    /// Union of the running systems' reads and writes.
    running_reads_and_writes: Mask,
}

impl RunState {
    fn reset(&mut self, dependency_counts: &[usize]) {
        self.ready.clear();
        self.running.clear();
        self.completed.clear();
        self.completed_count = 0;
        self.running_writes.clear();
        self.running_reads_and_writes.clear();

        self.remaining.clear();
        self.remaining.extend_from_slice(dependency_counts);
        for (index, &count) in dependency_counts.iter().enumerate() {
            if count == 0 {
                self.ready.insert(index);
            }
        }
    }

    fn start(&mut self, index: usize, access: &Access) {
        self.ready.remove(index);
        self.running.insert(index);
        self.running_writes.union_with(access.writes());
        self.running_reads_and_writes
            .union_with(access.reads_and_writes());
    }

    fn finish(&mut self, index: usize, systems: &[Slot], dependents: &[usize]) {
        self.running.remove(index);
        self.completed.insert(index);
        self.completed_count += 1;

        self.running_writes.clear();
        self.running_reads_and_writes.clear();
        for running in self.running.ones() {
            let access = &systems[running].access;
            self.running_writes.union_with(access.writes());
            self.running_reads_and_writes
                .union_with(access.reads_and_writes());
        }

        for &dependent in dependents {
            self.remaining[dependent] -= 1;
            if self.remaining[dependent] == 0 {
                self.ready.insert(dependent);
            }
        }
    }
}

fn complete(
    systems: &mut [Slot],
    state: &mut RunState,
    graph: &DependencyGraph,
    sink: &dyn FailureSink,
    completion: Completion,
) {
    let index = completion.system.index();
    let slot = &mut systems[index];
    slot.body = completion.body;

    match completion.outcome {
        Ok(()) => log::trace!("system {} completed", completion.system),
        Err(message) => sink.report(SystemFailure {
            system: completion.system,
            name: slot.access.name().map(str::to_owned),
            message,
        }),
    }

    state.finish(index, systems, graph.dependents(index));
}

/// What a finished job sends back to the coordinator.
struct Completion {
    system: SystemId,
    body: Option<Box<dyn System>>,
    outcome: std::result::Result<(), String>,
}

/// One system run handed to the pool.
///
/// Reports a [`Completion`] when dropped, whether the body ran, failed, panicked, or the pool
/// discarded the task without running it.
struct Job<'w> {
    system: SystemId,
    body: Option<Box<dyn System>>,
    world: &'w World,
    query: Query,
    outcome: Option<std::result::Result<(), String>>,
    completions: Sender<Completion>,
}

impl Job<'_> {
    fn run(mut self) {
        let Some(body) = self.body.as_mut() else {
            self.outcome = Some(Err("system body is unavailable".to_string()));
            return;
        };

        let context = Context::new(self.system, self.world.matches(&self.query));
        let outcome = catch_unwind(AssertUnwindSafe(|| body.run(&context)));
        self.outcome = Some(match outcome {
            Ok(Ok(())) => Ok(()),
            Ok(Err(error)) => Err(error.to_string()),
            Err(payload) => Err(system::panic_message(&*payload)),
        });
    }
}

impl Drop for Job<'_> {
    fn drop(&mut self) {
        let outcome = self
            .outcome
            .take()
            .unwrap_or_else(|| Err("task was dropped before running".to_string()));
        // The coordinator holds the receiver until every job reported.
        let _ = self.completions.send(Completion {
            system: self.system,
            body: self.body.take(),
            outcome,
        });
    }
}

fn submit<P: TaskPool + ?Sized>(pool: &P, job: Job<'_>) {
    let task: Box<dyn FnOnce() + Send + '_> = Box::new(move || job.run());

    // SAFETY: The only borrow captured by the task is the job's `&World`. `Schedule::run`
    // keeps that borrow alive until the job's completion arrives (see `InFlight`), and a job
    // sends its completion from `Drop`, after its last use of the world.
    let task: Task = unsafe {
        std::mem::transmute::<Box<dyn FnOnce() + Send + '_>, Box<dyn FnOnce() + Send + 'static>>(
            task,
        )
    };
    pool.submit(task);
}

/// Tracks submitted jobs and waits for all of them when dropped, so no job outlives the world
/// borrow of `Schedule::run`, even when the coordinator unwinds.
///
/// Owns the schedule's slots for the run. Bodies carried by completions drained on drop go
/// back to their slots.
struct InFlight<'r, 's> {
    receiver: &'r Receiver<Completion>,
    systems: &'s mut [Slot],
    outstanding: usize,
}

impl<'r, 's> InFlight<'r, 's> {
    fn new(receiver: &'r Receiver<Completion>, systems: &'s mut [Slot]) -> Self {
        Self {
            receiver,
            systems,
            outstanding: 0,
        }
    }

    /// Block for the next completion, `None` when nothing is outstanding.
    fn wait(&mut self) -> Option<Completion> {
        if self.outstanding == 0 {
            return None;
        }
        let completion = self.receiver.recv().ok()?;
        self.outstanding -= 1;
        Some(completion)
    }

    fn try_next(&mut self) -> Option<Completion> {
        if self.outstanding == 0 {
            return None;
        }
        let completion = self.receiver.try_recv().ok()?;
        self.outstanding -= 1;
        Some(completion)
    }
}

impl Drop for InFlight<'_, '_> {
    fn drop(&mut self) {
        while self.outstanding > 0 {
            let Ok(completion) = self.receiver.recv() else {
                break;
            };
            self.outstanding -= 1;
            self.systems[completion.system.index()].body = completion.body;
        }
    }
}

#[cfg(test)]
mod tests {
    use std::{
        sync::{Arc, Mutex},
        thread,
        time::{Duration, Instant},
    };

    use super::*;
    use crate::{
        core::tasks::{Executor, Inline},
        ecs::{Error, column::ColumnKind},
    };

    type Log = Arc<Mutex<Vec<&'static str>>>;

    fn recorder(log: Log, name: &'static str) -> impl System + 'static {
        move |_: &Context<'_>| log.lock().unwrap().push(name)
    }

    fn position(log: &Log, name: &str) -> usize {
        log.lock()
            .unwrap()
            .iter()
            .position(|n| *n == name)
            .unwrap()
    }

    #[test]
    fn conflicting_writers_never_overlap() {
        // Given
        let mut world = World::new();
        let c = world.register_component(ColumnKind::I32);
        let executor = Executor::new(4);
        let starts = Arc::new(Mutex::new(Vec::new()));
        let mut schedule = Schedule::new();
        for _ in 0..2 {
            let starts = Arc::clone(&starts);
            schedule
                .configure(move |_: &Context<'_>| {
                    starts.lock().unwrap().push(Instant::now());
                    thread::sleep(Duration::from_millis(100));
                })
                .writes([c])
                .apply()
                .unwrap();
        }

        // When
        schedule.run(&world, &executor).unwrap();

        // Then
        let starts = starts.lock().unwrap();
        assert_eq!(starts.len(), 2);
        let gap = if starts[0] > starts[1] {
            starts[0] - starts[1]
        } else {
            starts[1] - starts[0]
        };
        assert!(gap >= Duration::from_millis(90), "writers overlapped: {gap:?}");
    }

    #[test]
    fn disjoint_systems_run_in_parallel() {
        // Given
        let mut world = World::new();
        let ids: Vec<_> = (0..3)
            .map(|_| world.register_component(ColumnKind::F32))
            .collect();
        let executor = Executor::new(4);
        let mut schedule = Schedule::new();
        for &c in &ids {
            schedule
                .configure(|_: &Context<'_>| thread::sleep(Duration::from_millis(50)))
                .writes([c])
                .apply()
                .unwrap();
        }

        // When
        let started = Instant::now();
        schedule.run(&world, &executor).unwrap();

        // Then
        assert!(started.elapsed() < Duration::from_millis(150));
    }

    #[test]
    fn shared_readers_run_together() {
        // Given
        let mut world = World::new();
        let c = world.register_component(ColumnKind::I64);
        let executor = Executor::new(2);
        let mut schedule = Schedule::new();
        for _ in 0..2 {
            schedule
                .configure(|_: &Context<'_>| thread::sleep(Duration::from_millis(80)))
                .reads([c])
                .apply()
                .unwrap();
        }

        // When
        let started = Instant::now();
        schedule.run(&world, &executor).unwrap();

        // Then
        assert!(started.elapsed() < Duration::from_millis(160));
    }

    #[test]
    fn dependencies_order_execution() {
        // Given
        let world = World::new();
        let log = Log::default();
        let mut schedule = Schedule::new();
        let a = schedule.configure(recorder(log.clone(), "a")).apply().unwrap();
        let c = schedule.configure(recorder(log.clone(), "c")).apply().unwrap();
        schedule
            .configure(recorder(log.clone(), "b"))
            .after([a])
            .before([c])
            .apply()
            .unwrap();

        // When
        schedule.run(&world, &Executor::new(3)).unwrap();

        // Then
        assert!(position(&log, "a") < position(&log, "b"));
        assert!(position(&log, "b") < position(&log, "c"));
    }

    #[test]
    fn cycles_fail_before_anything_runs() {
        // Given
        let world = World::new();
        let log = Log::default();
        let mut schedule = Schedule::new();
        let a = schedule.configure(recorder(log.clone(), "a")).apply().unwrap();
        let b = schedule
            .configure(recorder(log.clone(), "b"))
            .after([a])
            .apply()
            .unwrap();
        let c = schedule
            .configure(recorder(log.clone(), "c"))
            .after([b])
            .apply()
            .unwrap();
        let d = schedule
            .configure(recorder(log.clone(), "d"))
            .after([c])
            .before([a])
            .apply()
            .unwrap();

        // When
        let result = schedule.run(&world, &Inline);

        // Then
        assert_eq!(
            result,
            Err(Error::ConfigurationCycle {
                cycles: vec![vec![a, b, c, d]]
            })
        );
        assert!(log.lock().unwrap().is_empty());
    }

    #[test]
    fn failures_are_reported_and_unblock_dependents() {
        // Given
        let world = World::new();
        let log = Log::default();
        let (sender, receiver) = crossbeam::channel::unbounded();
        let mut schedule = Schedule::with_sink(sender);
        let failing = schedule
            .configure(|_: &Context<'_>| -> std::result::Result<(), BoxError> {
                Err("boom".into())
            })
            .named("failing")
            .apply()
            .unwrap();
        let panicking = schedule
            .configure(|_: &Context<'_>| -> std::result::Result<(), BoxError> {
                panic!("kaboom")
            })
            .apply()
            .unwrap();
        schedule
            .configure(recorder(log.clone(), "after"))
            .after([failing, panicking])
            .apply()
            .unwrap();

        // When
        schedule.run(&world, &Executor::new(2)).unwrap();

        // Then
        let mut failures: Vec<_> = receiver.try_iter().collect();
        failures.sort_by_key(|f| f.system);
        assert_eq!(
            failures,
            vec![
                SystemFailure {
                    system: failing,
                    name: Some("failing".into()),
                    message: "boom".into(),
                },
                SystemFailure {
                    system: panicking,
                    name: None,
                    message: "panicked: kaboom".into(),
                },
            ]
        );
        assert_eq!(*log.lock().unwrap(), vec!["after"]);
    }

    #[test]
    fn systems_read_and_write_matching_archetypes() {
        // Given
        let mut world = World::new();
        let a = world.register_component(ColumnKind::I32);
        let b = world.register_component(ColumnKind::I64);
        let entity = world
            .spawn(&Mask::of([a, b]))
            .unwrap()
            .set_i32(a, 10)
            .unwrap()
            .set_i64(b, 20)
            .unwrap()
            .id();
        type Seen = (usize, Vec<crate::ecs::entity::Id>, Vec<(i32, i64)>);
        let seen: Arc<Mutex<Vec<Seen>>> = Arc::default();

        let mut schedule = Schedule::new();
        let observed = Arc::clone(&seen);
        schedule
            .configure(move |ctx: &Context<'_>| -> Result<()> {
                let mut entities = Vec::new();
                let mut values = Vec::new();
                for archetype in ctx.archetypes() {
                    let mut ints = archetype.column_mut(a)?;
                    let longs = archetype.column(b)?;
                    entities.extend_from_slice(archetype.entities());
                    for (x, y) in ints.i32s_mut()?.iter_mut().zip(longs.i64s()?) {
                        values.push((*x, *y));
                    }
                }
                observed
                    .lock()
                    .unwrap()
                    .push((ctx.matches().len(), entities, values));
                Ok(())
            })
            .reads([b])
            .writes([a])
            .apply()
            .unwrap();
        let executor = Executor::new(2);

        // When
        schedule.run(&world, &executor).unwrap();
        schedule.run(&world, &executor).unwrap();

        // Then
        assert_eq!(
            *seen.lock().unwrap(),
            vec![
                (1, vec![entity], vec![(10, 20)]),
                (1, vec![entity], vec![(10, 20)]),
            ]
        );
        assert_eq!(world.entity(entity).unwrap().get_i32(a), Ok(10));

        // When
        world.remove_entity(entity).unwrap();
        seen.lock().unwrap().clear();
        schedule.run(&world, &executor).unwrap();

        // Then
        let seen = seen.lock().unwrap();
        assert_eq!(seen.len(), 1);
        assert!(seen[0].1.is_empty());
        assert!(seen[0].2.is_empty());
    }

    #[test]
    fn undeclared_access_is_rejected_not_raced() {
        // Given
        let mut world = World::new();
        let c = world.register_component(ColumnKind::I32);
        world.spawn(&Mask::of([c])).unwrap();
        let (sender, receiver) = crossbeam::channel::unbounded();
        let mut schedule = Schedule::with_sink(sender);
        let (hold, release) = crossbeam::channel::bounded::<()>(0);
        schedule
            .configure(move |ctx: &Context<'_>| -> Result<()> {
                let archetype = ctx.world().archetypes().last().unwrap();
                let _column = archetype.column_mut(c)?;
                let _ = release.recv_timeout(Duration::from_millis(200));
                Ok(())
            })
            .writes([c])
            .apply()
            .unwrap();
        schedule
            .configure(move |ctx: &Context<'_>| -> Result<()> {
                // Reads `c` without declaring it.
                thread::sleep(Duration::from_millis(50));
                let archetype = ctx.world().archetypes().last().unwrap();
                let result = archetype.column(c).map(|_| ());
                let _ = hold.send(());
                result
            })
            .apply()
            .unwrap();

        // When
        schedule.run(&world, &Executor::new(2)).unwrap();

        // Then
        let failures: Vec<_> = receiver.try_iter().collect();
        assert_eq!(failures.len(), 1);
        assert!(failures[0].message.contains("already borrowed"));
    }

    #[test]
    fn adding_systems_rebuilds_the_graph() {
        // Given
        let world = World::new();
        let log = Log::default();
        let mut schedule = Schedule::new();
        let first = schedule.configure(recorder(log.clone(), "first")).apply().unwrap();
        schedule.run(&world, &Inline).unwrap();

        // When
        schedule
            .configure(recorder(log.clone(), "second"))
            .after([first])
            .apply()
            .unwrap();
        schedule.run(&world, &Inline).unwrap();

        // Then
        assert_eq!(*log.lock().unwrap(), vec!["first", "first", "second"]);
        assert_eq!(schedule.len(), 2);
    }

    #[test]
    fn unknown_dependencies_are_rejected() {
        // Given
        let log = Log::default();
        let mut schedule = Schedule::new();

        // When
        let result = schedule
            .configure(recorder(log.clone(), "orphan"))
            .after([SystemId::new(3)])
            .apply();

        // Then
        assert_eq!(result, Err(Error::InvalidSystem(SystemId::new(3))));
        assert!(schedule.is_empty());
    }

    #[test]
    fn empty_schedule_runs() {
        // Then
        assert_eq!(Schedule::new().run(&World::new(), &Inline), Ok(()));
    }

    #[test]
    fn dropped_tasks_still_complete() {
        // Given
        struct Discard;
        impl TaskPool for Discard {
            fn submit(&self, task: Task) {
                drop(task);
            }
        }
        let world = World::new();
        let (sender, receiver) = crossbeam::channel::unbounded();
        let mut schedule = Schedule::with_sink(sender);
        let log = Log::default();
        schedule.configure(recorder(log.clone(), "lost")).apply().unwrap();

        // When
        schedule.run(&world, &Discard).unwrap();

        // Then
        assert!(log.lock().unwrap().is_empty());
        assert_eq!(receiver.try_iter().count(), 1);

        // When
        schedule.run(&world, &Inline).unwrap();

        // Then
        assert_eq!(*log.lock().unwrap(), vec!["lost"]);
    }

    #[test]
    fn explicit_queries_select_archetypes() {
        // Given
        let mut world = World::new();
        let a = world.register_component(ColumnKind::Bit);
        let frozen = world.register_component(ColumnKind::Bit);
        world.spawn(&Mask::of([a])).unwrap();
        world.spawn(&Mask::of([a, frozen])).unwrap();
        world.spawn(&Mask::of([a])).unwrap();
        let counted = Arc::new(Mutex::new(0));
        let mut schedule = Schedule::new();
        let sink = Arc::clone(&counted);
        schedule
            .configure(move |ctx: &Context<'_>| {
                *sink.lock().unwrap() += ctx.matches().entity_count();
            })
            .reads([a])
            .query(Query::builder().uses([a]).excludes([frozen]).build())
            .apply()
            .unwrap();

        // When
        schedule.run(&world, &Inline).unwrap();

        // Then
        assert_eq!(*counted.lock().unwrap(), 2);
    }

    #[test]
    fn dependencies_can_be_added_after_registration() {
        // Given
        let mut world = World::new();
        let c = world.register_component(ColumnKind::F64);
        let log = Log::default();
        let mut schedule = Schedule::new();
        let late = schedule
            .configure(recorder(log.clone(), "late"))
            .named("late")
            .writes([c])
            .apply()
            .unwrap();
        let early = schedule.configure(recorder(log.clone(), "early")).apply().unwrap();

        // When
        schedule.add_dependency(late, early).unwrap();
        schedule.run(&world, &Inline).unwrap();

        // Then
        assert_eq!(*log.lock().unwrap(), vec!["early", "late"]);
        let access = schedule.access(late).unwrap();
        assert_eq!(access.name(), Some("late"));
        assert!(access.writes().contains(c.index()));
        assert!(access.reads_and_writes().contains(c.index()));
        assert!(schedule.access(SystemId::new(5)).is_none());
        assert_eq!(
            schedule.add_dependency(early, SystemId::new(5)),
            Err(Error::InvalidSystem(SystemId::new(5)))
        );
    }

    #[test]
    fn panicking_sink_keeps_system_bodies() {
        // Given
        struct Explode;
        impl FailureSink for Explode {
            fn report(&self, failure: SystemFailure) {
                panic!("cannot report {failure}");
            }
        }
        let world = World::new();
        let log = Log::default();
        let executor = Executor::new(2);
        let mut schedule = Schedule::with_sink(Explode);
        schedule
            .configure(|_: &Context<'_>| -> std::result::Result<(), BoxError> {
                Err("boom".into())
            })
            .apply()
            .unwrap();
        let slow = Arc::clone(&log);
        schedule
            .configure(move |_: &Context<'_>| {
                thread::sleep(Duration::from_millis(50));
                slow.lock().unwrap().push("slow");
            })
            .apply()
            .unwrap();
        let unwound = std::panic::catch_unwind(AssertUnwindSafe(|| {
            schedule.run(&world, &executor)
        }));
        assert!(unwound.is_err());

        // When
        let (sender, receiver) = crossbeam::channel::unbounded();
        schedule.set_sink(sender);
        schedule.run(&world, &executor).unwrap();

        // Then
        let messages: Vec<_> = receiver.try_iter().map(|f| f.message).collect();
        assert_eq!(messages, vec!["boom".to_string()]);
        assert_eq!(*log.lock().unwrap(), vec!["slow", "slow"]);
    }

    #[allow(dead_code)]
    fn assert_send<T: Send>() {}

    #[allow(dead_code)]
    fn schedules_are_send() {
        assert_send::<Schedule>();
        assert_send::<Job<'static>>();
    }
}
