use crate::ecs::{
    error::Result,
    query::Query,
    schedule::{
        Access, Dependencies, ExclusiveSystem, FailureSink, LogSink, Registrar, SystemConfig,
        SystemFailure, SystemId,
    },
    world::World,
};

struct Slot {
    access: Access,
    query: Query,
    body: Box<dyn ExclusiveSystem>,
}

/// Runs systems one at a time on the calling thread, each with exclusive access to the world.
///
/// Systems may spawn and remove entities or change their components. Declared reads and writes
/// only select the archetypes handed to the system; ordering comes from explicit dependencies,
/// with ties broken by registration order.
///
/// A system returning an error is reported to the failure sink and the run continues. Panics
/// are not caught.
pub struct Sequential {
    systems: Vec<Slot>,
    dependencies: Dependencies,
    sink: Box<dyn FailureSink>,
}

impl Default for Sequential {
    fn default() -> Self {
        Self::new()
    }
}

impl Sequential {
    pub fn new() -> Self {
        Self::with_sink(LogSink)
    }

    pub fn with_sink(sink: impl FailureSink + 'static) -> Self {
        Self {
            systems: Vec::new(),
            dependencies: Dependencies::default(),
            sink: Box::new(sink),
        }
    }

    /// Start describing a new system.
    pub fn configure(
        &mut self,
        body: impl ExclusiveSystem + 'static,
    ) -> SystemConfig<'_, Self> {
        SystemConfig::new(self, Box::new(body))
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.systems.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.systems.is_empty()
    }

    /// Run every system once in dependency order.
    ///
    /// Fails with `ConfigurationCycle` before running anything when explicit dependencies form
    /// a cycle.
    pub fn run(&mut self, world: &mut World) -> Result<()> {
        let Self {
            systems,
            dependencies,
            sink,
        } = self;

        for &index in dependencies.graph()?.order() {
            let slot = &mut systems[index];
            let system = SystemId::from(index);
            let archetypes = world.matching(&slot.query);

            log::trace!("running system {system} over {} archetypes", archetypes.len());
            if let Err(error) = slot.body.run(world, &archetypes) {
                sink.report(SystemFailure {
                    system,
                    name: slot.access.name().map(str::to_owned),
                    message: error.to_string(),
                });
            }
        }

        Ok(())
    }
}

impl Registrar for Sequential {
    type Body = Box<dyn ExclusiveSystem>;

    fn register(&mut self, body: Self::Body, access: Access) -> Result<SystemId> {
        let id = self.dependencies.add(access.after(), access.before())?;
        self.systems.push(Slot {
            query: access.query(),
            access,
            body,
        });
        Ok(id)
    }
}
