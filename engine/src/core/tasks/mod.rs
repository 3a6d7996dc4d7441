//! Work submission for parallel schedules.

mod executor;

pub use executor::{Executor, ExecutorHandle};

/// A unit of work handed to a [`TaskPool`].
pub type Task = Box<dyn FnOnce() + Send + 'static>;

/// Anything that can run tasks, usually on other threads.
///
/// A pool must eventually either run or drop every task it accepts. Schedules wait for each
/// submitted task to finish or be dropped before returning.
pub trait TaskPool {
    fn submit(&self, task: Task);
}

impl<P: TaskPool + ?Sized> TaskPool for &P {
    #[inline]
    fn submit(&self, task: Task) {
        (**self).submit(task)
    }
}

/// Runs every task immediately on the submitting thread.
#[derive(Debug, Clone, Copy, Default)]
pub struct Inline;

impl TaskPool for Inline {
    #[inline]
    fn submit(&self, task: Task) {
        task()
    }
}
