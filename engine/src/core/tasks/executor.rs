use std::{
    panic::{AssertUnwindSafe, catch_unwind},
    thread,
};

use crossbeam::channel::{Sender, unbounded};

use super::{Task, TaskPool};

/// A fixed-size pool of worker threads fed from one shared queue.
/// Tasks can be submitted from any thread and run in FIFO order, though completion order is
/// non-deterministic.
pub struct Executor {
    sender: Sender<Message>,
    workers: Vec<Worker>,
}

enum Message {
    Task(Task),
    Shutdown,
}

struct Worker {
    id: usize,
    handle: Option<thread::JoinHandle<()>>,
}

impl Executor {
    /// Creates a new executor with the specified number of worker threads.
    pub fn new(size: usize) -> Self {
        assert!(size > 0, "Thread pool size must be greater than 0");

        let (sender, receiver) = unbounded();
        let mut workers = Vec::with_capacity(size);

        for id in 0..size {
            workers.push(Worker::new(id, receiver.clone()));
        }

        Executor { sender, workers }
    }

    // Creates a single-threaded executor.
    pub fn single_threaded() -> Self {
        Self::new(1)
    }

    /// Executes a closure on the pool.
    pub fn execute<F>(&self, f: F)
    where
        F: FnOnce() + Send + 'static,
    {
        self.submit(Box::new(f));
    }

    /// Returns a handle that can be used to submit tasks from other threads.
    pub fn handle(&self) -> ExecutorHandle {
        ExecutorHandle {
            sender: self.sender.clone(),
        }
    }

    /// Returns the number of worker threads in the pool.
    pub fn size(&self) -> usize {
        self.workers.len()
    }
}

impl TaskPool for Executor {
    fn submit(&self, task: Task) {
        send(&self.sender, task);
    }
}

impl Drop for Executor {
    fn drop(&mut self) {
        // Queued tasks run before the shutdown messages are seen.
        for _ in &self.workers {
            let _ = self.sender.send(Message::Shutdown);
        }

        for worker in &mut self.workers {
            if let Some(handle) = worker.handle.take() {
                if handle.join().is_err() {
                    log::warn!("executor worker {} panicked", worker.id);
                }
            }
        }
    }
}

impl Worker {
    fn new(id: usize, receiver: crossbeam::channel::Receiver<Message>) -> Self {
        let handle = thread::Builder::new()
            .name(format!("executor-{id}"))
            .spawn(move || {
                loop {
                    match receiver.recv() {
                        Ok(Message::Task(task)) => {
                            if catch_unwind(AssertUnwindSafe(task)).is_err() {
                                log::warn!("executor worker {id}: task panicked");
                            }
                        }
                        Ok(Message::Shutdown) | Err(_) => break,
                    }
                }
            })
            .ok();
        if handle.is_none() {
            log::warn!("failed to spawn executor worker {id}");
        }

        Worker { id, handle }
    }
}

/// A handle to submit tasks to an executor from other threads.
/// Clone this handle to share it across threads.
#[derive(Clone)]
pub struct ExecutorHandle {
    sender: Sender<Message>,
}

impl ExecutorHandle {
    /// Executes a closure on the pool.
    pub fn execute<F>(&self, f: F)
    where
        F: FnOnce() + Send + 'static,
    {
        self.submit(Box::new(f));
    }
}

impl TaskPool for ExecutorHandle {
    fn submit(&self, task: Task) {
        send(&self.sender, task);
    }
}

/// Queue a task. Once every worker is gone the task is dropped without running.
fn send(sender: &Sender<Message>, task: Task) {
    if sender.send(Message::Task(task)).is_err() {
        log::warn!("executor is shut down, dropping task");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Arc, Mutex};
    use std::time::Duration;

    #[test]
    fn test_executor_executes_tasks() {
        let executor = Executor::new(4);
        let counter = Arc::new(Mutex::new(0));

        for _ in 0..10 {
            let counter = Arc::clone(&counter);
            executor.execute(move || {
                let mut num = counter.lock().unwrap();
                *num += 1;
            });
        }

        // Dropping waits for the queue to drain.
        drop(executor);

        assert_eq!(*counter.lock().unwrap(), 10);
    }

    #[test]
    fn test_executor_handle_from_multiple_threads() {
        let executor = Executor::new(2);
        let counter = Arc::new(Mutex::new(0));

        let threads: Vec<_> = (0..2)
            .map(|_| {
                let handle = executor.handle();
                let counter = Arc::clone(&counter);
                thread::spawn(move || {
                    for _ in 0..5 {
                        let counter = Arc::clone(&counter);
                        handle.submit(Box::new(move || {
                            *counter.lock().unwrap() += 1;
                        }));
                    }
                })
            })
            .collect();

        for t in threads {
            t.join().unwrap();
        }
        drop(executor);

        assert_eq!(*counter.lock().unwrap(), 10);
    }

    #[test]
    fn test_executor_graceful_shutdown() {
        let executor = Executor::new(2);
        let completed = Arc::new(Mutex::new(false));

        let completed_clone = Arc::clone(&completed);
        executor.execute(move || {
            thread::sleep(Duration::from_millis(50));
            *completed_clone.lock().unwrap() = true;
        });

        // Drop executor to trigger shutdown
        drop(executor);

        // Task should have completed before shutdown
        assert!(*completed.lock().unwrap());
    }

    #[test]
    fn test_handle_drops_tasks_after_shutdown() {
        let executor = Executor::single_threaded();
        let handle = executor.handle();
        drop(executor);

        let guard = Arc::new(());
        let held = Arc::clone(&guard);
        handle.execute(move || drop(held));

        // The task was dropped, releasing its capture.
        assert_eq!(Arc::strong_count(&guard), 1);
    }

    #[test]
    fn test_worker_survives_panicking_task() {
        let executor = Executor::single_threaded();
        let counter = Arc::new(Mutex::new(0));

        executor.execute(|| panic!("task failed"));
        let after = Arc::clone(&counter);
        executor.execute(move || *after.lock().unwrap() += 1);

        drop(executor);

        assert_eq!(*counter.lock().unwrap(), 1);
    }

    #[test]
    fn test_tasks_run_on_worker_threads() {
        let executor = Executor::new(3);
        let (sender, receiver) = crossbeam::channel::unbounded();

        for _ in 0..6 {
            let sender = sender.clone();
            executor.execute(move || {
                let name = thread::current().name().map(str::to_owned);
                sender.send(name).unwrap();
            });
        }

        for _ in 0..6 {
            let name = receiver.recv().unwrap().unwrap();
            assert!(name.starts_with("executor-"));
        }
        assert_eq!(executor.size(), 3);
    }
}
