use std::collections::VecDeque;
use std::sync::{Mutex, PoisonError};

/// Result of running a deferred task once.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WorkStatus {
    /// The task finished and is dropped.
    Done,
    /// The task could not make progress; run it again on a later turn.
    Retry,
}

/// Work deferred to a later turn of the host's main loop.
pub trait WorkTask: Send {
    fn run(&mut self) -> WorkStatus;
}

/// Host facility that runs [`WorkTask`]s outside the current call stack.
pub trait WorkQueue {
    fn queue(&self, task: Box<dyn WorkTask>);
}

/// First-in first-out work queue driven explicitly by the host loop.
#[derive(Default)]
pub struct LocalWorkQueue {
    tasks: Mutex<VecDeque<Box<dyn WorkTask>>>,
}

impl LocalWorkQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Run every task queued so far once. Tasks asking to be retried go back
    /// to the front of the queue in their original order; tasks queued while
    /// running wait for the next call.
    ///
    /// Returns the number of tasks that completed.
    pub fn run_pending(&self) -> usize {
        let mut batch = std::mem::take(&mut *self.lock());
        let mut retry = VecDeque::new();
        let mut done = 0usize;

        while let Some(mut task) = batch.pop_front() {
            match task.run() {
                WorkStatus::Done => done += 1,
                WorkStatus::Retry => retry.push_back(task),
            }
        }

        if !retry.is_empty() {
            let mut tasks = self.lock();
            retry.append(&mut *tasks);
            *tasks = retry;
        }
        done
    }

    /// Number of queued tasks.
    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, VecDeque<Box<dyn WorkTask>>> {
        self.tasks.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl WorkQueue for LocalWorkQueue {
    fn queue(&self, task: Box<dyn WorkTask>) {
        self.lock().push_back(task);
    }
}

impl std::fmt::Debug for LocalWorkQueue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LocalWorkQueue")
            .field("queued", &self.len())
            .finish()
    }
}
