use std::collections::VecDeque;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use parking_lot::{Condvar, Mutex};
use rayon::{ThreadPool, ThreadPoolBuilder};

use crate::errors::{Result, WorldError};
use crate::settings::TaskSystemSettings;

type Job = Box<dyn FnOnce() + Send + 'static>;

/// Scheduling tier of a task.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TaskPriority {
    /// Frame-critical work, expected to finish within the current tick.
    ShortTask,
    /// Work that may span several ticks. Runs on a separate pool so it never
    /// starves short tasks.
    LongRunning,
    /// Blocking I/O. Shares the long-running pool.
    FileAccess,
    /// Only runs when the main thread calls
    /// [`process_main_thread_tasks`](TaskSystem::process_main_thread_tasks)
    /// or waits on the task's group.
    MainThread,
}

// ============================================================================
// Task Groups
// ============================================================================

#[derive(Debug, Default)]
struct TaskGroupState {
    remaining: AtomicUsize,
    lock: Mutex<()>,
    finished: Condvar,
}

impl TaskGroupState {
    fn task_done(&self) {
        if self.remaining.fetch_sub(1, Ordering::AcqRel) == 1 {
            let _guard = self.lock.lock();
            self.finished.notify_all();
        }
    }
}

/// Counts down when dropped, so a group also finishes if its task panics.
struct TaskCompletion(Arc<TaskGroupState>);

impl Drop for TaskCompletion {
    fn drop(&mut self) {
        self.0.task_done();
    }
}

/// Handle to a set of tasks that can be waited on as a whole.
///
/// A group with no tasks is finished.
#[derive(Debug, Clone, Default)]
pub struct TaskGroupHandle {
    state: Arc<TaskGroupState>,
}

impl TaskGroupHandle {
    /// Tasks of this group that have not completed yet.
    #[must_use]
    pub fn remaining(&self) -> usize {
        self.state.remaining.load(Ordering::Acquire)
    }
}

// ============================================================================
// Task System
// ============================================================================

/// Worker pools plus a main-thread queue.
///
/// Tasks run to completion; there is no preemption and no cancellation of a
/// task once it started. Joins are blocking waits on [`TaskGroupHandle`]s or
/// on a [`scope`](TaskSystem::scope).
pub struct TaskSystem {
    short_pool: ThreadPool,
    long_pool: ThreadPool,
    main_thread_tasks: Mutex<VecDeque<Job>>,
}

impl std::fmt::Debug for TaskSystem {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TaskSystem")
            .field("short_threads", &self.short_pool.current_num_threads())
            .field("long_threads", &self.long_pool.current_num_threads())
            .field("main_thread_tasks", &self.main_thread_tasks.lock().len())
            .finish()
    }
}

impl TaskSystem {
    pub fn new(settings: &TaskSystemSettings) -> Result<Self> {
        let short_pool = ThreadPoolBuilder::new()
            .num_threads(settings.short_task_threads)
            .thread_name(|i| format!("stratum-short-{i}"))
            .build()
            .map_err(|e| WorldError::InvalidSettings(format!("short task pool: {e}")))?;

        let long_pool = ThreadPoolBuilder::new()
            .num_threads(settings.long_task_threads.max(1))
            .thread_name(|i| format!("stratum-long-{i}"))
            .build()
            .map_err(|e| WorldError::InvalidSettings(format!("long task pool: {e}")))?;

        log::debug!(
            "Task system started with {} short and {} long-running workers",
            short_pool.current_num_threads(),
            long_pool.current_num_threads()
        );

        Ok(Self {
            short_pool,
            long_pool,
            main_thread_tasks: Mutex::new(VecDeque::new()),
        })
    }

    /// Number of workers available for short tasks.
    #[must_use]
    pub fn worker_count(&self) -> usize {
        self.short_pool.current_num_threads()
    }

    /// Creates an empty group to add tasks to.
    #[must_use]
    pub fn create_group(&self) -> TaskGroupHandle {
        TaskGroupHandle::default()
    }

    /// Adds a task to an existing group and schedules it.
    pub fn add_task<F>(&self, group: &TaskGroupHandle, priority: TaskPriority, task: F)
    where
        F: FnOnce() + Send + 'static,
    {
        group.state.remaining.fetch_add(1, Ordering::AcqRel);
        let completion = TaskCompletion(Arc::clone(&group.state));
        let job: Job = Box::new(move || {
            let _completion = completion;
            task();
        });

        match priority {
            TaskPriority::ShortTask => self.short_pool.spawn(job),
            TaskPriority::LongRunning | TaskPriority::FileAccess => self.long_pool.spawn(job),
            TaskPriority::MainThread => self.main_thread_tasks.lock().push_back(job),
        }
    }

    /// Schedules a single task in a new group.
    pub fn submit_task<F>(&self, priority: TaskPriority, task: F) -> TaskGroupHandle
    where
        F: FnOnce() + Send + 'static,
    {
        let group = self.create_group();
        self.add_task(&group, priority, task);
        group
    }

    #[must_use]
    pub fn is_group_finished(&self, group: &TaskGroupHandle) -> bool {
        group.remaining() == 0
    }

    /// Blocks until every task of `group` has completed.
    ///
    /// Must be called from the main thread: while waiting it runs queued
    /// main-thread tasks, which may belong to the awaited group.
    pub fn wait_for_group(&self, group: &TaskGroupHandle) {
        while !self.is_group_finished(group) {
            if self.run_one_main_thread_task() {
                continue;
            }

            let mut guard = group.state.lock.lock();
            if group.remaining() != 0 {
                // Main-thread tasks may be queued while we sleep, so wake up periodically.
                group
                    .state
                    .finished
                    .wait_for(&mut guard, Duration::from_millis(1));
            }
        }
    }

    /// Runs every queued main-thread task. Returns how many ran.
    pub fn process_main_thread_tasks(&self) -> usize {
        let mut count = 0;
        while self.run_one_main_thread_task() {
            count += 1;
        }
        count
    }

    fn run_one_main_thread_task(&self) -> bool {
        let job = self.main_thread_tasks.lock().pop_front();
        match job {
            Some(job) => {
                job();
                true
            }
            None => false,
        }
    }

    /// Runs `op` with a scope whose spawned tasks may borrow from the caller;
    /// returns once every spawned task has finished.
    pub fn scope<'scope, OP, R>(&self, op: OP) -> R
    where
        OP: FnOnce(&rayon::Scope<'scope>) -> R + Send,
        R: Send,
    {
        self.short_pool.scope(op)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicU32;

    fn task_system() -> TaskSystem {
        TaskSystem::new(&TaskSystemSettings {
            short_task_threads: 2,
            long_task_threads: 1,
        })
        .expect("thread pools")
    }

    #[test]
    fn empty_group_is_finished() {
        let tasks = task_system();
        let group = tasks.create_group();
        assert!(tasks.is_group_finished(&group));
        tasks.wait_for_group(&group);
    }

    #[test]
    fn waits_for_all_priorities() {
        let tasks = task_system();
        let counter = Arc::new(AtomicU32::new(0));
        let group = tasks.create_group();

        for priority in [
            TaskPriority::ShortTask,
            TaskPriority::LongRunning,
            TaskPriority::FileAccess,
            TaskPriority::MainThread,
        ] {
            let counter = Arc::clone(&counter);
            tasks.add_task(&group, priority, move || {
                counter.fetch_add(1, Ordering::SeqCst);
            });
        }

        tasks.wait_for_group(&group);
        assert!(tasks.is_group_finished(&group));
        assert_eq!(counter.load(Ordering::SeqCst), 4);
    }

    #[test]
    fn main_thread_tasks_wait_for_the_main_thread() {
        let tasks = task_system();
        let group = tasks.submit_task(TaskPriority::MainThread, || {});

        assert!(!tasks.is_group_finished(&group));
        assert_eq!(tasks.process_main_thread_tasks(), 1);
        assert!(tasks.is_group_finished(&group));
    }

    #[test]
    fn scope_joins_borrowing_tasks() {
        let tasks = task_system();
        let mut values = vec![1_u32, 2, 3, 4];

        tasks.scope(|s| {
            for v in &mut values {
                s.spawn(move |_| *v *= 10);
            }
        });

        assert_eq!(values, vec![10, 20, 30, 40]);
    }
}
