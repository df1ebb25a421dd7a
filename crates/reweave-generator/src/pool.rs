//! Bounded render worker pool.
//!
//! Up to `max_workers` threads pull tasks from a shared FIFO queue. Workers
//! are spawned lazily, reused across tasks and parked on a condition variable
//! while the queue is empty.
//!
//! A task handler that returns normally always completes its task. A handler
//! that panics takes its worker down with it: the task's handle resolves to
//! [`PoolError::WorkerCrashed`], the thread exits, and a replacement is
//! spawned if work is still queued.

use std::{
    any::Any,
    collections::VecDeque,
    panic::{self, AssertUnwindSafe},
    path::PathBuf,
    sync::{Arc, mpsc},
    thread,
};

use parking_lot::{Condvar, Mutex};
use reweave_core::Document;
use thiserror::Error;
use tracing::{debug, error, trace, warn};

/// Pool errors, reported per task.
#[derive(Debug, Error)]
pub enum PoolError {
    /// The worker running the task panicked.
    #[error("worker crashed while rendering task {task_id}: {message}")]
    WorkerCrashed { task_id: usize, message: String },

    /// No worker could be started to run the task.
    #[error("failed to spawn render worker: {0}")]
    Spawn(String),

    /// The task was dropped without a result, e.g. submitted after close.
    #[error("task {0} was dropped before completing")]
    Disconnected(usize),
}

/// Result type for pool operations.
pub type Result<T> = std::result::Result<T, PoolError>;

/// A unit of render work.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderTask {
    /// Scan-order index of the source file.
    pub id: usize,
    pub source_path: PathBuf,
}

impl RenderTask {
    pub fn new(id: usize, source_path: impl Into<PathBuf>) -> Self {
        Self {
            id,
            source_path: source_path.into(),
        }
    }
}

/// Turns a task into a document. Shared by every worker thread.
pub trait TaskHandler: Send + Sync + 'static {
    fn handle(&self, task: &RenderTask) -> Document;
}

impl<F> TaskHandler for F
where
    F: Fn(&RenderTask) -> Document + Send + Sync + 'static,
{
    fn handle(&self, task: &RenderTask) -> Document {
        self(task)
    }
}

/// Counters describing pool activity.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PoolStats {
    pub workers_spawned: usize,
    pub workers_crashed: usize,
    pub tasks_completed: usize,
    /// Largest number of tasks observed running at once.
    pub peak_busy: usize,
}

/// Completion handle for a submitted task.
#[derive(Debug)]
pub struct TaskHandle {
    task_id: usize,
    rx: mpsc::Receiver<Result<Document>>,
}

impl TaskHandle {
    pub fn task_id(&self) -> usize {
        self.task_id
    }

    /// Block until the task resolves.
    pub fn wait(self) -> Result<Document> {
        self.rx
            .recv()
            .unwrap_or(Err(PoolError::Disconnected(self.task_id)))
    }
}

struct Job {
    task: RenderTask,
    reply: mpsc::Sender<Result<Document>>,
}

#[derive(Default)]
struct PoolState {
    queue: VecDeque<Job>,
    /// Workers parked on the condition variable.
    idle: usize,
    /// Workers alive, idle or busy.
    live: usize,
    busy: usize,
    closed: bool,
    stats: PoolStats,
}

struct Shared<H> {
    state: Mutex<PoolState>,
    work_available: Condvar,
    handler: H,
    max_workers: usize,
}

/// A bounded pool of render threads.
pub struct WorkerPool<H: TaskHandler> {
    shared: Arc<Shared<H>>,
}

impl<H: TaskHandler> WorkerPool<H> {
    /// Create a pool running at most `max_workers` tasks at once.
    ///
    /// No thread is started until the first task is submitted.
    pub fn new(handler: H, max_workers: usize) -> Self {
        Self {
            shared: Arc::new(Shared {
                state: Mutex::new(PoolState::default()),
                work_available: Condvar::new(),
                handler,
                max_workers: max_workers.max(1),
            }),
        }
    }

    /// Upper bound on concurrently running tasks.
    pub fn max_workers(&self) -> usize {
        self.shared.max_workers
    }

    /// Queue a task. Never waits for a worker to become free.
    pub fn submit(&self, task: RenderTask) -> TaskHandle {
        let (tx, rx) = mpsc::channel();
        let handle = TaskHandle { task_id: task.id, rx };

        let mut state = self.shared.state.lock();
        if state.closed {
            warn!(task = task.id, "task submitted to a closed pool");
            return handle;
        }

        state.queue.push_back(Job { task, reply: tx });

        if state.idle >= state.queue.len() {
            self.shared.work_available.notify_one();
        } else if state.live < self.shared.max_workers {
            if let Err(e) = spawn_worker(&self.shared, &mut state) {
                warn!(error = %e, live = state.live, "could not spawn render worker");
                if state.live == 0 {
                    // Nothing will ever drain the queue; fail everything in it.
                    for job in state.queue.drain(..) {
                        let _ = job.reply.send(Err(PoolError::Spawn(e.to_string())));
                    }
                }
            }
        }

        handle
    }

    /// Stop accepting tasks and let workers exit once the queue drains.
    ///
    /// Running tasks are never interrupted.
    pub fn close(&self) {
        let mut state = self.shared.state.lock();
        if !state.closed {
            debug!(live = state.live, queued = state.queue.len(), "closing worker pool");
            state.closed = true;
            self.shared.work_available.notify_all();
        }
    }

    /// Workers currently alive.
    pub fn live_workers(&self) -> usize {
        self.shared.state.lock().live
    }

    pub fn stats(&self) -> PoolStats {
        self.shared.state.lock().stats
    }
}

impl<H: TaskHandler> Drop for WorkerPool<H> {
    fn drop(&mut self) {
        self.close();
    }
}

fn spawn_worker<H: TaskHandler>(
    shared: &Arc<Shared<H>>,
    state: &mut PoolState,
) -> std::io::Result<()> {
    let worker_id = state.stats.workers_spawned;
    let shared = Arc::clone(shared);

    thread::Builder::new()
        .name(format!("reweave-render-{worker_id}"))
        .spawn(move || worker_loop(&shared, worker_id))?;

    state.live += 1;
    state.stats.workers_spawned += 1;
    trace!(worker = worker_id, live = state.live, "spawned render worker");
    Ok(())
}

fn worker_loop<H: TaskHandler>(shared: &Arc<Shared<H>>, worker_id: usize) {
    let mut state = shared.state.lock();
    loop {
        let Some(job) = state.queue.pop_front() else {
            if state.closed {
                state.live -= 1;
                trace!(worker = worker_id, "render worker exiting");
                return;
            }
            state.idle += 1;
            shared.work_available.wait(&mut state);
            state.idle -= 1;
            continue;
        };

        state.busy += 1;
        state.stats.peak_busy = state.stats.peak_busy.max(state.busy);
        drop(state);

        let Job { task, reply } = job;
        let outcome = panic::catch_unwind(AssertUnwindSafe(|| shared.handler.handle(&task)));

        state = shared.state.lock();
        state.busy -= 1;

        match outcome {
            Ok(document) => {
                state.stats.tasks_completed += 1;
                // The receiver may have been dropped; the result is then unwanted.
                let _ = reply.send(Ok(document));
            }
            Err(payload) => {
                let message = panic_message(payload.as_ref());
                error!(
                    worker = worker_id,
                    task = task.id,
                    path = %task.source_path.display(),
                    error = %message,
                    "render worker crashed"
                );
                let _ = reply.send(Err(PoolError::WorkerCrashed {
                    task_id: task.id,
                    message,
                }));

                state.live -= 1;
                state.stats.workers_crashed += 1;
                if !state.queue.is_empty()
                    && state.live < shared.max_workers
                    && let Err(e) = spawn_worker(shared, &mut state)
                {
                    warn!(error = %e, "could not replace crashed render worker");
                    if state.live == 0 {
                        for job in state.queue.drain(..) {
                            let _ = job.reply.send(Err(PoolError::Spawn(e.to_string())));
                        }
                    }
                }
                return;
            }
        }
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}

#[cfg(test)]
mod tests {
    use std::{
        sync::atomic::{AtomicUsize, Ordering},
        time::{Duration, Instant},
    };

    use reweave_core::Frontmatter;

    use super::*;

    fn document_for(task: &RenderTask) -> Document {
        Document::from_parts(
            Frontmatter::default(),
            task.source_path.clone(),
            task.id,
            String::new(),
            Vec::new(),
        )
    }

    fn tasks(n: usize) -> Vec<RenderTask> {
        (0..n)
            .map(|i| RenderTask::new(i, format!("post-{i}.md")))
            .collect()
    }

    #[test]
    fn test_every_task_resolves() {
        // Later tasks finish sooner so completions arrive out of order.
        let pool = WorkerPool::new(
            |task: &RenderTask| {
                thread::sleep(Duration::from_millis((20 - task.id as u64 % 20) / 4));
                document_for(task)
            },
            4,
        );

        let handles: Vec<_> = tasks(40).into_iter().map(|t| pool.submit(t)).collect();
        let mut orders: Vec<usize> = handles
            .into_iter()
            .map(|h| h.wait().expect("task completes").order)
            .collect();
        orders.sort_unstable();

        assert_eq!(orders, (0..40).collect::<Vec<_>>());
        assert_eq!(pool.stats().tasks_completed, 40);
    }

    #[test]
    fn test_concurrency_is_bounded() {
        let active = Arc::new(AtomicUsize::new(0));
        let peak = Arc::new(AtomicUsize::new(0));
        let (a, p) = (Arc::clone(&active), Arc::clone(&peak));

        let pool = WorkerPool::new(
            move |task: &RenderTask| {
                let now = a.fetch_add(1, Ordering::SeqCst) + 1;
                p.fetch_max(now, Ordering::SeqCst);
                thread::sleep(Duration::from_millis(5));
                a.fetch_sub(1, Ordering::SeqCst);
                document_for(task)
            },
            3,
        );

        let handles: Vec<_> = tasks(24).into_iter().map(|t| pool.submit(t)).collect();
        for h in handles {
            h.wait().expect("task completes");
        }

        assert!(peak.load(Ordering::SeqCst) <= 3);
        assert!(pool.stats().peak_busy <= 3);
        assert!(pool.stats().workers_spawned <= 3);
    }

    #[test]
    fn test_single_worker_runs_fifo() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let log = Arc::clone(&seen);
        let pool = WorkerPool::new(
            move |task: &RenderTask| {
                log.lock().push(task.id);
                document_for(task)
            },
            1,
        );

        let handles: Vec<_> = tasks(10).into_iter().map(|t| pool.submit(t)).collect();
        for h in handles {
            h.wait().expect("task completes");
        }

        assert_eq!(*seen.lock(), (0..10).collect::<Vec<_>>());
    }

    #[test]
    fn test_crashed_workers_are_replaced() {
        let pool = WorkerPool::new(
            |task: &RenderTask| {
                if task.id % 3 == 0 {
                    panic!("cannot render {}", task.id);
                }
                document_for(task)
            },
            2,
        );

        let handles: Vec<_> = tasks(12).into_iter().map(|t| pool.submit(t)).collect();
        let mut ok = 0;
        let mut crashed = Vec::new();
        for h in handles {
            match h.wait() {
                Ok(_) => ok += 1,
                Err(PoolError::WorkerCrashed { task_id, message }) => {
                    assert!(message.contains("cannot render"));
                    crashed.push(task_id);
                }
                Err(e) => panic!("unexpected error: {e}"),
            }
        }

        crashed.sort_unstable();
        assert_eq!(ok + crashed.len(), 12);
        assert_eq!(crashed, vec![0, 3, 6, 9]);

        let stats = pool.stats();
        assert_eq!(stats.workers_crashed, 4);
        assert!(stats.peak_busy <= 2);
        assert!(pool.live_workers() <= 2);
    }

    #[test]
    fn test_close_lets_idle_workers_exit() {
        let pool = WorkerPool::new(document_for, 2);
        let handles: Vec<_> = tasks(4).into_iter().map(|t| pool.submit(t)).collect();
        for h in handles {
            h.wait().expect("task completes");
        }

        pool.close();
        let deadline = Instant::now() + Duration::from_secs(5);
        while pool.live_workers() > 0 && Instant::now() < deadline {
            thread::sleep(Duration::from_millis(5));
        }
        assert_eq!(pool.live_workers(), 0);
    }

    #[test]
    fn test_close_finishes_queued_work() {
        let pool = WorkerPool::new(
            |task: &RenderTask| {
                thread::sleep(Duration::from_millis(2));
                document_for(task)
            },
            1,
        );
        let handles: Vec<_> = tasks(5).into_iter().map(|t| pool.submit(t)).collect();
        pool.close();

        for h in handles {
            assert!(h.wait().is_ok());
        }
    }

    #[test]
    fn test_submit_after_close_is_disconnected() {
        let pool = WorkerPool::new(document_for, 1);
        pool.close();

        let handle = pool.submit(RenderTask::new(7, "late.md"));
        assert!(matches!(handle.wait(), Err(PoolError::Disconnected(7))));
    }

    #[test]
    fn test_panic_message() {
        let boxed: Box<dyn Any + Send> = Box::new("static str");
        assert_eq!(panic_message(boxed.as_ref()), "static str");
        let boxed: Box<dyn Any + Send> = Box::new(String::from("owned"));
        assert_eq!(panic_message(boxed.as_ref()), "owned");
        let boxed: Box<dyn Any + Send> = Box::new(42u8);
        assert_eq!(panic_message(boxed.as_ref()), "unknown panic");
    }
}
