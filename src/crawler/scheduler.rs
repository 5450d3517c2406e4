//! Bounded-concurrency task scheduler
//!
//! This module handles:
//! - A FIFO queue of submitted asynchronous tasks
//! - Dispatching queued tasks while fewer than `limit` are running
//! - Surfacing each task's failure without disturbing the others
//! - Announcing a drain whenever the scheduler goes fully idle
//!
//! Tasks may submit further tasks while they run; a submission never blocks
//! and never runs the new task inline on the caller's stack.

use crate::SpiderError;
use std::collections::VecDeque;
use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::task::{Context, Poll};
use tokio::sync::{oneshot, watch};

/// A unit of work accepted by the scheduler
pub type TaskFuture = Pin<Box<dyn Future<Output = Result<(), SpiderError>> + Send + 'static>>;

/// Identifier assigned to each submitted task, in submission order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TaskId(u64);

impl TaskId {
    pub fn get(self) -> u64 {
        self.0
    }
}

impl fmt::Display for TaskId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "task-{}", self.0)
    }
}

/// Receives scheduler lifecycle events
///
/// All methods default to doing nothing. They are called outside the
/// scheduler's internal lock and may submit new tasks.
pub trait SchedulerObserver: Send + Sync + 'static {
    /// A queued task has been started
    fn on_dispatch(&self, _task: TaskId) {}

    /// A task completed successfully
    fn on_task_done(&self, _task: TaskId) {}

    /// A task completed with an error
    fn on_task_error(&self, _task: TaskId, _error: &SpiderError) {}

    /// The scheduler has no running and no queued tasks
    fn on_drain(&self) {}
}

/// Observer that writes scheduler events to the tracing log
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingObserver;

impl SchedulerObserver for TracingObserver {
    fn on_dispatch(&self, task: TaskId) {
        tracing::trace!("Dispatched {}", task);
    }

    fn on_task_done(&self, task: TaskId) {
        tracing::trace!("{} completed", task);
    }

    fn on_task_error(&self, task: TaskId, error: &SpiderError) {
        tracing::debug!("{} failed: {}", task, error);
    }

    fn on_drain(&self) {
        tracing::debug!("Scheduler drained");
    }
}

/// Point-in-time snapshot of scheduler counters
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SchedulerStats {
    /// Tasks currently executing
    pub running: usize,

    /// Tasks waiting for a free slot
    pub queued: usize,

    /// Tasks ever submitted
    pub total: u64,

    /// Tasks ever started
    pub started: u64,

    /// Tasks that completed successfully
    pub succeeded: u64,

    /// Tasks that completed with an error
    pub failed: u64,

    /// Number of times the scheduler became idle
    pub drains: u64,
}

struct QueuedTask {
    id: TaskId,
    future: TaskFuture,
}

#[derive(Default)]
struct QueueState {
    pending: VecDeque<QueuedTask>,
    running: usize,
    next_id: u64,
    started: u64,
    succeeded: u64,
    failed: u64,
    drains: u64,
}

/// Work taken from the queue under the lock, acted on after releasing it
struct Dispatch {
    ready: Vec<QueuedTask>,
    drained: bool,
}

struct Shared {
    limit: usize,
    state: Mutex<QueueState>,
    observer: Arc<dyn SchedulerObserver>,
    drains: watch::Sender<u64>,
}

impl Shared {
    fn lock(&self) -> MutexGuard<'_, QueueState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Moves queued tasks into free slots and detects the idle transition
    ///
    /// Must be called with the state lock held. A drain is only recognized
    /// right after a completion, never on a scheduler that has not run yet.
    fn take_ready(&self, state: &mut QueueState, after_completion: bool) -> Dispatch {
        let mut ready = Vec::new();

        while state.running < self.limit {
            let Some(task) = state.pending.pop_front() else {
                break;
            };
            state.running += 1;
            state.started += 1;
            ready.push(task);
        }

        let drained = after_completion && state.running == 0 && state.pending.is_empty();
        if drained {
            state.drains += 1;
        }

        Dispatch { ready, drained }
    }

    fn launch(self: &Arc<Self>, dispatch: Dispatch) {
        for task in dispatch.ready {
            self.observer.on_dispatch(task.id);
            self.spawn(task);
        }

        if dispatch.drained {
            self.observer.on_drain();
            self.drains.send_modify(|count| *count += 1);
        }
    }

    fn spawn(self: &Arc<Self>, task: QueuedTask) {
        let shared = Arc::clone(self);
        let QueuedTask { id, future } = task;

        tokio::spawn(async move {
            // The inner spawn turns a panic into a JoinError so the slot is
            // always released.
            let outcome = match tokio::spawn(future).await {
                Ok(result) => result,
                Err(e) => Err(SpiderError::TaskPanicked(e.to_string())),
            };
            shared.finish(id, outcome);
        });
    }

    fn finish(self: &Arc<Self>, id: TaskId, outcome: Result<(), SpiderError>) {
        let dispatch = {
            let mut state = self.lock();
            state.running -= 1;
            match outcome {
                Ok(()) => state.succeeded += 1,
                Err(_) => state.failed += 1,
            }
            self.take_ready(&mut state, true)
        };

        match &outcome {
            Ok(()) => self.observer.on_task_done(id),
            Err(e) => self.observer.on_task_error(id, e),
        }

        self.launch(dispatch);
    }
}

/// Runs submitted tasks with at most `limit` in flight at once
///
/// Cloning a scheduler yields another handle to the same queue.
#[derive(Clone)]
pub struct TaskScheduler {
    shared: Arc<Shared>,
}

impl TaskScheduler {
    /// Creates a scheduler that logs its events through tracing
    ///
    /// A limit of zero is raised to one.
    pub fn new(limit: usize) -> Self {
        Self::with_observer(limit, Arc::new(TracingObserver))
    }

    /// Creates a scheduler reporting to a custom observer
    pub fn with_observer(limit: usize, observer: Arc<dyn SchedulerObserver>) -> Self {
        if limit == 0 {
            tracing::warn!("Scheduler limit of 0 raised to 1");
        }

        let (drains, _) = watch::channel(0);

        Self {
            shared: Arc::new(Shared {
                limit: limit.max(1),
                state: Mutex::new(QueueState::default()),
                observer,
                drains,
            }),
        }
    }

    /// Maximum number of tasks running at once
    pub fn limit(&self) -> usize {
        self.shared.limit
    }

    /// Queues a task and starts it if a slot is free
    ///
    /// Returns immediately. The task's error, if any, goes to the observer.
    pub fn submit<F>(&self, task: F) -> TaskId
    where
        F: Future<Output = Result<(), SpiderError>> + Send + 'static,
    {
        let (id, dispatch) = {
            let mut state = self.shared.lock();
            let id = TaskId(state.next_id);
            state.next_id += 1;
            state.pending.push_back(QueuedTask {
                id,
                future: Box::pin(task),
            });
            (id, self.shared.take_ready(&mut state, false))
        };

        self.shared.launch(dispatch);
        id
    }

    /// Queues a task whose result is delivered through the returned handle
    ///
    /// A failing task is still reported to the observer, as
    /// [`SpiderError::TaskFailed`].
    pub fn run<T, F>(&self, task: F) -> TaskHandle<T>
    where
        T: Send + 'static,
        F: Future<Output = Result<T, SpiderError>> + Send + 'static,
    {
        let (sender, receiver) = oneshot::channel();

        let id = self.submit(async move {
            match task.await {
                Ok(value) => {
                    let _ = sender.send(Ok(value));
                    Ok(())
                }
                Err(e) => {
                    let message = e.to_string();
                    let _ = sender.send(Err(e));
                    Err(SpiderError::TaskFailed(message))
                }
            }
        });

        TaskHandle { id, receiver }
    }

    /// Returns a snapshot of the scheduler's counters
    pub fn stats(&self) -> SchedulerStats {
        let state = self.shared.lock();
        SchedulerStats {
            running: state.running,
            queued: state.pending.len(),
            total: state.next_id,
            started: state.started,
            succeeded: state.succeeded,
            failed: state.failed,
            drains: state.drains,
        }
    }

    /// Returns true if nothing is running or queued
    pub fn is_idle(&self) -> bool {
        let state = self.shared.lock();
        state.running == 0 && state.pending.is_empty()
    }

    /// Waits until the scheduler has no running and no queued tasks
    ///
    /// Returns at once on an idle scheduler.
    pub async fn wait_drained(&self) {
        let mut drains = self.shared.drains.subscribe();

        while !self.is_idle() {
            if drains.changed().await.is_err() {
                return;
            }
        }
    }
}

impl fmt::Debug for TaskScheduler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TaskScheduler")
            .field("limit", &self.shared.limit)
            .field("stats", &self.stats())
            .finish()
    }
}

/// Typed result of a task queued with [`TaskScheduler::run`]
#[derive(Debug)]
pub struct TaskHandle<T> {
    id: TaskId,
    receiver: oneshot::Receiver<Result<T, SpiderError>>,
}

impl<T> TaskHandle<T> {
    pub fn id(&self) -> TaskId {
        self.id
    }
}

impl<T> Future for TaskHandle<T> {
    type Output = Result<T, SpiderError>;

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        let id = self.id;
        Pin::new(&mut self.receiver).poll(cx).map(|received| {
            received.unwrap_or_else(|_| {
                Err(SpiderError::TaskPanicked(format!(
                    "{} ended without a result",
                    id
                )))
            })
        })
    }
}

/// Applies `f` to every item with at most `limit` calls in flight
///
/// Results come back in input order. Every call runs to completion; if any
/// failed, the error of the earliest failing item is returned.
pub async fn map_bounded<I, T, R, F, Fut>(items: I, limit: usize, f: F) -> Result<Vec<R>, SpiderError>
where
    I: IntoIterator<Item = T>,
    F: Fn(T) -> Fut,
    Fut: Future<Output = Result<R, SpiderError>> + Send + 'static,
    R: Send + 'static,
{
    let scheduler = TaskScheduler::new(limit);
    let handles: Vec<TaskHandle<R>> = items.into_iter().map(|item| scheduler.run(f(item))).collect();

    let mut results = Vec::with_capacity(handles.len());
    let mut first_error = None;

    for handle in handles {
        match handle.await {
            Ok(value) => results.push(value),
            Err(e) => {
                if first_error.is_none() {
                    first_error = Some(e);
                }
            }
        }
    }

    match first_error {
        Some(e) => Err(e),
        None => Ok(results),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::{Duration, Instant};

    #[derive(Default)]
    struct CountingObserver {
        dispatched: AtomicUsize,
        done: AtomicUsize,
        errors: AtomicUsize,
        drains: AtomicUsize,
    }

    impl SchedulerObserver for CountingObserver {
        fn on_dispatch(&self, _task: TaskId) {
            self.dispatched.fetch_add(1, Ordering::SeqCst);
        }

        fn on_task_done(&self, _task: TaskId) {
            self.done.fetch_add(1, Ordering::SeqCst);
        }

        fn on_task_error(&self, _task: TaskId, _error: &SpiderError) {
            self.errors.fetch_add(1, Ordering::SeqCst);
        }

        fn on_drain(&self) {
            self.drains.fetch_add(1, Ordering::SeqCst);
        }
    }

    /// Tracks how many tasks run at once and the highest value seen
    #[derive(Default)]
    struct Gauge {
        active: AtomicUsize,
        peak: AtomicUsize,
    }

    impl Gauge {
        async fn hold(&self, duration: Duration) {
            let now = self.active.fetch_add(1, Ordering::SeqCst) + 1;
            self.peak.fetch_max(now, Ordering::SeqCst);
            tokio::time::sleep(duration).await;
            self.active.fetch_sub(1, Ordering::SeqCst);
        }
    }

    #[tokio::test]
    async fn test_never_exceeds_limit() {
        let scheduler = TaskScheduler::new(3);
        let gauge = Arc::new(Gauge::default());

        for _ in 0..10 {
            let gauge = Arc::clone(&gauge);
            scheduler.submit(async move {
                gauge.hold(Duration::from_millis(20)).await;
                Ok(())
            });
        }

        assert!(scheduler.stats().running <= 3);
        scheduler.wait_drained().await;

        assert_eq!(gauge.peak.load(Ordering::SeqCst), 3);
        let stats = scheduler.stats();
        assert_eq!(stats.total, 10);
        assert_eq!(stats.succeeded, 10);
        assert_eq!(stats.running, 0);
        assert_eq!(stats.queued, 0);
    }

    #[tokio::test]
    async fn test_fifo_start_order() {
        let scheduler = TaskScheduler::new(1);
        let order = Arc::new(Mutex::new(Vec::new()));

        for i in 0..5 {
            let order = Arc::clone(&order);
            scheduler.submit(async move {
                order.lock().unwrap().push(i);
                tokio::time::sleep(Duration::from_millis(1)).await;
                Ok(())
            });
        }

        scheduler.wait_drained().await;
        assert_eq!(*order.lock().unwrap(), vec![0, 1, 2, 3, 4]);
    }

    #[tokio::test]
    async fn test_queued_tasks_wait_for_slots() {
        let scheduler = TaskScheduler::new(2);

        for _ in 0..5 {
            scheduler.submit(async {
                tokio::time::sleep(Duration::from_millis(20)).await;
                Ok(())
            });
        }

        let stats = scheduler.stats();
        assert_eq!(stats.running, 2);
        assert_eq!(stats.queued, 3);
        assert_eq!(stats.started, 2);

        scheduler.wait_drained().await;
    }

    #[tokio::test]
    async fn test_limit_two_halves_wall_clock() {
        let scheduler = TaskScheduler::new(2);
        let start = Instant::now();

        for _ in 0..4 {
            scheduler.submit(async {
                tokio::time::sleep(Duration::from_millis(100)).await;
                Ok(())
            });
        }

        scheduler.wait_drained().await;
        let elapsed = start.elapsed();

        assert!(elapsed >= Duration::from_millis(190), "took {:?}", elapsed);
        assert!(elapsed < Duration::from_millis(390), "took {:?}", elapsed);
    }

    #[tokio::test]
    async fn test_failure_does_not_stop_others() {
        let observer = Arc::new(CountingObserver::default());
        let scheduler = TaskScheduler::with_observer(2, observer.clone());

        for i in 0..6 {
            scheduler.submit(async move {
                tokio::time::sleep(Duration::from_millis(5)).await;
                if i % 3 == 0 {
                    Err(SpiderError::Setup(format!("task {} failed", i)))
                } else {
                    Ok(())
                }
            });
        }

        scheduler.wait_drained().await;

        assert_eq!(observer.errors.load(Ordering::SeqCst), 2);
        assert_eq!(observer.done.load(Ordering::SeqCst), 4);
        assert_eq!(observer.dispatched.load(Ordering::SeqCst), 6);

        let stats = scheduler.stats();
        assert_eq!(stats.failed, 2);
        assert_eq!(stats.succeeded, 4);
    }

    #[tokio::test]
    async fn test_drain_fires_per_idle_transition() {
        let observer = Arc::new(CountingObserver::default());
        let scheduler = TaskScheduler::with_observer(4, observer.clone());

        for _ in 0..3 {
            scheduler.submit(async { Ok(()) });
        }
        scheduler.wait_drained().await;
        assert_eq!(scheduler.stats().drains, 1);
        assert_eq!(observer.drains.load(Ordering::SeqCst), 1);

        scheduler.submit(async { Ok(()) });
        scheduler.wait_drained().await;
        assert_eq!(scheduler.stats().drains, 2);
        assert_eq!(observer.drains.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_idle_scheduler_never_drains() {
        let scheduler = TaskScheduler::new(2);

        scheduler.wait_drained().await;
        assert!(scheduler.is_idle());
        assert_eq!(scheduler.stats().drains, 0);
    }

    #[tokio::test]
    async fn test_tasks_submit_more_tasks() {
        let scheduler = TaskScheduler::new(1);
        let count = Arc::new(AtomicUsize::new(0));

        let inner = scheduler.clone();
        let counter = Arc::clone(&count);
        scheduler.submit(async move {
            counter.fetch_add(1, Ordering::SeqCst);
            for _ in 0..3 {
                let counter = Arc::clone(&counter);
                inner.submit(async move {
                    counter.fetch_add(1, Ordering::SeqCst);
                    Ok(())
                });
            }
            Ok(())
        });

        scheduler.wait_drained().await;

        assert_eq!(count.load(Ordering::SeqCst), 4);
        assert_eq!(scheduler.stats().drains, 1);
    }

    #[tokio::test]
    async fn test_run_returns_value() {
        let scheduler = TaskScheduler::new(2);

        let handle = scheduler.run(async { Ok(21 * 2) });
        assert_eq!(handle.await.unwrap(), 42);

        let failing = scheduler.run::<(), _>(async { Err(SpiderError::Setup("nope".to_string())) });
        assert!(matches!(failing.await, Err(SpiderError::Setup(_))));

        scheduler.wait_drained().await;
        assert_eq!(scheduler.stats().failed, 1);
    }

    #[tokio::test]
    async fn test_panicking_task_releases_slot() {
        let observer = Arc::new(CountingObserver::default());
        let scheduler = TaskScheduler::with_observer(1, observer.clone());

        let handle = scheduler.run::<(), _>(async {
            if true {
                panic!("boom");
            }
            Ok(())
        });
        let after = scheduler.run(async { Ok("still running") });

        assert!(matches!(handle.await, Err(SpiderError::TaskPanicked(_))));
        assert_eq!(after.await.unwrap(), "still running");

        scheduler.wait_drained().await;
        assert_eq!(observer.errors.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_zero_limit_raised_to_one() {
        let scheduler = TaskScheduler::new(0);
        assert_eq!(scheduler.limit(), 1);

        let value = scheduler.run(async { Ok(1) }).await.unwrap();
        assert_eq!(value, 1);
    }

    #[tokio::test]
    async fn test_map_bounded_keeps_input_order() {
        let gauge = Arc::new(Gauge::default());

        let results = map_bounded(vec![30u64, 5, 20, 1, 10], 2, |delay| {
            let gauge = Arc::clone(&gauge);
            async move {
                gauge.hold(Duration::from_millis(delay)).await;
                Ok(delay * 2)
            }
        })
        .await
        .unwrap();

        assert_eq!(results, vec![60, 10, 40, 2, 20]);
        assert!(gauge.peak.load(Ordering::SeqCst) <= 2);
    }

    #[tokio::test]
    async fn test_map_bounded_returns_first_error() {
        let finished = Arc::new(AtomicUsize::new(0));

        let result = map_bounded(0..5, 2, |i| {
            let finished = Arc::clone(&finished);
            async move {
                tokio::time::sleep(Duration::from_millis(5)).await;
                finished.fetch_add(1, Ordering::SeqCst);
                if i >= 2 {
                    Err(SpiderError::Setup(format!("item {}", i)))
                } else {
                    Ok(i)
                }
            }
        })
        .await;

        match result {
            Err(SpiderError::Setup(message)) => assert_eq!(message, "item 2"),
            other => panic!("unexpected result: {:?}", other),
        }
        assert_eq!(finished.load(Ordering::SeqCst), 5);
    }

    #[tokio::test]
    async fn test_map_bounded_empty_input() {
        let results: Vec<u32> = map_bounded(Vec::<u32>::new(), 4, |i| async move { Ok(i) })
            .await
            .unwrap();
        assert!(results.is_empty());
    }
}
