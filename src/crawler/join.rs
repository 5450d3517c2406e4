//! Fan-in join counters for crawl fan-out
//!
//! A node that submits `k` children creates a [`JoinCounter`] expecting `k`
//! completions and hands each child a [`JoinToken`]. The counter's
//! continuation runs exactly once, when the last token reports, in whatever
//! order the children finish.
//!
//! A counter created with [`JoinCounter::nested`] owes one completion to its
//! parent once it joins. Completions travel up the chain of parents in a loop,
//! so the stack stays flat however deep the chain is.

use std::fmt;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

type Continuation = Box<dyn FnOnce() + Send + 'static>;

/// Counts child completions and fires a continuation when all have reported
pub struct JoinCounter {
    expected: usize,
    completed: AtomicUsize,
    continuation: Mutex<Option<Continuation>>,
    parent: Mutex<Option<Arc<JoinCounter>>>,
}

impl JoinCounter {
    /// Creates a counter expecting `expected` children
    ///
    /// With `expected == 0` the continuation runs immediately, before this
    /// function returns.
    pub fn new<F>(expected: usize, on_joined: F) -> Arc<Self>
    where
        F: FnOnce() + Send + 'static,
    {
        Self::build(expected, None, Box::new(on_joined))
    }

    /// Creates a counter that reports to `parent` after its own continuation runs
    ///
    /// The token is consumed without reporting; the parent hears from this
    /// counter exactly once, when it joins.
    pub fn nested<F>(expected: usize, parent: JoinToken, on_joined: F) -> Arc<Self>
    where
        F: FnOnce() + Send + 'static,
    {
        Self::build(expected, parent.into_parent(), Box::new(on_joined))
    }

    fn build(expected: usize, parent: Option<Arc<JoinCounter>>, on_joined: Continuation) -> Arc<Self> {
        let counter = Arc::new(Self {
            expected,
            completed: AtomicUsize::new(0),
            continuation: Mutex::new(Some(on_joined)),
            parent: Mutex::new(parent),
        });

        if expected == 0 {
            propagate(counter.fire());
        }

        counter
    }

    /// Records one child completion
    ///
    /// Returns `true` if this call completed the join.
    pub fn child_done(&self) -> bool {
        if !self.record() {
            return false;
        }

        propagate(self.fire());
        true
    }

    /// Number of children this counter waits for
    pub fn expected(&self) -> usize {
        self.expected
    }

    /// Number of children that have reported so far
    pub fn completed(&self) -> usize {
        self.completed.load(Ordering::Acquire).min(self.expected)
    }

    /// Returns true once every expected child has reported
    pub fn is_joined(&self) -> bool {
        self.completed.load(Ordering::Acquire) >= self.expected
    }

    /// Counts a completion, returning true for the one that reaches `expected`
    fn record(&self) -> bool {
        let previous = self.completed.fetch_add(1, Ordering::AcqRel);

        if previous + 1 == self.expected {
            return true;
        }

        if previous >= self.expected {
            tracing::warn!(
                "Join counter received {} completions but expected {}",
                previous + 1,
                self.expected
            );
        }

        false
    }

    /// Runs the continuation and hands back the parent now owed a completion
    fn fire(&self) -> Option<Arc<JoinCounter>> {
        let continuation = self
            .continuation
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();

        if let Some(continuation) = continuation {
            continuation();
        }

        self.parent
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take()
    }
}

/// Walks a completion up the parent chain until a counter is still waiting
fn propagate(mut next: Option<Arc<JoinCounter>>) {
    while let Some(counter) = next {
        next = if counter.record() { counter.fire() } else { None };
    }
}

impl Drop for JoinCounter {
    fn drop(&mut self) {
        // Unlink an unjoined chain one level at a time
        let mut next = self
            .parent
            .get_mut()
            .unwrap_or_else(PoisonError::into_inner)
            .take();

        while let Some(counter) = next {
            next = match Arc::try_unwrap(counter) {
                Ok(mut counter) => counter
                    .parent
                    .get_mut()
                    .unwrap_or_else(PoisonError::into_inner)
                    .take(),
                Err(_) => None,
            };
        }
    }
}

impl fmt::Debug for JoinCounter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("JoinCounter")
            .field("expected", &self.expected)
            .field("completed", &self.completed())
            .finish()
    }
}

/// A child's obligation to report to its parent's join counter
///
/// Reporting happens when the token is completed or dropped, so a child whose
/// task fails, is abandoned, or panics still releases its parent.
#[derive(Debug)]
pub struct JoinToken {
    parent: Option<Arc<JoinCounter>>,
}

impl JoinToken {
    pub fn new(parent: Arc<JoinCounter>) -> Self {
        Self {
            parent: Some(parent),
        }
    }

    /// Reports completion to the parent counter
    pub fn complete(mut self) {
        self.report();
    }

    fn into_parent(mut self) -> Option<Arc<JoinCounter>> {
        self.parent.take()
    }

    fn report(&mut self) {
        if let Some(parent) = self.parent.take() {
            parent.child_done();
        }
    }
}

impl Drop for JoinToken {
    fn drop(&mut self) {
        self.report();
    }
}
