//! Fault injection for simulated vendor clients.

use parking_lot::Mutex;
use std::collections::{HashMap, VecDeque};

/// Per-call queues of injected errors plus call counters.
///
/// Every simulated client call first passes through [`FaultPlan::check`],
/// which counts the call and pops the next queued error for that call, if
/// any.
#[derive(Debug)]
pub struct FaultPlan<E> {
    queued: Mutex<HashMap<&'static str, VecDeque<E>>>,
    calls: Mutex<HashMap<&'static str, usize>>,
}

impl<E> Default for FaultPlan<E> {
    fn default() -> Self {
        Self {
            queued: Mutex::new(HashMap::new()),
            calls: Mutex::new(HashMap::new()),
        }
    }
}

impl<E: Clone> FaultPlan<E> {
    /// Creates a plan with nothing queued.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes the next call to `call` fail with `err`.
    pub fn fail_next(&self, call: &'static str, err: E) {
        self.fail_times(call, 1, err);
    }

    /// Makes the next `times` calls to `call` fail with `err`.
    pub fn fail_times(&self, call: &'static str, times: usize, err: E) {
        let mut queued = self.queued.lock();
        let queue = queued.entry(call).or_default();
        queue.extend(std::iter::repeat(err).take(times));
    }

    /// Drops every queued error.
    pub fn clear(&self) {
        self.queued.lock().clear();
    }

    /// Number of times `call` was made.
    #[must_use]
    pub fn calls(&self, call: &str) -> usize {
        self.calls.lock().get(call).copied().unwrap_or(0)
    }

    /// Total number of calls made.
    #[must_use]
    pub fn total_calls(&self) -> usize {
        self.calls.lock().values().sum()
    }

    /// Resets the call counters.
    pub fn reset_calls(&self) {
        self.calls.lock().clear();
    }

    /// Counts a call to `call` and returns its queued error, if any.
    pub fn check(&self, call: &'static str) -> Result<(), E> {
        *self.calls.lock().entry(call).or_insert(0) += 1;
        match self.queued.lock().get_mut(call).and_then(VecDeque::pop_front) {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }
}
