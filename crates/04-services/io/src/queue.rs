//! Bounded report queue shared by the submit and drain sides of a service.

use parking_lot::Mutex;
use service_abi::SubmitOutcome;
use smallvec::SmallVec;
use std::collections::VecDeque;

pub struct ReportQueue<Rep> {
    inner: Mutex<VecDeque<Rep>>,
    capacity: usize,
}

impl<Rep> ReportQueue<Rep> {
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            inner: Mutex::new(VecDeque::with_capacity(capacity)),
            capacity,
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn len(&self) -> usize {
        self.inner.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.lock().is_empty()
    }

    /// Runs `materialise` and queues its reports if `needed` more fit.
    ///
    /// The queue stays locked while `materialise` runs, so a command is either
    /// executed with room for its reports or not executed at all.
    pub fn try_submit_with<F>(&self, needed: usize, materialise: F) -> SubmitOutcome
    where
        F: FnOnce() -> SmallVec<[Rep; 8]>,
    {
        let mut inner = self.inner.lock();
        if inner.len() + needed > self.capacity {
            return SubmitOutcome::WouldBlock;
        }
        inner.extend(materialise());
        SubmitOutcome::Accepted
    }

    /// Pops up to `max` reports in submission order.
    pub fn drain(&self, max: usize) -> SmallVec<[Rep; 8]> {
        if max == 0 {
            return SmallVec::new();
        }
        let mut inner = self.inner.lock();
        let limit = max.min(inner.len());
        inner.drain(..limit).collect()
    }
}
