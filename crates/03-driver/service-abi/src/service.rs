//! Submission seam between firmware callers and the backend that runs their calls.

use smallvec::SmallVec;

/// A backend that runs firmware calls and hands back their reports.
///
/// A submitted call runs to completion before `try_submit` returns; its
/// reports (for example a read's `Data` followed by its `Done`) are queued in
/// call order and collected with `drain`. Neither method blocks.
pub trait Service {
    type Cmd: Send + 'static;
    type Rep: Send + 'static;

    /// Runs `cmd` if every report it can produce fits in the queue.
    ///
    /// On `WouldBlock` the call has not run and left no side effects, so the
    /// caller may drain and submit the same command again.
    fn try_submit(&self, cmd: &Self::Cmd) -> SubmitOutcome;

    /// Pops up to `max` queued reports, oldest first.
    fn drain(&self, max: usize) -> SmallVec<[Self::Rep; 8]>;
}

/// Whether a firmware call was run.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SubmitOutcome {
    /// The call ran and its reports are queued.
    Accepted,
    /// The report queue is too full for the call's reports; nothing ran.
    WouldBlock,
    /// The backend was shut down; nothing ran.
    Closed,
}
