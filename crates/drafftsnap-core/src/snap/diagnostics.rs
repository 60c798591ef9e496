//! Developer-facing diagnostics emitted while snapping.

use std::cell::{Cell, RefCell};
use std::rc::Rc;
use std::time::Duration;
use web_time::Instant;

/// Default minimum interval between two repeated warnings.
pub const WARNING_INTERVAL: Duration = Duration::from_secs(1);

/// Receives diagnostics from the snapping engine.
pub trait Diagnostics {
    /// The candidate collector stopped at `limit` candidates.
    fn candidate_limit_reached(&self, limit: usize);
}

impl<D: Diagnostics + ?Sized> Diagnostics for Rc<D> {
    fn candidate_limit_reached(&self, limit: usize) {
        (**self).candidate_limit_reached(limit);
    }
}

/// Logs diagnostics through `log`, at most once per interval.
#[derive(Debug)]
pub struct RateLimitedLog {
    interval: Duration,
    last: Cell<Option<Instant>>,
    emitted: Cell<usize>,
}

impl Default for RateLimitedLog {
    fn default() -> Self {
        Self::new(WARNING_INTERVAL)
    }
}

impl RateLimitedLog {
    pub fn new(interval: Duration) -> Self {
        Self {
            interval,
            last: Cell::new(None),
            emitted: Cell::new(0),
        }
    }

    /// Number of warnings actually written.
    pub fn emitted(&self) -> usize {
        self.emitted.get()
    }

    fn should_emit(&self) -> bool {
        let now = Instant::now();
        let due = self
            .last
            .get()
            .is_none_or(|last| now.duration_since(last) >= self.interval);
        if due {
            self.last.set(Some(now));
            self.emitted.set(self.emitted.get() + 1);
        }
        due
    }
}

impl Diagnostics for RateLimitedLog {
    fn candidate_limit_reached(&self, limit: usize) {
        if self.should_emit() {
            log::warn!(
                "Snap candidate limit of {} items reached; some objects will not be snapped to",
                limit
            );
        }
    }
}

/// Records diagnostics for inspection; clones share the same record.
#[derive(Debug, Clone, Default)]
pub struct RecordingDiagnostics {
    limits: Rc<RefCell<Vec<usize>>>,
}

impl RecordingDiagnostics {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every limit reported so far.
    pub fn limits(&self) -> Vec<usize> {
        self.limits.borrow().clone()
    }
}

impl Diagnostics for RecordingDiagnostics {
    fn candidate_limit_reached(&self, limit: usize) {
        self.limits.borrow_mut().push(limit);
    }
}
