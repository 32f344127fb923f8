//! Time sources for tick timing and profiling

use std::{cell::Cell, rc::Rc, time::Instant};

/// Microsecond time source
pub trait Clock {
    /// Microseconds since an arbitrary fixed origin
    fn now_us(&self) -> u64;
}

/// Wall-clock time since construction
#[derive(Debug, Clone, Copy)]
pub struct MonotonicClock {
    origin: Instant,
}

impl MonotonicClock {
    /// Start a clock at zero
    pub fn new() -> Self {
        Self {
            origin: Instant::now(),
        }
    }
}

impl Default for MonotonicClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for MonotonicClock {
    fn now_us(&self) -> u64 {
        self.origin.elapsed().as_micros() as u64
    }
}

/// Deterministic clock driven by hand
///
/// Clones share the same time, so a test can keep one handle while the
/// processor owns another. With a non-zero step every read advances time,
/// which makes each profiled stage take a known duration.
#[derive(Debug, Clone, Default)]
pub struct ManualClock {
    now: Rc<Cell<u64>>,
    step_us: u64,
}

impl ManualClock {
    /// Clock frozen at zero
    pub fn new() -> Self {
        Self::default()
    }

    /// Clock that advances `step_us` after every read
    pub fn stepping(step_us: u64) -> Self {
        Self {
            now: Rc::default(),
            step_us,
        }
    }

    /// Move time forward
    pub fn advance(&self, us: u64) {
        self.now.set(self.now.get().saturating_add(us));
    }

    /// Jump to an absolute time
    pub fn set(&self, us: u64) {
        self.now.set(us);
    }
}

impl Clock for ManualClock {
    fn now_us(&self) -> u64 {
        let t = self.now.get();
        self.now.set(t.saturating_add(self.step_us));
        t
    }
}
