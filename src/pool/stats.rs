/// Snapshot of a pool's custody counts.
///
/// All fields are read under the pool lock, so a single snapshot is
/// consistent, but it may be stale by the time it is inspected.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct PoolStats {
    total: usize,
    idle: usize,
    active: usize,
    waiting: usize,
}

impl PoolStats {
    pub(crate) fn new(idle: usize, active: usize, waiting: usize) -> Self {
        Self { total: idle + active, idle, active, waiting }
    }

    /// Idle plus active connections.
    pub fn total(&self) -> usize {
        self.total
    }

    pub fn idle(&self) -> usize {
        self.idle
    }

    /// Connections checked out to callers.
    pub fn active(&self) -> usize {
        self.active
    }

    /// Callers parked until a connection is released.
    pub fn waiting(&self) -> usize {
        self.waiting
    }

    /// Fraction of tracked connections that are checked out, from 0.0 to 1.0.
    pub fn utilization(&self) -> f64 {
        if self.total == 0 {
            0.0
        } else {
            self.active as f64 / self.total as f64
        }
    }

    /// True when nothing is idle and at least one caller is waiting.
    pub fn is_exhausted(&self) -> bool {
        self.idle == 0 && self.waiting > 0
    }
}
