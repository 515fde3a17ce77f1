//! cooperative time slicing – every incremental task checks one of these
//! between work items and parks its cursor once the slice is spent

use std::time::{Duration, Instant};

#[derive(Clone, Copy, Debug)]
pub struct FrameBudget {
    started: Instant,
    limit: Option<Duration>,
}

impl FrameBudget {
    /// a fresh slice of `limit`, starting now
    pub fn start(limit: Duration) -> Self {
        Self {
            started: Instant::now(),
            limit: Some(limit),
        }
    }

    /// never runs out (tests, offline generation)
    pub fn unlimited() -> Self {
        Self {
            started: Instant::now(),
            limit: None,
        }
    }

    /// already used up: a task stepped with it does one unit of work and parks
    pub fn spent() -> Self {
        let now = Instant::now();
        Self {
            started: now.checked_sub(Duration::from_millis(1)).unwrap_or(now),
            limit: Some(Duration::ZERO),
        }
    }

    #[inline]
    pub fn exhausted(&self) -> bool {
        match self.limit {
            Some(limit) => self.started.elapsed() > limit,
            None => false,
        }
    }
}
