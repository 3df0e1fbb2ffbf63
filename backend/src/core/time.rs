//! Arrival clock
//!
//! The engine's notion of time is the number of arrivals seen so far.
//! The counter is advanced *before* an arrival is processed, so the first
//! arrival runs at `t = 1`.

use serde::{Deserialize, Serialize};

/// Monotonic arrival counter
///
/// # Example
/// ```
/// use ad_allocation_core_rs::ArrivalClock;
///
/// let mut clock = ArrivalClock::new();
/// assert_eq!(clock.current(), 0);
///
/// assert_eq!(clock.advance(), 1);
/// assert_eq!(clock.current(), 1);
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArrivalClock {
    arrivals: u64,
}

impl ArrivalClock {
    pub fn new() -> Self {
        Self::default()
    }

    /// Count a new arrival and return its index `t`.
    pub fn advance(&mut self) -> u64 {
        self.arrivals += 1;
        self.arrivals
    }

    /// Index of the most recent arrival (0 before the first one).
    pub fn current(&self) -> u64 {
        self.arrivals
    }
}
