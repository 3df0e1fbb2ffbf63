//! Deterministic random number generation
//!
//! Uses xorshift64* algorithm for fast, deterministic random number generation.
//! Perturbation draws and synthetic bids MUST go through this module so a
//! seed fully determines a run.

mod xorshift;

pub use xorshift::RngManager;

/// Source of per-advertiser perturbation draws `y` in [0, 1).
///
/// The engine asks for exactly one draw per advertiser, in ascending id
/// order, while it is being constructed. Nothing is drawn afterwards.
pub trait PerturbationSource {
    /// Next draw; expected in [0, 1).
    fn next_perturbation(&mut self) -> f64;
}

impl PerturbationSource for RngManager {
    fn next_perturbation(&mut self) -> f64 {
        self.next_f64()
    }
}

/// Replays a fixed list of draws, cycling when exhausted.
///
/// # Example
/// ```
/// use ad_allocation_core_rs::rng::{FixedPerturbations, PerturbationSource};
///
/// let mut source = FixedPerturbations::new(vec![0.2, 0.8]);
/// assert_eq!(source.next_perturbation(), 0.2);
/// assert_eq!(source.next_perturbation(), 0.8);
/// assert_eq!(source.next_perturbation(), 0.2);
/// ```
#[derive(Debug, Clone)]
pub struct FixedPerturbations {
    values: Vec<f64>,
    cursor: usize,
}

impl FixedPerturbations {
    /// An empty list yields 0.0 for every draw.
    pub fn new(values: Vec<f64>) -> Self {
        Self { values, cursor: 0 }
    }
}

impl PerturbationSource for FixedPerturbations {
    fn next_perturbation(&mut self) -> f64 {
        if self.values.is_empty() {
            return 0.0;
        }
        let value = self.values[self.cursor % self.values.len()];
        self.cursor += 1;
        value
    }
}
