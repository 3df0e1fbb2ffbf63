//! Trade-off functions
//!
//! Pure weights that discount a raw bid:
//!
//! - `g_time(t) = exp(beta * (t - 1))` drives partial allocation
//! - `g_perturb(y) = exp(beta * (y - 1))` drives perturbed-greedy
//! - `psi(slab, k) = 1 - exp(-(1 - slab / k))` drives balance
//!
//! All three are plain `f64` arithmetic with no special-casing beyond what
//! is noted on each function.

use serde::{Deserialize, Serialize};

/// The `beta`-parameterised trade-off functions.
///
/// # Example
/// ```
/// use ad_allocation_core_rs::TradeoffFunctions;
///
/// let tradeoff = TradeoffFunctions::new(0.5);
/// assert_eq!(tradeoff.g_time(1), 1.0);
/// assert!((tradeoff.g_perturb(0.2) - (-0.4f64).exp()).abs() < 1e-12);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TradeoffFunctions {
    beta: f64,
}

impl TradeoffFunctions {
    pub fn new(beta: f64) -> Self {
        Self { beta }
    }

    pub fn beta(&self) -> f64 {
        self.beta
    }

    /// `exp(beta * (t - 1))`
    pub fn g_time(&self, t: u64) -> f64 {
        (self.beta * (t as f64 - 1.0)).exp()
    }

    /// `exp(beta * (y - 1))`
    pub fn g_perturb(&self, y: f64) -> f64 {
        (self.beta * (y - 1.0)).exp()
    }

    /// Partial-allocation score `bid * (1 - g_time(t) * y)`.
    ///
    /// `g_time` overflows to infinity for large `t`; the discount is taken as
    /// 0 when `y == 0` since `inf * 0` is NaN.
    pub fn time_discounted(&self, bid: f64, t: u64, y: f64) -> f64 {
        let discount = if y == 0.0 { 0.0 } else { self.g_time(t) * y };
        bid * (1.0 - discount)
    }

    /// Perturbed-greedy score `bid * (1 - g_perturb(y))`.
    pub fn perturbed(&self, bid: f64, y: f64) -> f64 {
        bid * (1.0 - self.g_perturb(y))
    }
}

/// Balance weight `1 - exp(-(1 - slab / k))`.
///
/// Non-increasing in `slab`; reaches 0 at `slab == k`.
pub fn psi(slab: usize, slabs: usize) -> f64 {
    1.0 - (-(1.0 - slab as f64 / slabs as f64)).exp()
}

/// Slab (1..=k) an advertiser's spend falls into.
///
/// An untouched budget is slab 1. Otherwise the slab is
/// `min(k, ceil(spent_fraction * k))`.
pub fn slab_for(initial_budget: f64, budget: f64, slabs: usize) -> usize {
    if budget >= initial_budget {
        return 1;
    }
    let spent_fraction = (initial_budget - budget) / initial_budget;
    let slab = (spent_fraction * slabs as f64).ceil() as usize;
    slab.clamp(1, slabs)
}
