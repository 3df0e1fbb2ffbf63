//! Allocation Strategies
//!
//! This module defines the decision interface shared by the three online
//! allocators.
//!
//! # Overview
//!
//! Every arrival carries a bid per interested advertiser. The active
//! strategy must decide immediately, and irrevocably, who gets the arrival:
//!
//! 1. **PartialAllocation**: divisible arrival, split fractionally in order of
//!    `bid * (1 - g_time(t) * y)`
//! 2. **PerturbedGreedy**: indivisible arrival, single winner by
//!    `bid * (1 - g_perturb(y))`, with permanent retirement of advertisers
//!    that can no longer pay
//! 3. **Balance**: indivisible arrival, single winner by `bid * psi(slab)`,
//!    favouring advertisers that have spent less of their budget
//!
//! # Strategy Interface
//!
//! ```rust
//! use ad_allocation_core_rs::allocation::{
//!     AllocationOutcome, AllocationStrategy, ArrivalContext, BidMap,
//! };
//! use ad_allocation_core_rs::{AdvertiserRegistry, RegistryError};
//!
//! struct NeverMatch;
//!
//! impl AllocationStrategy for NeverMatch {
//!     fn name(&self) -> &'static str {
//!         "never_match"
//!     }
//!
//!     fn allocate(
//!         &mut self,
//!         _arrival: &ArrivalContext,
//!         _bids: &BidMap,
//!         _registry: &mut AdvertiserRegistry,
//!     ) -> Result<AllocationOutcome, RegistryError> {
//!         Ok(AllocationOutcome::Integral(None))
//!     }
//! }
//! ```
//!
//! # Tie-breaking
//!
//! Candidates are always visited in ascending advertiser id and the
//! incumbent is only replaced on a strictly greater score. The lowest id
//! therefore wins every tie, whatever order the bid map iterates in.

use crate::models::{Advertiser, AdvertiserId, AdvertiserRegistry, RegistryError};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};

pub mod balance;
pub mod partial;
pub mod perturbed_greedy;

pub use balance::BalanceAllocator;
pub use partial::PartialAllocator;
pub use perturbed_greedy::PerturbedGreedyAllocator;

/// Bids of one arrival, advertiser id → bid. Missing ids did not bid.
pub type BidMap = HashMap<AdvertiserId, f64>;

/// Fraction of a divisible arrival awarded to each advertiser.
pub type FractionalAllocation = BTreeMap<AdvertiserId, f64>;

/// Per-arrival information handed to the strategy
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ArrivalContext {
    /// Index `t` of this arrival, starting at 1
    pub arrival: u64,
}

/// Result of processing one arrival
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum AllocationOutcome {
    /// Fractions per advertiser; may be empty and may sum to less than 1
    Fractional(FractionalAllocation),

    /// Single winner, or `None` when nobody qualified
    Integral(Option<AdvertiserId>),
}

impl AllocationOutcome {
    /// Fraction map of a divisible arrival
    pub fn fractions(&self) -> Option<&FractionalAllocation> {
        match self {
            AllocationOutcome::Fractional(map) => Some(map),
            AllocationOutcome::Integral(_) => None,
        }
    }

    /// Winner of an indivisible arrival
    pub fn matched(&self) -> Option<AdvertiserId> {
        match self {
            AllocationOutcome::Fractional(_) => None,
            AllocationOutcome::Integral(winner) => *winner,
        }
    }

    /// Nothing was allocated
    pub fn is_empty(&self) -> bool {
        match self {
            AllocationOutcome::Fractional(map) => map.is_empty(),
            AllocationOutcome::Integral(winner) => winner.is_none(),
        }
    }

    /// `(advertiser, fraction, charge)` for every award, ascending id.
    ///
    /// An integral match is a fraction of 1 charged the full bid.
    pub fn charges(&self, bids: &BidMap) -> Vec<(AdvertiserId, f64, f64)> {
        match self {
            AllocationOutcome::Fractional(map) => map
                .iter()
                .map(|(&id, &fraction)| (id, fraction, bid_for(bids, id) * fraction))
                .collect(),
            AllocationOutcome::Integral(Some(id)) => vec![(*id, 1.0, bid_for(bids, *id))],
            AllocationOutcome::Integral(None) => Vec::new(),
        }
    }

    /// Revenue earned on this arrival
    pub fn revenue(&self, bids: &BidMap) -> f64 {
        self.charges(bids).iter().map(|&(_, _, charge)| charge).sum()
    }
}

/// Online allocation algorithm
///
/// Implementations receive the registry mutably for the duration of one
/// arrival and must keep every budget inside `[0, initial_budget]`.
pub trait AllocationStrategy: Send {
    /// Short identifier used in logs and snapshots
    fn name(&self) -> &'static str;

    /// Decide the arrival and charge the winners.
    fn allocate(
        &mut self,
        arrival: &ArrivalContext,
        bids: &BidMap,
        registry: &mut AdvertiserRegistry,
    ) -> Result<AllocationOutcome, RegistryError>;

    /// Can `advertiser` still win future arrivals?
    fn is_eligible(&self, advertiser: &Advertiser) -> bool {
        !advertiser.is_exhausted()
    }

    /// Current `(slab, psi(slab))` for slab-based strategies
    fn slab_weight(&self, _advertiser: &Advertiser) -> Option<(usize, f64)> {
        None
    }
}

/// Bid of `id`, 0 when absent
pub(crate) fn bid_for(bids: &BidMap, id: AdvertiserId) -> f64 {
    bids.get(&id).copied().unwrap_or(0.0)
}

/// Running arg-max over candidates visited in ascending id order
#[derive(Debug, Clone, Copy)]
pub(crate) struct Best {
    pub id: AdvertiserId,
    pub bid: f64,
    pub score: f64,
}

impl Best {
    /// Keep the incumbent unless `score` is strictly greater. NaN never wins.
    pub fn offer(current: Option<Best>, id: AdvertiserId, bid: f64, score: f64) -> Option<Best> {
        if score.is_nan() {
            return current;
        }
        match current {
            Some(best) if score <= best.score => Some(best),
            _ => Some(Best { id, bid, score }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_best_keeps_incumbent_on_tie() {
        let best = Best::offer(None, 1, 10.0, 5.0);
        let best = Best::offer(best, 2, 12.0, 5.0).unwrap();
        assert_eq!(best.id, 1);
    }

    #[test]
    fn test_best_replaced_on_strictly_greater() {
        let best = Best::offer(None, 1, 10.0, 5.0);
        let best = Best::offer(best, 2, 12.0, 5.5).unwrap();
        assert_eq!(best.id, 2);
    }

    #[test]
    fn test_outcome_revenue() {
        let bids: BidMap = [(1, 40.0), (2, 60.0)].into_iter().collect();

        let integral = AllocationOutcome::Integral(Some(2));
        assert_eq!(integral.revenue(&bids), 60.0);
        assert_eq!(integral.matched(), Some(2));

        let fractional =
            AllocationOutcome::Fractional([(1, 0.5), (2, 0.25)].into_iter().collect());
        assert_eq!(fractional.revenue(&bids), 35.0);
        assert!(fractional.matched().is_none());

        assert!(AllocationOutcome::Integral(None).is_empty());
        assert_eq!(AllocationOutcome::Integral(None).revenue(&bids), 0.0);
    }
}
