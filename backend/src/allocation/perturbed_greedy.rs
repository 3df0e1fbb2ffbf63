//! Generalized Perturbed-Greedy
//!
//! Indivisible arrivals go entirely to the available bidder maximising
//! `bid * (1 - g_perturb(y))`.
//!
//! # Availability
//!
//! An advertiser is retired, permanently, when
//! - it bids more than its remaining budget, or
//! - a win leaves it with less than the exhaustion threshold.
//!
//! Retired advertisers are never considered again, even if a later bid
//! would fit their budget.

use super::{bid_for, AllocationOutcome, AllocationStrategy, ArrivalContext, Best, BidMap};
use crate::core::tradeoff::TradeoffFunctions;
use crate::models::{Advertiser, AdvertiserId, AdvertiserRegistry, RegistryError};
use std::collections::BTreeSet;
use tracing::debug;

/// Budget below which a winner is retired
pub const DEFAULT_EXHAUSTION_THRESHOLD: f64 = 0.01;

/// Single-winner allocator driven by `g_perturb`
///
/// # Example
///
/// ```
/// use ad_allocation_core_rs::allocation::{
///     AllocationStrategy, ArrivalContext, BidMap, PerturbedGreedyAllocator,
/// };
/// use ad_allocation_core_rs::{Advertiser, AdvertiserRegistry, TradeoffFunctions};
///
/// let mut registry = AdvertiserRegistry::new();
/// registry.register(Advertiser::new(1, 100.0, 0.2)).unwrap();
/// registry.register(Advertiser::new(2, 100.0, 0.8)).unwrap();
///
/// let mut allocator =
///     PerturbedGreedyAllocator::new(TradeoffFunctions::new(0.5), 0.01, &registry);
/// let bids: BidMap = [(1, 40.0), (2, 60.0)].into_iter().collect();
/// let outcome = allocator
///     .allocate(&ArrivalContext { arrival: 1 }, &bids, &mut registry)
///     .unwrap();
///
/// assert_eq!(outcome.matched(), Some(1));
/// assert_eq!(registry.budget(1), Some(60.0));
/// ```
#[derive(Debug, Clone)]
pub struct PerturbedGreedyAllocator {
    tradeoff: TradeoffFunctions,
    exhaustion_threshold: f64,
    available: BTreeSet<AdvertiserId>,
}

impl PerturbedGreedyAllocator {
    /// Every registered advertiser starts out available.
    pub fn new(
        tradeoff: TradeoffFunctions,
        exhaustion_threshold: f64,
        registry: &AdvertiserRegistry,
    ) -> Self {
        Self {
            tradeoff,
            exhaustion_threshold,
            available: registry.ids().collect(),
        }
    }

    pub fn is_available(&self, id: AdvertiserId) -> bool {
        self.available.contains(&id)
    }

    /// Ids still in the running, ascending
    pub fn available(&self) -> impl Iterator<Item = AdvertiserId> + '_ {
        self.available.iter().copied()
    }

    fn retire(&mut self, id: AdvertiserId, reason: &'static str) {
        if self.available.remove(&id) {
            debug!(advertiser_id = id, reason, "advertiser retired");
        }
    }
}

impl AllocationStrategy for PerturbedGreedyAllocator {
    fn name(&self) -> &'static str {
        "perturbed_greedy"
    }

    fn allocate(
        &mut self,
        _arrival: &ArrivalContext,
        bids: &BidMap,
        registry: &mut AdvertiserRegistry,
    ) -> Result<AllocationOutcome, RegistryError> {
        let mut best = None;
        let mut over_budget = Vec::new();

        for &id in &self.available {
            let bid = bid_for(bids, id);
            if bid <= 0.0 {
                continue;
            }
            let advertiser = registry
                .get(id)
                .ok_or(RegistryError::UnknownAdvertiser(id))?;
            if !advertiser.can_afford(bid) {
                over_budget.push(id);
                continue;
            }
            let score = self.tradeoff.perturbed(bid, advertiser.perturbation());
            best = Best::offer(best, id, bid, score);
        }

        for id in over_budget {
            self.retire(id, "bid exceeds remaining budget");
        }

        let Some(best) = best else {
            return Ok(AllocationOutcome::Integral(None));
        };

        let remaining = registry.debit(best.id, best.bid)?;
        debug!(
            advertiser_id = best.id,
            charge = best.bid,
            remaining,
            "perturbed-greedy match"
        );
        if remaining < self.exhaustion_threshold {
            self.retire(best.id, "budget below exhaustion threshold");
        }

        Ok(AllocationOutcome::Integral(Some(best.id)))
    }

    fn is_eligible(&self, advertiser: &Advertiser) -> bool {
        self.is_available(advertiser.id())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn setup(entries: &[(AdvertiserId, f64, f64)]) -> (AdvertiserRegistry, PerturbedGreedyAllocator) {
        let mut registry = AdvertiserRegistry::new();
        for &(id, budget, y) in entries {
            registry.register(Advertiser::new(id, budget, y)).unwrap();
        }
        let allocator = PerturbedGreedyAllocator::new(
            TradeoffFunctions::new(0.5),
            DEFAULT_EXHAUSTION_THRESHOLD,
            &registry,
        );
        (registry, allocator)
    }

    fn arrival(
        allocator: &mut PerturbedGreedyAllocator,
        registry: &mut AdvertiserRegistry,
        t: u64,
        entries: &[(AdvertiserId, f64)],
    ) -> Option<AdvertiserId> {
        let bids: BidMap = entries.iter().copied().collect();
        allocator
            .allocate(&ArrivalContext { arrival: t }, &bids, registry)
            .unwrap()
            .matched()
    }

    #[test]
    fn test_over_budget_bidder_is_retired_for_good() {
        let (mut registry, mut allocator) = setup(&[(1, 100.0, 0.2), (2, 100.0, 0.8)]);

        assert_eq!(arrival(&mut allocator, &mut registry, 1, &[(1, 40.0), (2, 60.0)]), Some(1));
        assert_eq!(arrival(&mut allocator, &mut registry, 2, &[(1, 70.0), (2, 50.0)]), Some(2));
        assert!(!allocator.is_available(1));

        // Affordable now, but retired advertisers never come back.
        assert_eq!(arrival(&mut allocator, &mut registry, 3, &[(1, 10.0)]), None);
        assert_eq!(registry.budget(1), Some(60.0));
    }

    #[test]
    fn test_winner_below_threshold_is_retired() {
        let (mut registry, mut allocator) = setup(&[(1, 50.0, 0.5)]);

        assert_eq!(arrival(&mut allocator, &mut registry, 1, &[(1, 49.995)]), Some(1));
        assert!(!allocator.is_available(1));
        assert_eq!(allocator.available().count(), 0);
    }

    #[test]
    fn test_exact_budget_bid_wins() {
        let (mut registry, mut allocator) = setup(&[(1, 30.0, 0.5)]);

        assert_eq!(arrival(&mut allocator, &mut registry, 1, &[(1, 30.0)]), Some(1));
        assert_eq!(registry.budget(1), Some(0.0));
        assert!(!allocator.is_available(1));
    }

    #[test]
    fn test_tie_goes_to_lowest_id() {
        let (mut registry, mut allocator) = setup(&[(3, 100.0, 0.4), (1, 100.0, 0.4), (2, 100.0, 0.4)]);

        let winner = arrival(&mut allocator, &mut registry, 1, &[(3, 20.0), (2, 20.0), (1, 20.0)]);
        assert_eq!(winner, Some(1));
    }

    #[test]
    fn test_no_bidders_is_no_match() {
        let (mut registry, mut allocator) = setup(&[(1, 100.0, 0.4)]);
        assert_eq!(arrival(&mut allocator, &mut registry, 1, &[]), None);
        assert_eq!(registry.budget(1), Some(100.0));
        assert!(allocator.is_available(1));
    }
}
