//! Partial Allocation
//!
//! Divisible arrivals: the arrival is filled greedily, one advertiser at a
//! time, each taking as much as its budget can pay for.
//!
//! # Behavior
//!
//! - Working set: advertisers with budget left
//! - Pick the bidder maximising `bid * (1 - g_time(t) * y)`
//! - Award `min(1 - filled, budget / bid)` and charge `bid * fraction`
//! - Repeat until the arrival is full or nobody qualifies
//!
//! An advertiser whose budget caps its share is drained to exactly 0 and
//! leaves the working set.

use super::{bid_for, AllocationOutcome, AllocationStrategy, ArrivalContext, Best, BidMap};
use crate::core::tradeoff::TradeoffFunctions;
use crate::models::{AdvertiserId, AdvertiserRegistry, RegistryError};
use tracing::debug;

/// Fractional allocator driven by `g_time`
///
/// # Example
///
/// ```
/// use ad_allocation_core_rs::allocation::{
///     AllocationStrategy, ArrivalContext, BidMap, PartialAllocator,
/// };
/// use ad_allocation_core_rs::{Advertiser, AdvertiserRegistry, TradeoffFunctions};
///
/// let mut registry = AdvertiserRegistry::new();
/// registry.register(Advertiser::new(1, 20.0, 0.5)).unwrap();
/// registry.register(Advertiser::new(2, 100.0, 0.9)).unwrap();
///
/// let mut allocator = PartialAllocator::new(TradeoffFunctions::new(0.5));
/// let bids: BidMap = [(1, 40.0), (2, 40.0)].into_iter().collect();
/// let outcome = allocator
///     .allocate(&ArrivalContext { arrival: 1 }, &bids, &mut registry)
///     .unwrap();
///
/// // Advertiser 1 scores higher but can only pay for half the arrival.
/// let fractions = outcome.fractions().unwrap();
/// assert_eq!(fractions[&1], 0.5);
/// assert_eq!(fractions[&2], 0.5);
/// ```
#[derive(Debug, Clone)]
pub struct PartialAllocator {
    tradeoff: TradeoffFunctions,
}

impl PartialAllocator {
    pub fn new(tradeoff: TradeoffFunctions) -> Self {
        Self { tradeoff }
    }

    fn select(
        &self,
        working: &[AdvertiserId],
        bids: &BidMap,
        registry: &AdvertiserRegistry,
        t: u64,
    ) -> Result<Option<Best>, RegistryError> {
        let mut best = None;
        for &id in working {
            let bid = bid_for(bids, id);
            if bid <= 0.0 {
                continue;
            }
            let advertiser = registry
                .get(id)
                .ok_or(RegistryError::UnknownAdvertiser(id))?;
            let score = self
                .tradeoff
                .time_discounted(bid, t, advertiser.perturbation());
            best = Best::offer(best, id, bid, score);
        }
        Ok(best)
    }
}

impl AllocationStrategy for PartialAllocator {
    fn name(&self) -> &'static str {
        "partial_allocation"
    }

    fn allocate(
        &mut self,
        arrival: &ArrivalContext,
        bids: &BidMap,
        registry: &mut AdvertiserRegistry,
    ) -> Result<AllocationOutcome, RegistryError> {
        let mut allocations = super::FractionalAllocation::new();
        let mut filled = 0.0;
        let mut working = registry.funded_ids();

        while filled < 1.0 && !working.is_empty() {
            let Some(best) = self.select(&working, bids, registry, arrival.arrival)? else {
                break;
            };

            let budget = registry
                .budget(best.id)
                .ok_or(RegistryError::UnknownAdvertiser(best.id))?;
            let remaining = 1.0 - filled;
            let affordable = budget / best.bid;

            if affordable <= remaining {
                // Budget-capped: the advertiser pays everything it has left.
                let charge = registry.drain(best.id)?;
                if affordable > 0.0 {
                    *allocations.entry(best.id).or_insert(0.0) += affordable;
                    filled = if affordable == remaining {
                        1.0
                    } else {
                        filled + affordable
                    };
                }
                debug!(
                    advertiser_id = best.id,
                    fraction = affordable,
                    charge,
                    "budget-capped fractional allocation"
                );
                // budget / bid can underflow to 0; drop the advertiser regardless
                working.retain(|&id| id != best.id);
            } else {
                let charge = best.bid * remaining;
                registry.debit(best.id, charge)?;
                *allocations.entry(best.id).or_insert(0.0) += remaining;
                filled = 1.0;
                debug!(
                    advertiser_id = best.id,
                    fraction = remaining,
                    charge,
                    "fractional allocation filled arrival"
                );
            }

            working.retain(|&id| registry.get(id).is_some_and(|a| !a.is_exhausted()));
        }

        Ok(AllocationOutcome::Fractional(allocations))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Advertiser;

    fn registry(entries: &[(AdvertiserId, f64, f64)]) -> AdvertiserRegistry {
        let mut registry = AdvertiserRegistry::new();
        for &(id, budget, y) in entries {
            registry.register(Advertiser::new(id, budget, y)).unwrap();
        }
        registry
    }

    fn bids(entries: &[(AdvertiserId, f64)]) -> BidMap {
        entries.iter().copied().collect()
    }

    #[test]
    fn test_single_rich_bidder_takes_whole_arrival() {
        let mut registry = registry(&[(1, 100.0, 0.3)]);
        let mut allocator = PartialAllocator::new(TradeoffFunctions::new(0.5));

        let outcome = allocator
            .allocate(&ArrivalContext { arrival: 1 }, &bids(&[(1, 10.0)]), &mut registry)
            .unwrap();

        assert_eq!(outcome.fractions().unwrap()[&1], 1.0);
        assert_eq!(registry.budget(1), Some(90.0));
    }

    #[test]
    fn test_split_between_capped_and_rich_bidder() {
        // t = 1 → g = 1; scores 40*(1-0.1)=36 vs 40*(1-0.5)=20
        let mut registry = registry(&[(1, 10.0, 0.1), (2, 100.0, 0.5)]);
        let mut allocator = PartialAllocator::new(TradeoffFunctions::new(0.5));

        let outcome = allocator
            .allocate(
                &ArrivalContext { arrival: 1 },
                &bids(&[(1, 40.0), (2, 40.0)]),
                &mut registry,
            )
            .unwrap();

        let fractions = outcome.fractions().unwrap();
        assert!((fractions[&1] - 0.25).abs() < 1e-12);
        assert!((fractions[&2] - 0.75).abs() < 1e-12);
        assert_eq!(registry.budget(1), Some(0.0));
        assert!((registry.budget(2).unwrap() - 70.0).abs() < 1e-9);
    }

    #[test]
    fn test_all_capped_leaves_arrival_partially_filled() {
        let mut registry = registry(&[(1, 5.0, 0.1), (2, 5.0, 0.2)]);
        let mut allocator = PartialAllocator::new(TradeoffFunctions::new(0.5));

        let outcome = allocator
            .allocate(
                &ArrivalContext { arrival: 1 },
                &bids(&[(1, 20.0), (2, 20.0)]),
                &mut registry,
            )
            .unwrap();

        let total: f64 = outcome.fractions().unwrap().values().sum();
        assert!((total - 0.5).abs() < 1e-12);
        assert_eq!(registry.total_budget(), 0.0);
    }

    #[test]
    fn test_zero_and_missing_bids_are_ignored() {
        let mut registry = registry(&[(1, 50.0, 0.1), (2, 50.0, 0.2)]);
        let mut allocator = PartialAllocator::new(TradeoffFunctions::new(0.5));

        let outcome = allocator
            .allocate(&ArrivalContext { arrival: 1 }, &bids(&[(1, 0.0)]), &mut registry)
            .unwrap();

        assert!(outcome.is_empty());
        assert_eq!(registry.total_budget(), 100.0);
    }

    #[test]
    fn test_negative_scores_still_win_when_only_candidate() {
        // t = 10 → g_time = e^4.5 ≈ 90, so 1 - g*y is strongly negative
        let mut registry = registry(&[(1, 100.0, 0.9)]);
        let mut allocator = PartialAllocator::new(TradeoffFunctions::new(0.5));

        let outcome = allocator
            .allocate(&ArrivalContext { arrival: 10 }, &bids(&[(1, 10.0)]), &mut registry)
            .unwrap();

        assert_eq!(outcome.fractions().unwrap()[&1], 1.0);
    }
}
