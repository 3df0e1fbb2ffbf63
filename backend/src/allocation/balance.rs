//! Balance
//!
//! Indivisible arrivals go to the bidder maximising `bid * psi(slab)`,
//! where the slab tracks how much of the advertiser's budget is gone.
//! Bidders that cannot pay their full bid are skipped for this arrival only.

use super::{bid_for, AllocationOutcome, AllocationStrategy, ArrivalContext, Best, BidMap};
use crate::core::tradeoff::{psi, slab_for};
use crate::models::{Advertiser, AdvertiserRegistry, RegistryError};
use tracing::debug;

/// Slab count used when none is configured
pub const DEFAULT_SLABS: usize = 100;

/// Slab-based single-winner allocator
///
/// # Example
///
/// ```
/// use ad_allocation_core_rs::allocation::{
///     AllocationStrategy, ArrivalContext, BalanceAllocator, BidMap,
/// };
/// use ad_allocation_core_rs::{Advertiser, AdvertiserRegistry};
///
/// let mut registry = AdvertiserRegistry::new();
/// registry.register(Advertiser::new(1, 100.0, 0.0)).unwrap();
///
/// let mut allocator = BalanceAllocator::new(10);
/// let bids: BidMap = [(1, 25.0)].into_iter().collect();
/// let outcome = allocator
///     .allocate(&ArrivalContext { arrival: 1 }, &bids, &mut registry)
///     .unwrap();
///
/// assert_eq!(outcome.matched(), Some(1));
/// assert_eq!(allocator.slab(registry.get(1).unwrap()), 3);
/// ```
#[derive(Debug, Clone)]
pub struct BalanceAllocator {
    slabs: usize,
}

impl BalanceAllocator {
    /// `slabs` must be at least 1.
    pub fn new(slabs: usize) -> Self {
        Self { slabs }
    }

    pub fn slabs(&self) -> usize {
        self.slabs
    }

    /// Spend slab (1..=k) of `advertiser`
    pub fn slab(&self, advertiser: &Advertiser) -> usize {
        slab_for(advertiser.initial_budget(), advertiser.budget(), self.slabs)
    }

    /// `psi` of the advertiser's current slab
    pub fn weight(&self, advertiser: &Advertiser) -> f64 {
        psi(self.slab(advertiser), self.slabs)
    }
}

impl AllocationStrategy for BalanceAllocator {
    fn name(&self) -> &'static str {
        "balance"
    }

    fn allocate(
        &mut self,
        _arrival: &ArrivalContext,
        bids: &BidMap,
        registry: &mut AdvertiserRegistry,
    ) -> Result<AllocationOutcome, RegistryError> {
        let mut best = None;

        for advertiser in registry.iter() {
            let bid = bid_for(bids, advertiser.id());
            if bid <= 0.0 || !advertiser.can_afford(bid) {
                continue;
            }
            let score = bid * self.weight(advertiser);
            best = Best::offer(best, advertiser.id(), bid, score);
        }

        let Some(best) = best else {
            return Ok(AllocationOutcome::Integral(None));
        };

        let remaining = registry.debit(best.id, best.bid)?;
        debug!(
            advertiser_id = best.id,
            charge = best.bid,
            score = best.score,
            remaining,
            "balance match"
        );

        Ok(AllocationOutcome::Integral(Some(best.id)))
    }

    fn slab_weight(&self, advertiser: &Advertiser) -> Option<(usize, f64)> {
        let slab = self.slab(advertiser);
        Some((slab, psi(slab, self.slabs)))
    }
}
