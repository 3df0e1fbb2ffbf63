//! Synthetic workload generation
//!
//! Produces advertisers and arrival bid maps for demos and experiments.
//! All generation is deterministic based on the RNG seed.
//!
//! # Key Principles
//!
//! 1. **Determinism**: Same seed + same config → same workload
//! 2. **1-based ids**: advertisers are numbered `1..=num_advertisers`
//! 3. **Sparse bids**: each advertiser bids on an arrival independently
//!    with probability `bid_probability`
//!
//! # Example
//!
//! ```
//! use ad_allocation_core_rs::arrivals::{WorkloadConfig, WorkloadGenerator};
//! use ad_allocation_core_rs::rng::RngManager;
//!
//! let mut rng = RngManager::new(42);
//! let generator = WorkloadGenerator::new(WorkloadConfig {
//!     num_advertisers: 5,
//!     num_arrivals: 10,
//!     ..WorkloadConfig::default()
//! });
//!
//! let workload = generator.generate(&mut rng);
//! assert_eq!(workload.advertisers.len(), 5);
//! assert_eq!(workload.arrivals.len(), 10);
//! ```

use crate::allocation::BidMap;
use crate::engine::AdvertiserConfig;
use crate::models::AdvertiserId;
use crate::rng::RngManager;
use serde::{Deserialize, Serialize};

/// Shape of a synthetic workload
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkloadConfig {
    pub num_advertisers: u32,

    pub num_arrivals: usize,

    /// Initial budgets are uniform in `[min, max)`
    pub budget_range: (f64, f64),

    /// Chance that a given advertiser bids on a given arrival
    pub bid_probability: f64,

    /// Bids are uniform in `[min, max)`
    pub bid_range: (f64, f64),
}

impl Default for WorkloadConfig {
    fn default() -> Self {
        Self {
            num_advertisers: 5,
            num_arrivals: 10,
            budget_range: (100.0, 1000.0),
            bid_probability: 0.8,
            bid_range: (10.0, 50.0),
        }
    }
}

/// Advertisers plus the arrival sequence they will bid on
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Workload {
    pub advertisers: Vec<AdvertiserConfig>,
    pub arrivals: Vec<BidMap>,
}

/// Generator for synthetic workloads
#[derive(Debug, Clone)]
pub struct WorkloadGenerator {
    config: WorkloadConfig,
}

impl WorkloadGenerator {
    pub fn new(config: WorkloadConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &WorkloadConfig {
        &self.config
    }

    /// Advertisers `1..=num_advertisers` with random budgets
    pub fn advertisers(&self, rng: &mut RngManager) -> Vec<AdvertiserConfig> {
        let (min, max) = self.config.budget_range;
        (1..=self.config.num_advertisers)
            .map(|id| AdvertiserConfig {
                id,
                initial_budget: rng.uniform(min, max),
            })
            .collect()
    }

    /// One bid map over advertisers `1..=num_advertisers`
    pub fn arrival(&self, rng: &mut RngManager) -> BidMap {
        let ids: Vec<AdvertiserId> = (1..=self.config.num_advertisers).collect();
        self.arrival_for(&ids, rng)
    }

    /// One bid map over `ids`. Ids are visited in the given order so the
    /// draw sequence is reproducible.
    pub fn arrival_for(&self, ids: &[AdvertiserId], rng: &mut RngManager) -> BidMap {
        let (min, max) = self.config.bid_range;
        let mut bids = BidMap::new();
        for &id in ids {
            if rng.chance(self.config.bid_probability) {
                bids.insert(id, rng.uniform(min, max));
            }
        }
        bids
    }

    pub fn arrivals(&self, rng: &mut RngManager) -> Vec<BidMap> {
        (0..self.config.num_arrivals)
            .map(|_| self.arrival(rng))
            .collect()
    }

    /// `num_arrivals` bid maps over an existing advertiser set
    pub fn arrivals_for(&self, ids: &[AdvertiserId], rng: &mut RngManager) -> Vec<BidMap> {
        (0..self.config.num_arrivals)
            .map(|_| self.arrival_for(ids, rng))
            .collect()
    }

    /// Advertisers first, then arrivals, from one RNG stream
    pub fn generate(&self, rng: &mut RngManager) -> Workload {
        let advertisers = self.advertisers(rng);
        let arrivals = self.arrivals(rng);
        Workload {
            advertisers,
            arrivals,
        }
    }
}
