//! Allocation engine
//!
//! Owns the advertiser registry and exactly one allocation strategy, and
//! turns a stream of arrivals into irrevocable allocations.
//!
//! # Arrival loop
//!
//! For every call to [`AllocationEngine::process_arrival`]:
//! 1. Validate the bid map (fail fast, nothing mutated)
//! 2. Advance the arrival counter `t`
//! 3. Dispatch to the configured strategy, which charges the winners
//! 4. Book revenue and record events (including retirements)
//!
//! The engine is single-threaded and synchronous. It is `Send`, so it can
//! be moved to a worker, but concurrent callers must serialise access
//! themselves.

use crate::allocation::{
    AllocationOutcome, AllocationStrategy, ArrivalContext, BalanceAllocator, BidMap,
    PartialAllocator, PerturbedGreedyAllocator,
};
use crate::allocation::balance::DEFAULT_SLABS;
use crate::allocation::perturbed_greedy::DEFAULT_EXHAUSTION_THRESHOLD;
use crate::core::time::ArrivalClock;
use crate::core::tradeoff::TradeoffFunctions;
use crate::engine::snapshot::{compute_config_hash, EngineSnapshot};
use crate::models::{
    Advertiser, AdvertiserId, AdvertiserRegistry, Event, EventLog, RegistryError,
};
use crate::rng::{PerturbationSource, RngManager};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};
use thiserror::Error;
use tracing::{debug, field, info, instrument, trace};

/// Perturbation coefficient used by the reference runs
pub const DEFAULT_BETA: f64 = 0.5;

// ============================================================================
// Configuration Types
// ============================================================================

/// Per-advertiser configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AdvertiserConfig {
    /// Unique, 1-based identifier
    pub id: AdvertiserId,

    /// Budget the advertiser starts with
    pub initial_budget: f64,
}

/// Algorithm selection, fixed for the lifetime of an engine
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum AlgorithmConfig {
    /// Fractional allocation of divisible arrivals
    PartialAllocation,

    /// Single winner with perturbation draws and permanent retirement
    PerturbedGreedy {
        #[serde(default = "default_exhaustion_threshold")]
        exhaustion_threshold: f64,
    },

    /// Single winner weighted by budget-spend slab
    Balance {
        #[serde(default = "default_slabs")]
        slabs: usize,
    },
}

impl AlgorithmConfig {
    /// Perturbed-greedy with the default exhaustion threshold
    pub fn perturbed_greedy() -> Self {
        AlgorithmConfig::PerturbedGreedy {
            exhaustion_threshold: DEFAULT_EXHAUSTION_THRESHOLD,
        }
    }

    pub fn balance(slabs: usize) -> Self {
        AlgorithmConfig::Balance { slabs }
    }

    pub fn name(&self) -> &'static str {
        match self {
            AlgorithmConfig::PartialAllocation => "partial_allocation",
            AlgorithmConfig::PerturbedGreedy { .. } => "perturbed_greedy",
            AlgorithmConfig::Balance { .. } => "balance",
        }
    }
}

fn default_beta() -> f64 {
    DEFAULT_BETA
}

fn default_exhaustion_threshold() -> f64 {
    DEFAULT_EXHAUSTION_THRESHOLD
}

fn default_slabs() -> usize {
    DEFAULT_SLABS
}

fn default_record_events() -> bool {
    true
}

/// Complete engine configuration
///
/// # Example
///
/// ```
/// use ad_allocation_core_rs::{AdvertiserConfig, AlgorithmConfig, EngineConfig};
///
/// let config = EngineConfig::from_json(
///     r#"{
///         "advertisers": [{ "id": 1, "initial_budget": 100.0 }],
///         "algorithm": { "type": "balance", "slabs": 10 }
///     }"#,
/// )
/// .unwrap();
///
/// assert_eq!(config.beta, 0.5);
/// assert_eq!(config.algorithm, AlgorithmConfig::balance(10));
/// assert_eq!(
///     config.advertisers,
///     vec![AdvertiserConfig { id: 1, initial_budget: 100.0 }]
/// );
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EngineConfig {
    pub advertisers: Vec<AdvertiserConfig>,

    /// Perturbation coefficient `beta`
    #[serde(default = "default_beta")]
    pub beta: f64,

    pub algorithm: AlgorithmConfig,

    /// Seed for the perturbation draws
    #[serde(default)]
    pub rng_seed: u64,

    /// Keep a per-decision event log
    #[serde(default = "default_record_events")]
    pub record_events: bool,
}

impl EngineConfig {
    /// Config with default beta, seed 0 and event recording on.
    pub fn new(advertisers: Vec<AdvertiserConfig>, algorithm: AlgorithmConfig) -> Self {
        Self {
            advertisers,
            beta: DEFAULT_BETA,
            algorithm,
            rng_seed: 0,
            record_events: true,
        }
    }

    pub fn from_json(json: &str) -> Result<Self, EngineError> {
        serde_json::from_str(json)
            .map_err(|e| EngineError::Serialization(format!("Config parse failed: {}", e)))
    }
}

// ============================================================================
// Errors
// ============================================================================

#[derive(Debug, Error, PartialEq)]
pub enum EngineError {
    #[error("Invalid config: {0}")]
    InvalidConfig(String),

    #[error("Invalid bid {bid} from advertiser {advertiser_id}: bids must be finite and non-negative")]
    InvalidBid { advertiser_id: AdvertiserId, bid: f64 },

    #[error(transparent)]
    Registry(#[from] RegistryError),

    #[error("Serialization error: {0}")]
    Serialization(String),
}

// ============================================================================
// Revenue
// ============================================================================

/// Revenue booked over a run
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RevenueAccumulator {
    /// Sum of all charges
    pub total_revenue: f64,

    /// Arrivals that produced at least one award
    pub matched_arrivals: u64,

    /// Arrivals nobody qualified for
    pub unmatched_arrivals: u64,

    /// Total charged per advertiser
    pub spend_by_advertiser: BTreeMap<AdvertiserId, f64>,
}

impl RevenueAccumulator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Book the charges of one arrival.
    pub fn record(&mut self, outcome: &AllocationOutcome, bids: &BidMap) {
        let charges = outcome.charges(bids);
        if charges.is_empty() {
            self.unmatched_arrivals += 1;
            return;
        }
        self.matched_arrivals += 1;
        for (id, _, charge) in charges {
            self.total_revenue += charge;
            *self.spend_by_advertiser.entry(id).or_insert(0.0) += charge;
        }
    }

    pub fn arrivals(&self) -> u64 {
        self.matched_arrivals + self.unmatched_arrivals
    }

    /// Share of arrivals that were (at least partly) matched
    pub fn match_rate(&self) -> f64 {
        match self.arrivals() {
            0 => 0.0,
            n => self.matched_arrivals as f64 / n as f64,
        }
    }
}

// ============================================================================
// Engine
// ============================================================================

/// Online ad-allocation engine
///
/// # Example
///
/// ```
/// use ad_allocation_core_rs::rng::FixedPerturbations;
/// use ad_allocation_core_rs::{
///     AdvertiserConfig, AlgorithmConfig, AllocationEngine, BidMap, EngineConfig,
/// };
///
/// let config = EngineConfig::new(
///     vec![
///         AdvertiserConfig { id: 1, initial_budget: 100.0 },
///         AdvertiserConfig { id: 2, initial_budget: 100.0 },
///     ],
///     AlgorithmConfig::perturbed_greedy(),
/// );
/// let mut draws = FixedPerturbations::new(vec![0.2, 0.8]);
/// let mut engine = AllocationEngine::with_perturbation_source(config, &mut draws).unwrap();
///
/// let bids: BidMap = [(1, 40.0), (2, 60.0)].into_iter().collect();
/// let outcome = engine.process_arrival(&bids).unwrap();
///
/// assert_eq!(outcome.matched(), Some(1));
/// assert_eq!(engine.registry().budget(1), Some(60.0));
/// ```
pub struct AllocationEngine {
    registry: AdvertiserRegistry,
    strategy: Box<dyn AllocationStrategy>,
    tradeoff: TradeoffFunctions,
    clock: ArrivalClock,
    revenue: RevenueAccumulator,
    event_log: EventLog,
    config: EngineConfig,
    config_hash: String,
}

impl AllocationEngine {
    /// Build an engine whose perturbation draws come from `config.rng_seed`.
    pub fn new(config: EngineConfig) -> Result<Self, EngineError> {
        let mut rng = RngManager::new(config.rng_seed);
        Self::with_perturbation_source(config, &mut rng)
    }

    /// Build an engine drawing one `y` per advertiser, ascending id, from
    /// `source`.
    pub fn with_perturbation_source<S>(
        config: EngineConfig,
        source: &mut S,
    ) -> Result<Self, EngineError>
    where
        S: PerturbationSource + ?Sized,
    {
        Self::validate_config(&config)?;

        let mut advertiser_configs: Vec<&AdvertiserConfig> = config.advertisers.iter().collect();
        advertiser_configs.sort_by_key(|ac| ac.id);

        let mut registry = AdvertiserRegistry::new();
        for ac in advertiser_configs {
            let y = source.next_perturbation();
            if !(0.0..1.0).contains(&y) {
                return Err(EngineError::InvalidConfig(format!(
                    "perturbation draw {} for advertiser {} is outside [0, 1)",
                    y, ac.id
                )));
            }
            registry.register(Advertiser::new(ac.id, ac.initial_budget, y))?;
        }

        let tradeoff = TradeoffFunctions::new(config.beta);
        let strategy: Box<dyn AllocationStrategy> = match &config.algorithm {
            AlgorithmConfig::PartialAllocation => Box::new(PartialAllocator::new(tradeoff)),
            AlgorithmConfig::PerturbedGreedy {
                exhaustion_threshold,
            } => Box::new(PerturbedGreedyAllocator::new(
                tradeoff,
                *exhaustion_threshold,
                &registry,
            )),
            AlgorithmConfig::Balance { slabs } => Box::new(BalanceAllocator::new(*slabs)),
        };

        let config_hash = compute_config_hash(&config)?;

        info!(
            advertisers = registry.len(),
            algorithm = strategy.name(),
            beta = config.beta,
            config_hash = %config_hash,
            "allocation engine initialised"
        );

        Ok(Self {
            registry,
            strategy,
            tradeoff,
            clock: ArrivalClock::new(),
            revenue: RevenueAccumulator::new(),
            event_log: EventLog::new(),
            config,
            config_hash,
        })
    }

    /// Validate configuration
    fn validate_config(config: &EngineConfig) -> Result<(), EngineError> {
        if config.advertisers.is_empty() {
            return Err(EngineError::InvalidConfig(
                "Must have at least one advertiser".to_string(),
            ));
        }

        let mut ids = HashSet::new();
        for ac in &config.advertisers {
            if ac.id == 0 {
                return Err(EngineError::InvalidConfig(
                    "Advertiser ids start at 1; 0 is reserved".to_string(),
                ));
            }
            if !ids.insert(ac.id) {
                return Err(EngineError::InvalidConfig(format!(
                    "Duplicate advertiser ID: {}",
                    ac.id
                )));
            }
            if !ac.initial_budget.is_finite() || ac.initial_budget <= 0.0 {
                return Err(EngineError::InvalidConfig(format!(
                    "Advertiser {} initial_budget must be finite and > 0, got {}",
                    ac.id, ac.initial_budget
                )));
            }
        }

        if !config.beta.is_finite() {
            return Err(EngineError::InvalidConfig(format!(
                "beta must be finite, got {}",
                config.beta
            )));
        }

        match config.algorithm {
            AlgorithmConfig::PartialAllocation => {}
            AlgorithmConfig::PerturbedGreedy {
                exhaustion_threshold,
            } => {
                if !exhaustion_threshold.is_finite() || exhaustion_threshold < 0.0 {
                    return Err(EngineError::InvalidConfig(format!(
                        "exhaustion_threshold must be finite and >= 0, got {}",
                        exhaustion_threshold
                    )));
                }
            }
            AlgorithmConfig::Balance { slabs } => {
                if slabs == 0 {
                    return Err(EngineError::InvalidConfig(
                        "slabs must be > 0".to_string(),
                    ));
                }
            }
        }

        Ok(())
    }

    /// Lowest-id bid that is negative or not finite
    fn validate_bids(bids: &BidMap) -> Result<(), EngineError> {
        let invalid = bids
            .iter()
            .filter(|(_, bid)| !bid.is_finite() || **bid < 0.0)
            .min_by_key(|(id, _)| **id);

        match invalid {
            Some((&advertiser_id, &bid)) => Err(EngineError::InvalidBid { advertiser_id, bid }),
            None => Ok(()),
        }
    }

    // ========================================================================
    // Accessors
    // ========================================================================

    /// Number of arrivals processed so far
    pub fn arrivals_processed(&self) -> u64 {
        self.clock.current()
    }

    pub fn beta(&self) -> f64 {
        self.tradeoff.beta()
    }

    pub fn tradeoff(&self) -> &TradeoffFunctions {
        &self.tradeoff
    }

    pub fn algorithm_name(&self) -> &'static str {
        self.strategy.name()
    }

    pub fn registry(&self) -> &AdvertiserRegistry {
        &self.registry
    }

    pub fn advertiser(&self, id: AdvertiserId) -> Option<&Advertiser> {
        self.registry.get(id)
    }

    /// Can `id` still win future arrivals under the active strategy?
    pub fn is_eligible(&self, id: AdvertiserId) -> bool {
        self.registry
            .get(id)
            .is_some_and(|a| self.strategy.is_eligible(a))
    }

    /// `(slab, psi)` of `id` when the balance strategy is active
    pub fn slab_weight(&self, id: AdvertiserId) -> Option<(usize, f64)> {
        self.registry
            .get(id)
            .and_then(|a| self.strategy.slab_weight(a))
    }

    pub fn revenue(&self) -> &RevenueAccumulator {
        &self.revenue
    }

    pub fn event_log(&self) -> &EventLog {
        &self.event_log
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// SHA-256 of the canonical JSON config
    pub fn config_hash(&self) -> &str {
        &self.config_hash
    }

    /// Point-in-time report of every advertiser
    pub fn snapshot(&self) -> EngineSnapshot {
        EngineSnapshot::capture(self)
    }

    fn eligible_ids(&self) -> Vec<AdvertiserId> {
        self.registry
            .iter()
            .filter(|a| self.strategy.is_eligible(a))
            .map(Advertiser::id)
            .collect()
    }

    // ========================================================================
    // Arrival Processing
    // ========================================================================

    /// Decide one arrival
    ///
    /// # Returns
    ///
    /// * `Ok(AllocationOutcome::Fractional(_))` - partial allocation
    /// * `Ok(AllocationOutcome::Integral(_))` - perturbed-greedy or balance
    /// * `Err(EngineError::InvalidBid)` - negative or non-finite bid; the
    ///   arrival is rejected before anything changes
    #[instrument(skip_all, fields(arrival = field::Empty, algorithm = self.strategy.name()))]
    pub fn process_arrival(&mut self, bids: &BidMap) -> Result<AllocationOutcome, EngineError> {
        Self::validate_bids(bids)?;

        let t = self.clock.advance();
        tracing::Span::current().record("arrival", t);

        for id in bids.keys().filter(|id| !self.registry.contains(**id)) {
            trace!(advertiser_id = *id, "ignoring bid from unregistered advertiser");
        }

        let eligible_before = self.eligible_ids();

        let outcome =
            self.strategy
                .allocate(&ArrivalContext { arrival: t }, bids, &mut self.registry)?;

        self.revenue.record(&outcome, bids);

        if outcome.is_empty() {
            debug!("no qualifying bidder");
        }

        let retired: Vec<&Advertiser> = eligible_before
            .iter()
            .filter_map(|&id| self.registry.get(id))
            .filter(|a| !self.strategy.is_eligible(a))
            .collect();
        for advertiser in &retired {
            debug!(
                advertiser_id = advertiser.id(),
                remaining_budget = advertiser.budget(),
                "advertiser no longer eligible"
            );
        }

        if self.config.record_events {
            let mut events = Vec::new();
            match &outcome {
                AllocationOutcome::Fractional(_) => {
                    for (advertiser_id, fraction, charge) in outcome.charges(bids) {
                        events.push(Event::Allocated {
                            arrival: t,
                            advertiser_id,
                            fraction,
                            charge,
                        });
                    }
                }
                AllocationOutcome::Integral(Some(advertiser_id)) => {
                    events.push(Event::Matched {
                        arrival: t,
                        advertiser_id: *advertiser_id,
                        charge: outcome.revenue(bids),
                    });
                }
                AllocationOutcome::Integral(None) => {}
            }
            if outcome.is_empty() {
                events.push(Event::Unmatched { arrival: t });
            }
            for advertiser in &retired {
                events.push(Event::AdvertiserRetired {
                    arrival: t,
                    advertiser_id: advertiser.id(),
                    remaining_budget: advertiser.budget(),
                });
            }
            for event in events {
                self.event_log.log(event);
            }
        }

        Ok(outcome)
    }
}

impl std::fmt::Debug for AllocationEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AllocationEngine")
            .field("algorithm", &self.strategy.name())
            .field("beta", &self.tradeoff.beta())
            .field("arrivals_processed", &self.clock.current())
            .field("registry", &self.registry)
            .finish()
    }
}
