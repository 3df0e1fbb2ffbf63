//! Ad Allocation Core - Rust Engine
//!
//! Online ad allocation (bipartite matching with budgets) with deterministic
//! execution.
//!
//! # Architecture
//!
//! - **core**: Arrival clock and trade-off functions
//! - **models**: Domain types (Advertiser, AdvertiserRegistry, Event)
//! - **allocation**: The three online allocators behind one strategy trait
//! - **engine**: Arrival loop, configuration, revenue and snapshots
//! - **arrivals**: Synthetic workload generation
//! - **rng**: Deterministic random number generation
//!
//! # Critical Invariants
//!
//! 1. Every budget stays in `[0, initial_budget]`
//! 2. All randomness is deterministic (seeded RNG, drawn only at construction)
//! 3. Ties go to the lowest advertiser id

// Module declarations
pub mod allocation;
pub mod arrivals;
pub mod core;
pub mod engine;
pub mod models;
pub mod rng;

// Re-exports for convenience
pub use allocation::{
    AllocationOutcome, AllocationStrategy, ArrivalContext, BidMap, FractionalAllocation,
};
pub use arrivals::{Workload, WorkloadConfig, WorkloadGenerator};
pub use crate::core::time::ArrivalClock;
pub use crate::core::tradeoff::{psi, slab_for, TradeoffFunctions};
pub use engine::{
    AdvertiserConfig, AdvertiserSnapshot, AlgorithmConfig, AllocationEngine, EngineConfig,
    EngineError, EngineSnapshot, RevenueAccumulator,
};
pub use models::{
    advertiser::{Advertiser, AdvertiserError, AdvertiserId},
    event::{Event, EventLog},
    registry::{AdvertiserRegistry, RegistryError},
};
pub use rng::{FixedPerturbations, PerturbationSource, RngManager};
