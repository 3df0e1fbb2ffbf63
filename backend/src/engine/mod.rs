//! Allocation engine - owns the registry and drives one strategy
//!
//! See `ad_system.rs` for the arrival loop and `snapshot.rs` for reports.

pub mod ad_system;
pub mod snapshot;

pub use ad_system::{
    AdvertiserConfig, AlgorithmConfig, AllocationEngine, EngineConfig, EngineError,
    RevenueAccumulator, DEFAULT_BETA,
};
pub use snapshot::{compute_config_hash, AdvertiserSnapshot, EngineSnapshot};
