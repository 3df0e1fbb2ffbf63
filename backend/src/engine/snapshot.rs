//! Snapshot - point-in-time report of an allocation run
//!
//! Captures every advertiser's budget state together with the run's
//! counters, so a driver can render or persist it without touching the
//! engine's internals.
//!
//! # Critical Invariants
//!
//! - **Read-only**: capturing a snapshot never mutates the engine
//! - **Config identity**: `config_hash` is identical for identical configs,
//!   regardless of map ordering

use crate::engine::ad_system::{AllocationEngine, EngineError};
use crate::models::AdvertiserId;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

// ============================================================================
// Snapshot Structures
// ============================================================================

/// Engine state at one point in time
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EngineSnapshot {
    pub algorithm: String,

    pub beta: f64,

    /// Arrivals processed when the snapshot was taken
    pub arrivals_processed: u64,

    pub total_revenue: f64,

    /// Ascending by id
    pub advertisers: Vec<AdvertiserSnapshot>,

    /// SHA256 hash of the engine config
    pub config_hash: String,
}

/// Advertiser state snapshot
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AdvertiserSnapshot {
    pub id: AdvertiserId,
    pub initial_budget: f64,
    pub budget: f64,
    pub perturbation: f64,

    /// Can still win future arrivals
    pub eligible: bool,

    /// Balance strategy only
    pub slab: Option<usize>,

    /// Balance strategy only
    pub psi: Option<f64>,
}

impl EngineSnapshot {
    pub(crate) fn capture(engine: &AllocationEngine) -> Self {
        let advertisers = engine
            .registry()
            .iter()
            .map(|advertiser| {
                let id = advertiser.id();
                let slab_weight = engine.slab_weight(id);
                AdvertiserSnapshot {
                    id,
                    initial_budget: advertiser.initial_budget(),
                    budget: advertiser.budget(),
                    perturbation: advertiser.perturbation(),
                    eligible: engine.is_eligible(id),
                    slab: slab_weight.map(|(slab, _)| slab),
                    psi: slab_weight.map(|(_, psi)| psi),
                }
            })
            .collect();

        Self {
            algorithm: engine.algorithm_name().to_string(),
            beta: engine.beta(),
            arrivals_processed: engine.arrivals_processed(),
            total_revenue: engine.revenue().total_revenue,
            advertisers,
            config_hash: engine.config_hash().to_string(),
        }
    }

    pub fn advertiser(&self, id: AdvertiserId) -> Option<&AdvertiserSnapshot> {
        self.advertisers.iter().find(|a| a.id == id)
    }

    /// Sum of remaining budgets
    pub fn total_budget(&self) -> f64 {
        self.advertisers.iter().map(|a| a.budget).sum()
    }

    pub fn to_json(&self) -> Result<String, EngineError> {
        serde_json::to_string_pretty(self)
            .map_err(|e| EngineError::Serialization(format!("Snapshot serialization failed: {}", e)))
    }

    pub fn from_json(json: &str) -> Result<Self, EngineError> {
        serde_json::from_str(json)
            .map_err(|e| EngineError::Serialization(format!("Snapshot parse failed: {}", e)))
    }
}

// ============================================================================
// Config Hashing
// ============================================================================

/// Compute deterministic SHA256 hash of config
///
/// Uses canonical JSON serialization with sorted keys so the hash does not
/// depend on map iteration order.
pub fn compute_config_hash<T: Serialize>(config: &T) -> Result<String, EngineError> {
    use serde_json::Value;
    use std::collections::BTreeMap;

    let value = serde_json::to_value(config).map_err(|e| {
        EngineError::Serialization(format!("Config serialization failed: {}", e))
    })?;

    fn canonicalize(value: Value) -> Value {
        match value {
            Value::Object(map) => {
                let sorted: BTreeMap<String, Value> =
                    map.into_iter().map(|(k, v)| (k, canonicalize(v))).collect();
                Value::Object(sorted.into_iter().collect())
            }
            Value::Array(arr) => Value::Array(arr.into_iter().map(canonicalize).collect()),
            other => other,
        }
    }

    let json = serde_json::to_string(&canonicalize(value)).map_err(|e| {
        EngineError::Serialization(format!("Config serialization failed: {}", e))
    })?;

    let mut hasher = Sha256::new();
    hasher.update(json.as_bytes());
    Ok(format!("{:x}", hasher.finalize()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_hash_is_order_independent() {
        let a: HashMap<&str, u32> = [("beta", 1), ("slabs", 2), ("seed", 3)].into_iter().collect();
        let b: HashMap<&str, u32> = [("seed", 3), ("beta", 1), ("slabs", 2)].into_iter().collect();
        assert_eq!(compute_config_hash(&a).unwrap(), compute_config_hash(&b).unwrap());
    }

    #[test]
    fn test_hash_is_hex_sha256() {
        let hash = compute_config_hash(&vec![1, 2, 3]).unwrap();
        assert_eq!(hash.len(), 64);
        assert!(hash.chars().all(|c| c.is_ascii_hexdigit()));
    }
}
