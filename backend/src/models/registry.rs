//! Advertiser registry
//!
//! Owns every advertiser for the lifetime of a run and is the only path
//! through which budgets change.
//!
//! # Critical Invariants
//!
//! 1. **Budget feasibility**: `0 <= budget <= initial_budget` for every advertiser
//! 2. **Id uniqueness**: each id is registered at most once, and never 0
//! 3. **Ordered iteration**: advertisers are always visited in ascending id
//!    order, which is what makes tie-breaks deterministic

use crate::models::advertiser::{Advertiser, AdvertiserError, AdvertiserId};
use std::collections::BTreeMap;
use thiserror::Error;

#[derive(Debug, Error, PartialEq)]
pub enum RegistryError {
    #[error("Unknown advertiser: {0}")]
    UnknownAdvertiser(AdvertiserId),

    #[error("Duplicate advertiser id: {0}")]
    DuplicateAdvertiser(AdvertiserId),

    #[error("Advertiser id 0 is reserved")]
    ReservedId,

    #[error("Advertiser {id}: {source}")]
    Budget {
        id: AdvertiserId,
        #[source]
        source: AdvertiserError,
    },
}

/// All advertisers of a run, keyed by id
///
/// # Example
///
/// ```rust
/// use ad_allocation_core_rs::{Advertiser, AdvertiserRegistry};
///
/// let mut registry = AdvertiserRegistry::new();
/// registry.register(Advertiser::new(2, 200.0, 0.4)).unwrap();
/// registry.register(Advertiser::new(1, 100.0, 0.9)).unwrap();
///
/// let ids: Vec<u32> = registry.ids().collect();
/// assert_eq!(ids, vec![1, 2]);
///
/// registry.debit(1, 30.0).unwrap();
/// assert_eq!(registry.budget(1), Some(70.0));
/// ```
#[derive(Debug, Clone, Default)]
pub struct AdvertiserRegistry {
    advertisers: BTreeMap<AdvertiserId, Advertiser>,
}

impl AdvertiserRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an advertiser. Fails on id 0 or on a repeated id.
    pub fn register(&mut self, advertiser: Advertiser) -> Result<(), RegistryError> {
        let id = advertiser.id();
        if id == 0 {
            return Err(RegistryError::ReservedId);
        }
        if self.advertisers.contains_key(&id) {
            return Err(RegistryError::DuplicateAdvertiser(id));
        }
        self.advertisers.insert(id, advertiser);
        Ok(())
    }

    pub fn get(&self, id: AdvertiserId) -> Option<&Advertiser> {
        self.advertisers.get(&id)
    }

    pub fn contains(&self, id: AdvertiserId) -> bool {
        self.advertisers.contains_key(&id)
    }

    /// Remaining budget of `id`
    pub fn budget(&self, id: AdvertiserId) -> Option<f64> {
        self.get(id).map(Advertiser::budget)
    }

    pub fn len(&self) -> usize {
        self.advertisers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.advertisers.is_empty()
    }

    /// Advertisers in ascending id order
    pub fn iter(&self) -> impl Iterator<Item = &Advertiser> {
        self.advertisers.values()
    }

    /// Ids in ascending order
    pub fn ids(&self) -> impl Iterator<Item = AdvertiserId> + '_ {
        self.advertisers.keys().copied()
    }

    /// Ids of advertisers with budget left, ascending
    pub fn funded_ids(&self) -> Vec<AdvertiserId> {
        self.iter()
            .filter(|a| !a.is_exhausted())
            .map(Advertiser::id)
            .collect()
    }

    /// Charge `amount` to `id` and return the remaining budget.
    pub fn debit(&mut self, id: AdvertiserId, amount: f64) -> Result<f64, RegistryError> {
        let advertiser = self
            .advertisers
            .get_mut(&id)
            .ok_or(RegistryError::UnknownAdvertiser(id))?;
        advertiser
            .debit(amount)
            .map_err(|source| RegistryError::Budget { id, source })
    }

    /// Charge whatever budget `id` has left and return the amount taken.
    pub fn drain(&mut self, id: AdvertiserId) -> Result<f64, RegistryError> {
        let advertiser = self
            .advertisers
            .get_mut(&id)
            .ok_or(RegistryError::UnknownAdvertiser(id))?;
        Ok(advertiser.drain())
    }

    /// Sum of remaining budgets
    pub fn total_budget(&self) -> f64 {
        self.iter().map(Advertiser::budget).sum()
    }

    /// Sum of amounts spent
    pub fn total_spent(&self) -> f64 {
        self.iter().map(Advertiser::spent).sum()
    }

    /// Every budget lies in `[0, initial_budget]`.
    pub fn is_feasible(&self) -> bool {
        self.iter()
            .all(|a| a.budget() >= 0.0 && a.budget() <= a.initial_budget())
    }
}
