//! Advertiser model
//!
//! An advertiser owns a fixed initial budget, a remaining budget that only
//! ever shrinks, and a perturbation draw `y` fixed at registration.
//!
//! Budgets are mutated only through [`AdvertiserRegistry`], which is in turn
//! only handed out mutably to the allocation strategies while an arrival is
//! being processed.
//!
//! [`AdvertiserRegistry`]: crate::models::AdvertiserRegistry

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Advertiser identifier. Ids are 1-based; 0 is reserved.
pub type AdvertiserId = u32;

/// Slack allowed when a debit overshoots the remaining budget by rounding.
pub(crate) const DEBIT_TOLERANCE: f64 = 1e-9;

/// Errors that can occur when charging an advertiser
#[derive(Debug, Error, PartialEq)]
pub enum AdvertiserError {
    #[error("Debit amount must be finite and non-negative, got {amount}")]
    InvalidAmount { amount: f64 },

    #[error("Insufficient budget: required {required}, available {available}")]
    InsufficientBudget { required: f64, available: f64 },
}

/// A budget-constrained bidder
///
/// # Example
/// ```
/// use ad_allocation_core_rs::Advertiser;
///
/// let advertiser = Advertiser::new(1, 100.0, 0.25);
/// assert_eq!(advertiser.budget(), 100.0);
/// assert_eq!(advertiser.spent(), 0.0);
/// assert!(advertiser.can_afford(100.0));
/// assert!(!advertiser.can_afford(100.5));
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Advertiser {
    id: AdvertiserId,

    /// Ceiling every budget check is measured against
    initial_budget: f64,

    /// Remaining spend capacity, always in `[0, initial_budget]`
    budget: f64,

    /// Perturbation draw `y` in [0, 1)
    perturbation: f64,
}

impl Advertiser {
    /// Create an advertiser with a full budget.
    pub fn new(id: AdvertiserId, initial_budget: f64, perturbation: f64) -> Self {
        Self {
            id,
            initial_budget,
            budget: initial_budget,
            perturbation,
        }
    }

    pub fn id(&self) -> AdvertiserId {
        self.id
    }

    pub fn initial_budget(&self) -> f64 {
        self.initial_budget
    }

    pub fn budget(&self) -> f64 {
        self.budget
    }

    pub fn perturbation(&self) -> f64 {
        self.perturbation
    }

    /// Amount spent so far
    pub fn spent(&self) -> f64 {
        self.initial_budget - self.budget
    }

    /// Fraction of the initial budget already spent, in [0, 1]
    pub fn spent_fraction(&self) -> f64 {
        self.spent() / self.initial_budget
    }

    /// True once nothing is left to spend
    pub fn is_exhausted(&self) -> bool {
        self.budget <= 0.0
    }

    /// Remaining budget covers `amount`
    pub fn can_afford(&self, amount: f64) -> bool {
        self.budget >= amount
    }

    /// Subtract `amount` from the remaining budget and return what is left.
    ///
    /// Overshoots within [`DEBIT_TOLERANCE`] are absorbed and leave the
    /// budget at exactly 0.
    pub(crate) fn debit(&mut self, amount: f64) -> Result<f64, AdvertiserError> {
        if !amount.is_finite() || amount < 0.0 {
            return Err(AdvertiserError::InvalidAmount { amount });
        }
        if amount > self.budget + DEBIT_TOLERANCE {
            return Err(AdvertiserError::InsufficientBudget {
                required: amount,
                available: self.budget,
            });
        }
        self.budget = (self.budget - amount).max(0.0);
        Ok(self.budget)
    }

    /// Spend everything that is left and return the amount taken.
    pub(crate) fn drain(&mut self) -> f64 {
        let taken = self.budget;
        self.budget = 0.0;
        taken
    }
}
