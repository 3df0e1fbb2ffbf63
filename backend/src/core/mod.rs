//! Arrival counting and the trade-off functions shared by the allocators.

pub mod time;
pub mod tradeoff;
