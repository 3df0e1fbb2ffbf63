//! Domain models for the allocation engine

pub mod advertiser;
pub mod event;
pub mod registry;

// Re-exports
pub use advertiser::{Advertiser, AdvertiserError, AdvertiserId};
pub use event::{Event, EventLog};
pub use registry::{AdvertiserRegistry, RegistryError};
