//! Decision log for allocation runs.
//!
//! Every arrival produces at least one event, so a run can be audited
//! after the fact:
//! - **Allocated**: a fraction of a divisible arrival went to an advertiser
//! - **Matched**: an indivisible arrival went entirely to one advertiser
//! - **Unmatched**: nobody qualified
//! - **AdvertiserRetired**: an advertiser left the eligible pool for good
//!
//! # Example
//!
//! ```rust
//! use ad_allocation_core_rs::models::{Event, EventLog};
//!
//! let mut log = EventLog::new();
//! log.log(Event::Matched { arrival: 1, advertiser_id: 2, charge: 35.0 });
//! log.log(Event::Unmatched { arrival: 2 });
//!
//! assert_eq!(log.events_at_arrival(1).len(), 1);
//! assert_eq!(log.events_for_advertiser(2).len(), 1);
//! ```

use crate::models::advertiser::AdvertiserId;
use serde::{Deserialize, Serialize};

/// One engine decision, tagged with the arrival that caused it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event_type", rename_all = "snake_case")]
pub enum Event {
    Allocated {
        arrival: u64,
        advertiser_id: AdvertiserId,
        fraction: f64,
        charge: f64,
    },

    Matched {
        arrival: u64,
        advertiser_id: AdvertiserId,
        charge: f64,
    },

    Unmatched {
        arrival: u64,
    },

    /// Advertiser can no longer win any arrival
    AdvertiserRetired {
        arrival: u64,
        advertiser_id: AdvertiserId,
        remaining_budget: f64,
    },
}

impl Event {
    pub fn arrival(&self) -> u64 {
        match self {
            Event::Allocated { arrival, .. }
            | Event::Matched { arrival, .. }
            | Event::Unmatched { arrival }
            | Event::AdvertiserRetired { arrival, .. } => *arrival,
        }
    }

    pub fn advertiser_id(&self) -> Option<AdvertiserId> {
        match self {
            Event::Allocated { advertiser_id, .. }
            | Event::Matched { advertiser_id, .. }
            | Event::AdvertiserRetired { advertiser_id, .. } => Some(*advertiser_id),
            Event::Unmatched { .. } => None,
        }
    }

    pub fn event_type(&self) -> &'static str {
        match self {
            Event::Allocated { .. } => "allocated",
            Event::Matched { .. } => "matched",
            Event::Unmatched { .. } => "unmatched",
            Event::AdvertiserRetired { .. } => "advertiser_retired",
        }
    }
}

/// Append-only event log
#[derive(Debug, Clone, Default)]
pub struct EventLog {
    events: Vec<Event>,
}

impl EventLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn log(&mut self, event: Event) {
        self.events.push(event);
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    pub fn events(&self) -> &[Event] {
        &self.events
    }

    pub fn events_at_arrival(&self, arrival: u64) -> Vec<&Event> {
        self.events.iter().filter(|e| e.arrival() == arrival).collect()
    }

    pub fn events_of_type(&self, event_type: &str) -> Vec<&Event> {
        self.events
            .iter()
            .filter(|e| e.event_type() == event_type)
            .collect()
    }

    pub fn events_for_advertiser(&self, advertiser_id: AdvertiserId) -> Vec<&Event> {
        self.events
            .iter()
            .filter(|e| e.advertiser_id() == Some(advertiser_id))
            .collect()
    }

    pub fn clear(&mut self) {
        self.events.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_event_serializes_with_type_tag() {
        let event = Event::AdvertiserRetired {
            arrival: 4,
            advertiser_id: 1,
            remaining_budget: 0.0,
        };
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["event_type"], "advertiser_retired");
        assert_eq!(json["advertiser_id"], 1);
    }

    #[test]
    fn test_events_of_type() {
        let mut log = EventLog::new();
        log.log(Event::Unmatched { arrival: 1 });
        log.log(Event::Matched {
            arrival: 2,
            advertiser_id: 1,
            charge: 5.0,
        });
        log.log(Event::Unmatched { arrival: 3 });

        assert_eq!(log.events_of_type("unmatched").len(), 2);
        assert_eq!(log.events_of_type("matched").len(), 1);
        log.clear();
        assert!(log.is_empty());
    }
}
