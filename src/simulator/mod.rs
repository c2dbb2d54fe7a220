//! Synthetic change for cycles without real ones (development aid).

use crate::record::{FacilityId, FacilityState, Location, Record};
use chrono::{DateTime, Utc};
use std::sync::atomic::{AtomicBool, Ordering};

/// Placeholder id; real equipment numbers start well above it
pub const SIMULATED_ID: FacilityId = 0;

/// What to publish when a poll cycle found no real change.
pub trait QuietCycle: Send + Sync {
    fn on_quiet_cycle(&self, observed_at: DateTime<Utc>) -> Option<Record>;
}

/// Publishes nothing (production behaviour)
#[derive(Debug, Default)]
pub struct Silent;

impl QuietCycle for Silent {
    fn on_quiet_cycle(&self, _observed_at: DateTime<Utc>) -> Option<Record> {
        None
    }
}

/// Example elevator flipping between ACTIVE and INACTIVE on every call,
/// starting with ACTIVE.
#[derive(Debug, Default)]
pub struct Simulator {
    active: AtomicBool,
}

impl Simulator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn next(&self, observed_at: DateTime<Utc>) -> Record {
        let was_active = self.active.fetch_xor(true, Ordering::SeqCst);
        let state = if was_active {
            FacilityState::Inactive
        } else {
            FacilityState::Active
        };

        Record {
            id: SIMULATED_ID,
            kind: "ELEVATOR".to_string(),
            description: Some("Example Elevator".to_string()),
            location: Location {
                x: Some(0.0),
                y: Some(0.0),
            },
            state,
            group_id: 0,
            observed_at: Some(observed_at),
        }
    }
}

impl QuietCycle for Simulator {
    fn on_quiet_cycle(&self, observed_at: DateTime<Utc>) -> Option<Record> {
        Some(self.next(observed_at))
    }
}

/// Strategy for the `dev` setting
pub fn quiet_cycle_for(dev: bool) -> Box<dyn QuietCycle> {
    if dev {
        Box::new(Simulator::new())
    } else {
        Box::new(Silent)
    }
}
