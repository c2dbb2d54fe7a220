// Facility records and their wire format
pub mod record;

// Error taxonomy
pub mod error;

// Last known state per facility
pub mod store;

// State file for restart recovery
pub mod snapshot;

// Upstream facility API client
pub mod poller;

// Change detection
pub mod differ;

// Fan-out to live subscribers
pub mod publisher;

// Synthetic changes for development
pub mod simulator;

// Append-only change log
pub mod changelog;

// Poll loop
pub mod feed;

// Configuration
pub mod config;

// HTTP and WebSocket delivery
pub mod api;

pub use error::{DeliveryError, FetchError, ParseError, PersistError, SnapshotError};
pub use feed::{CycleOutcome, Feed, FeedError, FeedHandle};
pub use publisher::{Publisher, SinkHandle, Subscription};
pub use record::{FacilityId, FacilityState, Record};
pub use store::StateStore;
