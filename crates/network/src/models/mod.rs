//! Snapshot data model and run configuration.

pub mod config;
pub mod types;

// Re-exports for convenience
pub use config::{DriverBehavior, RunConfig, StationStrategy};
pub use types::{
    DelayCause, Nanoseconds, NetworkError, Result, Segment, SegmentOccupant, Snapshot, Station,
    StationOccupant, Train, TrainEvent, TrainStop,
};
