//! # trainmap-network
//!
//! Data model of a train-network simulation as seen by its map view.
//!
//! ## Features
//!
//! - **Snapshots**: Parse the engine's per-tick state (stations, directed
//!   segments, trains, simulated time)
//! - **Shared track geometry**: One polyline per station pair, resolved for
//!   either direction of travel
//! - **Projection**: Turn "meters along a segment" into a map coordinate
//! - **Static resources**: Load station and track locations from files or URLs
//!
//! ## Example
//!
//! ```
//! use trainmap_network::prelude::*;
//!
//! let index = GeometryIndex::from_locations(&[SegmentLocation {
//!     from_station_id: StationId::new("A"),
//!     to_station_id: StationId::new("B"),
//!     coordinates: vec![[0.0, 0.0], [1.0, 1.0]],
//! }]);
//!
//! // A train 750m into the 1000m B -> A segment is a quarter of the way from A
//! let track = index.resolve(&StationId::new("B"), &StationId::new("A")).unwrap();
//! let position = track.project(750.0, 1000.0).unwrap();
//! assert_eq!((position.x, position.y), (0.25, 0.25));
//! ```

pub mod geometry;
pub mod identifiers;
pub mod models;
pub mod resources;

// Re-exports for convenience
pub mod prelude {
    pub use crate::geometry::{project, project_on, GeometryIndex, TrackGeometry, TrackRef};
    pub use crate::identifiers::*;
    pub use crate::models::config::*;
    pub use crate::models::types::{
        DelayCause, Nanoseconds, NetworkError, Segment, SegmentOccupant, Snapshot, Station,
        StationOccupant, Train, TrainEvent, TrainStop,
    };
    pub use crate::resources::{
        load_segment_locations, load_station_locations, DataFetcher, DefaultFetcher,
        ResourceLocation, SegmentLocation, StationLocation,
    };
}

pub use prelude::*;
