//! Snapshot data model as emitted by the simulation engine.
//!
//! A snapshot is one complete, immutable reading of the simulation at a
//! point in simulated time. Times are integer nanoseconds since the start of
//! the simulated service day (the engine's native duration encoding).

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::identifiers::*;
use crate::models::config::{DriverBehavior, StationStrategy};

/// Simulated time or duration, in nanoseconds.
pub type Nanoseconds = i64;

// ============================================================================
// Snapshot
// ============================================================================

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Snapshot {
    pub current_time: Nanoseconds,
    pub is_finished: bool,
    #[serde(default)]
    pub is_started: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub driver_behavior: Option<DriverBehavior>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub station_strategy: Option<StationStrategy>,
    #[serde(default)]
    pub stations: BTreeMap<StationId, Station>,
    #[serde(default)]
    pub segments: BTreeMap<SegmentId, Segment>,
    #[serde(default)]
    pub trains: BTreeMap<TrainId, Train>,
}

impl Snapshot {
    /// Parse the engine's self-describing snapshot text.
    pub fn from_json(text: &str) -> Result<Self> {
        serde_json::from_str(text).map_err(NetworkError::InvalidSnapshot)
    }

    /// Locate the segment a train currently occupies, if any.
    ///
    /// A train sits in at most one segment's occupancy map; a train that is
    /// on none is stationed or has left the network.
    pub fn locate_train(&self, train_id: &TrainId) -> Option<(&Segment, &SegmentOccupant)> {
        self.segments
            .values()
            .find_map(|segment| segment.trains_on_segment.get(train_id).map(|o| (segment, o)))
    }

    /// Segments with at least one train on them.
    pub fn occupied_segments(&self) -> impl Iterator<Item = &Segment> {
        self.segments
            .values()
            .filter(|segment| !segment.trains_on_segment.is_empty())
    }

    pub fn has_active_delay(&self, train_id: &TrainId) -> bool {
        self.trains
            .get(train_id)
            .is_some_and(|train| train.event.is_active_delay(self.current_time))
    }
}

// ============================================================================
// Stations and segments
// ============================================================================

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Station {
    pub id: StationId,
    pub name: String,
    pub capacity: u32,
    #[serde(default)]
    pub trains_in_station: BTreeMap<TrainId, StationOccupant>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StationOccupant {
    pub entry_time: Nanoseconds,
}

/// One direction of travel between two stations.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Segment {
    pub id: SegmentId,
    pub from_station_id: StationId,
    pub to_station_id: StationId,
    /// Meters
    pub length: f64,
    /// Meters per minute
    pub max_speed: f64,
    #[serde(default)]
    pub trains_on_segment: BTreeMap<TrainId, SegmentOccupant>,
}

#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SegmentOccupant {
    /// Meters from the segment's origin station
    pub position: f64,
    /// Meters per minute
    pub speed: f64,
    pub entry_time: Nanoseconds,
}

// ============================================================================
// Trains
// ============================================================================

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Train {
    pub id: TrainId,
    pub stops: Vec<TrainStop>,
    #[serde(default)]
    pub event: TrainEvent,
}

/// A planned visit; index 0 of a train's stops is its origin.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TrainStop {
    pub station_id: StationId,
    pub arrival: Nanoseconds,
    pub arrived_at: Option<Nanoseconds>,
    pub departure: Nanoseconds,
    pub departed_at: Option<Nanoseconds>,
}

impl TrainStop {
    pub fn arrival_delay(&self) -> Option<Nanoseconds> {
        self.arrived_at.map(|actual| actual - self.arrival)
    }

    pub fn departure_delay(&self) -> Option<Nanoseconds> {
        self.departed_at.map(|actual| actual - self.departure)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DelayCause {
    External,
    Infrastructure,
    Traffic,
    RollingStock,
    Station,
    Passenger,
}

impl DelayCause {
    pub fn label(&self) -> &'static str {
        match self {
            Self::External => "External causes",
            Self::Infrastructure => "Infrastructure",
            Self::Traffic => "Traffic management",
            Self::RollingStock => "Rolling stock",
            Self::Station => "Station operations",
            Self::Passenger => "Passenger",
        }
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum TrainEvent {
    #[default]
    None,
    #[serde(rename_all = "camelCase")]
    Delay {
        cause: DelayCause,
        duration: Nanoseconds,
        start_time: Nanoseconds,
    },
    #[serde(rename_all = "camelCase")]
    Cancellation { start_time: Nanoseconds },
}

impl TrainEvent {
    /// A delay is active during `[start_time, start_time + duration)`.
    pub fn is_active_delay(&self, at: Nanoseconds) -> bool {
        match *self {
            Self::Delay {
                duration,
                start_time,
                ..
            } => at >= start_time && at < start_time.saturating_add(duration),
            _ => false,
        }
    }

    pub fn is_cancelled(&self, at: Nanoseconds) -> bool {
        matches!(*self, Self::Cancellation { start_time } if at >= start_time)
    }
}

// ============================================================================
// Errors
// ============================================================================

#[derive(Debug, thiserror::Error)]
pub enum NetworkError {
    #[error("Invalid snapshot: {0}")]
    InvalidSnapshot(#[source] serde_json::Error),

    #[error("Invalid resource {location}: {source}")]
    InvalidResource {
        location: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("Failed to fetch {location}: {message}")]
    Fetch { location: String, message: String },

    #[error("Unknown {kind}: {value}")]
    UnknownVariant { kind: &'static str, value: String },
}

pub type Result<T> = std::result::Result<T, NetworkError>;
