//! Read-only detail views of the selected station and train.
//!
//! Both resolve against the current snapshot and return `None` for "nothing
//! to show": no selection, no snapshot, or an id the snapshot does not know.

use trainmap_network::{
    DelayCause, Nanoseconds, Snapshot, SegmentId, StationId, TrainEvent, TrainId,
};

use crate::format::delay_minutes;

// ============================================================================
// Station
// ============================================================================

#[derive(Clone, Debug, PartialEq)]
pub struct StationDetails {
    pub id: StationId,
    pub name: String,
    pub capacity: u32,
    /// Trains currently in the station, earliest arrival first.
    pub trains: Vec<StationTrain>,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct StationTrain {
    pub train_id: TrainId,
    pub entry_time: Nanoseconds,
}

impl StationDetails {
    pub fn resolve(snapshot: Option<&Snapshot>, selected: Option<&StationId>) -> Option<Self> {
        let station = snapshot?.stations.get(selected?)?;

        let mut trains: Vec<StationTrain> = station
            .trains_in_station
            .iter()
            .map(|(train_id, occupant)| StationTrain {
                train_id: train_id.clone(),
                entry_time: occupant.entry_time,
            })
            .collect();
        trains.sort_by(|a, b| {
            a.entry_time
                .cmp(&b.entry_time)
                .then_with(|| a.train_id.cmp(&b.train_id))
        });

        Some(Self {
            id: station.id.clone(),
            name: station.name.clone(),
            capacity: station.capacity,
            trains,
        })
    }

    pub fn occupancy(&self) -> usize {
        self.trains.len()
    }

    /// `occupied/capacity`
    pub fn occupancy_label(&self) -> String {
        format!("{}/{}", self.occupancy(), self.capacity)
    }
}

// ============================================================================
// Train
// ============================================================================

#[derive(Clone, Debug, PartialEq)]
pub struct TrainDetails {
    pub id: TrainId,
    pub event: EventSummary,
    pub position: Option<TrainPosition>,
    pub stops: Vec<StopDetails>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum EventSummary {
    None,
    Delay {
        cause: DelayCause,
        start_time: Nanoseconds,
        duration: Nanoseconds,
        active: bool,
    },
    Cancellation {
        start_time: Nanoseconds,
        active: bool,
    },
}

#[derive(Clone, Debug, PartialEq)]
pub struct TrainPosition {
    pub segment_id: SegmentId,
    pub position: f64,
    pub length: f64,
    pub speed: f64,
}

impl TrainPosition {
    /// Fraction of the segment covered, clamped to `[0, 1]`.
    pub fn progress(&self) -> f64 {
        if self.length <= 0.0 {
            return 0.0;
        }
        (self.position / self.length).clamp(0.0, 1.0)
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct StopDetails {
    pub station_id: StationId,
    /// Display name, falling back to the id for stations not in the snapshot.
    pub station_name: String,
    /// `None` at the origin, which is never arrived at.
    pub planned_arrival: Option<Nanoseconds>,
    pub actual_arrival: Option<Nanoseconds>,
    /// `None` at the terminus.
    pub planned_departure: Option<Nanoseconds>,
    pub actual_departure: Option<Nanoseconds>,
    pub reached: bool,
    pub arrival_delay_minutes: Option<i64>,
    pub departure_delay_minutes: Option<i64>,
}

impl StopDetails {
    pub fn is_delayed(&self) -> bool {
        self.arrival_delay_minutes.is_some_and(|m| m > 0)
            || self.departure_delay_minutes.is_some_and(|m| m > 0)
    }
}

impl TrainDetails {
    pub fn resolve(snapshot: Option<&Snapshot>, selected: Option<&TrainId>) -> Option<Self> {
        let snapshot = snapshot?;
        let train = snapshot.trains.get(selected?)?;
        let now = snapshot.current_time;

        let event = match train.event {
            TrainEvent::None => EventSummary::None,
            TrainEvent::Delay {
                cause,
                duration,
                start_time,
            } => EventSummary::Delay {
                cause,
                start_time,
                duration,
                active: train.event.is_active_delay(now),
            },
            TrainEvent::Cancellation { start_time } => EventSummary::Cancellation {
                start_time,
                active: train.event.is_cancelled(now),
            },
        };

        let position = snapshot
            .locate_train(&train.id)
            .map(|(segment, occupant)| TrainPosition {
                segment_id: segment.id.clone(),
                position: occupant.position,
                length: segment.length,
                speed: occupant.speed,
            });

        let last = train.stops.len().saturating_sub(1);
        let stops = train
            .stops
            .iter()
            .enumerate()
            .map(|(index, stop)| {
                let is_origin = index == 0;
                let is_terminus = index == last;
                let station_name = snapshot
                    .stations
                    .get(&stop.station_id)
                    .map(|station| station.name.clone())
                    .unwrap_or_else(|| stop.station_id.to_string());

                StopDetails {
                    station_id: stop.station_id.clone(),
                    station_name,
                    planned_arrival: (!is_origin).then_some(stop.arrival),
                    actual_arrival: stop.arrived_at.filter(|_| !is_origin),
                    planned_departure: (!is_terminus).then_some(stop.departure),
                    actual_departure: stop.departed_at.filter(|_| !is_terminus),
                    reached: stop.arrived_at.is_some(),
                    arrival_delay_minutes: stop
                        .arrived_at
                        .filter(|_| !is_origin)
                        .map(|actual| delay_minutes(stop.arrival, actual)),
                    departure_delay_minutes: stop
                        .departed_at
                        .filter(|_| !is_terminus)
                        .map(|actual| delay_minutes(stop.departure, actual)),
                }
            })
            .collect();

        Some(Self {
            id: train.id.clone(),
            event,
            position,
            stops,
        })
    }
}
