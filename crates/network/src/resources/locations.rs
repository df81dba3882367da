//! Static geographic resources: where stations sit and how track runs
//! between them.

use geo::{Coord, LineString};
use serde::{Deserialize, Serialize};

use crate::identifiers::{SegmentId, StationId};

/// A station's map position, `[longitude, latitude]`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct StationLocation {
    pub id: StationId,
    pub coordinates: [f64; 2],
}

impl StationLocation {
    pub fn coord(&self) -> Coord<f64> {
        Coord {
            x: self.coordinates[0],
            y: self.coordinates[1],
        }
    }
}

/// Track polyline for an unordered station pair. The stored direction is
/// `from -> to`; the opposite direction reuses the same coordinates.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SegmentLocation {
    pub from_station_id: StationId,
    pub to_station_id: StationId,
    pub coordinates: Vec<[f64; 2]>,
}

impl SegmentLocation {
    pub fn segment_id(&self) -> SegmentId {
        SegmentId::between(&self.from_station_id, &self.to_station_id)
    }

    pub fn line_string(&self) -> LineString<f64> {
        self.coordinates
            .iter()
            .map(|&[x, y]| Coord { x, y })
            .collect::<Vec<_>>()
            .into()
    }
}
