//! Lookup from a directed station pair to the physical track geometry.
//!
//! Track is stored once per unordered pair. Both directional segments
//! (`A-B` and `B-A`) resolve to the same `Arc`; the reverse direction is
//! flagged so positions can be measured from the other end.

use std::collections::HashMap;
use std::sync::Arc;

use geo::{Coord, LineString};

use crate::geometry::projector::project_on;
use crate::identifiers::StationId;
use crate::models::types::Segment;
use crate::resources::SegmentLocation;

/// Unordered station pair.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct PairKey(StationId, StationId);

impl PairKey {
    pub fn new(a: &StationId, b: &StationId) -> Self {
        if a <= b {
            Self(a.clone(), b.clone())
        } else {
            Self(b.clone(), a.clone())
        }
    }
}

/// Polyline of one physical track, drawn from `from` to `to`.
#[derive(Debug, PartialEq)]
pub struct TrackGeometry {
    pub from: StationId,
    pub to: StationId,
    pub line: LineString<f64>,
}

/// A track resolved for one direction of travel.
#[derive(Clone, Copy, Debug)]
pub struct TrackRef<'a> {
    pub track: &'a Arc<TrackGeometry>,
    /// Travel runs from the polyline's last point towards its first.
    pub reversed: bool,
}

impl TrackRef<'_> {
    /// Map position (meters from the segment origin) onto the polyline.
    pub fn project(&self, position: f64, length: f64) -> Option<Coord<f64>> {
        let distance = if self.reversed {
            length - position
        } else {
            position
        };

        project_on(&self.track.line, distance, length)
    }
}

#[derive(Clone, Debug, Default)]
pub struct GeometryIndex {
    tracks: Vec<Arc<TrackGeometry>>,
    by_pair: HashMap<PairKey, Arc<TrackGeometry>>,
}

impl GeometryIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build the index from static segment locations.
    ///
    /// The first entry for a pair wins; later duplicates (in either
    /// direction) and polylines with fewer than two points are skipped.
    pub fn from_locations(locations: &[SegmentLocation]) -> Self {
        let mut index = Self::new();

        for location in locations {
            if location.coordinates.len() < 2 {
                tracing::warn!(
                    segment = %location.segment_id(),
                    points = location.coordinates.len(),
                    "skipping track with fewer than two points"
                );
                continue;
            }

            let key = PairKey::new(&location.from_station_id, &location.to_station_id);
            if index.by_pair.contains_key(&key) {
                tracing::warn!(segment = %location.segment_id(), "duplicate track geometry ignored");
                continue;
            }

            let track = Arc::new(TrackGeometry {
                from: location.from_station_id.clone(),
                to: location.to_station_id.clone(),
                line: location.line_string(),
            });
            index.tracks.push(track.clone());
            index.by_pair.insert(key, track);
        }

        tracing::debug!(tracks = index.tracks.len(), "built geometry index");
        index
    }

    pub fn resolve(&self, from: &StationId, to: &StationId) -> Option<TrackRef<'_>> {
        self.by_pair
            .get(&PairKey::new(from, to))
            .map(|track| TrackRef {
                reversed: track.from != *from,
                track,
            })
    }

    pub fn resolve_segment(&self, segment: &Segment) -> Option<TrackRef<'_>> {
        self.resolve(&segment.from_station_id, &segment.to_station_id)
    }

    /// Tracks in load order.
    pub fn tracks(&self) -> &[Arc<TrackGeometry>] {
        &self.tracks
    }

    pub fn len(&self) -> usize {
        self.tracks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tracks.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;

    use approx::assert_relative_eq;

    use crate::identifiers::SegmentId;

    fn location(from: &str, to: &str, coordinates: Vec<[f64; 2]>) -> SegmentLocation {
        SegmentLocation {
            from_station_id: from.into(),
            to_station_id: to.into(),
            coordinates,
        }
    }

    fn segment(from: &str, to: &str, length: f64) -> Segment {
        Segment {
            id: SegmentId::between(&from.into(), &to.into()),
            from_station_id: from.into(),
            to_station_id: to.into(),
            length,
            max_speed: 2000.0,
            trains_on_segment: BTreeMap::new(),
        }
    }

    #[test]
    fn test_both_directions_share_one_geometry() {
        let index = GeometryIndex::from_locations(&[location("A", "B", vec![[0.0, 0.0], [1.0, 1.0]])]);

        let forward = index.resolve(&"A".into(), &"B".into()).unwrap();
        let reverse = index.resolve(&"B".into(), &"A".into()).unwrap();

        assert!(!forward.reversed);
        assert!(reverse.reversed);
        assert!(Arc::ptr_eq(forward.track, reverse.track));
    }

    #[test]
    fn test_reverse_projection_matches_forward() {
        let index = GeometryIndex::from_locations(&[location("A", "B", vec![[0.0, 0.0], [1.0, 1.0]])]);

        let ab = segment("A", "B", 1000.0);
        let ba = segment("B", "A", 1000.0);

        let forward = index.resolve_segment(&ab).unwrap().project(250.0, ab.length).unwrap();
        let reverse = index.resolve_segment(&ba).unwrap().project(750.0, ba.length).unwrap();

        assert_relative_eq!(forward.x, 0.25);
        assert_relative_eq!(forward.y, 0.25);
        assert_eq!(forward, reverse);
    }

    #[test]
    fn test_reverse_projection_on_bent_track() {
        let index = GeometryIndex::from_locations(&[location(
            "A",
            "B",
            vec![[0.0, 0.0], [2.0, 0.0], [2.0, 3.0], [5.0, 4.0]],
        )]);
        let forward = index.resolve(&"A".into(), &"B".into()).unwrap();
        let reverse = index.resolve(&"B".into(), &"A".into()).unwrap();

        for p in [0.0, 120.0, 333.0, 500.0, 871.5, 1000.0] {
            assert_eq!(forward.project(p, 1000.0), reverse.project(1000.0 - p, 1000.0));
        }
    }

    #[test]
    fn test_unknown_pair() {
        let index = GeometryIndex::from_locations(&[location("A", "B", vec![[0.0, 0.0], [1.0, 1.0]])]);
        assert!(index.resolve(&"A".into(), &"C".into()).is_none());
    }

    #[test]
    fn test_duplicates_and_short_polylines_are_skipped() {
        let index = GeometryIndex::from_locations(&[
            location("A", "B", vec![[0.0, 0.0], [1.0, 1.0]]),
            location("B", "A", vec![[9.0, 9.0], [8.0, 8.0]]),
            location("C", "D", vec![[0.0, 0.0]]),
        ]);

        assert_eq!(index.len(), 1);
        let track = index.resolve(&"B".into(), &"A".into()).unwrap();
        assert_eq!(track.track.from, StationId::new("A"));
        assert!(index.resolve(&"C".into(), &"D".into()).is_none());
    }
}
