//! A surface that keeps everything in memory.
//!
//! Besides backing the terminal renderer it records how often each surface
//! operation was called, so layer lifecycles can be asserted on.

use std::collections::{BTreeSet, HashMap};

use geo::{ClosestPoint, Coord, Line, Point};
use geojson::{Feature, FeatureCollection, feature::Id};
use rstar::{AABB, PointDistance, RTree, RTreeObject};

use crate::style::{Expression, LayerSpec, PaintProperty};
use crate::surface::{
    CursorStyle, FeatureHit, MapSurface, PointerEventKind, SurfaceError, SurfaceEvent,
};

/// Call counters per surface operation.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct SurfaceStats {
    pub sources_added: usize,
    pub sources_removed: usize,
    pub layers_added: usize,
    pub layers_removed: usize,
    pub data_replaced: usize,
    pub paint_updates: usize,
}

#[derive(Debug, Default)]
pub struct MemorySurface {
    sources: HashMap<String, FeatureCollection>,
    /// Bottom to top.
    layers: Vec<LayerSpec>,
    subscriptions: BTreeSet<(String, PointerEventKind)>,
    hovered: BTreeSet<String>,
    cursor: CursorStyle,
    stats: SurfaceStats,
}

impl MemorySurface {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn stats(&self) -> SurfaceStats {
        self.stats
    }

    pub fn source(&self, id: &str) -> Option<&FeatureCollection> {
        self.sources.get(id)
    }

    pub fn layer(&self, id: &str) -> Option<&LayerSpec> {
        self.layers.iter().find(|layer| layer.id == id)
    }

    pub fn layers(&self) -> &[LayerSpec] {
        &self.layers
    }

    pub fn sources(&self) -> impl Iterator<Item = (&str, &FeatureCollection)> {
        self.sources.iter().map(|(id, data)| (id.as_str(), data))
    }

    pub fn cursor(&self) -> CursorStyle {
        self.cursor
    }

    pub fn is_subscribed(&self, layer: &str, kind: PointerEventKind) -> bool {
        self.subscriptions.contains(&(layer.to_owned(), kind))
    }

    // ========================================================================
    // Pointer input
    // ========================================================================

    /// Nearest feature of `layer` within `tolerance` of `at`.
    pub fn query(&self, layer: &str, at: Coord<f64>, tolerance: f64) -> Option<FeatureHit> {
        let layer = self.layer(layer)?;
        let source = self.sources.get(&layer.source)?;

        let nodes: Vec<FeatureNode> = source
            .features
            .iter()
            .enumerate()
            .flat_map(|(index, feature)| FeatureNode::from_feature(index, feature))
            .collect();
        let tree = RTree::bulk_load(nodes);

        let point = [at.x, at.y];
        let nearest = tree.nearest_neighbor(&point)?;
        if nearest.distance_2(&point) > tolerance * tolerance {
            return None;
        }

        let feature = &source.features[nearest.feature];
        Some(FeatureHit {
            id: feature.id.as_ref().map(|id| match id {
                Id::String(id) => id.clone(),
                Id::Number(id) => id.to_string(),
            }),
            properties: feature.properties.clone().unwrap_or_default(),
        })
    }

    /// Click events for every subscribed layer with a feature under `at`,
    /// topmost layer first.
    pub fn click(&self, at: Coord<f64>, tolerance: f64) -> Vec<SurfaceEvent> {
        self.layers
            .iter()
            .rev()
            .filter(|layer| self.is_subscribed(&layer.id, PointerEventKind::Click))
            .filter_map(|layer| {
                self.query(&layer.id, at, tolerance).map(|hit| SurfaceEvent {
                    kind: PointerEventKind::Click,
                    layer: layer.id.clone(),
                    feature: Some(hit),
                })
            })
            .collect()
    }

    /// Move the pointer, reporting layers it entered or left.
    pub fn pointer_move(&mut self, at: Coord<f64>, tolerance: f64) -> Vec<SurfaceEvent> {
        let mut events = Vec::new();

        for layer in self.layers.iter().rev() {
            let enter = self.is_subscribed(&layer.id, PointerEventKind::MouseEnter);
            let leave = self.is_subscribed(&layer.id, PointerEventKind::MouseLeave);
            if !enter && !leave {
                continue;
            }

            let hit = self.query(&layer.id, at, tolerance);
            let was_hovered = self.hovered.contains(&layer.id);

            match hit {
                Some(hit) if !was_hovered => {
                    self.hovered.insert(layer.id.clone());
                    if enter {
                        events.push(SurfaceEvent {
                            kind: PointerEventKind::MouseEnter,
                            layer: layer.id.clone(),
                            feature: Some(hit),
                        });
                    }
                }
                None if was_hovered => {
                    self.hovered.remove(&layer.id);
                    if leave {
                        events.push(SurfaceEvent {
                            kind: PointerEventKind::MouseLeave,
                            layer: layer.id.clone(),
                            feature: None,
                        });
                    }
                }
                _ => {}
            }
        }

        events
    }
}

impl MapSurface for MemorySurface {
    fn has_source(&self, id: &str) -> bool {
        self.sources.contains_key(id)
    }

    fn add_source(&mut self, id: &str, data: FeatureCollection) -> Result<(), SurfaceError> {
        if self.sources.contains_key(id) {
            return Err(SurfaceError::DuplicateSource(id.to_owned()));
        }
        self.sources.insert(id.to_owned(), data);
        self.stats.sources_added += 1;
        Ok(())
    }

    fn set_source_data(&mut self, id: &str, data: FeatureCollection) -> Result<(), SurfaceError> {
        let source = self
            .sources
            .get_mut(id)
            .ok_or_else(|| SurfaceError::UnknownSource(id.to_owned()))?;
        *source = data;
        self.stats.data_replaced += 1;
        Ok(())
    }

    fn remove_source(&mut self, id: &str) -> Result<(), SurfaceError> {
        if let Some(layer) = self.layers.iter().find(|layer| layer.source == id) {
            return Err(SurfaceError::SourceInUse {
                source_id: id.to_owned(),
                layer: layer.id.clone(),
            });
        }
        self.sources
            .remove(id)
            .ok_or_else(|| SurfaceError::UnknownSource(id.to_owned()))?;
        self.stats.sources_removed += 1;
        Ok(())
    }

    fn has_layer(&self, id: &str) -> bool {
        self.layer(id).is_some()
    }

    fn add_layer(&mut self, layer: LayerSpec) -> Result<(), SurfaceError> {
        if self.has_layer(&layer.id) {
            return Err(SurfaceError::DuplicateLayer(layer.id));
        }
        if !self.sources.contains_key(&layer.source) {
            return Err(SurfaceError::UnknownSource(layer.source));
        }
        self.layers.push(layer);
        self.stats.layers_added += 1;
        Ok(())
    }

    fn remove_layer(&mut self, id: &str) -> Result<(), SurfaceError> {
        let index = self
            .layers
            .iter()
            .position(|layer| layer.id == id)
            .ok_or_else(|| SurfaceError::UnknownLayer(id.to_owned()))?;
        self.layers.remove(index);
        self.hovered.remove(id);
        self.stats.layers_removed += 1;
        Ok(())
    }

    fn set_paint_property(
        &mut self,
        layer: &str,
        property: PaintProperty,
        value: Expression,
    ) -> Result<(), SurfaceError> {
        let layer = self
            .layers
            .iter_mut()
            .find(|candidate| candidate.id == layer)
            .ok_or_else(|| SurfaceError::UnknownLayer(layer.to_owned()))?;
        layer.paint.insert(property, value);
        self.stats.paint_updates += 1;
        Ok(())
    }

    fn subscribe(&mut self, layer: &str, kind: PointerEventKind) {
        self.subscriptions.insert((layer.to_owned(), kind));
    }

    fn unsubscribe(&mut self, layer: &str, kind: PointerEventKind) {
        self.subscriptions.remove(&(layer.to_owned(), kind));
    }

    fn set_cursor(&mut self, cursor: CursorStyle) {
        self.cursor = cursor;
    }
}

// ============================================================================
// Hit testing
// ============================================================================

/// A point feature, or one straight piece of a line feature.
#[derive(Clone, Debug)]
struct FeatureNode {
    feature: usize,
    shape: NodeShape,
}

#[derive(Clone, Debug)]
enum NodeShape {
    Point([f64; 2]),
    Piece(Line<f64>),
}

impl FeatureNode {
    fn from_feature(feature: usize, data: &Feature) -> Vec<Self> {
        let Some(geometry) = &data.geometry else {
            return Vec::new();
        };

        match &geometry.value {
            geojson::Value::Point(position) if position.len() >= 2 => vec![Self {
                feature,
                shape: NodeShape::Point([position[0], position[1]]),
            }],
            geojson::Value::LineString(positions) => positions
                .windows(2)
                .filter(|pair| pair[0].len() >= 2 && pair[1].len() >= 2)
                .map(|pair| Self {
                    feature,
                    shape: NodeShape::Piece(Line::new(
                        Coord { x: pair[0][0], y: pair[0][1] },
                        Coord { x: pair[1][0], y: pair[1][1] },
                    )),
                })
                .collect(),
            _ => Vec::new(),
        }
    }
}

impl RTreeObject for FeatureNode {
    type Envelope = AABB<[f64; 2]>;

    fn envelope(&self) -> Self::Envelope {
        match &self.shape {
            NodeShape::Point(point) => AABB::from_point(*point),
            NodeShape::Piece(line) => AABB::from_corners(
                [line.start.x, line.start.y],
                [line.end.x, line.end.y],
            ),
        }
    }
}

impl PointDistance for FeatureNode {
    fn distance_2(&self, point: &[f64; 2]) -> f64 {
        let target = Point::new(point[0], point[1]);
        let closest = match &self.shape {
            NodeShape::Point(at) => Point::new(at[0], at[1]),
            NodeShape::Piece(line) => match line.closest_point(&target) {
                geo::Closest::Intersection(p) | geo::Closest::SinglePoint(p) => p,
                geo::Closest::Indeterminate => line.start_point(),
            },
        };

        let dx = closest.x() - target.x();
        let dy = closest.y() - target.y();
        dx * dx + dy * dy
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use geojson::{Geometry, JsonObject};
    use serde_json::json;

    use crate::style::LayerType;

    fn point(id: &str, x: f64, y: f64) -> Feature {
        let properties: JsonObject = serde_json::from_value(json!({ "stationId": id })).unwrap();
        Feature {
            bbox: None,
            geometry: Some(Geometry::new(geojson::Value::Point(vec![x, y]))),
            id: Some(Id::String(id.to_owned())),
            properties: Some(properties),
            foreign_members: None,
        }
    }

    fn line(id: &str, coordinates: Vec<Vec<f64>>) -> Feature {
        Feature {
            bbox: None,
            geometry: Some(Geometry::new(geojson::Value::LineString(coordinates))),
            id: Some(Id::String(id.to_owned())),
            properties: None,
            foreign_members: None,
        }
    }

    fn collection(features: Vec<Feature>) -> FeatureCollection {
        FeatureCollection {
            bbox: None,
            features,
            foreign_members: None,
        }
    }

    fn surface_with(layer: &str, kind: LayerType, features: Vec<Feature>) -> MemorySurface {
        let mut surface = MemorySurface::new();
        surface.add_source("data", collection(features)).unwrap();
        surface.add_layer(LayerSpec::new(layer, kind, "data")).unwrap();
        surface
    }

    #[test]
    fn test_registration_is_guarded() {
        let mut surface = MemorySurface::new();
        surface.add_source("s", collection(vec![])).unwrap();
        assert!(matches!(
            surface.add_source("s", collection(vec![])),
            Err(SurfaceError::DuplicateSource(_))
        ));
        assert!(matches!(
            surface.add_layer(LayerSpec::new("l", LayerType::Circle, "missing")),
            Err(SurfaceError::UnknownSource(_))
        ));

        surface.add_layer(LayerSpec::new("l", LayerType::Circle, "s")).unwrap();
        assert!(matches!(surface.remove_source("s"), Err(SurfaceError::SourceInUse { .. })));

        surface.remove_layer("l").unwrap();
        surface.remove_source("s").unwrap();
        assert!(matches!(surface.remove_layer("l"), Err(SurfaceError::UnknownLayer(_))));
        assert_eq!(surface.stats().sources_added, 1);
        assert_eq!(surface.stats().sources_removed, 1);
    }

    #[test]
    fn test_query_nearest_point_within_tolerance() {
        let surface = surface_with(
            "stations-layer",
            LayerType::Circle,
            vec![point("A", 0.0, 0.0), point("B", 1.0, 1.0)],
        );

        let hit = surface.query("stations-layer", Coord { x: 0.9, y: 0.95 }, 0.2).unwrap();
        assert_eq!(hit.id.as_deref(), Some("B"));
        assert_eq!(hit.string_property("stationId"), Some("B"));
        assert!(surface.query("stations-layer", Coord { x: 0.5, y: 0.5 }, 0.2).is_none());
    }

    #[test]
    fn test_query_line_by_distance_to_piece() {
        let surface = surface_with(
            "segments-layer",
            LayerType::Line,
            vec![line("A-B", vec![vec![0.0, 0.0], vec![10.0, 0.0], vec![10.0, 10.0]])],
        );

        let hit = surface.query("segments-layer", Coord { x: 5.0, y: 0.3 }, 0.5).unwrap();
        assert_eq!(hit.id.as_deref(), Some("A-B"));
        assert!(surface.query("segments-layer", Coord { x: 5.0, y: 5.0 }, 0.5).is_none());
        assert!(surface.query("segments-layer", Coord { x: 9.8, y: 5.0 }, 0.5).is_some());
    }

    #[test]
    fn test_click_only_for_subscribed_layers() {
        let mut surface = surface_with("stations-layer", LayerType::Circle, vec![point("A", 0.0, 0.0)]);
        let at = Coord { x: 0.0, y: 0.0 };
        assert!(surface.click(at, 0.1).is_empty());

        surface.subscribe("stations-layer", PointerEventKind::Click);
        let events = surface.click(at, 0.1);
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].kind, PointerEventKind::Click);
        assert_eq!(events[0].layer, "stations-layer");
    }

    #[test]
    fn test_enter_and_leave_fire_on_transitions() {
        let mut surface = surface_with("stations-layer", LayerType::Circle, vec![point("A", 0.0, 0.0)]);
        surface.subscribe("stations-layer", PointerEventKind::MouseEnter);
        surface.subscribe("stations-layer", PointerEventKind::MouseLeave);

        let on = Coord { x: 0.0, y: 0.05 };
        let off = Coord { x: 3.0, y: 3.0 };

        let kinds = |events: Vec<SurfaceEvent>| events.into_iter().map(|e| e.kind).collect::<Vec<_>>();
        assert_eq!(kinds(surface.pointer_move(on, 0.1)), vec![PointerEventKind::MouseEnter]);
        assert!(surface.pointer_move(on, 0.1).is_empty());
        assert_eq!(kinds(surface.pointer_move(off, 0.1)), vec![PointerEventKind::MouseLeave]);
        assert!(surface.pointer_move(off, 0.1).is_empty());
    }

    #[test]
    fn test_counters() {
        let mut surface = surface_with("l", LayerType::Circle, vec![]);
        surface.set_source_data("data", collection(vec![point("A", 0.0, 0.0)])).unwrap();
        surface
            .set_paint_property("l", PaintProperty::CircleRadius, Expression::number(4.0))
            .unwrap();

        let stats = surface.stats();
        assert_eq!(stats.layers_added, 1);
        assert_eq!(stats.data_replaced, 1);
        assert_eq!(stats.paint_updates, 1);
        assert_eq!(surface.source("data").unwrap().features.len(), 1);
    }
}
