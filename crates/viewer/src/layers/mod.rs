//! Feature layers: stations, track segments and trains.
//!
//! Every layer owns one source and one paint layer on the surface. A
//! [`Synchronizer`] drives its three independent effects:
//!
//! - **lifecycle**: register the source and layer once per attachment,
//!   remove them on detachment
//! - **data**: recompute the full feature set and replace the source's data
//! - **highlight**: restyle the layer when the selection changes, without
//!   touching the data
//!
//! The layer itself is never recreated while a run plays.

pub mod segments;
pub mod stations;
pub mod trains;

use geo::Coord;
use geojson::{Feature, FeatureCollection, Geometry, JsonObject, feature::Id};
use trainmap_core::selection::{Selected, SelectionBridge, SelectionWatch};

use crate::style::{Expression, LayerSpec, PaintProperty};
use crate::surface::{CursorStyle, FeatureHit, MapSurface, PointerEventKind, SurfaceError, SurfaceEvent};

pub use segments::SegmentsLayer;
pub use stations::StationsLayer;
pub use trains::{TrainInput, TrainsLayer};

const POINTER_EVENTS: [PointerEventKind; 3] = [
    PointerEventKind::Click,
    PointerEventKind::MouseEnter,
    PointerEventKind::MouseLeave,
];

pub trait FeatureLayer {
    const SOURCE_ID: &'static str;
    const LAYER_ID: &'static str;
    const INTERACTIVE: bool;

    /// What the features are computed from.
    type Input<'a>;

    /// Identity selected by clicking a feature of this layer.
    type Selection: Clone + PartialEq;

    fn layer_spec() -> LayerSpec;

    fn features(input: Self::Input<'_>) -> Vec<Feature>;

    /// The slot of the selection bridge this layer reads and writes.
    fn selection(_bridge: &SelectionBridge) -> Option<&Selected<Self::Selection>> {
        None
    }

    /// Paint properties for the given selection.
    fn highlight(_selected: Option<&Self::Selection>) -> Vec<(PaintProperty, Expression)> {
        Vec::new()
    }

    fn selection_from_hit(_hit: &FeatureHit) -> Option<Self::Selection> {
        None
    }
}

pub struct Synchronizer<L: FeatureLayer> {
    attached: bool,
    selection: Option<SelectionWatch<L::Selection>>,
    /// Highlight must be applied regardless of selection changes.
    highlight_stale: bool,
}

impl<L: FeatureLayer> Synchronizer<L> {
    pub fn new(bridge: &SelectionBridge) -> Self {
        Self {
            attached: false,
            selection: L::selection(bridge).map(Selected::subscribe),
            highlight_stale: true,
        }
    }

    pub fn is_attached(&self) -> bool {
        self.attached
    }

    /// Register the source (empty) and the layer, and subscribe to pointer
    /// events. Does nothing until the surface is ready; safe to repeat.
    pub fn attach<S: MapSurface + ?Sized>(&mut self, surface: &mut S) -> Result<(), SurfaceError> {
        if !surface.is_ready() {
            tracing::debug!(layer = L::LAYER_ID, "surface not ready, deferring attach");
            return Ok(());
        }

        if !surface.has_source(L::SOURCE_ID) {
            surface.add_source(L::SOURCE_ID, collection(Vec::new()))?;
        }
        if !surface.has_layer(L::LAYER_ID) {
            surface.add_layer(L::layer_spec())?;
        }
        if L::INTERACTIVE {
            for kind in POINTER_EVENTS {
                surface.subscribe(L::LAYER_ID, kind);
            }
        }

        if !self.attached {
            tracing::debug!(layer = L::LAYER_ID, "attached");
        }
        self.attached = true;
        self.highlight_stale = true;
        Ok(())
    }

    /// Remove the layer and source if present and drop the subscriptions.
    pub fn detach<S: MapSurface + ?Sized>(&mut self, surface: &mut S) -> Result<(), SurfaceError> {
        if surface.has_layer(L::LAYER_ID) {
            surface.remove_layer(L::LAYER_ID)?;
        }
        if surface.has_source(L::SOURCE_ID) {
            surface.remove_source(L::SOURCE_ID)?;
        }
        if L::INTERACTIVE {
            for kind in POINTER_EVENTS {
                surface.unsubscribe(L::LAYER_ID, kind);
            }
        }

        self.attached = false;
        tracing::debug!(layer = L::LAYER_ID, "detached");
        Ok(())
    }

    /// Replace the source's features with those computed from `input`.
    ///
    /// Returns whether the source existed to receive them.
    pub fn sync_data<S: MapSurface + ?Sized>(
        &mut self,
        surface: &mut S,
        input: L::Input<'_>,
    ) -> Result<bool, SurfaceError> {
        if !surface.has_source(L::SOURCE_ID) {
            return Ok(false);
        }

        let features = L::features(input);
        tracing::trace!(layer = L::LAYER_ID, features = features.len(), "replacing data");
        surface.set_source_data(L::SOURCE_ID, collection(features))?;
        Ok(true)
    }

    /// Restyle the layer if the selection changed since the last call (or
    /// the layer was just attached). Returns whether paint was updated.
    pub fn sync_highlight<S: MapSurface + ?Sized>(
        &mut self,
        surface: &mut S,
    ) -> Result<bool, SurfaceError> {
        let Some(watch) = self.selection.as_mut() else {
            return Ok(false);
        };
        if !surface.has_layer(L::LAYER_ID) {
            return Ok(false);
        }
        if !self.highlight_stale && !watch.has_changed() {
            return Ok(false);
        }

        let selected = watch.current();
        for (property, value) in L::highlight(selected.as_ref()) {
            surface.set_paint_property(L::LAYER_ID, property, value)?;
        }
        self.highlight_stale = false;
        Ok(true)
    }

    /// React to a pointer event on this layer. Returns whether it was ours.
    pub fn handle_event<S: MapSurface + ?Sized>(
        &self,
        surface: &mut S,
        bridge: &SelectionBridge,
        event: &SurfaceEvent,
    ) -> bool {
        if !L::INTERACTIVE || event.layer != L::LAYER_ID {
            return false;
        }

        match event.kind {
            PointerEventKind::Click => {
                let selection = event.feature.as_ref().and_then(L::selection_from_hit);
                if let (Some(slot), Some(id)) = (L::selection(bridge), selection) {
                    slot.select(id);
                }
            }
            PointerEventKind::MouseEnter => surface.set_cursor(CursorStyle::Pointer),
            PointerEventKind::MouseLeave => surface.set_cursor(CursorStyle::Default),
        }
        true
    }
}

// ============================================================================
// GeoJSON helpers
// ============================================================================

pub(crate) fn collection(features: Vec<Feature>) -> FeatureCollection {
    FeatureCollection {
        bbox: None,
        features,
        foreign_members: None,
    }
}

pub(crate) fn feature(id: &str, value: geojson::Value, properties: JsonObject) -> Feature {
    Feature {
        bbox: None,
        geometry: Some(Geometry::new(value)),
        id: Some(Id::String(id.to_owned())),
        properties: Some(properties),
        foreign_members: None,
    }
}

pub(crate) fn position(coord: Coord<f64>) -> Vec<f64> {
    vec![coord.x, coord.y]
}

/// The entity id carried by a clicked feature: the named property, or the
/// feature id when the property is absent.
pub(crate) fn hit_identity<'a>(hit: &'a FeatureHit, property: &str) -> Option<&'a str> {
    hit.string_property(property)
        .or(hit.id.as_deref().filter(|id| !id.is_empty()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use trainmap_network::{StationId, StationLocation};

    use crate::surface::MemorySurface;

    fn locations() -> Vec<StationLocation> {
        vec![
            StationLocation {
                id: "A".into(),
                coordinates: [0.0, 0.0],
            },
            StationLocation {
                id: "B".into(),
                coordinates: [1.0, 1.0],
            },
        ]
    }

    #[test]
    fn test_attach_registers_once() {
        let bridge = SelectionBridge::new();
        let mut surface = MemorySurface::new();
        let mut stations = Synchronizer::<StationsLayer>::new(&bridge);

        stations.attach(&mut surface).unwrap();
        stations.attach(&mut surface).unwrap();
        let locations = locations();
        for _ in 0..5 {
            stations.sync_data(&mut surface, locations.as_slice()).unwrap();
        }

        let stats = surface.stats();
        assert_eq!(stats.sources_added, 1);
        assert_eq!(stats.layers_added, 1);
        assert_eq!(stats.data_replaced, 5);
        assert!(surface.is_subscribed(StationsLayer::LAYER_ID, PointerEventKind::Click));
    }

    #[test]
    fn test_detach_removes_everything() {
        let bridge = SelectionBridge::new();
        let mut surface = MemorySurface::new();
        let mut stations = Synchronizer::<StationsLayer>::new(&bridge);

        stations.attach(&mut surface).unwrap();
        stations.detach(&mut surface).unwrap();
        stations.detach(&mut surface).unwrap();

        assert!(!surface.has_layer(StationsLayer::LAYER_ID));
        assert!(!surface.has_source(StationsLayer::SOURCE_ID));
        assert!(!surface.is_subscribed(StationsLayer::LAYER_ID, PointerEventKind::Click));
        assert!(!stations.is_attached());
    }

    #[test]
    fn test_data_sync_without_source_is_skipped() {
        let bridge = SelectionBridge::new();
        let mut surface = MemorySurface::new();
        let mut stations = Synchronizer::<StationsLayer>::new(&bridge);

        assert!(!stations.sync_data(&mut surface, locations().as_slice()).unwrap());
        assert_eq!(surface.stats().data_replaced, 0);
    }

    #[test]
    fn test_highlight_only_on_change() {
        let bridge = SelectionBridge::new();
        let mut surface = MemorySurface::new();
        let mut stations = Synchronizer::<StationsLayer>::new(&bridge);
        stations.attach(&mut surface).unwrap();
        stations.sync_data(&mut surface, locations().as_slice()).unwrap();

        // Initial style after attaching
        assert!(stations.sync_highlight(&mut surface).unwrap());
        assert!(!stations.sync_highlight(&mut surface).unwrap());

        bridge.station.select(StationId::new("A"));
        let data_before = surface.stats().data_replaced;
        assert!(stations.sync_highlight(&mut surface).unwrap());
        assert!(!stations.sync_highlight(&mut surface).unwrap());
        assert_eq!(surface.stats().data_replaced, data_before);

        let layer = surface.layer(StationsLayer::LAYER_ID).unwrap();
        let source = surface.source(StationsLayer::SOURCE_ID).unwrap();
        let radius = &layer.paint[&PaintProperty::CircleRadius];
        assert_eq!(radius.evaluate_f64(&source.features[0]), Some(8.0));
        assert_eq!(radius.evaluate_f64(&source.features[1]), Some(4.0));
    }

    #[test]
    fn test_click_selects_and_hover_sets_cursor() {
        let bridge = SelectionBridge::new();
        let mut surface = MemorySurface::new();
        let mut stations = Synchronizer::<StationsLayer>::new(&bridge);
        stations.attach(&mut surface).unwrap();
        stations.sync_data(&mut surface, locations().as_slice()).unwrap();

        let at = Coord { x: 1.0, y: 1.0 };
        for event in surface.click(at, 0.1) {
            assert!(stations.handle_event(&mut surface, &bridge, &event));
        }
        assert_eq!(bridge.station.get(), Some(StationId::new("B")));

        for event in surface.pointer_move(at, 0.1) {
            stations.handle_event(&mut surface, &bridge, &event);
        }
        assert_eq!(surface.cursor(), CursorStyle::Pointer);

        for event in surface.pointer_move(Coord { x: 5.0, y: 5.0 }, 0.1) {
            stations.handle_event(&mut surface, &bridge, &event);
        }
        assert_eq!(surface.cursor(), CursorStyle::Default);
    }

    #[test]
    fn test_click_falls_back_to_feature_id() {
        let hit = FeatureHit {
            id: Some("S9".to_owned()),
            properties: JsonObject::new(),
        };
        assert_eq!(hit_identity(&hit, "stationId"), Some("S9"));
    }
}
