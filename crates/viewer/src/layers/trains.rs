//! Moving trains, projected onto the shared track geometry every tick.

use serde_json::json;
use trainmap_core::selection::{Selected, SelectionBridge};
use trainmap_network::{GeometryIndex, Snapshot, TrainId};

use crate::layers::{FeatureLayer, feature, hit_identity, position};
use crate::style::{Expression, LayerSpec, LayerType, PaintProperty, colors};
use crate::surface::FeatureHit;

pub struct TrainsLayer;

#[derive(Clone, Copy)]
pub struct TrainInput<'a> {
    /// `None` once a run has been discarded.
    pub snapshot: Option<&'a Snapshot>,
    pub geometry: &'a GeometryIndex,
}

impl FeatureLayer for TrainsLayer {
    const SOURCE_ID: &'static str = "trains";
    const LAYER_ID: &'static str = "trains-layer";
    const INTERACTIVE: bool = true;

    type Input<'a> = TrainInput<'a>;
    type Selection = TrainId;

    fn layer_spec() -> LayerSpec {
        LayerSpec::new(Self::LAYER_ID, LayerType::Circle, Self::SOURCE_ID)
            .with_paint(PaintProperty::CircleRadius, Expression::number(6.0))
            .with_paint(PaintProperty::CircleColor, Expression::color(colors::TRAIN))
            .with_paint(PaintProperty::CircleStrokeWidth, Expression::number(2.0))
            .with_paint(PaintProperty::CircleStrokeColor, Expression::color(colors::STROKE))
            .with_paint(PaintProperty::CircleOpacity, Expression::number(0.9))
    }

    /// One point per train on a segment. Reverse-direction segments are
    /// measured from the far end of the shared polyline.
    fn features(input: TrainInput<'_>) -> Vec<geojson::Feature> {
        let Some(snapshot) = input.snapshot else {
            return Vec::new();
        };

        let mut features = Vec::new();
        for segment in snapshot.occupied_segments() {
            let Some(track) = input.geometry.resolve_segment(segment) else {
                tracing::debug!(segment = %segment.id, "no geometry for occupied segment");
                continue;
            };

            for (train_id, occupant) in &segment.trains_on_segment {
                let Some(coord) = track.project(occupant.position, segment.length) else {
                    continue;
                };

                let mut properties = serde_json::Map::new();
                properties.insert("trainId".to_string(), json!(train_id.as_str()));
                properties.insert(
                    "hasActiveDelay".to_string(),
                    json!(snapshot.has_active_delay(train_id)),
                );
                features.push(feature(
                    train_id.as_str(),
                    geojson::Value::Point(position(coord)),
                    properties,
                ));
            }
        }

        features
    }

    fn selection(bridge: &SelectionBridge) -> Option<&Selected<TrainId>> {
        Some(&bridge.train)
    }

    fn highlight(selected: Option<&TrainId>) -> Vec<(PaintProperty, Expression)> {
        let id = selected.map(TrainId::as_str);
        let is_selected =
            Expression::equals(Expression::get("trainId"), Expression::string(id.unwrap_or_default()));

        vec![
            (
                PaintProperty::CircleRadius,
                Expression::when_selected("trainId", id, Expression::number(10.0), Expression::number(6.0)),
            ),
            (
                PaintProperty::CircleColor,
                // An active delay outranks the selection colour
                Expression::case(
                    vec![
                        (Expression::get("hasActiveDelay"), Expression::color(colors::TRAIN_DELAYED)),
                        (is_selected, Expression::color(colors::TRAIN_SELECTED)),
                    ],
                    Expression::color(colors::TRAIN),
                ),
            ),
            (
                PaintProperty::CircleStrokeWidth,
                Expression::when_selected("trainId", id, Expression::number(3.0), Expression::number(2.0)),
            ),
        ]
    }

    fn selection_from_hit(hit: &FeatureHit) -> Option<TrainId> {
        hit_identity(hit, "trainId").map(TrainId::new)
    }
}
