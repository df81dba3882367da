use serde_json::json;
use trainmap_core::selection::{Selected, SelectionBridge};
use trainmap_network::{StationId, StationLocation};

use crate::layers::{FeatureLayer, feature, hit_identity};
use crate::style::{Expression, LayerSpec, LayerType, PaintProperty, colors};
use crate::surface::FeatureHit;

/// Station markers, keyed by `stationId`.
pub struct StationsLayer;

impl FeatureLayer for StationsLayer {
    const SOURCE_ID: &'static str = "stations";
    const LAYER_ID: &'static str = "stations-layer";
    const INTERACTIVE: bool = true;

    type Input<'a> = &'a [StationLocation];
    type Selection = StationId;

    fn layer_spec() -> LayerSpec {
        LayerSpec::new(Self::LAYER_ID, LayerType::Circle, Self::SOURCE_ID)
            .with_paint(PaintProperty::CircleRadius, Expression::number(4.0))
            .with_paint(PaintProperty::CircleColor, Expression::color(colors::STATION))
            .with_paint(PaintProperty::CircleStrokeWidth, Expression::number(2.0))
            .with_paint(PaintProperty::CircleStrokeColor, Expression::color(colors::STROKE))
            .with_paint(PaintProperty::CircleOpacity, Expression::number(0.9))
    }

    fn features(stations: &[StationLocation]) -> Vec<geojson::Feature> {
        stations
            .iter()
            .map(|station| {
                let mut properties = serde_json::Map::new();
                properties.insert("stationId".to_string(), json!(station.id.as_str()));
                feature(
                    station.id.as_str(),
                    geojson::Value::Point(station.coordinates.to_vec()),
                    properties,
                )
            })
            .collect()
    }

    fn selection(bridge: &SelectionBridge) -> Option<&Selected<StationId>> {
        Some(&bridge.station)
    }

    fn highlight(selected: Option<&StationId>) -> Vec<(PaintProperty, Expression)> {
        let id = selected.map(StationId::as_str);
        let when_selected = |selected: Expression, otherwise: Expression| {
            Expression::when_selected("stationId", id, selected, otherwise)
        };

        vec![
            (
                PaintProperty::CircleRadius,
                when_selected(Expression::number(8.0), Expression::number(4.0)),
            ),
            (
                PaintProperty::CircleColor,
                when_selected(
                    Expression::color(colors::STATION_SELECTED),
                    Expression::color(colors::STATION),
                ),
            ),
            (
                PaintProperty::CircleStrokeWidth,
                when_selected(Expression::number(3.0), Expression::number(2.0)),
            ),
        ]
    }

    fn selection_from_hit(hit: &FeatureHit) -> Option<StationId> {
        hit_identity(hit, "stationId").map(StationId::new)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::Value;

    #[test]
    fn test_features_carry_station_id() {
        let features = StationsLayer::features(&[StationLocation {
            id: "PAR".into(),
            coordinates: [2.35, 48.85],
        }]);

        assert_eq!(features.len(), 1);
        let properties = features[0].properties.as_ref().unwrap();
        assert_eq!(properties["stationId"], Value::from("PAR"));
        assert_eq!(
            features[0].geometry.as_ref().unwrap().value,
            geojson::Value::Point(vec![2.35, 48.85])
        );
    }

    #[test]
    fn test_highlight_paint() {
        let paint = StationsLayer::highlight(Some(&StationId::new("PAR")));
        let properties: Vec<PaintProperty> = paint.iter().map(|(p, _)| *p).collect();
        assert_eq!(
            properties,
            [
                PaintProperty::CircleRadius,
                PaintProperty::CircleColor,
                PaintProperty::CircleStrokeWidth
            ]
        );
        assert_eq!(
            paint[0].1.to_json(),
            json!(["case", ["==", ["get", "stationId"], "PAR"], 8.0, 4.0])
        );
    }
}
