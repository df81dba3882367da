use trainmap_network::{GeometryIndex, SegmentId};

use crate::layers::{FeatureLayer, feature};
use crate::style::{Expression, LayerSpec, LayerType, LayoutProperty, PaintProperty, colors};

/// Track lines, one per station pair. Not interactive.
pub struct SegmentsLayer;

impl FeatureLayer for SegmentsLayer {
    const SOURCE_ID: &'static str = "segments";
    const LAYER_ID: &'static str = "segments-layer";
    const INTERACTIVE: bool = false;

    type Input<'a> = &'a GeometryIndex;
    type Selection = SegmentId;

    fn layer_spec() -> LayerSpec {
        LayerSpec::new(Self::LAYER_ID, LayerType::Line, Self::SOURCE_ID)
            .with_layout(LayoutProperty::LineJoin, "round")
            .with_layout(LayoutProperty::LineCap, "round")
            .with_paint(PaintProperty::LineColor, Expression::color(colors::TRACK))
            .with_paint(PaintProperty::LineWidth, Expression::number(2.0))
            .with_paint(PaintProperty::LineOpacity, Expression::number(1.0))
    }

    fn features(index: &GeometryIndex) -> Vec<geojson::Feature> {
        index
            .tracks()
            .iter()
            .map(|track| {
                let id = SegmentId::between(&track.from, &track.to);
                let coordinates = track.line.coords().map(|c| vec![c.x, c.y]).collect();
                feature(
                    id.as_str(),
                    geojson::Value::LineString(coordinates),
                    serde_json::Map::new(),
                )
            })
            .collect()
    }
}
