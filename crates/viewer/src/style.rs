//! Layer definitions and data-driven paint expressions.
//!
//! Expressions follow the array encoding map renderers understand
//! (`["case", ["==", ["get", "trainId"], "T1"], 10, 6]`) and can also be
//! evaluated here against a feature, which is what the terminal surface
//! does.

use std::collections::BTreeMap;

use geojson::{Feature, feature::Id};
use palette::Srgb;
use serde::{Serialize, Serializer};
use serde_json::{Value, json};

// ============================================================================
// Colours
// ============================================================================

pub mod colors {
    use palette::Srgb;

    pub const STATION: Srgb<u8> = Srgb::new(0xef, 0x44, 0x44);
    pub const STATION_SELECTED: Srgb<u8> = Srgb::new(0xdc, 0x26, 0x26);
    pub const TRACK: Srgb<u8> = Srgb::new(0x3b, 0x82, 0xf6);
    pub const TRAIN: Srgb<u8> = Srgb::new(0x10, 0xb9, 0x81);
    pub const TRAIN_SELECTED: Srgb<u8> = Srgb::new(0x05, 0x96, 0x69);
    pub const TRAIN_DELAYED: Srgb<u8> = Srgb::new(0xea, 0xb3, 0x08);
    pub const STROKE: Srgb<u8> = Srgb::new(0xff, 0xff, 0xff);
}

/// `#rrggbb`
pub fn hex(color: Srgb<u8>) -> String {
    format!("#{:02x}{:02x}{:02x}", color.red, color.green, color.blue)
}

pub fn parse_hex(value: &str) -> Option<Srgb<u8>> {
    value.parse().ok()
}

// ============================================================================
// Properties
// ============================================================================

#[derive(
    Clone,
    Copy,
    Debug,
    PartialEq,
    Eq,
    Hash,
    PartialOrd,
    Ord,
    Serialize,
    strum::Display,
    strum::EnumString,
    strum::AsRefStr,
)]
#[serde(rename_all = "kebab-case")]
#[strum(serialize_all = "kebab-case")]
pub enum PaintProperty {
    CircleRadius,
    CircleColor,
    CircleStrokeWidth,
    CircleStrokeColor,
    CircleOpacity,
    LineColor,
    LineWidth,
    LineOpacity,
}

#[derive(
    Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, strum::Display,
)]
#[serde(rename_all = "kebab-case")]
#[strum(serialize_all = "kebab-case")]
pub enum LayoutProperty {
    LineJoin,
    LineCap,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, strum::Display)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum LayerType {
    Circle,
    Line,
}

// ============================================================================
// Expressions
// ============================================================================

#[derive(Clone, Debug, PartialEq)]
pub enum Expression {
    Literal(Value),
    /// A feature property.
    Get(String),
    /// The feature id.
    Id,
    Eq(Box<Expression>, Box<Expression>),
    /// First branch whose condition is `true`, else the fallback.
    Case {
        branches: Vec<(Expression, Expression)>,
        fallback: Box<Expression>,
    },
}

impl Expression {
    pub fn number(value: f64) -> Self {
        Self::Literal(json!(value))
    }

    pub fn string(value: impl Into<String>) -> Self {
        Self::Literal(Value::String(value.into()))
    }

    pub fn color(color: Srgb<u8>) -> Self {
        Self::string(hex(color))
    }

    pub fn get(property: impl Into<String>) -> Self {
        Self::Get(property.into())
    }

    pub fn equals(left: Expression, right: Expression) -> Self {
        Self::Eq(Box::new(left), Box::new(right))
    }

    pub fn case(branches: Vec<(Expression, Expression)>, fallback: Expression) -> Self {
        Self::Case {
            branches,
            fallback: Box::new(fallback),
        }
    }

    /// `selected` when `property` equals `id`, else `otherwise`.
    ///
    /// A missing selection compares against the empty string, which no
    /// feature carries.
    pub fn when_selected(
        property: &str,
        id: Option<&str>,
        selected: Expression,
        otherwise: Expression,
    ) -> Self {
        Self::case(
            vec![(
                Self::equals(Self::get(property), Self::string(id.unwrap_or_default())),
                selected,
            )],
            otherwise,
        )
    }

    pub fn to_json(&self) -> Value {
        match self {
            Self::Literal(value) => value.clone(),
            Self::Get(property) => json!(["get", property]),
            Self::Id => json!(["id"]),
            Self::Eq(left, right) => json!(["==", left.to_json(), right.to_json()]),
            Self::Case { branches, fallback } => {
                let mut array = vec![json!("case")];
                for (condition, output) in branches {
                    array.push(condition.to_json());
                    array.push(output.to_json());
                }
                array.push(fallback.to_json());
                Value::Array(array)
            }
        }
    }

    pub fn evaluate(&self, feature: &Feature) -> Value {
        match self {
            Self::Literal(value) => value.clone(),
            Self::Get(property) => feature
                .properties
                .as_ref()
                .and_then(|properties| properties.get(property))
                .cloned()
                .unwrap_or(Value::Null),
            Self::Id => match &feature.id {
                Some(Id::String(id)) => Value::String(id.clone()),
                Some(Id::Number(id)) => Value::Number(id.clone()),
                None => Value::Null,
            },
            Self::Eq(left, right) => Value::Bool(left.evaluate(feature) == right.evaluate(feature)),
            Self::Case { branches, fallback } => branches
                .iter()
                .find(|(condition, _)| condition.evaluate(feature) == Value::Bool(true))
                .map_or_else(|| fallback.evaluate(feature), |(_, output)| output.evaluate(feature)),
        }
    }

    pub fn evaluate_f64(&self, feature: &Feature) -> Option<f64> {
        self.evaluate(feature).as_f64()
    }

    pub fn evaluate_color(&self, feature: &Feature) -> Option<Srgb<u8>> {
        self.evaluate(feature).as_str().and_then(parse_hex)
    }
}

impl Serialize for Expression {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.to_json().serialize(serializer)
    }
}

// ============================================================================
// Layers
// ============================================================================

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct LayerSpec {
    pub id: String,
    #[serde(rename = "type")]
    pub kind: LayerType,
    pub source: String,
    pub paint: BTreeMap<PaintProperty, Expression>,
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub layout: BTreeMap<LayoutProperty, Value>,
}

impl LayerSpec {
    pub fn new(id: &str, kind: LayerType, source: &str) -> Self {
        Self {
            id: id.to_owned(),
            kind,
            source: source.to_owned(),
            paint: BTreeMap::new(),
            layout: BTreeMap::new(),
        }
    }

    pub fn with_paint(mut self, property: PaintProperty, value: Expression) -> Self {
        self.paint.insert(property, value);
        self
    }

    pub fn with_layout(mut self, property: LayoutProperty, value: &str) -> Self {
        self.layout.insert(property, Value::String(value.to_owned()));
        self
    }
}
