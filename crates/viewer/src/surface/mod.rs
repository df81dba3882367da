//! The rendering surface the feature layers draw into.
//!
//! A surface owns named GeoJSON sources and paint layers that reference
//! them, in the manner of a vector map renderer. Layers are registered once
//! and then fed new data; pointer interaction is reported per layer as
//! [`SurfaceEvent`]s.

pub mod memory;
pub mod terminal;

use geojson::{FeatureCollection, JsonObject};
use serde_json::Value;

use crate::style::{Expression, LayerSpec, PaintProperty};

pub use memory::MemorySurface;
pub use terminal::TerminalSurface;

pub trait MapSurface {
    /// Whether sources and layers can be registered yet.
    fn is_ready(&self) -> bool {
        true
    }

    fn has_source(&self, id: &str) -> bool;

    /// Register a source. Fails if the id is taken.
    fn add_source(&mut self, id: &str, data: FeatureCollection) -> Result<(), SurfaceError>;

    /// Replace a source's features wholesale.
    fn set_source_data(&mut self, id: &str, data: FeatureCollection) -> Result<(), SurfaceError>;

    /// Fails while a layer still references the source.
    fn remove_source(&mut self, id: &str) -> Result<(), SurfaceError>;

    fn has_layer(&self, id: &str) -> bool;

    /// Register a layer on top of the existing ones.
    fn add_layer(&mut self, layer: LayerSpec) -> Result<(), SurfaceError>;

    fn remove_layer(&mut self, id: &str) -> Result<(), SurfaceError>;

    fn set_paint_property(
        &mut self,
        layer: &str,
        property: PaintProperty,
        value: Expression,
    ) -> Result<(), SurfaceError>;

    fn subscribe(&mut self, layer: &str, kind: PointerEventKind);

    fn unsubscribe(&mut self, layer: &str, kind: PointerEventKind);

    fn set_cursor(&mut self, cursor: CursorStyle);
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, strum::Display)]
#[strum(serialize_all = "lowercase")]
pub enum PointerEventKind {
    Click,
    MouseEnter,
    MouseLeave,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, strum::Display)]
#[strum(serialize_all = "lowercase")]
pub enum CursorStyle {
    #[default]
    Default,
    Pointer,
}

/// The topmost feature of a layer under the pointer.
#[derive(Clone, Debug, PartialEq)]
pub struct FeatureHit {
    pub id: Option<String>,
    pub properties: JsonObject,
}

impl FeatureHit {
    pub fn string_property(&self, key: &str) -> Option<&str> {
        self.properties
            .get(key)
            .and_then(Value::as_str)
            .filter(|value| !value.is_empty())
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct SurfaceEvent {
    pub kind: PointerEventKind,
    pub layer: String,
    /// Absent for [`PointerEventKind::MouseLeave`].
    pub feature: Option<FeatureHit>,
}

#[derive(Debug, thiserror::Error)]
pub enum SurfaceError {
    #[error("Source {0} already exists")]
    DuplicateSource(String),

    #[error("Layer {0} already exists")]
    DuplicateLayer(String),

    #[error("Unknown source {0}")]
    UnknownSource(String),

    #[error("Unknown layer {0}")]
    UnknownLayer(String),

    #[error("Source {source_id} is still used by layer {layer}")]
    SourceInUse { source_id: String, layer: String },
}
