//! # trainmap-viewer
//!
//! Terminal front end of the train-network simulation: three map layers
//! kept in step with the engine's snapshots, pointer-driven selection and
//! an operator console on stdin.

pub mod app;
pub mod commands;
pub mod config;
pub mod engines;
pub mod layers;
pub mod logging;
pub mod style;
pub mod surface;

pub mod prelude {
    pub use crate::app::{App, Flow, ResourceSet, run_console};
    pub use crate::commands::{Command, CommandError};
    pub use crate::config::ViewerArgs;
    pub use crate::engines::{ProcessEngine, ReplayEngine};
    pub use crate::layers::{
        FeatureLayer, SegmentsLayer, StationsLayer, Synchronizer, TrainInput, TrainsLayer,
    };
    pub use crate::logging::setup_logging;
    pub use crate::style::{Expression, LayerSpec, LayerType, PaintProperty};
    pub use crate::surface::{MapSurface, MemorySurface, SurfaceError, TerminalSurface};
}
