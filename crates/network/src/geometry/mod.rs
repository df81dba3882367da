//! Track geometry and projection of trains onto it.

pub mod index;
pub mod projector;

pub use index::{GeometryIndex, PairKey, TrackGeometry, TrackRef};
pub use projector::{project, project_on};
