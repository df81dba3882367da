//! Concrete [`SimulationEngine`](trainmap_core::engine::SimulationEngine)s.

pub mod process;
pub mod replay;

pub use process::ProcessEngine;
pub use replay::ReplayEngine;
