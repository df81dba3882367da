//! Boundary to the external simulation engine.
//!
//! The engine is opaque: it is configured once per run and then advanced one
//! tick at a time, answering each call with the full snapshot as JSON text.

use trainmap_network::RunConfig;

pub trait SimulationEngine {
    /// Configure a fresh run and return its initial snapshot.
    fn initialize(&mut self, config: &RunConfig) -> Result<String, EngineError>;

    /// Advance one tick and return the resulting snapshot.
    fn step(&mut self) -> Result<String, EngineError>;
}

impl<E: SimulationEngine + ?Sized> SimulationEngine for Box<E> {
    fn initialize(&mut self, config: &RunConfig) -> Result<String, EngineError> {
        (**self).initialize(config)
    }

    fn step(&mut self) -> Result<String, EngineError> {
        (**self).step()
    }
}

#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    #[error("Engine has not been initialized")]
    NotInitialized,

    #[error("Engine I/O failed: {0}")]
    Io(#[from] std::io::Error),

    #[error("Engine closed its output")]
    Closed,

    #[error("Engine protocol error: {0}")]
    Protocol(String),
}
