//! # trainmap-core
//!
//! Everything between the simulation engine and the map surface that does
//! not draw: stepping the engine on a fixed cadence, sharing the selected
//! station and train, recording completed runs and shaping the detail
//! panels.

pub mod engine;
pub mod format;
pub mod history;
pub mod panels;
pub mod playback;
pub mod selection;

#[cfg(test)]
mod testing;

// Re-export the data model crate
pub use trainmap_network as network;

pub mod prelude {
    pub use crate::engine::{EngineError, SimulationEngine};
    pub use crate::format::{delay_minutes, format_clock, format_delay, format_duration};
    pub use crate::history::{
        FileStorage, HistoryStorage, MAX_HISTORY_SIZE, MemoryStorage, RunHistory, RunRecord,
        StorageError,
    };
    pub use crate::panels::{EventSummary, StationDetails, StopDetails, TrainDetails};
    pub use crate::playback::{
        DEFAULT_CADENCE, FinishedRun, PlaybackError, PlaybackStatus, Published, SessionToken,
        TickScheduler, play_until_stopped,
    };
    pub use crate::selection::{Selected, SelectionBridge, SelectionWatch};
}
