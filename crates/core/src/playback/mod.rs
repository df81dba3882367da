//! Playback of a simulation run: state machine, sessions and async driver.

pub mod driver;
pub mod scheduler;
pub mod session;

pub use driver::play_until_stopped;
pub use scheduler::{
    Continuation, DEFAULT_CADENCE, FinishedRun, PlaybackError, PlaybackStatus, Published,
    TickScheduler,
};
pub use session::SessionToken;
