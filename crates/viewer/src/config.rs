use std::path::PathBuf;
use std::time::Duration;

use clap::{ArgAction, Parser};
use tracing::Level;
use trainmap_core::history::{FileStorage, HistoryStorage, MemoryStorage};
use trainmap_network::{DriverBehavior, ResourceLocation, RunConfig, StationStrategy};

#[derive(Parser, Debug)]
#[command(
    name = "trainmap",
    version,
    about = "Live terminal map of a train-network simulation",
    long_about = "Steps a simulation engine at a fixed cadence and draws stations, tracks \
                  and moving trains to the terminal. Operator commands are read from stdin, \
                  one per line (start, play, pause, step, restart, click <col> <row>, ...)."
)]
pub struct ViewerArgs {
    /// Engine command speaking the line protocol on stdin/stdout
    #[arg(long, required_unless_present = "replay", conflicts_with = "replay")]
    pub engine: Option<String>,

    /// JSON-lines recording of snapshots to replay instead of an engine
    #[arg(long)]
    pub replay: Option<PathBuf>,

    /// Station locations, file path or http(s) URL
    #[arg(long, default_value = "data/stations.json")]
    pub stations: String,

    /// Track polylines, file path or http(s) URL
    #[arg(long, default_value = "data/segments.json")]
    pub segments: String,

    /// Where completed runs are recorded
    #[arg(long, default_value = "trainmap-history.json")]
    pub history_file: PathBuf,

    /// Keep the run history in memory only
    #[arg(long)]
    pub no_history: bool,

    /// Milliseconds between engine steps while playing
    #[arg(long, default_value_t = 16)]
    pub cadence_ms: u64,

    /// Map width in terminal columns
    #[arg(long, default_value_t = 100)]
    pub width: usize,

    /// Map height in terminal rows
    #[arg(long, default_value_t = 30)]
    pub height: usize,

    /// Disable ANSI colours and screen clearing
    #[arg(long)]
    pub no_color: bool,

    /// Driver behaviour for runs started without one
    #[arg(long, default_value_t = DriverBehavior::Eco)]
    pub driver: DriverBehavior,

    /// Station strategy for runs started without one
    #[arg(long, default_value_t = StationStrategy::NoSort)]
    pub strategy: StationStrategy,

    /// Start a run immediately
    #[arg(long)]
    pub autostart: bool,

    /// Play one run to completion without drawing, then exit
    #[arg(long)]
    pub headless: bool,

    /// More logging (-v debug, -vv trace)
    #[arg(short, long, action = ArgAction::Count)]
    pub verbose: u8,
}

impl ViewerArgs {
    pub fn run_config(&self) -> RunConfig {
        RunConfig::new(self.driver, self.strategy)
    }

    pub fn cadence(&self) -> Duration {
        Duration::from_millis(self.cadence_ms)
    }

    pub fn stations_location(&self) -> ResourceLocation {
        ResourceLocation::parse(&self.stations)
    }

    pub fn segments_location(&self) -> ResourceLocation {
        ResourceLocation::parse(&self.segments)
    }

    pub fn history_storage(&self) -> Box<dyn HistoryStorage> {
        if self.no_history {
            Box::new(MemoryStorage::new())
        } else {
            Box::new(FileStorage::new(&self.history_file))
        }
    }

    pub fn log_level(&self) -> Level {
        match self.verbose {
            0 => Level::INFO,
            1 => Level::DEBUG,
            _ => Level::TRACE,
        }
    }
}
