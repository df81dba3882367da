//! The viewer: one simulation run, its map layers and the operator console.

use std::io::Write;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc;
use tokio::time::{self, Instant};
use trainmap_core::engine::SimulationEngine;
use trainmap_core::format::{format_clock, format_delay, format_duration};
use trainmap_core::history::{HistoryStorage, RunHistory};
use trainmap_core::panels::{EventSummary, StationDetails, TrainDetails};
use trainmap_core::playback::{Published, TickScheduler, play_until_stopped};
use trainmap_core::selection::SelectionBridge;
use trainmap_network::{
    DataFetcher, GeometryIndex, ResourceLocation, RunConfig, StationLocation,
    load_segment_locations, load_station_locations,
};
use uuid::Uuid;

use crate::commands::Command;
use crate::layers::{FeatureLayer, SegmentsLayer, StationsLayer, Synchronizer, TrainInput, TrainsLayer};
use crate::surface::{SurfaceError, SurfaceEvent, TerminalSurface};

/// How long the console waits for input when nothing is scheduled.
const IDLE_WAIT: Duration = Duration::from_secs(3600);

#[derive(Clone, Debug)]
pub struct ResourceSet {
    pub stations: ResourceLocation,
    pub segments: ResourceLocation,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Flow {
    Continue,
    Quit,
}

pub struct App<E> {
    scheduler: TickScheduler<E>,
    history: RunHistory<Box<dyn HistoryStorage>>,
    selection: SelectionBridge,
    surface: TerminalSurface,
    resources: ResourceSet,
    default_config: RunConfig,

    stations: Vec<StationLocation>,
    geometry: GeometryIndex,

    stations_layer: Synchronizer<StationsLayer>,
    segments_layer: Synchronizer<SegmentsLayer>,
    trains_layer: Synchronizer<TrainsLayer>,

    /// Feedback for the last command, shown under the map.
    messages: Vec<String>,
}

impl<E: SimulationEngine> App<E> {
    pub fn new(
        scheduler: TickScheduler<E>,
        history: RunHistory<Box<dyn HistoryStorage>>,
        surface: TerminalSurface,
        resources: ResourceSet,
        default_config: RunConfig,
    ) -> Self {
        let selection = SelectionBridge::new();

        Self {
            stations_layer: Synchronizer::new(&selection),
            segments_layer: Synchronizer::new(&selection),
            trains_layer: Synchronizer::new(&selection),
            scheduler,
            history,
            selection,
            surface,
            resources,
            default_config,
            stations: Vec::new(),
            geometry: GeometryIndex::new(),
            messages: Vec::new(),
        }
    }

    // ========================================================================
    // Accessors
    // ========================================================================

    pub fn scheduler(&self) -> &TickScheduler<E> {
        &self.scheduler
    }

    pub fn history(&self) -> &RunHistory<Box<dyn HistoryStorage>> {
        &self.history
    }

    pub fn selection(&self) -> &SelectionBridge {
        &self.selection
    }

    pub fn surface(&self) -> &TerminalSurface {
        &self.surface
    }

    pub fn geometry(&self) -> &GeometryIndex {
        &self.geometry
    }

    pub fn next_deadline(&self) -> Option<Instant> {
        self.scheduler.next_deadline()
    }

    pub fn notify(&mut self, message: impl Into<String>) {
        self.messages.push(message.into());
    }

    // ========================================================================
    // Layers
    // ========================================================================

    /// Register the three layers, tracks at the bottom and trains on top.
    pub fn attach(&mut self) -> eyre::Result<()> {
        self.segments_layer.attach(&mut self.surface)?;
        self.stations_layer.attach(&mut self.surface)?;
        self.trains_layer.attach(&mut self.surface)?;

        self.sync_static()?;
        self.sync_trains()?;
        self.sync_highlights()?;
        Ok(())
    }

    pub fn detach(&mut self) -> eyre::Result<()> {
        self.trains_layer.detach(&mut self.surface)?;
        self.stations_layer.detach(&mut self.surface)?;
        self.segments_layer.detach(&mut self.surface)?;
        Ok(())
    }

    /// Fetch the station and track resources again and redraw them.
    pub async fn reload(&mut self, fetcher: &dyn DataFetcher) -> eyre::Result<()> {
        self.stations = load_station_locations(fetcher, &self.resources.stations).await;
        let segments = load_segment_locations(fetcher, &self.resources.segments).await;
        self.geometry = GeometryIndex::from_locations(&segments);
        tracing::info!(
            stations = self.stations.len(),
            tracks = self.geometry.len(),
            "loaded network resources"
        );

        self.sync_static()?;
        self.sync_trains()?;
        Ok(())
    }

    fn sync_static(&mut self) -> Result<(), SurfaceError> {
        self.stations_layer
            .sync_data(&mut self.surface, self.stations.as_slice())?;
        self.segments_layer
            .sync_data(&mut self.surface, &self.geometry)?;
        Ok(())
    }

    fn sync_trains(&mut self) -> Result<(), SurfaceError> {
        let input = TrainInput {
            snapshot: self.scheduler.snapshot().map(Arc::as_ref),
            geometry: &self.geometry,
        };
        self.trains_layer.sync_data(&mut self.surface, input)?;
        Ok(())
    }

    fn sync_highlights(&mut self) -> Result<(), SurfaceError> {
        self.stations_layer.sync_highlight(&mut self.surface)?;
        self.segments_layer.sync_highlight(&mut self.surface)?;
        self.trains_layer.sync_highlight(&mut self.surface)?;
        Ok(())
    }

    fn dispatch(&mut self, events: &[SurfaceEvent]) {
        for event in events {
            let handled = self
                .stations_layer
                .handle_event(&mut self.surface, &self.selection, event)
                || self
                    .trains_layer
                    .handle_event(&mut self.surface, &self.selection, event);
            if !handled {
                tracing::trace!(layer = %event.layer, kind = %event.kind, "unhandled pointer event");
            }
        }
    }

    // ========================================================================
    // Playback
    // ========================================================================

    /// Push a published snapshot to the map, recording the run if it just
    /// finished.
    fn publish(&mut self, published: Published) -> eyre::Result<Option<Uuid>> {
        self.sync_trains()?;

        let Some(finished) = published.finished else {
            return Ok(None);
        };
        let record = self.history.record_finished(&finished);
        let id = record.id;
        self.messages.push(format!(
            "Run {id} ({}) finished at {}",
            finished.config,
            format_clock(finished.snapshot.current_time)
        ));
        Ok(Some(id))
    }

    pub fn start(&mut self, config: RunConfig, now: Instant) -> eyre::Result<Option<Uuid>> {
        let published = self.scheduler.start(config, now)?;
        self.publish(published)
    }

    /// Discard the run; the selection and the trains on the map go with it.
    pub fn restart(&mut self) -> eyre::Result<()> {
        self.scheduler.restart();
        self.selection.clear_all();
        self.sync_trains()?;
        self.sync_highlights()?;
        Ok(())
    }

    /// Run the pending continuation if due. Returns whether anything
    /// changed on screen.
    pub fn tick(&mut self, now: Instant) -> eyre::Result<bool> {
        match self.scheduler.run_due(now) {
            Ok(Some(published)) => {
                self.publish(published)?;
                Ok(true)
            }
            Ok(None) => Ok(false),
            Err(error) => {
                self.messages.push(format!("Simulation paused: {error}"));
                Ok(true)
            }
        }
    }

    /// Start a run and play it to the end without a console.
    pub async fn play_headless(&mut self, config: RunConfig) -> eyre::Result<Option<Uuid>> {
        let mut recorded = self.start(config, Instant::now())?;

        let Self {
            scheduler,
            trains_layer,
            surface,
            geometry,
            ..
        } = self;
        let mut ticks = 0_u64;
        let finished = play_until_stopped(scheduler, |published| {
            ticks += 1;
            let input = TrainInput {
                snapshot: Some(published.snapshot.as_ref()),
                geometry: &*geometry,
            };
            if let Err(error) = trains_layer.sync_data(&mut *surface, input) {
                tracing::warn!(%error, "failed to update trains");
            }
        })
        .await?;

        if let Some(run) = finished {
            let record = self.history.record_finished(&run);
            tracing::info!(
                id = %record.id,
                ticks,
                time = %format_clock(run.snapshot.current_time),
                trains = run.snapshot.trains.len(),
                "headless run complete"
            );
            recorded = Some(record.id);
        }
        Ok(recorded)
    }

    // ========================================================================
    // Commands
    // ========================================================================

    pub async fn execute(
        &mut self,
        command: Command,
        fetcher: &dyn DataFetcher,
        now: Instant,
    ) -> eyre::Result<Flow> {
        self.messages.clear();
        tracing::debug!(?command, "executing");

        match command {
            Command::Start { driver, strategy } => {
                let config = RunConfig::new(
                    driver.unwrap_or(self.default_config.driver_behavior),
                    strategy.unwrap_or(self.default_config.station_strategy),
                );
                if let Err(error) = self.start(config, now) {
                    self.messages.push(format!("Could not start {config}: {error}"));
                }
            }
            Command::Play => {
                if let Err(error) = self.scheduler.play(now) {
                    self.messages.push(error.to_string());
                }
            }
            Command::Pause => self.scheduler.pause(),
            Command::Toggle => {
                if let Err(error) = self.scheduler.toggle(now) {
                    self.messages.push(error.to_string());
                }
            }
            Command::Step => match self.scheduler.next_tick() {
                Ok(published) => {
                    self.publish(published)?;
                }
                Err(error) => self.messages.push(error.to_string()),
            },
            Command::Restart => self.restart()?,
            Command::Click { column, row } => {
                let events = self.surface.click_cell(column, row);
                self.dispatch(&events);
            }
            Command::Hover { column, row } => {
                let events = self.surface.hover_cell(column, row);
                self.dispatch(&events);
            }
            Command::SelectStation(id) => self.selection.station.select(id),
            Command::SelectTrain(id) => self.selection.train.select(id),
            Command::ClearStation => self.selection.station.clear(),
            Command::ClearTrain => self.selection.train.clear(),
            Command::Reload => self.reload(fetcher).await?,
            Command::History => self.messages = self.history_lines(),
            Command::HistoryRemove(id) => {
                if !self.history.remove(&id) {
                    self.messages.push(format!("No recorded run {id}"));
                }
            }
            Command::HistoryClear => self.history.clear(),
            Command::Quit => return Ok(Flow::Quit),
        }

        self.sync_highlights()?;
        Ok(Flow::Continue)
    }

    // ========================================================================
    // Text panels
    // ========================================================================

    pub fn status_lines(&self) -> Vec<String> {
        let snapshot = self.scheduler.snapshot().map(Arc::as_ref);
        let on_map = self
            .surface
            .memory()
            .source(TrainsLayer::SOURCE_ID)
            .map_or(0, |source| source.features.len());

        let run = match (self.scheduler.config(), snapshot) {
            (Some(config), Some(snapshot)) => {
                format!("{config} {}", format_clock(snapshot.current_time))
            }
            _ => "no run".to_owned(),
        };
        let mut lines = vec![format!(
            "[{}] {run} | trains on map: {on_map} | runs recorded: {}",
            self.scheduler.status(),
            self.history.len()
        )];

        if let Some(id) = self.selection.station.get() {
            match StationDetails::resolve(snapshot, Some(&id)) {
                Some(details) => lines.extend(station_lines(&details)),
                None => lines.push(format!("Station {id}: not in the current run")),
            }
        }
        if let Some(id) = self.selection.train.get() {
            match TrainDetails::resolve(snapshot, Some(&id)) {
                Some(details) => lines.extend(train_lines(&details)),
                None => lines.push(format!("Train {id}: not in the current run")),
            }
        }

        lines.extend(self.messages.iter().cloned());
        lines
    }

    /// Newest first.
    pub fn history_lines(&self) -> Vec<String> {
        if self.history.is_empty() {
            return vec!["No completed runs".to_owned()];
        }

        self.history
            .records()
            .iter()
            .rev()
            .map(|record| {
                format!(
                    "{} {} {} ({} trains)",
                    record.id,
                    record.config(),
                    record.completed_at.format("%Y-%m-%d %H:%M:%S"),
                    record.trains.len()
                )
            })
            .collect()
    }

    pub fn present<W: Write>(&self, out: &mut W) -> std::io::Result<()> {
        self.surface.present(out, &self.status_lines())
    }
}

fn station_lines(details: &StationDetails) -> Vec<String> {
    let mut lines = vec![format!(
        "Station {} ({}) {}",
        details.name,
        details.id,
        details.occupancy_label()
    )];
    lines.extend(details.trains.iter().map(|train| {
        format!("  {} since {}", train.train_id, format_clock(train.entry_time))
    }));
    lines
}

fn train_lines(details: &TrainDetails) -> Vec<String> {
    let event = match details.event {
        EventSummary::None => "running".to_owned(),
        EventSummary::Delay {
            cause,
            start_time,
            duration,
            active,
        } => format!(
            "{} delay of {} from {}{}",
            cause.label(),
            format_duration(duration),
            format_clock(start_time),
            if active { " (active)" } else { "" }
        ),
        EventSummary::Cancellation { start_time, active } => format!(
            "cancelled from {}{}",
            format_clock(start_time),
            if active { "" } else { " (upcoming)" }
        ),
    };

    let mut lines = vec![format!("Train {}: {event}", details.id)];
    if let Some(position) = &details.position {
        lines.push(format!(
            "  on {} at {:.0}/{:.0} m ({:.0}%)",
            position.segment_id,
            position.position,
            position.length,
            position.progress() * 100.0
        ));
    }

    let time = |planned: Option<i64>, delay: Option<i64>| match (planned, delay) {
        (Some(planned), Some(delay)) => {
            format!("{} {}", format_clock(planned), format_delay(delay as f64))
        }
        (Some(planned), None) => format_clock(planned),
        (None, _) => "--".to_owned(),
    };
    lines.extend(details.stops.iter().map(|stop| {
        format!(
            "  {} {:<16} arr {:<12} dep {}",
            match (stop.reached, stop.is_delayed()) {
                (_, true) => '!',
                (true, false) => '*',
                (false, false) => '-',
            },
            stop.station_name,
            time(stop.planned_arrival, stop.arrival_delay_minutes),
            time(stop.planned_departure, stop.departure_delay_minutes),
        )
    }));
    lines
}

/// Interleave operator commands with scheduled ticks, redrawing after each.
///
/// Once the input closes the loop keeps playing and exits as soon as nothing
/// is scheduled.
pub async fn run_console<E, W>(
    app: &mut App<E>,
    fetcher: &dyn DataFetcher,
    mut commands: mpsc::Receiver<String>,
    out: &mut W,
) -> eyre::Result<()>
where
    E: SimulationEngine,
    W: Write,
{
    let mut input_open = true;
    app.present(out)?;

    loop {
        let deadline = app.next_deadline();
        if !input_open && deadline.is_none() {
            break;
        }
        let wake = deadline.unwrap_or_else(|| Instant::now() + IDLE_WAIT);

        tokio::select! {
            line = commands.recv(), if input_open => {
                let Some(line) = line else {
                    input_open = false;
                    continue;
                };
                if line.trim().is_empty() {
                    continue;
                }
                match line.parse::<Command>() {
                    Ok(command) => {
                        if app.execute(command, fetcher, Instant::now()).await? == Flow::Quit {
                            break;
                        }
                    }
                    Err(error) => app.notify(error.to_string()),
                }
            }
            () = time::sleep_until(wake), if deadline.is_some() => {
                if !app.tick(Instant::now())? {
                    continue;
                }
            }
        }

        app.present(out)?;
    }

    Ok(())
}
