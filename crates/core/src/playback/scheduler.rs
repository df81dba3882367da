//! Fixed-cadence stepping of the simulation engine.
//!
//! The scheduler is a plain state machine. It never sleeps itself: while
//! Playing it holds exactly one pending [`Continuation`] with a due instant,
//! and whoever drives it (see [`super::driver`] or the viewer's event loop)
//! waits for [`TickScheduler::next_deadline`] and calls
//! [`TickScheduler::run_due`].

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use tokio::time::Instant;
use trainmap_network::{NetworkError, RunConfig, Snapshot};

use crate::engine::{EngineError, SimulationEngine};
use crate::playback::session::SessionToken;

/// Roughly 60 requests per second.
pub const DEFAULT_CADENCE: Duration = Duration::from_millis(16);

#[derive(Clone, Copy, Debug, PartialEq, Eq, strum::Display, strum::IntoStaticStr)]
#[strum(serialize_all = "snake_case")]
pub enum PlaybackStatus {
    Idle,
    Playing,
    Finished,
}

/// The next scheduled engine request of a play session.
#[derive(Clone, Debug)]
pub struct Continuation {
    pub token: SessionToken,
    pub due: Instant,
}

/// Result of one request/publish cycle.
#[derive(Clone, Debug)]
pub struct Published {
    pub snapshot: Arc<Snapshot>,
    /// Set only on the cycle that moved the run into Finished.
    pub finished: Option<FinishedRun>,
}

/// A run that has just reached its final snapshot.
#[derive(Clone, Debug)]
pub struct FinishedRun {
    pub config: RunConfig,
    pub started_at: DateTime<Utc>,
    pub snapshot: Arc<Snapshot>,
}

#[derive(Debug)]
struct ActiveRun {
    config: RunConfig,
    started_at: DateTime<Utc>,
    snapshot: Arc<Snapshot>,
}

#[derive(Debug, thiserror::Error)]
pub enum PlaybackError {
    #[error("No simulation has been started")]
    NotStarted,

    #[error("Cannot step manually while playing")]
    AlreadyPlaying,

    #[error("Simulation already finished")]
    Finished,

    #[error(transparent)]
    Engine(#[from] EngineError),

    #[error(transparent)]
    Snapshot(#[from] NetworkError),
}

pub type Result<T> = std::result::Result<T, PlaybackError>;

pub struct TickScheduler<E> {
    engine: E,
    cadence: Duration,
    status: PlaybackStatus,
    run: Option<ActiveRun>,
    session: Option<SessionToken>,
    pending: Option<Continuation>,
    sessions_issued: u64,
}

impl<E: SimulationEngine> TickScheduler<E> {
    pub fn new(engine: E) -> Self {
        Self::with_cadence(engine, DEFAULT_CADENCE)
    }

    #[cfg(test)]
    pub(crate) fn engine(&self) -> &E {
        &self.engine
    }

    pub fn with_cadence(engine: E, cadence: Duration) -> Self {
        Self {
            engine,
            cadence,
            status: PlaybackStatus::Idle,
            run: None,
            session: None,
            pending: None,
            sessions_issued: 0,
        }
    }

    // ========================================================================
    // Transport controls
    // ========================================================================

    /// Begin a new run, discarding whatever was running before.
    ///
    /// The initial snapshot is published immediately and the first engine
    /// step is due at `now`.
    pub fn start(&mut self, config: RunConfig, now: Instant) -> Result<Published> {
        self.restart();

        let started_at = Utc::now();
        let text = self.engine.initialize(&config)?;
        let snapshot = Arc::new(Snapshot::from_json(&text)?);

        tracing::info!(%config, "simulation started");
        self.run = Some(ActiveRun {
            config,
            started_at,
            snapshot: snapshot.clone(),
        });
        self.status = PlaybackStatus::Playing;
        self.open_session(now);

        Ok(self.publish(snapshot))
    }

    /// Resume a paused run. Playing again is a no-op.
    pub fn play(&mut self, now: Instant) -> Result<()> {
        match self.status {
            PlaybackStatus::Playing => Ok(()),
            PlaybackStatus::Finished => Err(PlaybackError::Finished),
            PlaybackStatus::Idle if self.run.is_none() => Err(PlaybackError::NotStarted),
            PlaybackStatus::Idle => {
                self.status = PlaybackStatus::Playing;
                self.open_session(now);
                tracing::debug!("playback resumed");
                Ok(())
            }
        }
    }

    pub fn pause(&mut self) {
        if self.status == PlaybackStatus::Playing {
            self.status = PlaybackStatus::Idle;
            self.close_session();
            tracing::debug!("playback paused");
        }
    }

    /// Pause when playing, otherwise resume.
    pub fn toggle(&mut self, now: Instant) -> Result<PlaybackStatus> {
        if self.status == PlaybackStatus::Playing {
            self.pause();
        } else {
            self.play(now)?;
        }
        Ok(self.status)
    }

    /// Advance exactly one tick while not playing.
    ///
    /// Stepping a finished run asks the engine again; the finished side
    /// effect is not reported a second time.
    pub fn next_tick(&mut self) -> Result<Published> {
        if self.status == PlaybackStatus::Playing {
            return Err(PlaybackError::AlreadyPlaying);
        }
        if self.run.is_none() {
            return Err(PlaybackError::NotStarted);
        }
        self.step()
    }

    /// Drop the current run and any pending continuation.
    pub fn restart(&mut self) {
        self.close_session();
        if self.run.take().is_some() {
            tracing::debug!("simulation discarded");
        }
        self.status = PlaybackStatus::Idle;
    }

    // ========================================================================
    // Continuations
    // ========================================================================

    pub fn next_deadline(&self) -> Option<Instant> {
        self.pending.as_ref().map(|continuation| continuation.due)
    }

    pub fn pending_continuations(&self) -> usize {
        usize::from(self.pending.is_some())
    }

    /// Execute the pending continuation if it is due at `now`.
    ///
    /// Returns `Ok(None)` when nothing was due or the continuation belonged
    /// to a cancelled session. An engine failure pauses the run.
    pub fn run_due(&mut self, now: Instant) -> Result<Option<Published>> {
        let Some(continuation) = self.pending.take_if(|c| c.due <= now) else {
            return Ok(None);
        };

        if !continuation.token.is_alive() {
            tracing::trace!(session = continuation.token.id(), "dropping stale continuation");
            return Ok(None);
        }

        let published = match self.step() {
            Ok(published) => published,
            Err(error) => {
                tracing::error!(%error, "simulation step failed, pausing");
                self.pause();
                return Err(error);
            }
        };

        if self.status == PlaybackStatus::Playing && continuation.token.is_alive() {
            self.pending = Some(Continuation {
                token: continuation.token,
                due: now + self.cadence,
            });
        }

        Ok(Some(published))
    }

    // ========================================================================
    // Accessors
    // ========================================================================

    pub fn status(&self) -> PlaybackStatus {
        self.status
    }

    pub fn snapshot(&self) -> Option<&Arc<Snapshot>> {
        self.run.as_ref().map(|run| &run.snapshot)
    }

    pub fn config(&self) -> Option<RunConfig> {
        self.run.as_ref().map(|run| run.config)
    }

    pub fn started_at(&self) -> Option<DateTime<Utc>> {
        self.run.as_ref().map(|run| run.started_at)
    }

    pub fn session(&self) -> Option<&SessionToken> {
        self.session.as_ref()
    }

    pub fn cadence(&self) -> Duration {
        self.cadence
    }

    // ========================================================================
    // Internals
    // ========================================================================

    fn step(&mut self) -> Result<Published> {
        let text = self.engine.step()?;
        let snapshot = Arc::new(Snapshot::from_json(&text)?);
        Ok(self.publish(snapshot))
    }

    fn publish(&mut self, snapshot: Arc<Snapshot>) -> Published {
        let Some(run) = self.run.as_mut() else {
            return Published {
                snapshot,
                finished: None,
            };
        };
        run.snapshot = snapshot.clone();
        let (config, started_at) = (run.config, run.started_at);

        let finished = if snapshot.is_finished && self.status != PlaybackStatus::Finished {
            tracing::info!(
                %config,
                from = %self.status,
                time = snapshot.current_time,
                "simulation finished"
            );
            self.status = PlaybackStatus::Finished;
            self.close_session();
            Some(FinishedRun {
                config,
                started_at,
                snapshot: snapshot.clone(),
            })
        } else {
            None
        };

        Published { snapshot, finished }
    }

    fn open_session(&mut self, now: Instant) {
        self.close_session();
        self.sessions_issued += 1;

        let token = SessionToken::issue(self.sessions_issued);
        tracing::trace!(session = token.id(), "session opened");
        self.session = Some(token.clone());
        self.pending = Some(Continuation { token, due: now });
    }

    fn close_session(&mut self) {
        if let Some(token) = self.session.take() {
            token.cancel();
            tracing::trace!(session = token.id(), "session closed");
        }
        self.pending = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use trainmap_network::{DriverBehavior, StationStrategy};

    use crate::testing::{ScriptedEngine, TICK};

    fn eco() -> RunConfig {
        RunConfig::new(DriverBehavior::Eco, StationStrategy::NoSort)
    }

    fn started(steps: u64) -> (TickScheduler<ScriptedEngine>, Instant) {
        let mut scheduler = TickScheduler::new(ScriptedEngine::finishing_after(steps));
        let now = Instant::now();
        scheduler.start(eco(), now).unwrap();
        (scheduler, now)
    }

    #[test]
    fn test_start_publishes_initial_snapshot() {
        let mut scheduler = TickScheduler::new(ScriptedEngine::finishing_after(10));
        let now = Instant::now();
        let published = scheduler.start(eco(), now).unwrap();

        assert_eq!(published.snapshot.current_time, 0);
        assert!(published.finished.is_none());
        assert_eq!(scheduler.status(), PlaybackStatus::Playing);
        assert_eq!(scheduler.pending_continuations(), 1);
        assert_eq!(scheduler.next_deadline(), Some(now));
        assert_eq!(scheduler.engine().initialized, vec![eco()]);
        assert_eq!(scheduler.engine().steps, 0);
    }

    #[test]
    fn test_exactly_one_continuation_while_playing() {
        let (mut scheduler, now) = started(10);

        let mut at = now;
        for tick in 1..=5 {
            let published = scheduler.run_due(at).unwrap().unwrap();
            assert_eq!(published.snapshot.current_time, tick * TICK);
            assert_eq!(scheduler.pending_continuations(), 1);
            assert_eq!(scheduler.next_deadline(), Some(at + DEFAULT_CADENCE));
            at += DEFAULT_CADENCE;
        }
        assert_eq!(scheduler.engine().steps, 5);
    }

    #[test]
    fn test_continuation_not_run_before_due() {
        let (mut scheduler, now) = started(10);
        scheduler.run_due(now).unwrap();

        assert!(scheduler.run_due(now + Duration::from_millis(5)).unwrap().is_none());
        assert_eq!(scheduler.engine().steps, 1);
        assert_eq!(scheduler.pending_continuations(), 1);
    }

    #[test]
    fn test_pause_stops_engine_requests() {
        let (mut scheduler, now) = started(10);
        scheduler.run_due(now).unwrap();
        scheduler.pause();

        assert_eq!(scheduler.status(), PlaybackStatus::Idle);
        assert_eq!(scheduler.pending_continuations(), 0);
        for late in 1..10 {
            assert!(scheduler.run_due(now + DEFAULT_CADENCE * late).unwrap().is_none());
        }
        assert_eq!(scheduler.engine().steps, 1);
    }

    #[test]
    fn test_queued_continuation_of_cancelled_session_is_dropped() {
        let (mut scheduler, now) = started(10);
        let token = scheduler.session().unwrap().clone();

        // A driver that already picked up this session's continuation
        // observes the cancellation through the shared token
        scheduler.pause();
        assert!(!token.is_alive());

        scheduler.pending = Some(Continuation { token, due: now });
        assert!(scheduler.run_due(now).unwrap().is_none());
        assert_eq!(scheduler.engine().steps, 0);
        assert_eq!(scheduler.pending_continuations(), 0);
    }

    #[test]
    fn test_play_opens_fresh_session() {
        let (mut scheduler, now) = started(10);
        let first = scheduler.session().unwrap().clone();
        scheduler.pause();

        scheduler.play(now).unwrap();
        let second = scheduler.session().unwrap();
        assert_ne!(first.id(), second.id());
        assert!(!first.is_alive());
        assert!(second.is_alive());
        assert_eq!(scheduler.pending_continuations(), 1);
    }

    #[test]
    fn test_restart_discards_run() {
        let (mut scheduler, now) = started(10);
        scheduler.run_due(now).unwrap();
        scheduler.restart();

        assert_eq!(scheduler.status(), PlaybackStatus::Idle);
        assert!(scheduler.snapshot().is_none());
        assert_eq!(scheduler.pending_continuations(), 0);
        assert!(matches!(scheduler.play(now), Err(PlaybackError::NotStarted)));
        assert!(matches!(scheduler.next_tick(), Err(PlaybackError::NotStarted)));
        assert_eq!(scheduler.engine().steps, 1);
    }

    #[test]
    fn test_next_tick_only_when_not_playing() {
        let (mut scheduler, _) = started(10);
        assert!(matches!(scheduler.next_tick(), Err(PlaybackError::AlreadyPlaying)));

        scheduler.pause();
        let published = scheduler.next_tick().unwrap();
        assert_eq!(published.snapshot.current_time, TICK);
        assert_eq!(scheduler.status(), PlaybackStatus::Idle);
        assert_eq!(scheduler.pending_continuations(), 0);
    }

    #[test]
    fn test_finish_fires_once() {
        let (mut scheduler, now) = started(3);

        let mut finished = Vec::new();
        let mut at = now;
        while let Some(due) = scheduler.next_deadline() {
            at = at.max(due);
            if let Some(published) = scheduler.run_due(at).unwrap() {
                finished.extend(published.finished);
            }
        }

        assert_eq!(finished.len(), 1);
        assert_eq!(finished[0].config, eco());
        assert_eq!(scheduler.status(), PlaybackStatus::Finished);
        assert_eq!(scheduler.engine().steps, 3);

        // The finished snapshot observed again through manual stepping
        let again = scheduler.next_tick().unwrap();
        assert!(again.snapshot.is_finished);
        assert!(again.finished.is_none());
        assert!(matches!(scheduler.play(now), Err(PlaybackError::Finished)));
    }

    #[test]
    fn test_manual_step_into_finish_fires() {
        let (mut scheduler, _) = started(2);
        scheduler.pause();

        assert!(scheduler.next_tick().unwrap().finished.is_none());
        let last = scheduler.next_tick().unwrap();
        assert!(last.finished.is_some());
        assert_eq!(scheduler.status(), PlaybackStatus::Finished);
    }

    #[test]
    fn test_engine_failure_pauses() {
        let mut engine = ScriptedEngine::finishing_after(10);
        engine.fail_on_step = Some(2);
        let mut scheduler = TickScheduler::new(engine);
        let now = Instant::now();
        scheduler.start(eco(), now).unwrap();

        scheduler.run_due(now).unwrap();
        let error = scheduler.run_due(now + DEFAULT_CADENCE).unwrap_err();
        assert!(matches!(error, PlaybackError::Engine(EngineError::Protocol(_))));
        assert_eq!(scheduler.status(), PlaybackStatus::Idle);
        assert_eq!(scheduler.pending_continuations(), 0);
        assert_eq!(scheduler.snapshot().unwrap().current_time, TICK);
    }

    #[test]
    fn test_start_replaces_previous_run() {
        let (mut scheduler, now) = started(10);
        scheduler.run_due(now).unwrap();

        let crazy = RunConfig::new(DriverBehavior::Crazy, StationStrategy::DelayAsc);
        let published = scheduler.start(crazy, now).unwrap();
        assert_eq!(published.snapshot.current_time, 0);
        assert_eq!(scheduler.config(), Some(crazy));
        assert_eq!(scheduler.pending_continuations(), 1);
    }
}
