use tokio::time::{self, Instant};

use crate::engine::SimulationEngine;
use crate::playback::scheduler::{FinishedRun, Published, Result, TickScheduler};

/// Drive the scheduler's continuations until it stops playing.
///
/// `on_publish` runs after every published snapshot, before the next
/// continuation is awaited. Returns the finished run when the loop ended by
/// reaching the end of the simulation, `None` when it was paused.
pub async fn play_until_stopped<E, F>(
    scheduler: &mut TickScheduler<E>,
    mut on_publish: F,
) -> Result<Option<FinishedRun>>
where
    E: SimulationEngine,
    F: FnMut(&Published),
{
    while let Some(due) = scheduler.next_deadline() {
        time::sleep_until(due).await;

        let Some(published) = scheduler.run_due(Instant::now())? else {
            continue;
        };
        on_publish(&published);

        if let Some(finished) = published.finished {
            return Ok(Some(finished));
        }
    }

    Ok(None)
}

#[cfg(test)]
mod tests {
    use super::*;
    use trainmap_network::RunConfig;

    use crate::playback::scheduler::{DEFAULT_CADENCE, PlaybackError, PlaybackStatus};
    use crate::testing::{ScriptedEngine, TICK};

    #[tokio::test(start_paused = true)]
    async fn test_plays_to_completion_at_cadence() {
        let mut scheduler = TickScheduler::new(ScriptedEngine::finishing_after(5));
        let begin = Instant::now();
        scheduler.start(RunConfig::default(), begin).unwrap();

        let mut times = Vec::new();
        let finished = play_until_stopped(&mut scheduler, |published| {
            times.push(published.snapshot.current_time)
        })
        .await
        .unwrap()
        .unwrap();

        assert_eq!(times, vec![TICK, 2 * TICK, 3 * TICK, 4 * TICK, 5 * TICK]);
        assert!(finished.snapshot.is_finished);
        assert!(finished.started_at <= chrono::Utc::now());
        assert_eq!(scheduler.status(), PlaybackStatus::Finished);
        // First step is due immediately, the other four one cadence apart
        assert!(Instant::now() - begin >= DEFAULT_CADENCE * 4);
    }

    #[tokio::test(start_paused = true)]
    async fn test_returns_none_when_not_playing() {
        let mut scheduler = TickScheduler::new(ScriptedEngine::finishing_after(5));
        scheduler.start(RunConfig::default(), Instant::now()).unwrap();
        scheduler.pause();

        let outcome = play_until_stopped(&mut scheduler, |_| {}).await.unwrap();
        assert!(outcome.is_none());
        assert_eq!(scheduler.engine().steps, 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_engine_failure_surfaces() {
        let mut engine = ScriptedEngine::finishing_after(5);
        engine.fail_on_step = Some(3);
        let mut scheduler = TickScheduler::new(engine);
        scheduler.start(RunConfig::default(), Instant::now()).unwrap();

        let outcome = play_until_stopped(&mut scheduler, |_| {}).await;
        assert!(matches!(outcome, Err(PlaybackError::Engine(_))));
        assert_eq!(scheduler.status(), PlaybackStatus::Idle);
    }
}
