//! Replays a recorded run, one JSON snapshot per line.

use std::fs;
use std::path::Path;

use trainmap_core::engine::{EngineError, SimulationEngine};
use trainmap_network::RunConfig;

#[derive(Clone, Debug)]
pub struct ReplayEngine {
    lines: Vec<String>,
    cursor: Option<usize>,
}

impl ReplayEngine {
    pub fn from_text(text: &str) -> Self {
        Self {
            lines: text
                .lines()
                .map(str::trim)
                .filter(|line| !line.is_empty())
                .map(str::to_owned)
                .collect(),
            cursor: None,
        }
    }

    pub fn open(path: &Path) -> Result<Self, EngineError> {
        let engine = Self::from_text(&fs::read_to_string(path)?);
        tracing::info!(path = %path.display(), snapshots = engine.len(), "loaded recording");
        Ok(engine)
    }

    pub fn len(&self) -> usize {
        self.lines.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }
}

impl SimulationEngine for ReplayEngine {
    /// The recording fixes the run; `config` is only logged.
    fn initialize(&mut self, config: &RunConfig) -> Result<String, EngineError> {
        let first = self
            .lines
            .first()
            .ok_or_else(|| EngineError::Protocol("recording is empty".to_owned()))?;

        tracing::debug!(%config, "replaying recording");
        self.cursor = Some(0);
        Ok(first.clone())
    }

    /// Stays on the last snapshot once the recording is exhausted.
    fn step(&mut self) -> Result<String, EngineError> {
        let cursor = self.cursor.ok_or(EngineError::NotInitialized)?;
        let next = (cursor + 1).min(self.lines.len().saturating_sub(1));
        self.cursor = Some(next);
        Ok(self.lines[next].clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use trainmap_network::Snapshot;

    #[test]
    fn test_replays_then_sticks_on_last() {
        let mut engine = ReplayEngine::from_text("one\n\ntwo\nthree\n");
        assert_eq!(engine.len(), 3);
        assert!(matches!(engine.step(), Err(EngineError::NotInitialized)));

        assert_eq!(engine.initialize(&RunConfig::default()).unwrap(), "one");
        assert_eq!(engine.step().unwrap(), "two");
        assert_eq!(engine.step().unwrap(), "three");
        assert_eq!(engine.step().unwrap(), "three");

        // Restarting rewinds
        assert_eq!(engine.initialize(&RunConfig::default()).unwrap(), "one");
    }

    #[test]
    fn test_empty_recording() {
        let mut engine = ReplayEngine::from_text("\n");
        assert!(engine.is_empty());
        assert!(matches!(
            engine.initialize(&RunConfig::default()),
            Err(EngineError::Protocol(_))
        ));
    }

    #[test]
    fn test_demo_recording_finishes() {
        let path = Path::new(env!("CARGO_MANIFEST_DIR")).join("../../demos/run.jsonl");
        let mut engine = ReplayEngine::open(&path).unwrap();

        let first = Snapshot::from_json(&engine.initialize(&RunConfig::default()).unwrap()).unwrap();
        assert!(!first.is_finished);
        assert_eq!(first.trains.len(), 2);

        let mut last = first;
        for _ in 1..engine.len() {
            last = Snapshot::from_json(&engine.step().unwrap()).unwrap();
        }
        assert!(last.is_finished);
        assert_eq!(last.occupied_segments().count(), 0);
    }
}
