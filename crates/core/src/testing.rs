//! Scripted engine shared by the playback tests.

use std::collections::BTreeMap;

use trainmap_network::{RunConfig, Snapshot, Train, TrainEvent, TrainId, TrainStop};

use crate::engine::{EngineError, SimulationEngine};

pub(crate) const TICK: i64 = 60_000_000_000;

/// Engine that advances a minute per step and reports `isFinished` once
/// `finish_after` steps have been taken.
#[derive(Debug, Default)]
pub(crate) struct ScriptedEngine {
    pub finish_after: u64,
    pub fail_on_step: Option<u64>,
    pub initialized: Vec<RunConfig>,
    pub steps: u64,
    config: Option<RunConfig>,
}

impl ScriptedEngine {
    pub fn finishing_after(steps: u64) -> Self {
        Self {
            finish_after: steps,
            ..Self::default()
        }
    }

    fn render(&self) -> String {
        let config = self.config.unwrap_or_default();
        let train = Train {
            id: TrainId::new("T1"),
            stops: vec![TrainStop {
                station_id: "A".into(),
                arrival: 0,
                arrived_at: Some(0),
                departure: TICK,
                departed_at: None,
            }],
            event: TrainEvent::None,
        };

        let snapshot = Snapshot {
            current_time: self.steps as i64 * TICK,
            is_finished: self.steps >= self.finish_after,
            is_started: self.steps > 0,
            driver_behavior: Some(config.driver_behavior),
            station_strategy: Some(config.station_strategy),
            stations: BTreeMap::new(),
            segments: BTreeMap::new(),
            trains: BTreeMap::from([(train.id.clone(), train)]),
        };
        serde_json::to_string(&snapshot).unwrap()
    }
}

impl SimulationEngine for ScriptedEngine {
    fn initialize(&mut self, config: &RunConfig) -> Result<String, EngineError> {
        self.initialized.push(*config);
        self.config = Some(*config);
        self.steps = 0;
        Ok(self.render())
    }

    fn step(&mut self) -> Result<String, EngineError> {
        if self.config.is_none() {
            return Err(EngineError::NotInitialized);
        }
        if self.fail_on_step == Some(self.steps + 1) {
            return Err(EngineError::Protocol("scripted failure".to_owned()));
        }
        self.steps += 1;
        Ok(self.render())
    }
}
