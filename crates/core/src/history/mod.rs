//! Record of completed runs.
//!
//! Persisted as one JSON array of [`RunRecord`]s, newest last, capped at
//! [`MAX_HISTORY_SIZE`]. Storage problems never reach the caller: an
//! unreadable or corrupt document loads as an empty history, and failed
//! writes are logged.

mod storage;

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use trainmap_network::{DriverBehavior, RunConfig, StationStrategy, Train, TrainId};
use uuid::Uuid;

use crate::playback::FinishedRun;

pub use storage::{FileStorage, HistoryStorage, MemoryStorage, StorageError};

pub const MAX_HISTORY_SIZE: usize = 20;

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RunRecord {
    pub id: Uuid,
    pub driver_behavior: DriverBehavior,
    pub station_strategy: StationStrategy,
    pub trains: BTreeMap<TrainId, Train>,
    pub completed_at: DateTime<Utc>,
}

impl RunRecord {
    pub fn config(&self) -> RunConfig {
        RunConfig::new(self.driver_behavior, self.station_strategy)
    }
}

pub struct RunHistory<S> {
    storage: S,
    records: Vec<RunRecord>,
}

impl<S: HistoryStorage> RunHistory<S> {
    pub fn load(storage: S) -> Self {
        let mut records = match storage.load() {
            Ok(Some(contents)) => match serde_json::from_str::<Vec<RunRecord>>(&contents) {
                Ok(records) => records,
                Err(error) => {
                    tracing::warn!(%error, "discarding unreadable run history");
                    Vec::new()
                }
            },
            Ok(None) => Vec::new(),
            Err(error) => {
                tracing::warn!(%error, "failed to load run history");
                Vec::new()
            }
        };

        if records.len() > MAX_HISTORY_SIZE {
            records.drain(..records.len() - MAX_HISTORY_SIZE);
        }
        tracing::debug!(records = records.len(), "loaded run history");

        Self { storage, records }
    }

    /// Oldest first.
    pub fn records(&self) -> &[RunRecord] {
        &self.records
    }

    pub fn get(&self, id: &Uuid) -> Option<&RunRecord> {
        self.records.iter().find(|record| record.id == *id)
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn storage(&self) -> &S {
        &self.storage
    }

    /// Record a completed run, evicting the oldest beyond the cap.
    pub fn append(&mut self, config: RunConfig, trains: BTreeMap<TrainId, Train>) -> &RunRecord {
        let record = RunRecord {
            id: Uuid::new_v4(),
            driver_behavior: config.driver_behavior,
            station_strategy: config.station_strategy,
            trains,
            completed_at: Utc::now(),
        };
        tracing::info!(id = %record.id, %config, "recorded completed run");

        self.records.push(record);
        if self.records.len() > MAX_HISTORY_SIZE {
            self.records.remove(0);
        }
        self.persist();

        &self.records[self.records.len() - 1]
    }

    pub fn record_finished(&mut self, run: &FinishedRun) -> &RunRecord {
        self.append(run.config, run.snapshot.trains.clone())
    }

    pub fn remove(&mut self, id: &Uuid) -> bool {
        let before = self.records.len();
        self.records.retain(|record| record.id != *id);

        let removed = self.records.len() != before;
        if removed {
            self.persist();
        }
        removed
    }

    pub fn clear(&mut self) {
        self.records.clear();
        if let Err(error) = self.storage.remove() {
            tracing::error!(%error, "failed to clear run history");
        }
    }

    fn persist(&mut self) {
        let result = serde_json::to_string(&self.records)
            .map_err(StorageError::from)
            .and_then(|contents| self.storage.save(&contents));

        if let Err(error) = result {
            tracing::error!(%error, "failed to save run history");
        }
    }
}
