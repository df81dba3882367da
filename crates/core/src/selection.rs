//! Shared selection of one station and one train.
//!
//! Each identity is an independent observable slot. Writers are click
//! handlers and operator commands; readers are the highlight effects and
//! the detail panels. Nothing here is validated against a snapshot.

use tokio::sync::watch;
use trainmap_network::{StationId, TrainId};

/// One observable, nullable identity.
#[derive(Debug)]
pub struct Selected<K> {
    sender: watch::Sender<Option<K>>,
}

impl<K: Clone + PartialEq> Selected<K> {
    fn new() -> Self {
        let (sender, _) = watch::channel(None);
        Self { sender }
    }

    /// Select `id`. Re-selecting the current id notifies nobody.
    pub fn select(&self, id: K) {
        self.sender.send_if_modified(|current| {
            if current.as_ref() == Some(&id) {
                return false;
            }
            *current = Some(id);
            true
        });
    }

    pub fn clear(&self) {
        self.sender.send_if_modified(|current| current.take().is_some());
    }

    pub fn get(&self) -> Option<K> {
        self.sender.borrow().clone()
    }

    pub fn subscribe(&self) -> SelectionWatch<K> {
        SelectionWatch {
            receiver: self.sender.subscribe(),
        }
    }
}

/// Subscriber side of a [`Selected`] slot.
#[derive(Debug)]
pub struct SelectionWatch<K> {
    receiver: watch::Receiver<Option<K>>,
}

impl<K: Clone> SelectionWatch<K> {
    /// Whether the slot changed since this watcher last read it.
    pub fn has_changed(&self) -> bool {
        self.receiver.has_changed().unwrap_or(false)
    }

    /// Read the current value and mark it seen.
    pub fn current(&mut self) -> Option<K> {
        self.receiver.borrow_and_update().clone()
    }
}

#[derive(Debug)]
pub struct SelectionBridge {
    pub station: Selected<StationId>,
    pub train: Selected<TrainId>,
}

impl Default for SelectionBridge {
    fn default() -> Self {
        Self::new()
    }
}

impl SelectionBridge {
    pub fn new() -> Self {
        Self {
            station: Selected::new(),
            train: Selected::new(),
        }
    }

    pub fn clear_all(&self) {
        self.station.clear();
        self.train.clear();
    }
}
