//! Persistent plant gallery.
//!
//! The gallery lives in a single key/value slot under [`GALLERY_KEY`] as a JSON
//! array of [`PlantRecord`]s. Other processes may write the same slot; those
//! writes are reported to observers registered with
//! [`PlantStore::on_external_change`].

use parking_lot::Mutex;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use crate::errors::PlantError;
use crate::wire::PlantRecord;

pub mod slot;
#[cfg(test)]
pub mod memory;

#[cfg(test)]
pub use memory::MemorySlot;
pub use slot::{FileSlot, Slot};

pub const GALLERY_KEY: &str = "savedPlants";

pub type SubscriptionId = u64;

type Observer = Arc<dyn Fn(&[PlantRecord]) + Send + Sync>;

pub struct PlantStore {
    slot: Box<dyn Slot>,
    /// Raw slot content as of our last read or write.
    last_seen: Mutex<Option<String>>,
    observers: Mutex<Vec<(SubscriptionId, Observer)>>,
    next_id: Mutex<SubscriptionId>,
}

impl PlantStore {
    pub fn new(slot: impl Slot + 'static) -> Self {
        let store = Self {
            slot: Box::new(slot),
            last_seen: Mutex::new(None),
            observers: Mutex::new(Vec::new()),
            next_id: Mutex::new(0),
        };
        let initial = store.read_raw();
        *store.last_seen.lock() = initial;
        store
    }

    fn read_raw(&self) -> Option<String> {
        match self.slot.read(GALLERY_KEY) {
            Ok(v) => v,
            Err(e) => {
                warn!(error = %e, "gallery slot unreadable; treating as empty");
                None
            }
        }
    }

    /// Current gallery. Absent, blank, unreadable or malformed data all read
    /// as an empty gallery.
    pub fn load(&self) -> Vec<PlantRecord> {
        parse_gallery(self.read_raw().as_deref()).unwrap_or_else(|e| {
            warn!(error = %e, "discarding malformed gallery");
            Vec::new()
        })
    }

    pub fn get(&self, index: usize) -> Option<PlantRecord> {
        self.load().into_iter().nth(index)
    }

    pub fn append(&self, record: PlantRecord) -> Result<(), PlantError> {
        let mut plants = self.load();
        plants.push(record);
        self.persist(&plants)?;
        debug!(count = plants.len(), "appended plant to gallery");
        Ok(())
    }

    /// Removes the record at `index` and returns the new gallery. An index
    /// past the end leaves the slot untouched and returns it as is.
    pub fn remove_at(&self, index: usize) -> Result<Vec<PlantRecord>, PlantError> {
        let plants = self.load();
        if index >= plants.len() {
            debug!(index, len = plants.len(), "remove_at out of bounds; nothing to do");
            return Ok(plants);
        }
        let updated: Vec<PlantRecord> = plants
            .into_iter()
            .enumerate()
            .filter(|(i, _)| *i != index)
            .map(|(_, p)| p)
            .collect();
        self.persist(&updated)?;
        debug!(index, count = updated.len(), "removed plant from gallery");
        Ok(updated)
    }

    fn persist(&self, plants: &[PlantRecord]) -> Result<(), PlantError> {
        let raw = serde_json::to_string(plants)
            .map_err(|e| PlantError::Storage(format!("serialize gallery: {e}")))?;
        // Held across the write so a concurrent poll cannot mistake it for
        // a foreign change.
        let mut last = self.last_seen.lock();
        self.slot.write(GALLERY_KEY, &raw)?;
        *last = Some(raw);
        Ok(())
    }

    /// Registers `callback` to run with the fresh gallery whenever the slot is
    /// changed by someone other than this store.
    pub fn on_external_change<F>(&self, callback: F) -> SubscriptionId
    where
        F: Fn(&[PlantRecord]) + Send + Sync + 'static,
    {
        let mut next = self.next_id.lock();
        let id = *next;
        *next += 1;
        self.observers.lock().push((id, Arc::new(callback)));
        id
    }

    pub fn unsubscribe(&self, id: SubscriptionId) -> bool {
        let mut observers = self.observers.lock();
        let before = observers.len();
        observers.retain(|(oid, _)| *oid != id);
        observers.len() != before
    }

    /// Checks the slot once. Returns true (after notifying observers) if its
    /// content differs from what this store last read or wrote. A failed
    /// read is skipped, not reported as an emptied gallery.
    pub fn poll_external_change(&self) -> bool {
        let current = {
            let mut last = self.last_seen.lock();
            let current = match self.slot.read(GALLERY_KEY) {
                Ok(v) => v,
                Err(e) => {
                    warn!(error = %e, "gallery slot unreadable; skipping poll");
                    return false;
                }
            };
            if *last == current {
                return false;
            }
            *last = current.clone();
            current
        };
        let plants = parse_gallery(current.as_deref()).unwrap_or_default();
        debug!(count = plants.len(), "gallery changed externally");
        // Snapshot so callbacks may (un)subscribe without deadlocking.
        let observers: Vec<Observer> = self.observers.lock().iter().map(|(_, o)| o.clone()).collect();
        for observer in observers {
            observer(&plants);
        }
        true
    }
}

/// Polls `store` every `interval` until the returned handle is aborted.
pub fn spawn_watcher(store: Arc<PlantStore>, interval: Duration) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(interval);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
        loop {
            ticker.tick().await;
            store.poll_external_change();
        }
    })
}

fn parse_gallery(raw: Option<&str>) -> Result<Vec<PlantRecord>, PlantError> {
    match raw {
        None => Ok(Vec::new()),
        Some(s) if s.trim().is_empty() => Ok(Vec::new()),
        // `null` is what a browser stores after setItem(key, JSON.stringify(null))
        Some(s) => serde_json::from_str::<Option<Vec<PlantRecord>>>(s)
            .map(Option::unwrap_or_default)
            .map_err(|e| PlantError::StorageParse(e.to_string())),
    }
}
