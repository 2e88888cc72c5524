//! In-memory collection of download records.
//!
//! The registry owns every record. Callers read through [`DownloadRegistry::list`]
//! and change records only through the mutation methods, each of which
//! broadcasts a [`RegistryEvent`] once it has applied.

use tokio::sync::broadcast;
use tracing::debug;

use crate::error::ValidationError;
use crate::model::{DownloadFormat, DownloadId, DownloadRecord, DownloadStatus};

const EVENT_CAPACITY: usize = 256;

/// Change notification sent to registry subscribers
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RegistryEvent {
    Added(DownloadId),
    Ready(DownloadId),
    Failed(DownloadId),
    Cancelled(DownloadId),
    Removed(DownloadId),
}

pub struct DownloadRegistry {
    /// Most recently added first
    records: Vec<DownloadRecord>,
    event_tx: broadcast::Sender<RegistryEvent>,
}

impl Default for DownloadRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl DownloadRegistry {
    pub fn new() -> Self {
        let (event_tx, _rx) = broadcast::channel(EVENT_CAPACITY);
        Self {
            records: Vec::new(),
            event_tx,
        }
    }

    /// Receive an event for every applied mutation.
    pub fn subscribe(&self) -> broadcast::Receiver<RegistryEvent> {
        self.event_tx.subscribe()
    }

    /// Track a new download in `Processing` state, ahead of all existing records.
    pub fn add(
        &mut self,
        source_url: impl Into<String>,
        title: impl Into<String>,
        format: DownloadFormat,
    ) -> Result<DownloadId, ValidationError> {
        let source_url = source_url.into();
        if source_url.trim().is_empty() {
            return Err(ValidationError::Empty);
        }
        let record = DownloadRecord::new(source_url, title.into(), format);
        let id = record.id();
        self.records.insert(0, record);
        self.emit(RegistryEvent::Added(id));
        Ok(id)
    }

    /// `Processing -> Ready`. Returns false when the record is gone or already settled.
    pub fn mark_ready(&mut self, id: DownloadId, location: impl Into<String>) -> bool {
        let status = DownloadStatus::Ready { location: location.into() };
        self.settle(id, status, RegistryEvent::Ready(id))
    }

    /// `Processing -> Error`. Returns false when the record is gone or already settled.
    pub fn mark_error(&mut self, id: DownloadId, message: impl Into<String>) -> bool {
        let status = DownloadStatus::Error { message: message.into() };
        self.settle(id, status, RegistryEvent::Failed(id))
    }

    /// `Processing -> Cancelled`, keeping the record listed.
    pub fn mark_cancelled(&mut self, id: DownloadId) -> bool {
        self.settle(id, DownloadStatus::Cancelled, RegistryEvent::Cancelled(id))
    }

    /// Delete a record whatever its status. Removing an unknown id is a no-op.
    pub fn remove(&mut self, id: DownloadId) -> bool {
        let before = self.records.len();
        self.records.retain(|record| record.id() != id);
        let removed = self.records.len() != before;
        if removed {
            self.emit(RegistryEvent::Removed(id));
        }
        removed
    }

    pub fn list(&self) -> &[DownloadRecord] {
        &self.records
    }

    pub fn get(&self, id: DownloadId) -> Option<&DownloadRecord> {
        self.records.iter().find(|record| record.id() == id)
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    fn settle(&mut self, id: DownloadId, status: DownloadStatus, event: RegistryEvent) -> bool {
        let Some(record) = self.records.iter_mut().find(|record| record.id() == id) else {
            debug!(%id, "ignoring transition for unknown download");
            return false;
        };
        if !record.status.is_processing() {
            debug!(%id, status = ?record.status, "ignoring transition for settled download");
            return false;
        }
        record.status = status;
        self.emit(event);
        true
    }

    fn emit(&self, event: RegistryEvent) {
        // No subscribers is fine
        self.event_tx.send(event).ok();
    }
}
