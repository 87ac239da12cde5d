//! Size-capped in-memory record store

use crate::error::{CoreError, CoreResult};
use chrono::Utc;
use sitecheck_records::{ComplianceSummary, DetectionEvent, NewDetectionEvent};
use std::collections::VecDeque;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};
use std::time::{SystemTime, UNIX_EPOCH};

pub const DEFAULT_CAPACITY: usize = 1000;

static ID_SEQUENCE: AtomicU64 = AtomicU64::new(0);

/// Newest-first sequence of detection events, capped at `capacity`.
///
/// All mutation goes through the internal lock, so a shared `Arc<RecordStore>`
/// never loses an insert or delete. Readers get snapshot copies.
#[derive(Debug)]
pub struct RecordStore {
    records: RwLock<VecDeque<DetectionEvent>>,
    capacity: usize,
}

impl RecordStore {
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_CAPACITY)
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            records: RwLock::new(VecDeque::new()),
            capacity,
        }
    }

    /// Rebuild a store from a newest-first snapshot, keeping at most `capacity`
    pub fn from_snapshot(records: Vec<DetectionEvent>, capacity: usize) -> Self {
        let mut records: VecDeque<_> = records.into();
        records.truncate(capacity);
        Self {
            records: RwLock::new(records),
            capacity,
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Validate, summarise and prepend a new event; evicts the oldest past capacity.
    /// A caller-supplied id that is already stored is rejected.
    pub fn insert(&self, new: NewDetectionEvent) -> CoreResult<DetectionEvent> {
        let missing = new.missing_fields();
        if !missing.is_empty() {
            return Err(CoreError::missing_fields(&missing));
        }

        let detections = new.detections.unwrap_or_default();
        let event = DetectionEvent {
            id: new.id.filter(|id| !id.is_empty()).unwrap_or_else(generate_id),
            timestamp: new.timestamp.unwrap_or_else(Utc::now),
            filename: new.filename.unwrap_or_default(),
            site: new.site,
            supervisor: new.supervisor,
            summary: ComplianceSummary::from_detections(&detections),
            detections,
        };

        let mut records = self.write();
        if records.iter().any(|r| r.id == event.id) {
            return Err(CoreError::validation(format!(
                "Detection id already exists: {}",
                event.id
            )));
        }
        records.push_front(event.clone());
        let evicted = records.len().saturating_sub(self.capacity);
        records.truncate(self.capacity);
        drop(records);

        if evicted > 0 {
            tracing::debug!(evicted, capacity = self.capacity, "evicted oldest records");
        }
        tracing::debug!(id = %event.id, detections = event.summary.total_detections, "record stored");
        Ok(event)
    }

    /// Remove the record with `id`
    pub fn delete(&self, id: &str) -> CoreResult<()> {
        let mut records = self.write();
        match records.iter().position(|r| r.id == id) {
            Some(idx) => {
                records.remove(idx);
                Ok(())
            }
            None => Err(CoreError::NotFound(format!("Detection not found: {id}"))),
        }
    }

    pub fn get(&self, id: &str) -> Option<DetectionEvent> {
        self.read().iter().find(|r| r.id == id).cloned()
    }

    /// Copy of every record, newest first
    pub fn list(&self) -> Vec<DetectionEvent> {
        self.read().iter().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.read().is_empty()
    }

    // A poisoned lock still holds a consistent deque: every mutation above
    // completes before any call that could panic.
    fn read(&self) -> RwLockReadGuard<'_, VecDeque<DetectionEvent>> {
        self.records.read().unwrap_or_else(|e| e.into_inner())
    }

    fn write(&self) -> RwLockWriteGuard<'_, VecDeque<DetectionEvent>> {
        self.records.write().unwrap_or_else(|e| e.into_inner())
    }
}

impl Default for RecordStore {
    fn default() -> Self {
        Self::new()
    }
}

fn generate_id() -> String {
    let nanos = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_nanos();
    let seq = ID_SEQUENCE.fetch_add(1, Ordering::Relaxed);
    format!("det_{:x}_{}", nanos, seq)
}
