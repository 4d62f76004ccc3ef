use crate::handle::TaskHandle;
use crate::observer::{RegisterRecord, RetireReason, SchedulerObserver};

use parking_lot::Mutex;
use serde::Serialize;
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

/// Where an operation was registered from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CallSiteRecord {
    pub id: u64,
    pub label: String,
    pub file: &'static str,
    pub line: u32,
    pub column: u32,
    pub registered_at: Duration,
}

/// Read-only view of one tracked operation.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TaskDiagnostic {
    pub handle: TaskHandle,
    pub label: &'static str,
    pub elapsed: Duration,
    pub paused: bool,
    pub done: bool,
    /// Still in the pending buffer, not yet advanced.
    pub pending: bool,
}

/// Call-site registry for external tooling.
///
/// Cheap to clone; clones share the same records, so a tool can hold one while the
/// scheduler feeds another.
#[derive(Clone, Default)]
pub struct DiagnosticsRegistry {
    records: Arc<Mutex<BTreeMap<u64, CallSiteRecord>>>,
}

impl DiagnosticsRegistry {
    #[inline]
    pub fn new() -> Self {
        Self::default()
    }

    #[inline]
    pub fn get(&self, handle: TaskHandle) -> Option<CallSiteRecord> {
        self.records.lock().get(&handle.id()).cloned()
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.records.lock().len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.records.lock().is_empty()
    }

    /// Records ordered by id.
    pub fn snapshot(&self) -> Vec<CallSiteRecord> {
        self.records.lock().values().cloned().collect()
    }

    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(&self.snapshot())
    }
}

impl SchedulerObserver for DiagnosticsRegistry {
    fn on_registered(&mut self, record: &RegisterRecord<'_>) {
        let entry = CallSiteRecord {
            id: record.handle.id(),
            label: record.label.to_owned(),
            file: record.location.file(),
            line: record.location.line(),
            column: record.location.column(),
            registered_at: record.registered_at,
        };
        self.records.lock().insert(entry.id, entry);
    }

    fn on_retired(&mut self, handle: TaskHandle, _reason: RetireReason) {
        self.records.lock().remove(&handle.id());
    }

    fn on_teardown(&mut self) {
        self.records.lock().clear();
    }
}
