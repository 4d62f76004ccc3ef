use crate::pool::Poolable;
use crate::scheduled::Scheduled;

use std::time::Duration;

/// Operation storage inside an entry.
#[derive(Default)]
pub(crate) enum Slot {
    /// Unregistered mid-advance or reset by the pool; reclaimed by the next sweep.
    #[default]
    Vacant,
    Live(Box<dyn Scheduled>),
    /// Moved out while its own `tick` runs.
    Ticking,
}

/// Pooled wrapper around one registered operation.
#[derive(Default)]
pub(crate) struct Entry {
    pub id: u64,
    pub timestamp: Duration,
    pub slot: Slot,
    /// Set when the scheduler cancelled the operation, to attribute retirement.
    pub cancelled: bool,
}

impl Entry {
    #[inline]
    pub fn op(&self) -> Option<&dyn Scheduled> {
        match &self.slot {
            Slot::Live(op) => Some(op.as_ref()),
            _ => None,
        }
    }

    #[inline]
    pub fn op_mut(&mut self) -> Option<&mut (dyn Scheduled + 'static)> {
        match &mut self.slot {
            Slot::Live(op) => Some(op.as_mut()),
            _ => None,
        }
    }

    /// Ready to be swept.
    #[inline]
    pub fn is_retired(&self) -> bool {
        match &self.slot {
            Slot::Vacant => true,
            Slot::Live(op) => op.is_done(),
            Slot::Ticking => false,
        }
    }

    /// Cancels the operation unless it already finished.
    #[inline]
    pub fn cancel(&mut self) {
        if let Slot::Live(op) = &mut self.slot {
            if !op.is_done() {
                op.cancel();
                self.cancelled = true;
            }
        }
    }

    /// Takes the operation out, leaving the slot vacant.
    #[inline]
    pub fn take_op(&mut self) -> Option<Box<dyn Scheduled>> {
        match std::mem::take(&mut self.slot) {
            Slot::Live(op) => Some(op),
            other => {
                self.slot = other;
                None
            }
        }
    }
}

impl Poolable for Entry {
    fn reset(&mut self) {
        self.id = 0;
        self.timestamp = Duration::ZERO;
        self.slot = Slot::Vacant;
        self.cancelled = false;
    }
}
