use crate::sysex::OwnedSysEx;
use parking_lot::Mutex;

/// One submitted message, kept until the render side replays it.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum QueuedEvent {
    Short(u32),
    SysEx(OwnedSysEx),
}

/// FIFO between the control context and the render context.
///
/// The lock covers only the push or the swap that detaches the whole list;
/// engine calls happen after the lock is released.
#[derive(Debug, Default)]
pub struct EventQueue {
    events: Mutex<Vec<QueuedEvent>>,
}

impl EventQueue {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn enqueue(&self, event: QueuedEvent) {
        self.events.lock().push(event);
    }

    /// Takes every pending event in submission order, leaving the queue empty.
    pub fn dequeue_all(&self) -> Vec<QueuedEvent> {
        std::mem::take(&mut *self.events.lock())
    }

    /// Like [`dequeue_all`](Self::dequeue_all) but reuses `out`'s allocation.
    pub fn dequeue_into(&self, out: &mut Vec<QueuedEvent>) {
        out.clear();
        std::mem::swap(&mut *self.events.lock(), out);
    }

    pub fn len(&self) -> usize {
        self.events.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.lock().is_empty()
    }
}
