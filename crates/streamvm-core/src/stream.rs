//! Per-lane instruction queues.
//!
//! A stream is one ordered lane of execution bound to one stream type and
//! one device index. Instructions within a stream execute in submission
//! order; ordering across streams comes only from symbol dependencies.
//!
//! Queue discipline: the scheduler pushes into `pending` during admission
//! and is the only mover from `pending` to `ready`; the lane's thread
//! context is the only consumer of `ready`.

use std::collections::VecDeque;
use std::fmt;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};

use parking_lot::Mutex;

use crate::instruction::{InstructionMsg, StreamTypeId};
use crate::symbol::SymbolTable;

/// Snapshot of one stream's counters.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StreamStats {
    /// Instructions admitted to this stream.
    pub admitted: u64,
    /// Instructions executed to completion.
    pub executed: u64,
    /// Instructions admitted but not yet ready.
    pub pending: usize,
    /// Instructions ready and awaiting the thread context.
    pub ready: usize,
    /// Instructions currently executing.
    pub in_flight: usize,
}

/// One ordered execution lane.
pub struct Stream {
    stream_type: StreamTypeId,
    device: usize,
    pending: Mutex<VecDeque<InstructionMsg>>,
    ready: Mutex<VecDeque<InstructionMsg>>,
    in_flight: AtomicUsize,
    admitted: AtomicU64,
    executed: AtomicU64,
}

impl Stream {
    /// Create an empty stream for one lane.
    pub fn new(stream_type: StreamTypeId, device: usize) -> Self {
        Self {
            stream_type,
            device,
            pending: Mutex::new(VecDeque::new()),
            ready: Mutex::new(VecDeque::new()),
            in_flight: AtomicUsize::new(0),
            admitted: AtomicU64::new(0),
            executed: AtomicU64::new(0),
        }
    }

    /// The stream type this lane belongs to.
    pub fn stream_type(&self) -> StreamTypeId {
        self.stream_type
    }

    /// The device index this lane is bound to.
    pub fn device(&self) -> usize {
        self.device
    }

    /// Append an admitted instruction to the pending queue.
    pub fn push_pending(&self, instr: InstructionMsg) {
        self.admitted.fetch_add(1, Ordering::Relaxed);
        self.pending.lock().push_back(instr);
    }

    /// Promote head-of-line pending instructions whose inputs are all
    /// resolved. Never promotes past a blocked head; an instruction may not
    /// overtake an earlier one on the same stream. Returns the number of
    /// instructions promoted.
    pub fn promote_ready(&self, table: &SymbolTable) -> usize {
        let mut pending = self.pending.lock();
        let mut promoted = 0;
        while let Some(head) = pending.front() {
            let ready = head
                .inputs()
                .iter()
                .all(|&id| table.is_resolved(id).unwrap_or(false));
            if !ready {
                break;
            }
            let instr = pending.pop_front().expect("head exists");
            self.ready.lock().push_back(instr);
            promoted += 1;
        }
        promoted
    }

    /// Pop one ready instruction and mark it in flight.
    ///
    /// The in-flight count rises while the ready-queue lock is held, so a
    /// sampler that sees the queue empty also sees the popped instruction
    /// counted in flight.
    pub fn pop_ready(&self) -> Option<InstructionMsg> {
        let mut ready = self.ready.lock();
        let instr = ready.pop_front();
        if instr.is_some() {
            self.in_flight.fetch_add(1, Ordering::Relaxed);
        }
        instr
    }

    /// Record completion of an in-flight instruction.
    ///
    /// `executed` rises before `in_flight` falls; an admitted instruction
    /// is always visible in at least one counter.
    pub fn complete(&self) {
        self.executed.fetch_add(1, Ordering::Relaxed);
        self.in_flight.fetch_sub(1, Ordering::Release);
    }

    /// True when no instruction is pending, ready or in flight.
    pub fn is_idle(&self) -> bool {
        self.in_flight.load(Ordering::Acquire) == 0
            && self.ready.lock().is_empty()
            && self.pending.lock().is_empty()
    }

    /// Snapshot of this stream's counters.
    pub fn stats(&self) -> StreamStats {
        // Queue lengths first, then in-flight, then executed: an
        // instruction leaving one counter has already entered the next,
        // so the snapshot never loses it.
        let pending = self.pending.lock().len();
        let ready = self.ready.lock().len();
        let in_flight = self.in_flight.load(Ordering::Acquire);
        StreamStats {
            admitted: self.admitted.load(Ordering::Relaxed),
            executed: self.executed.load(Ordering::Relaxed),
            pending,
            ready,
            in_flight,
        }
    }
}

impl fmt::Debug for Stream {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Stream")
            .field("stream_type", &self.stream_type)
            .field("device", &self.device)
            .field("stats", &self.stats())
            .finish()
    }
}
