//! The scheduler: admission, readiness promotion and drain coordination.
//!
//! The scheduler owns the symbol table and one logical queue pair per
//! stream. Callers submit batches of instruction messages with
//! [`Scheduler::receive`], repeatedly run [`Scheduler::schedule`] passes to
//! promote instructions whose inputs have resolved, and drive the exposed
//! [`ThreadCtx`](crate::thread_ctx::ThreadCtx) values to drain the ready
//! queues. The composition of those three calls is left to the embedding
//! run loop so a single-threaded test driver and a truly concurrent
//! multi-thread driver reuse the identical scheduler logic.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;
use tracing::{debug, info, warn};

use crate::desc::VmDesc;
use crate::error::{Result, VmError};
use crate::instruction::{InstructionMsg, StreamTypeId};
use crate::stream::Stream;
use crate::stream_type::StreamTypeRegistry;
use crate::symbol::SymbolTable;
use crate::thread_ctx::ThreadCtx;

/// Snapshot of scheduler-wide counters.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SchedulerStats {
    /// Instructions admitted across all batches.
    pub received: u64,
    /// Instructions rejected during admission.
    pub rejected: u64,
    /// Instructions executed to completion.
    pub executed: u64,
    /// Instructions admitted but not yet completed.
    pub in_flight: usize,
    /// Symbols currently live in the table.
    pub live_symbols: usize,
    /// Symbols retired since construction.
    pub retired_symbols: u64,
}

/// State shared between the scheduler and its thread contexts.
pub(crate) struct Shared {
    pub(crate) registry: Arc<StreamTypeRegistry>,
    pub(crate) table: Mutex<SymbolTable>,
    pub(crate) streams: Vec<Arc<Stream>>,
    /// Admitted instructions that have not completed.
    pub(crate) in_flight: AtomicUsize,
    pub(crate) executed: AtomicU64,
}

/// The orchestrator: owns the symbol table and every stream queue.
pub struct Scheduler {
    shared: Arc<Shared>,
    /// Stream indices per stream type, in descriptor order.
    lanes_by_type: HashMap<StreamTypeId, Vec<usize>>,
    /// Round-robin lane cursors, one per stream type.
    cursors: Mutex<HashMap<StreamTypeId, usize>>,
    thread_ctxs: Vec<Arc<ThreadCtx>>,
    received: AtomicU64,
    rejected: AtomicU64,
}

impl Scheduler {
    /// Build a scheduler from a descriptor and a populated registry.
    ///
    /// Every stream type named by the descriptor must already be
    /// registered; configuration defects are fatal here, before any
    /// instruction is accepted.
    pub fn new(desc: &VmDesc, registry: Arc<StreamTypeRegistry>) -> Result<Self> {
        desc.validate()?;

        let mut streams = Vec::with_capacity(desc.total_lanes());
        let mut lanes_by_type: HashMap<StreamTypeId, Vec<usize>> = HashMap::new();
        let mut executors = Vec::with_capacity(desc.total_lanes());

        for stream_desc in &desc.streams {
            let executor = registry.lookup(stream_desc.stream_type)?;
            for lane in 0..stream_desc.lanes {
                let index = streams.len();
                streams.push(Arc::new(Stream::new(stream_desc.stream_type, lane)));
                lanes_by_type
                    .entry(stream_desc.stream_type)
                    .or_default()
                    .push(index);
                executors.push(Arc::clone(&executor));
            }
        }

        let shared = Arc::new(Shared {
            registry,
            table: Mutex::new(SymbolTable::new()),
            streams,
            in_flight: AtomicUsize::new(0),
            executed: AtomicU64::new(0),
        });

        let thread_ctxs = shared
            .streams
            .iter()
            .zip(executors)
            .map(|(stream, executor)| {
                Arc::new(ThreadCtx::new(
                    Arc::clone(&shared),
                    Arc::clone(stream),
                    executor,
                ))
            })
            .collect::<Vec<_>>();

        info!(
            "virtual machine configured: {} stream type(s), {} lane(s)",
            desc.streams.len(),
            shared.streams.len()
        );

        Ok(Self {
            shared,
            lanes_by_type,
            cursors: Mutex::new(HashMap::new()),
            thread_ctxs,
            received: AtomicU64::new(0),
            rejected: AtomicU64::new(0),
        })
    }

    /// Accept a batch of instruction messages, in submission order.
    ///
    /// Each instruction has its output symbols declared (when not already
    /// declared), its input symbols retained, and is enqueued on a lane of
    /// its stream type: the caller's lane hint when present, otherwise a
    /// per-type round-robin cursor advanced once per admitted instruction.
    ///
    /// A failing instruction is rejected and rolled back without
    /// disturbing the rest of the batch or previously admitted work; the
    /// first error is returned once the whole batch has been processed.
    pub fn receive(&self, batch: impl IntoIterator<Item = InstructionMsg>) -> Result<()> {
        let mut first_err = None;
        for instr in batch {
            if let Err(err) = self.admit(instr) {
                self.rejected.fetch_add(1, Ordering::Relaxed);
                if first_err.is_none() {
                    first_err = Some(err);
                }
            }
        }
        match first_err {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }

    fn admit(&self, instr: InstructionMsg) -> Result<()> {
        let lanes = self
            .lanes_by_type
            .get(&instr.stream_type())
            .ok_or_else(|| {
                warn!("rejecting {instr}: stream type not configured");
                VmError::UnresolvedStreamType(instr.stream_type())
            })?;

        let lane = match instr.lane_hint() {
            Some(hint) => {
                if hint >= lanes.len() {
                    warn!("rejecting {instr}: lane hint {hint} out of range");
                    return Err(VmError::InvalidConfig(format!(
                        "lane hint {} out of range for stream type {} ({} lane(s))",
                        hint,
                        instr.stream_type(),
                        lanes.len()
                    )));
                }
                hint
            }
            None => {
                let mut cursors = self.cursors.lock();
                let cursor = cursors.entry(instr.stream_type()).or_insert(0);
                let lane = *cursor % lanes.len();
                *cursor = cursor.wrapping_add(1);
                lane
            }
        };

        {
            let mut table = self.shared.table.lock();

            let mut declared = Vec::new();
            for &out in instr.outputs() {
                if !table.contains(out) {
                    table.declare(out)?;
                    declared.push(out);
                }
            }

            let mut retained = 0usize;
            for (i, &inp) in instr.inputs().iter().enumerate() {
                if let Err(err) = table.retain(inp) {
                    // Roll back so the rejected instruction leaves no trace.
                    for &prev in &instr.inputs()[..i] {
                        let _ = table.release(prev);
                    }
                    for &out in &declared {
                        let _ = table.undeclare(out);
                    }
                    warn!("rejecting {instr}: {err}");
                    return Err(err);
                }
                retained += 1;
            }
            debug_assert_eq!(retained, instr.inputs().len());
        }

        let stream = &self.shared.streams[lanes[lane]];
        self.shared.in_flight.fetch_add(1, Ordering::AcqRel);
        self.received.fetch_add(1, Ordering::Relaxed);
        debug!("admitted {instr} on lane {lane}");
        stream.push_pending(instr);
        Ok(())
    }

    /// One scheduling pass over every stream, in descriptor order.
    ///
    /// Promotes head-of-line pending instructions whose inputs are all
    /// resolved into their stream's ready queue. This is the sole place
    /// where cross-stream dependency resolution is checked; it never
    /// blocks, and calling it again with no intervening admission or
    /// completion promotes nothing further. Returns the number of
    /// instructions promoted.
    pub fn schedule(&self) -> usize {
        let table = self.shared.table.lock();
        let mut promoted = 0;
        for stream in &self.shared.streams {
            promoted += stream.promote_ready(&table);
        }
        promoted
    }

    /// True when no instruction is pending, ready or in flight and the
    /// symbol table holds no entries.
    pub fn is_empty(&self) -> bool {
        self.shared.in_flight.load(Ordering::Acquire) == 0 && self.shared.table.lock().is_empty()
    }

    /// The thread contexts, one per lane, for the caller's run loop.
    pub fn thread_ctxs(&self) -> &[Arc<ThreadCtx>] {
        &self.thread_ctxs
    }

    /// The streams, in descriptor order.
    pub fn streams(&self) -> &[Arc<Stream>] {
        &self.shared.streams
    }

    /// The stream type registry this scheduler dispatches against.
    pub fn registry(&self) -> &Arc<StreamTypeRegistry> {
        &self.shared.registry
    }

    /// Snapshot of the scheduler-wide counters.
    pub fn stats(&self) -> SchedulerStats {
        let table = self.shared.table.lock();
        SchedulerStats {
            received: self.received.load(Ordering::Relaxed),
            rejected: self.rejected.load(Ordering::Relaxed),
            executed: self.shared.executed.load(Ordering::Relaxed),
            in_flight: self.shared.in_flight.load(Ordering::Relaxed),
            live_symbols: table.len(),
            retired_symbols: table.retired(),
        }
    }
}

impl std::fmt::Debug for Scheduler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Scheduler")
            .field("streams", &self.shared.streams.len())
            .field("stats", &self.stats())
            .finish()
    }
}
