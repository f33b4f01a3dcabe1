//! Thread contexts: the execution agents draining one stream each.

use std::sync::atomic::Ordering;
use std::sync::Arc;

use tracing::trace;

use crate::error::{Result, VmError};
use crate::scheduler::Shared;
use crate::stream::Stream;
use crate::stream_type::{ExecContext, StreamType};
use crate::symbol::Payload;

/// One execution agent bound to exactly one stream.
///
/// Created at scheduler construction, one per configured lane, and alive
/// for the scheduler's lifetime. The embedding run loop decides whether the
/// contexts are visited cooperatively from one thread or each driven by its
/// own OS thread; the scheduler logic is identical either way.
pub struct ThreadCtx {
    shared: Arc<Shared>,
    stream: Arc<Stream>,
    executor: Arc<dyn StreamType>,
}

impl ThreadCtx {
    pub(crate) fn new(
        shared: Arc<Shared>,
        stream: Arc<Stream>,
        executor: Arc<dyn StreamType>,
    ) -> Self {
        Self {
            shared,
            stream,
            executor,
        }
    }

    /// The stream this context drains.
    pub fn stream(&self) -> &Stream {
        &self.stream
    }

    /// Non-blocking attempt to pop and execute one ready instruction.
    ///
    /// Returns `Ok(true)` when an instruction was executed, `Ok(false)`
    /// when nothing was ready ("nothing ready" is a no-op, not an error).
    /// On completion the instruction's resolved outputs are bound, each
    /// resolved output's pending-definition hold is dropped, and every
    /// input's reader hold is released. Errors here are fatal invariant
    /// violations: a broken executor contract, a double resolution, or an
    /// input observed unresolved at execution time.
    pub fn try_receive_and_run(&self) -> Result<bool> {
        let Some(instr) = self.stream.pop_ready() else {
            return Ok(false);
        };

        // Snapshot the input payloads, then run the executor without
        // holding the table lock: executor latency belongs to this stream.
        let inputs = {
            let table = self.shared.table.lock();
            instr
                .inputs()
                .iter()
                .map(|&id| table.payload(id))
                .collect::<Result<Vec<Payload>>>()?
        };

        trace!(
            "executing {instr} on '{}' device {}",
            self.executor.name(),
            self.stream.device()
        );

        let outputs = self.executor.execute(ExecContext {
            instr: &instr,
            inputs: &inputs,
            device: self.stream.device(),
        })?;

        if outputs.len() != instr.outputs().len() {
            return Err(VmError::ExecutorContractViolation {
                stream_type: self.executor.id(),
                expected: instr.outputs().len(),
                actual: outputs.len(),
            });
        }

        {
            let mut table = self.shared.table.lock();
            for (&sym, out) in instr.outputs().iter().zip(outputs) {
                if let Some(payload) = out {
                    table.resolve(sym, payload)?;
                    table.release(sym)?;
                }
            }
            for &inp in instr.inputs() {
                table.release(inp)?;
            }
        }

        self.stream.complete();
        self.shared.executed.fetch_add(1, Ordering::Relaxed);
        self.shared.in_flight.fetch_sub(1, Ordering::AcqRel);
        Ok(true)
    }
}

impl std::fmt::Debug for ThreadCtx {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ThreadCtx")
            .field("stream_type", &self.stream.stream_type())
            .field("device", &self.stream.device())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::desc::{StreamDesc, VmDesc};
    use crate::instruction::{InstructionMsg, Opcode, StreamTypeId};
    use crate::scheduler::Scheduler;
    use crate::stream_type::{ExecOutputs, StreamTypeRegistry};
    use crate::symbol::SymbolId;

    /// A broken executor that returns the wrong number of outputs.
    struct ShortType;

    impl StreamType for ShortType {
        fn id(&self) -> StreamTypeId {
            StreamTypeId::new(1)
        }

        fn name(&self) -> &str {
            "short"
        }

        fn execute(&self, _ctx: ExecContext<'_>) -> Result<ExecOutputs> {
            Ok(vec![])
        }
    }

    #[test]
    fn test_executor_contract_violation_is_fatal() {
        let registry = Arc::new(StreamTypeRegistry::new());
        registry.register(Arc::new(ShortType)).unwrap();
        let desc = VmDesc::new().stream(StreamDesc::new(StreamTypeId::new(1), 1));
        let scheduler = Scheduler::new(&desc, registry).unwrap();

        scheduler
            .receive([
                InstructionMsg::new(StreamTypeId::new(1), Opcode::new(0))
                    .with_outputs([SymbolId::new(1)]),
            ])
            .unwrap();
        scheduler.schedule();

        let err = scheduler.thread_ctxs()[0]
            .try_receive_and_run()
            .unwrap_err();
        assert!(matches!(
            err,
            VmError::ExecutorContractViolation {
                expected: 1,
                actual: 0,
                ..
            }
        ));
    }

    #[test]
    fn test_nothing_ready_is_a_noop() {
        let registry = Arc::new(StreamTypeRegistry::new());
        registry.register(Arc::new(ShortType)).unwrap();
        let desc = VmDesc::new().stream(StreamDesc::new(StreamTypeId::new(1), 1));
        let scheduler = Scheduler::new(&desc, registry).unwrap();

        assert!(!scheduler.thread_ctxs()[0].try_receive_and_run().unwrap());
    }
}
