//! Stream type capability contract and registry.
//!
//! A stream type is a category of execution unit (host compute, device
//! allocate, copy engine) registered once at configuration time. The
//! registry maps a stable identifier to an executor value; it is never
//! mutated during scheduling.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use parking_lot::RwLock;

use crate::error::{Result, VmError};
use crate::instruction::{InstructionMsg, StreamTypeId};
use crate::symbol::Payload;

/// Execution environment handed to a stream type executor.
pub struct ExecContext<'a> {
    /// The instruction being executed.
    pub instr: &'a InstructionMsg,
    /// Resolved payloads of the instruction's inputs, in input order.
    pub inputs: &'a [Payload],
    /// Device index of the lane executing the instruction.
    pub device: usize,
}

/// Outcome of an executor call: one entry per declared output symbol.
///
/// `Some(payload)` resolves the output; `None` leaves it pre-declared for a
/// later defining instruction (the control stream's "new symbol" case).
pub type ExecOutputs = Vec<Option<Payload>>;

/// Execution behavior for one category of execution unit.
///
/// The call is synchronous from the scheduler's point of view: the
/// underlying physical operation may be asynchronous, but `execute` returns
/// only once the instruction's symbol-visible effects are guaranteed to
/// hold. Any latency is attributed to the owning stream, never to the
/// scheduler.
pub trait StreamType: Send + Sync {
    /// Stable identifier this executor registers under.
    fn id(&self) -> StreamTypeId;

    /// Human-readable name for logging.
    fn name(&self) -> &str;

    /// Execute one instruction and produce exactly one entry per output
    /// symbol. Returning a wrong-length vector is an executor contract
    /// violation and fatal to the engine.
    fn execute(&self, ctx: ExecContext<'_>) -> Result<ExecOutputs>;
}

/// Pluggable catalog of stream types, populated once at startup.
#[derive(Default)]
pub struct StreamTypeRegistry {
    types: RwLock<HashMap<StreamTypeId, Arc<dyn StreamType>>>,
}

impl StreamTypeRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Associate a stream type with its executor exactly once.
    pub fn register(&self, executor: Arc<dyn StreamType>) -> Result<()> {
        let id = executor.id();
        let mut types = self.types.write();
        if types.contains_key(&id) {
            return Err(VmError::DuplicateStreamType(id));
        }
        tracing::debug!("registered stream type {} ('{}')", id, executor.name());
        types.insert(id, executor);
        Ok(())
    }

    /// Look up the executor for a stream type.
    pub fn lookup(&self, id: StreamTypeId) -> Result<Arc<dyn StreamType>> {
        self.types
            .read()
            .get(&id)
            .cloned()
            .ok_or(VmError::UnresolvedStreamType(id))
    }

    /// Whether a stream type is registered.
    pub fn contains(&self, id: StreamTypeId) -> bool {
        self.types.read().contains_key(&id)
    }

    /// Number of registered stream types.
    pub fn len(&self) -> usize {
        self.types.read().len()
    }

    /// True when no stream type is registered.
    pub fn is_empty(&self) -> bool {
        self.types.read().is_empty()
    }
}

impl fmt::Debug for StreamTypeRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StreamTypeRegistry")
            .field("registered", &self.types.read().len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::instruction::Opcode;

    struct NoopType(StreamTypeId);

    impl StreamType for NoopType {
        fn id(&self) -> StreamTypeId {
            self.0
        }

        fn name(&self) -> &str {
            "noop"
        }

        fn execute(&self, ctx: ExecContext<'_>) -> Result<ExecOutputs> {
            Ok(vec![None; ctx.instr.outputs().len()])
        }
    }

    #[test]
    fn test_register_and_lookup() {
        let registry = StreamTypeRegistry::new();
        let id = StreamTypeId::new(7);
        registry.register(Arc::new(NoopType(id))).unwrap();

        let executor = registry.lookup(id).unwrap();
        assert_eq!(executor.id(), id);
        assert!(registry.contains(id));
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn test_duplicate_registration() {
        let registry = StreamTypeRegistry::new();
        let id = StreamTypeId::new(7);
        registry.register(Arc::new(NoopType(id))).unwrap();
        assert!(matches!(
            registry.register(Arc::new(NoopType(id))),
            Err(VmError::DuplicateStreamType(_))
        ));
    }

    #[test]
    fn test_unregistered_lookup() {
        let registry = StreamTypeRegistry::new();
        assert!(matches!(
            registry.lookup(StreamTypeId::new(42)),
            Err(VmError::UnresolvedStreamType(_))
        ));
    }

    #[test]
    fn test_noop_execute() {
        let noop = NoopType(StreamTypeId::new(1));
        let instr = InstructionMsg::new(StreamTypeId::new(1), Opcode::new(0))
            .with_outputs([crate::symbol::SymbolId::new(5)]);
        let outputs = noop
            .execute(ExecContext {
                instr: &instr,
                inputs: &[],
                device: 0,
            })
            .unwrap();
        assert_eq!(outputs.len(), 1);
        assert!(outputs[0].is_none());
    }
}
