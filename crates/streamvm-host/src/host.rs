//! Host allocation stream type.

use std::sync::Arc;

use tracing::trace;

use streamvm_core::{
    ExecContext, ExecOutputs, InstructionMsg, Opcode, Operands, Payload, Result, StreamType,
    StreamTypeId, SymbolId, VmError,
};

use crate::buffer::HostBuffer;
use crate::HOST_STREAM_TYPE;

/// Opcode: allocate a host buffer (operand = byte size).
pub const ALLOC: Opcode = Opcode::new(0);

/// Host stream: allocates pinned-style host buffers on the host allocator.
#[derive(Debug, Default)]
pub struct HostStreamType;

impl HostStreamType {
    /// Create the host stream type.
    pub fn new() -> Self {
        Self
    }

    /// Build an instruction defining `sym` with a `size`-byte host buffer.
    pub fn malloc_host(sym: SymbolId, size: u64) -> InstructionMsg {
        InstructionMsg::new(HOST_STREAM_TYPE, ALLOC)
            .with_outputs([sym])
            .with_operands(Operands::Size(size))
    }
}

impl StreamType for HostStreamType {
    fn id(&self) -> StreamTypeId {
        HOST_STREAM_TYPE
    }

    fn name(&self) -> &str {
        "host"
    }

    fn execute(&self, ctx: ExecContext<'_>) -> Result<ExecOutputs> {
        match ctx.instr.opcode() {
            ALLOC => {
                let size = ctx.instr.operands().size().ok_or(VmError::MalformedOperands {
                    stream_type: self.id(),
                    opcode: ALLOC,
                })?;
                trace!("host alloc: {size} bytes");
                let buffer: Payload = Arc::new(HostBuffer::new(size as usize));
                Ok(ctx.instr.outputs().iter().map(|_| Some(buffer.clone())).collect())
            }
            op => Err(VmError::UnknownOpcode {
                stream_type: self.id(),
                opcode: op,
            }),
        }
    }
}
