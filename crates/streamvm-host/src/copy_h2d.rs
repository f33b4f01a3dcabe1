//! Host-to-device copy engine.

use tracing::trace;

use streamvm_core::{
    ExecContext, ExecOutputs, InstructionMsg, Opcode, Operands, Result, StreamType, StreamTypeId,
    SymbolId, VmError,
};

use crate::buffer::{DeviceBuffer, HostBuffer};
use crate::{downcast_input, COPY_H2D_STREAM_TYPE};

/// Opcode: copy bytes from a host buffer into a device buffer
/// (inputs = `[src_host, dst_device]`, operand = byte length).
pub const COPY: Opcode = Opcode::new(0);

/// Host-to-device copy stream.
///
/// The destination symbol is an input: its buffer must be resolved before
/// the copy runs, and the copy writes through the shared payload without
/// replacing the descriptor.
#[derive(Debug, Default)]
pub struct CopyH2DStreamType;

impl CopyH2DStreamType {
    /// Create the host-to-device copy stream type.
    pub fn new() -> Self {
        Self
    }

    /// Build a copy of `len` bytes from host symbol `src` into device
    /// symbol `dst`.
    pub fn copy(dst: SymbolId, src: SymbolId, len: u64) -> InstructionMsg {
        InstructionMsg::new(COPY_H2D_STREAM_TYPE, COPY)
            .with_inputs([src, dst])
            .with_operands(Operands::Size(len))
    }
}

impl StreamType for CopyH2DStreamType {
    fn id(&self) -> StreamTypeId {
        COPY_H2D_STREAM_TYPE
    }

    fn name(&self) -> &str {
        "copy_h2d"
    }

    fn execute(&self, ctx: ExecContext<'_>) -> Result<ExecOutputs> {
        match ctx.instr.opcode() {
            COPY => {
                let len = ctx.instr.operands().size().ok_or(VmError::MalformedOperands {
                    stream_type: self.id(),
                    opcode: COPY,
                })?;
                let src = downcast_input::<HostBuffer>(self.id(), ctx.inputs, 0)?;
                let dst = downcast_input::<DeviceBuffer>(self.id(), ctx.inputs, 1)?;
                let len = len as usize;
                if len > src.len() || len > dst.len() {
                    return Err(VmError::MalformedOperands {
                        stream_type: self.id(),
                        opcode: COPY,
                    });
                }
                trace!("copy h2d: {len} bytes to device {}", dst.device());
                src.copy_into(dst.bytes(), len);
                Ok(vec![None; ctx.instr.outputs().len()])
            }
            op => Err(VmError::UnknownOpcode {
                stream_type: self.id(),
                opcode: op,
            }),
        }
    }
}
