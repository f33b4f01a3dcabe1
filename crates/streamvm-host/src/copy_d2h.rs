//! Device-to-host copy engine.

use tracing::trace;

use streamvm_core::{
    ExecContext, ExecOutputs, InstructionMsg, Opcode, Operands, Result, StreamType, StreamTypeId,
    SymbolId, VmError,
};

use crate::buffer::{DeviceBuffer, HostBuffer};
use crate::{downcast_input, COPY_D2H_STREAM_TYPE};

/// Opcode: copy bytes from a device buffer into a host buffer
/// (inputs = `[src_device, dst_host]`, operand = byte length).
pub const COPY: Opcode = Opcode::new(0);

/// Device-to-host copy stream, the twin of
/// [`CopyH2DStreamType`](crate::copy_h2d::CopyH2DStreamType).
#[derive(Debug, Default)]
pub struct CopyD2HStreamType;

impl CopyD2HStreamType {
    /// Create the device-to-host copy stream type.
    pub fn new() -> Self {
        Self
    }

    /// Build a copy of `len` bytes from device symbol `src` into host
    /// symbol `dst`.
    pub fn copy(dst: SymbolId, src: SymbolId, len: u64) -> InstructionMsg {
        InstructionMsg::new(COPY_D2H_STREAM_TYPE, COPY)
            .with_inputs([src, dst])
            .with_operands(Operands::Size(len))
    }
}

impl StreamType for CopyD2HStreamType {
    fn id(&self) -> StreamTypeId {
        COPY_D2H_STREAM_TYPE
    }

    fn name(&self) -> &str {
        "copy_d2h"
    }

    fn execute(&self, ctx: ExecContext<'_>) -> Result<ExecOutputs> {
        match ctx.instr.opcode() {
            COPY => {
                let len = ctx.instr.operands().size().ok_or(VmError::MalformedOperands {
                    stream_type: self.id(),
                    opcode: COPY,
                })?;
                let src = downcast_input::<DeviceBuffer>(self.id(), ctx.inputs, 0)?;
                let dst = downcast_input::<HostBuffer>(self.id(), ctx.inputs, 1)?;
                let len = len as usize;
                if len > src.len() || len > dst.len() {
                    return Err(VmError::MalformedOperands {
                        stream_type: self.id(),
                        opcode: COPY,
                    });
                }
                trace!("copy d2h: {len} bytes from device {}", src.device());
                let bytes = src.read(len);
                dst.write(&bytes);
                Ok(vec![None; ctx.instr.outputs().len()])
            }
            op => Err(VmError::UnknownOpcode {
                stream_type: self.id(),
                opcode: op,
            }),
        }
    }
}
