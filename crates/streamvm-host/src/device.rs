//! Device allocation stream type (the device helper).

use std::sync::Arc;

use tracing::trace;

use streamvm_core::{
    ExecContext, ExecOutputs, InstructionMsg, Opcode, Operands, Payload, Result, StreamType,
    StreamTypeId, SymbolId, VmError,
};

use crate::buffer::DeviceBuffer;
use crate::DEVICE_STREAM_TYPE;

/// Opcode: allocate a device buffer (operand = byte size).
pub const ALLOC: Opcode = Opcode::new(0);

/// Device helper stream: allocates buffers on the lane's device.
///
/// Lane `i` of this stream type is bound to device index `i`; the buffer is
/// created on the executing lane's device.
#[derive(Debug, Default)]
pub struct DeviceStreamType;

impl DeviceStreamType {
    /// Create the device stream type.
    pub fn new() -> Self {
        Self
    }

    /// Build an instruction defining `sym` with a `size`-byte device buffer.
    pub fn malloc(sym: SymbolId, size: u64) -> InstructionMsg {
        InstructionMsg::new(DEVICE_STREAM_TYPE, ALLOC)
            .with_outputs([sym])
            .with_operands(Operands::Size(size))
    }
}

impl StreamType for DeviceStreamType {
    fn id(&self) -> StreamTypeId {
        DEVICE_STREAM_TYPE
    }

    fn name(&self) -> &str {
        "device"
    }

    fn execute(&self, ctx: ExecContext<'_>) -> Result<ExecOutputs> {
        match ctx.instr.opcode() {
            ALLOC => {
                let size = ctx.instr.operands().size().ok_or(VmError::MalformedOperands {
                    stream_type: self.id(),
                    opcode: ALLOC,
                })?;
                trace!("device {} alloc: {size} bytes", ctx.device);
                let buffer: Payload = Arc::new(DeviceBuffer::new(ctx.device, size as usize));
                Ok(ctx.instr.outputs().iter().map(|_| Some(buffer.clone())).collect())
            }
            op => Err(VmError::UnknownOpcode {
                stream_type: self.id(),
                opcode: op,
            }),
        }
    }
}
