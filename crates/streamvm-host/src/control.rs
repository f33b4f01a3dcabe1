//! The control stream type: symbol pre-registration.

use streamvm_core::{
    ExecContext, ExecOutputs, InstructionMsg, Opcode, Result, StreamType, StreamTypeId, SymbolId,
    VmError,
};

use crate::CONTROL_STREAM_TYPE;

/// Opcode: pre-register a symbol identifier.
pub const NEW_SYMBOL: Opcode = Opcode::new(0);

/// Control stream: carries the "new symbol" instruction used to
/// pre-register identifiers before any producing instruction references
/// them.
///
/// The admission path declares the symbol (it appears in the instruction's
/// output list); execution deliberately leaves it unresolved so the later
/// defining instruction can bind the payload.
#[derive(Debug, Default)]
pub struct ControlStreamType;

impl ControlStreamType {
    /// Create the control stream type.
    pub fn new() -> Self {
        Self
    }

    /// Build a "new symbol" instruction for `sym`.
    pub fn new_symbol(sym: SymbolId) -> InstructionMsg {
        InstructionMsg::new(CONTROL_STREAM_TYPE, NEW_SYMBOL).with_outputs([sym])
    }
}

impl StreamType for ControlStreamType {
    fn id(&self) -> StreamTypeId {
        CONTROL_STREAM_TYPE
    }

    fn name(&self) -> &str {
        "control"
    }

    fn execute(&self, ctx: ExecContext<'_>) -> Result<ExecOutputs> {
        match ctx.instr.opcode() {
            NEW_SYMBOL => Ok(vec![None; ctx.instr.outputs().len()]),
            op => Err(VmError::UnknownOpcode {
                stream_type: self.id(),
                opcode: op,
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_symbol_leaves_output_unresolved() {
        let instr = ControlStreamType::new_symbol(SymbolId::new(9527));
        assert_eq!(instr.stream_type(), CONTROL_STREAM_TYPE);
        assert_eq!(instr.outputs(), &[SymbolId::new(9527)]);

        let outputs = ControlStreamType::new()
            .execute(ExecContext {
                instr: &instr,
                inputs: &[],
                device: 0,
            })
            .unwrap();
        assert_eq!(outputs.len(), 1);
        assert!(outputs[0].is_none());
    }

    #[test]
    fn test_unknown_opcode() {
        let instr = InstructionMsg::new(CONTROL_STREAM_TYPE, Opcode::new(42));
        let err = ControlStreamType::new()
            .execute(ExecContext {
                instr: &instr,
                inputs: &[],
                device: 0,
            })
            .unwrap_err();
        assert!(matches!(err, VmError::UnknownOpcode { .. }));
    }
}
