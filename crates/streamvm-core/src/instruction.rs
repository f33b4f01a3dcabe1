//! Instruction messages: immutable units of requested work.
//!
//! An instruction message is created by the caller, owned by the scheduler
//! from submission until execution completes, and discarded afterwards. It
//! is fully self-describing: a stream type, an opcode, the symbols it reads,
//! the symbols it defines or pre-declares, and kind-specific operands.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::symbol::SymbolId;

/// Stable identifier for a registered stream type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct StreamTypeId(u32);

impl StreamTypeId {
    /// Create a stream type identifier.
    pub const fn new(raw: u32) -> Self {
        Self(raw)
    }

    /// Get the raw identifier value.
    pub const fn raw(&self) -> u32 {
        self.0
    }
}

impl fmt::Display for StreamTypeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Instruction kind within a stream type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Opcode(u32);

impl Opcode {
    /// Create an opcode.
    pub const fn new(raw: u32) -> Self {
        Self(raw)
    }

    /// Get the raw opcode value.
    pub const fn raw(&self) -> u32 {
        self.0
    }
}

impl fmt::Display for Opcode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Kind-specific operand payload carried alongside the symbol lists.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum Operands {
    /// No operands.
    #[default]
    None,
    /// A single byte count (allocation size, copy length).
    Size(u64),
    /// Free-form word list for caller-defined stream types.
    Words(Vec<u64>),
}

impl Operands {
    /// The byte count of a `Size` operand.
    pub fn size(&self) -> Option<u64> {
        match self {
            Operands::Size(n) => Some(*n),
            _ => None,
        }
    }
}

/// A single immutable execution request.
///
/// Input symbols are read dependencies: the instruction is not ready until
/// every one of them is resolved. A mutable target (such as a copy
/// destination) is also an input, since its buffer must exist before the
/// instruction runs; the resolved payload descriptor itself is never
/// replaced. Output symbols are declared at admission and resolved (or, for
/// the control stream's pre-declaration, left unresolved) at completion.
#[derive(Debug, Clone)]
pub struct InstructionMsg {
    stream_type: StreamTypeId,
    opcode: Opcode,
    inputs: Vec<SymbolId>,
    outputs: Vec<SymbolId>,
    operands: Operands,
    lane_hint: Option<usize>,
}

impl InstructionMsg {
    /// Create an instruction with no symbols and no operands.
    pub fn new(stream_type: StreamTypeId, opcode: Opcode) -> Self {
        Self {
            stream_type,
            opcode,
            inputs: Vec::new(),
            outputs: Vec::new(),
            operands: Operands::None,
            lane_hint: None,
        }
    }

    /// Set the input symbol list.
    pub fn with_inputs(mut self, inputs: impl IntoIterator<Item = SymbolId>) -> Self {
        self.inputs = inputs.into_iter().collect();
        self
    }

    /// Set the output symbol list.
    pub fn with_outputs(mut self, outputs: impl IntoIterator<Item = SymbolId>) -> Self {
        self.outputs = outputs.into_iter().collect();
        self
    }

    /// Set the operand payload.
    pub fn with_operands(mut self, operands: Operands) -> Self {
        self.operands = operands;
        self
    }

    /// Pin the instruction to a specific lane of its stream type.
    ///
    /// Without a hint the scheduler picks a lane round-robin.
    pub fn with_lane_hint(mut self, lane: usize) -> Self {
        self.lane_hint = Some(lane);
        self
    }

    /// Target stream type.
    pub fn stream_type(&self) -> StreamTypeId {
        self.stream_type
    }

    /// Instruction kind within the stream type.
    pub fn opcode(&self) -> Opcode {
        self.opcode
    }

    /// Symbols this instruction reads.
    pub fn inputs(&self) -> &[SymbolId] {
        &self.inputs
    }

    /// Symbols this instruction defines or pre-declares.
    pub fn outputs(&self) -> &[SymbolId] {
        &self.outputs
    }

    /// Kind-specific operands.
    pub fn operands(&self) -> &Operands {
        &self.operands
    }

    /// Caller-pinned lane, if any.
    pub fn lane_hint(&self) -> Option<usize> {
        self.lane_hint
    }
}

impl fmt::Display for InstructionMsg {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "instr(type={}, op={}, in={:?}, out={:?})",
            self.stream_type,
            self.opcode,
            self.inputs.iter().map(|s| s.raw()).collect::<Vec<_>>(),
            self.outputs.iter().map(|s| s.raw()).collect::<Vec<_>>(),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builder() {
        let instr = InstructionMsg::new(StreamTypeId::new(1), Opcode::new(2))
            .with_inputs([SymbolId::new(10)])
            .with_outputs([SymbolId::new(11)])
            .with_operands(Operands::Size(4096))
            .with_lane_hint(0);

        assert_eq!(instr.stream_type(), StreamTypeId::new(1));
        assert_eq!(instr.opcode(), Opcode::new(2));
        assert_eq!(instr.inputs(), &[SymbolId::new(10)]);
        assert_eq!(instr.outputs(), &[SymbolId::new(11)]);
        assert_eq!(instr.operands().size(), Some(4096));
        assert_eq!(instr.lane_hint(), Some(0));
    }

    #[test]
    fn test_operands_size() {
        assert_eq!(Operands::None.size(), None);
        assert_eq!(Operands::Size(16).size(), Some(16));
        assert_eq!(Operands::Words(vec![1, 2]).size(), None);
    }
}
