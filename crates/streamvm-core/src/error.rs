//! Error types for the StreamVM core.

use thiserror::Error;

use crate::instruction::{Opcode, StreamTypeId};
use crate::symbol::SymbolId;

/// Result type alias used throughout StreamVM.
pub type Result<T> = std::result::Result<T, VmError>;

/// Error type for all StreamVM core operations.
///
/// Symbol-table misuse (`DuplicateSymbol`, `UnknownSymbol`,
/// `AlreadyResolved`) is always a caller or backend defect and is fatal to
/// the responsible operation, never to the whole engine. Registry and
/// descriptor errors (`DuplicateStreamType`, `UnresolvedStreamType`,
/// `InvalidConfig`) are configuration defects surfaced at setup or
/// admission time. `ExecutorContractViolation` indicates a broken backend
/// integration; continuing past it would corrupt the symbol table.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum VmError {
    /// A symbol identifier was declared while already live.
    #[error("symbol {0} is already declared")]
    DuplicateSymbol(SymbolId),

    /// A symbol identifier is not present in the symbol table.
    #[error("symbol {0} is not declared")]
    UnknownSymbol(SymbolId),

    /// A symbol was resolved a second time.
    #[error("symbol {0} is already resolved")]
    AlreadyResolved(SymbolId),

    /// A symbol's payload was read before its defining instruction ran.
    #[error("symbol {0} is not yet resolved")]
    Unresolved(SymbolId),

    /// A stream type identifier was registered twice.
    #[error("stream type {0} is already registered")]
    DuplicateStreamType(StreamTypeId),

    /// An instruction (or descriptor entry) names an unregistered stream type.
    #[error("stream type {0} is not registered")]
    UnresolvedStreamType(StreamTypeId),

    /// A stream type executor received an opcode it does not implement.
    #[error("stream type {stream_type} does not implement opcode {opcode}")]
    UnknownOpcode {
        /// The executor's stream type.
        stream_type: StreamTypeId,
        /// The unimplemented opcode.
        opcode: Opcode,
    },

    /// An executor returned the wrong number of output payloads.
    #[error(
        "executor for stream type {stream_type} returned {actual} outputs, expected {expected}"
    )]
    ExecutorContractViolation {
        /// The offending executor's stream type.
        stream_type: StreamTypeId,
        /// Output count declared by the instruction.
        expected: usize,
        /// Output count the executor produced.
        actual: usize,
    },

    /// An executor received a payload of an unexpected concrete type.
    #[error("stream type {stream_type}: input payload {index} has unexpected type")]
    PayloadType {
        /// The executor's stream type.
        stream_type: StreamTypeId,
        /// Position of the offending input.
        index: usize,
    },

    /// An instruction's operands do not match its opcode.
    #[error("stream type {stream_type}, opcode {opcode}: malformed operands")]
    MalformedOperands {
        /// The executor's stream type.
        stream_type: StreamTypeId,
        /// The opcode whose operand contract was violated.
        opcode: Opcode,
    },

    /// Invalid virtual machine descriptor or builder configuration.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    /// A driver pass made no progress while instructions remain admitted.
    #[error("scheduler stalled with {inflight} instruction(s) unable to make progress")]
    Stalled {
        /// Instructions admitted but unable to complete.
        inflight: usize,
    },
}
