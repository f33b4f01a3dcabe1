//! # StreamVM Core
//!
//! Core types for the StreamVM heterogeneous instruction-execution engine.
//!
//! StreamVM accepts batches of abstract instructions referencing logical
//! resource handles ("symbols"), resolves data dependencies between
//! instructions that may target different physical execution units, and
//! dispatches each instruction to the stream responsible for executing it,
//! never running an instruction before every symbol it reads has been
//! resolved.
//!
//! ## Core Abstractions
//!
//! - [`SymbolTable`] - Reference-counted resource handle slots
//! - [`InstructionMsg`] - An immutable unit of requested work
//! - [`StreamType`] - Capability contract for one kind of execution unit
//! - [`StreamTypeRegistry`] - Pluggable catalog of stream types
//! - [`VmDesc`] - Static lane configuration
//! - [`Scheduler`] - Admission and readiness promotion
//! - [`ThreadCtx`] - The execution agent draining one stream
//!
//! ## Example
//!
//! ```ignore
//! use streamvm_core::prelude::*;
//!
//! let registry = Arc::new(StreamTypeRegistry::new());
//! registry.register(my_stream_type)?;
//!
//! let desc = VmDesc::new().stream(StreamDesc::new(MY_TYPE, 1));
//! let scheduler = Scheduler::new(&desc, registry)?;
//!
//! scheduler.receive(batch)?;
//! while !scheduler.is_empty() {
//!     scheduler.schedule();
//!     for ctx in scheduler.thread_ctxs() {
//!         ctx.try_receive_and_run()?;
//!     }
//! }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod desc;
pub mod error;
pub mod instruction;
pub mod scheduler;
pub mod stream;
pub mod stream_type;
pub mod symbol;
pub mod thread_ctx;

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::desc::{StreamDesc, VmDesc};
    pub use crate::error::{Result, VmError};
    pub use crate::instruction::{InstructionMsg, Opcode, Operands, StreamTypeId};
    pub use crate::scheduler::{Scheduler, SchedulerStats};
    pub use crate::stream::{Stream, StreamStats};
    pub use crate::stream_type::{ExecContext, ExecOutputs, StreamType, StreamTypeRegistry};
    pub use crate::symbol::{Payload, SymbolId, SymbolState, SymbolTable};
    pub use crate::thread_ctx::ThreadCtx;
}

// Re-exports for convenience
pub use desc::{StreamDesc, VmDesc};
pub use error::{Result, VmError};
pub use instruction::{InstructionMsg, Opcode, Operands, StreamTypeId};
pub use scheduler::{Scheduler, SchedulerStats};
pub use stream::{Stream, StreamStats};
pub use stream_type::{ExecContext, ExecOutputs, StreamType, StreamTypeRegistry};
pub use symbol::{Payload, SymbolId, SymbolState, SymbolTable};
pub use thread_ctx::ThreadCtx;
