//! # StreamVM
//!
//! A heterogeneous instruction-execution virtual machine.
//!
//! StreamVM accepts a stream of abstract instructions referencing logical
//! resource handles ("symbols"), resolves data dependencies between
//! instructions that may target different physical execution units (host
//! memory, device memory, copy engines), and dispatches each instruction
//! to the stream responsible for executing it, while enforcing that a
//! symbol is never used before the instruction that defines it completes.
//!
//! ## Quick Start
//!
//! ```
//! use streamvm::prelude::*;
//!
//! # fn main() -> Result<()> {
//! let vm = VirtualMachine::builder().with_host_defaults().build()?;
//!
//! let src = SymbolId::new(1);
//! let dst = SymbolId::new(2);
//! vm.submit([
//!     ControlStreamType::new_symbol(src),
//!     ControlStreamType::new_symbol(dst),
//!     HostStreamType::malloc_host(src, 1024),
//!     DeviceStreamType::malloc(dst, 1024),
//!     CopyH2DStreamType::copy(dst, src, 1024),
//! ])?;
//!
//! vm.run_to_completion()?;
//! assert!(vm.is_empty());
//! # Ok(())
//! # }
//! ```
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────┐
//! │                      Scheduler                           │
//! │   symbol table ── admission ── readiness promotion       │
//! └──────┬───────────────┬────────────────┬──────────────────┘
//!        │ ready          │ ready          │ ready
//! ┌──────┴─────┐  ┌───────┴────┐  ┌────────┴───┐
//! │ ThreadCtx  │  │ ThreadCtx  │  │ ThreadCtx  │   one per lane
//! │ (control)  │  │ (host)     │  │ (copy h2d) │
//! └────────────┘  └────────────┘  └────────────┘
//! ```
//!
//! Each thread context drains its stream in FIFO order; ordering across
//! streams comes only from symbol dependencies. The run loop is pluggable:
//! [`VirtualMachine::run_to_completion`] drives everything cooperatively
//! from one thread, [`VirtualMachine::run_threaded`] gives every lane its
//! own OS thread, and callers needing a custom loop can compose
//! [`Scheduler::schedule`] with the exposed thread contexts directly.

#![warn(missing_docs)]
#![warn(clippy::all)]
#![allow(hidden_glob_reexports)]

pub mod driver;

// Re-export core and host-backend types
pub use streamvm_core::*;
pub use streamvm_host::{
    ControlStreamType, CopyD2HStreamType, CopyH2DStreamType, DeviceBuffer, DeviceStreamType,
    HostBuffer, HostStreamType, CONTROL_STREAM_TYPE, COPY_D2H_STREAM_TYPE, COPY_H2D_STREAM_TYPE,
    DEVICE_STREAM_TYPE, HOST_STREAM_TYPE,
};

use std::sync::Arc;

/// Prelude module for convenient imports.
pub mod prelude {
    pub use crate::{VirtualMachine, VmBuilder};
    pub use streamvm_core::prelude::*;
    pub use streamvm_host::{
        ControlStreamType, CopyD2HStreamType, CopyH2DStreamType, DeviceBuffer, DeviceStreamType,
        HostBuffer, HostStreamType,
    };
}

/// Main virtual machine facade.
///
/// Owns the scheduler; batches go in through [`submit`](Self::submit) and
/// are drained by one of the drivers in [`driver`].
pub struct VirtualMachine {
    scheduler: Arc<Scheduler>,
}

impl VirtualMachine {
    /// Create a new builder.
    pub fn builder() -> VmBuilder {
        VmBuilder::new()
    }

    /// Submit a batch of instruction messages.
    ///
    /// See [`Scheduler::receive`] for the admission and partial-rejection
    /// semantics.
    pub fn submit(&self, batch: impl IntoIterator<Item = InstructionMsg>) -> Result<()> {
        self.scheduler.receive(batch)
    }

    /// Drive all admitted work to completion on the calling thread.
    ///
    /// Returns the number of scheduling passes taken.
    pub fn run_to_completion(&self) -> Result<usize> {
        driver::run_to_completion(&self.scheduler)
    }

    /// Drive all admitted work to completion with one thread per lane.
    pub fn run_threaded(&self) -> Result<()> {
        driver::run_threaded(&self.scheduler)
    }

    /// True when no instruction is admitted and no symbol is live.
    pub fn is_empty(&self) -> bool {
        self.scheduler.is_empty()
    }

    /// Snapshot of the scheduler counters.
    pub fn stats(&self) -> SchedulerStats {
        self.scheduler.stats()
    }

    /// The underlying scheduler, for custom run loops.
    pub fn scheduler(&self) -> &Arc<Scheduler> {
        &self.scheduler
    }
}

impl std::fmt::Debug for VirtualMachine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("VirtualMachine")
            .field("scheduler", &self.scheduler)
            .finish()
    }
}

/// Builder for a [`VirtualMachine`].
pub struct VmBuilder {
    desc: VmDesc,
    executors: Vec<Arc<dyn StreamType>>,
}

impl VmBuilder {
    /// Create an empty builder.
    pub fn new() -> Self {
        Self {
            desc: VmDesc::new(),
            executors: Vec::new(),
        }
    }

    /// Register a stream type executor.
    pub fn register(mut self, executor: Arc<dyn StreamType>) -> Self {
        self.executors.push(executor);
        self
    }

    /// Add a stream descriptor (lane configuration for one stream type).
    pub fn stream(mut self, desc: StreamDesc) -> Self {
        self.desc = self.desc.stream(desc);
        self
    }

    /// Register the built-in host stream types, one lane each: control,
    /// host allocate, device allocate, and both copy engines.
    pub fn with_host_defaults(self) -> Self {
        self.register(Arc::new(ControlStreamType::new()))
            .stream(StreamDesc::new(CONTROL_STREAM_TYPE, 1))
            .register(Arc::new(HostStreamType::new()))
            .stream(StreamDesc::new(HOST_STREAM_TYPE, 1))
            .register(Arc::new(DeviceStreamType::new()))
            .stream(StreamDesc::new(DEVICE_STREAM_TYPE, 1))
            .register(Arc::new(CopyH2DStreamType::new()))
            .stream(StreamDesc::new(COPY_H2D_STREAM_TYPE, 1))
            .register(Arc::new(CopyD2HStreamType::new()))
            .stream(StreamDesc::new(COPY_D2H_STREAM_TYPE, 1))
    }

    /// Build the virtual machine.
    ///
    /// Fails with [`VmError::DuplicateStreamType`] on a doubly registered
    /// executor, [`VmError::UnresolvedStreamType`] when a descriptor entry
    /// names an unregistered type, and [`VmError::InvalidConfig`] on a bad
    /// lane configuration.
    pub fn build(self) -> Result<VirtualMachine> {
        let registry = Arc::new(StreamTypeRegistry::new());
        for executor in self.executors {
            registry.register(executor)?;
        }
        let scheduler = Scheduler::new(&self.desc, registry)?;
        Ok(VirtualMachine {
            scheduler: Arc::new(scheduler),
        })
    }
}

impl Default for VmBuilder {
    fn default() -> Self {
        Self::new()
    }
}
