//! Virtual machine descriptor: static stream configuration.
//!
//! The descriptor is supplied once at construction and not reloadable at
//! runtime. Stream construction order is the descriptor order, which keeps
//! scheduling iteration fully deterministic.

use serde::{Deserialize, Serialize};

use crate::error::{Result, VmError};
use crate::instruction::StreamTypeId;

/// Configuration for one registered stream type.
///
/// Lane `i` of a stream type is bound to device index `i`. Per-stream FIFO
/// requires serial execution per lane, so one thread context drives exactly
/// one lane and `threads` must equal `lanes`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StreamDesc {
    /// The stream type these lanes belong to.
    pub stream_type: StreamTypeId,
    /// Number of independent lanes of this type.
    pub lanes: usize,
    /// Number of threads driving the lanes (one per lane).
    pub threads: usize,
}

impl StreamDesc {
    /// Describe `lanes` lanes of a stream type, one driving thread each.
    pub fn new(stream_type: StreamTypeId, lanes: usize) -> Self {
        Self {
            stream_type,
            lanes,
            threads: lanes,
        }
    }

    /// Validate the lane/thread configuration.
    pub fn validate(&self) -> Result<()> {
        if self.lanes == 0 {
            return Err(VmError::InvalidConfig(format!(
                "stream type {} has zero lanes",
                self.stream_type
            )));
        }
        if self.threads != self.lanes {
            return Err(VmError::InvalidConfig(format!(
                "stream type {}: {} thread(s) configured for {} lane(s); \
                 each lane needs exactly one driving thread",
                self.stream_type, self.threads, self.lanes
            )));
        }
        Ok(())
    }
}

/// Static configuration for a whole virtual machine.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct VmDesc {
    /// Per-stream-type lane configuration, in construction order.
    pub streams: Vec<StreamDesc>,
}

impl VmDesc {
    /// Create an empty descriptor.
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a stream descriptor.
    pub fn stream(mut self, desc: StreamDesc) -> Self {
        self.streams.push(desc);
        self
    }

    /// Validate every stream descriptor and reject duplicate stream types.
    pub fn validate(&self) -> Result<()> {
        for (i, desc) in self.streams.iter().enumerate() {
            desc.validate()?;
            if self.streams[..i]
                .iter()
                .any(|d| d.stream_type == desc.stream_type)
            {
                return Err(VmError::InvalidConfig(format!(
                    "stream type {} appears twice in the descriptor",
                    desc.stream_type
                )));
            }
        }
        Ok(())
    }

    /// Total lanes across all stream types.
    pub fn total_lanes(&self) -> usize {
        self.streams.iter().map(|d| d.lanes).sum()
    }
}
