//! # StreamVM Host Backend
//!
//! Built-in stream types executing on the host: the control stream
//! (symbol pre-registration), host and device allocators, and the copy
//! engines between them. Device memory is simulated in host memory, making
//! this backend always available for tests and hardware-free runs.
//!
//! ## Stream Types
//!
//! - [`ControlStreamType`] - "new symbol" pre-registration
//! - [`HostStreamType`] - host buffer allocation
//! - [`DeviceStreamType`] - device buffer allocation (per-lane device)
//! - [`CopyH2DStreamType`] - host-to-device copy engine
//! - [`CopyD2HStreamType`] - device-to-host copy engine

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod buffer;
pub mod control;
pub mod copy_d2h;
pub mod copy_h2d;
pub mod device;
pub mod host;

pub use buffer::{DeviceBuffer, HostBuffer};
pub use control::ControlStreamType;
pub use copy_d2h::CopyD2HStreamType;
pub use copy_h2d::CopyH2DStreamType;
pub use device::DeviceStreamType;
pub use host::HostStreamType;

use streamvm_core::{Payload, Result, StreamTypeId, VmError};

/// Stream type id of the control stream.
pub const CONTROL_STREAM_TYPE: StreamTypeId = StreamTypeId::new(0);
/// Stream type id of the host allocator stream.
pub const HOST_STREAM_TYPE: StreamTypeId = StreamTypeId::new(1);
/// Stream type id of the device allocator stream.
pub const DEVICE_STREAM_TYPE: StreamTypeId = StreamTypeId::new(2);
/// Stream type id of the host-to-device copy engine.
pub const COPY_H2D_STREAM_TYPE: StreamTypeId = StreamTypeId::new(3);
/// Stream type id of the device-to-host copy engine.
pub const COPY_D2H_STREAM_TYPE: StreamTypeId = StreamTypeId::new(4);

/// Downcast one input payload to its expected buffer type.
pub(crate) fn downcast_input<T: 'static>(
    stream_type: StreamTypeId,
    inputs: &[Payload],
    index: usize,
) -> Result<&T> {
    inputs
        .get(index)
        .and_then(|p| p.downcast_ref::<T>())
        .ok_or(VmError::PayloadType { stream_type, index })
}
