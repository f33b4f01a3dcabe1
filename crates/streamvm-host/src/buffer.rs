//! Simulated host and device buffers.
//!
//! These are the payloads produced by the built-in allocate stream types.
//! Device memory is simulated in host memory, giving an always-available
//! backend for tests and for running without real hardware.
//!
//! A resolved symbol's payload descriptor is immutable; the bytes behind
//! it live under an interior mutex so a copy engine can write through a
//! shared payload without replacing it.

use parking_lot::Mutex;

/// A host-side allocation (stands in for pinned host memory).
pub struct HostBuffer {
    data: Mutex<Vec<u8>>,
}

impl HostBuffer {
    /// Allocate a zero-filled host buffer of `size` bytes.
    pub fn new(size: usize) -> Self {
        Self {
            data: Mutex::new(vec![0u8; size]),
        }
    }

    /// Buffer size in bytes.
    pub fn len(&self) -> usize {
        self.data.lock().len()
    }

    /// True for a zero-sized buffer.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Copy `src` into the buffer starting at offset 0.
    ///
    /// Returns `false` without writing when `src` is longer than the
    /// buffer.
    pub fn write(&self, src: &[u8]) -> bool {
        let mut data = self.data.lock();
        if src.len() > data.len() {
            return false;
        }
        data[..src.len()].copy_from_slice(src);
        true
    }

    /// Copy the first `len` bytes out of the buffer, clamped to its size.
    pub fn read(&self, len: usize) -> Vec<u8> {
        let data = self.data.lock();
        data[..len.min(data.len())].to_vec()
    }

    /// Returns `false` without writing when `len` exceeds either buffer.
    pub(crate) fn copy_into(&self, dst: &Mutex<Vec<u8>>, len: usize) -> bool {
        let src = self.data.lock();
        let mut dst = dst.lock();
        if len > src.len() || len > dst.len() {
            return false;
        }
        dst[..len].copy_from_slice(&src[..len]);
        true
    }
}

/// A simulated device allocation bound to one device index.
pub struct DeviceBuffer {
    device: usize,
    data: Mutex<Vec<u8>>,
}

impl DeviceBuffer {
    /// Allocate a zero-filled device buffer of `size` bytes on `device`.
    pub fn new(device: usize, size: usize) -> Self {
        Self {
            device,
            data: Mutex::new(vec![0u8; size]),
        }
    }

    /// The device index this buffer lives on.
    pub fn device(&self) -> usize {
        self.device
    }

    /// Buffer size in bytes.
    pub fn len(&self) -> usize {
        self.data.lock().len()
    }

    /// True for a zero-sized buffer.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Copy the first `len` bytes out of the buffer, clamped to its size.
    pub fn read(&self, len: usize) -> Vec<u8> {
        let data = self.data.lock();
        data[..len.min(data.len())].to_vec()
    }

    pub(crate) fn bytes(&self) -> &Mutex<Vec<u8>> {
        &self.data
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_host_buffer_roundtrip() {
        let buf = HostBuffer::new(8);
        assert_eq!(buf.len(), 8);
        assert!(buf.write(&[1, 2, 3, 4]));
        assert_eq!(buf.read(4), vec![1, 2, 3, 4]);
        // Untouched tail stays zeroed.
        assert_eq!(buf.read(8)[4..], [0, 0, 0, 0]);
    }

    #[test]
    fn test_out_of_bounds_access_is_checked() {
        let buf = HostBuffer::new(4);
        assert!(!buf.write(&[0u8; 8]));
        assert_eq!(buf.read(4), vec![0u8; 4]);
        // Oversized reads clamp instead of panicking.
        assert_eq!(buf.read(64).len(), 4);

        let device = DeviceBuffer::new(0, 2);
        assert!(!buf.copy_into(device.bytes(), 4));
        assert_eq!(device.read(64).len(), 2);
    }

    #[test]
    fn test_device_buffer() {
        let buf = DeviceBuffer::new(2, 16);
        assert_eq!(buf.device(), 2);
        assert_eq!(buf.len(), 16);
        assert_eq!(buf.read(16), vec![0u8; 16]);
    }

    #[test]
    fn test_host_to_device_copy() {
        let host = HostBuffer::new(8);
        assert!(host.write(&[9, 8, 7, 6, 5, 4, 3, 2]));
        let device = DeviceBuffer::new(0, 8);
        assert!(host.copy_into(device.bytes(), 8));
        assert_eq!(device.read(8), vec![9, 8, 7, 6, 5, 4, 3, 2]);
    }
}
