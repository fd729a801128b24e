use std::ops::Range;

use crate::{Error, OwnedBytes, Pointer};

/// Boundary between the probe logic and whatever provides access to the
/// target's address space.
///
/// Implementations make no safety guarantees beyond returning an error
/// for addresses they cannot service.  Callers must treat every read as
/// fallible; an address that was valid a moment ago may have been
/// unmapped by the target in the meantime.
pub trait MemoryAccess {
    fn read_bytes(&self, range: Range<Pointer>) -> Result<OwnedBytes, Error>;

    fn write_bytes(&self, ptr: Pointer, bytes: &[u8]) -> Result<(), Error>;

    fn is_readable(&self, ptr: Pointer) -> bool;

    fn is_executable(&self, ptr: Pointer) -> bool;

    fn read_byte_array<const N: usize>(
        &self,
        ptr: Pointer,
    ) -> Result<[u8; N], Error> {
        let bytes = self.read_bytes(ptr..ptr.try_add(N)?)?;
        let mut buffer = [0u8; N];
        buffer.copy_from_slice(&bytes);
        Ok(buffer)
    }

    /// Guarded read for probing unconfirmed memory.  Never surfaces a
    /// fault to the caller.
    fn try_read_bytes(&self, range: Range<Pointer>) -> Option<OwnedBytes> {
        self.read_bytes(range).ok()
    }
}

/// Probe callbacks share one accessor across threads, so the common
/// wrappers delegate.
impl<T: MemoryAccess + ?Sized> MemoryAccess for std::sync::Arc<T> {
    fn read_bytes(&self, range: Range<Pointer>) -> Result<OwnedBytes, Error> {
        (**self).read_bytes(range)
    }

    fn write_bytes(&self, ptr: Pointer, bytes: &[u8]) -> Result<(), Error> {
        (**self).write_bytes(ptr, bytes)
    }

    fn is_readable(&self, ptr: Pointer) -> bool {
        (**self).is_readable(ptr)
    }

    fn is_executable(&self, ptr: Pointer) -> bool {
        (**self).is_executable(ptr)
    }
}

impl<T: MemoryAccess + ?Sized> MemoryAccess for &T {
    fn read_bytes(&self, range: Range<Pointer>) -> Result<OwnedBytes, Error> {
        (**self).read_bytes(range)
    }

    fn write_bytes(&self, ptr: Pointer, bytes: &[u8]) -> Result<(), Error> {
        (**self).write_bytes(ptr, bytes)
    }

    fn is_readable(&self, ptr: Pointer) -> bool {
        (**self).is_readable(ptr)
    }

    fn is_executable(&self, ptr: Pointer) -> bool {
        (**self).is_executable(ptr)
    }
}
