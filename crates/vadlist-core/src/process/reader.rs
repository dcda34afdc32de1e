use crate::error::{Error, Result};

/// Read access to the target's memory.
///
/// This is the engine's only way into the walked process. Live sources,
/// memory images and test mocks all implement it.
pub trait ReadMemory {
    /// Read exactly `size` bytes at `address`.
    ///
    /// Partial reads are errors; implementations report unreadable memory
    /// as `Error::MemoryReadFailed`.
    fn read_bytes(&self, address: u64, size: usize) -> Result<Vec<u8>>;

    fn read_u16(&self, address: u64) -> Result<u16> {
        read_array(self, address).map(u16::from_le_bytes)
    }

    fn read_u32(&self, address: u64) -> Result<u32> {
        read_array(self, address).map(u32::from_le_bytes)
    }

    fn read_u64(&self, address: u64) -> Result<u64> {
        read_array(self, address).map(u64::from_le_bytes)
    }
}

fn read_array<R: ReadMemory + ?Sized, const N: usize>(reader: &R, address: u64) -> Result<[u8; N]> {
    let bytes = reader.read_bytes(address, N)?;
    bytes.try_into().map_err(|bytes: Vec<u8>| Error::MemoryReadFailed {
        address,
        message: format!("Short read: {} of {} bytes", bytes.len(), N),
    })
}

impl<T: ReadMemory + ?Sized> ReadMemory for &T {
    fn read_bytes(&self, address: u64, size: usize) -> Result<Vec<u8>> {
        (**self).read_bytes(address, size)
    }
}
