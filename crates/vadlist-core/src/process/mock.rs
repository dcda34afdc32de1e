//! In-memory stand-ins for a target process.
//!
//! `MockMemoryReader` serves reads from a flat buffer mapped at a base
//! address; `MockMemoryBuilder` lays that buffer out field by field.
//! `MockProcess` and `MockProcessProvider` put a PID and a process object
//! address in front of it.

use crate::error::{Error, Result};
use crate::process::{ProcessInfo, ProcessProvider, ReadMemory};

/// Base address used when none is given.
const DEFAULT_BASE: u64 = 0x1000;

/// Flat buffer readable at `base..base + len`.
#[derive(Debug, Clone)]
pub struct MockMemoryReader {
    data: Vec<u8>,
    base: u64,
}

impl MockMemoryReader {
    pub fn new(data: Vec<u8>) -> Self {
        Self::with_base(data, DEFAULT_BASE)
    }

    pub fn with_base(data: Vec<u8>, base: u64) -> Self {
        Self { data, base }
    }

    pub fn base(&self) -> u64 {
        self.base
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }
}

impl ReadMemory for MockMemoryReader {
    fn read_bytes(&self, address: u64, size: usize) -> Result<Vec<u8>> {
        address
            .checked_sub(self.base)
            .and_then(|offset| usize::try_from(offset).ok())
            .and_then(|offset| Some(offset..offset.checked_add(size)?))
            .and_then(|range| self.data.get(range))
            .map(<[u8]>::to_vec)
            .ok_or_else(|| Error::MemoryReadFailed {
                address,
                message: format!(
                    "{} bytes not mapped in mock at {:#x}+{:#x}",
                    size,
                    self.base,
                    self.data.len()
                ),
            })
    }
}

/// Field-by-field builder for a `MockMemoryReader`.
///
/// Offsets are relative to the base; the buffer grows as needed.
#[derive(Debug, Clone, Default)]
pub struct MockMemoryBuilder {
    data: Vec<u8>,
    base: u64,
}

impl MockMemoryBuilder {
    pub fn new() -> Self {
        Self {
            data: Vec::new(),
            base: DEFAULT_BASE,
        }
    }

    pub fn base(mut self, base: u64) -> Self {
        self.base = base;
        self
    }

    /// Grow the buffer with zeros to at least `size` bytes.
    pub fn with_size(mut self, size: usize) -> Self {
        if self.data.len() < size {
            self.data.resize(size, 0);
        }
        self
    }

    pub fn write_u8(self, offset: usize, value: u8) -> Self {
        self.write_bytes(offset, &[value])
    }

    pub fn write_u16(self, offset: usize, value: u16) -> Self {
        self.write_bytes(offset, &value.to_le_bytes())
    }

    pub fn write_u32(self, offset: usize, value: u32) -> Self {
        self.write_bytes(offset, &value.to_le_bytes())
    }

    pub fn write_u64(self, offset: usize, value: u64) -> Self {
        self.write_bytes(offset, &value.to_le_bytes())
    }

    pub fn write_bytes(self, offset: usize, bytes: &[u8]) -> Self {
        let mut builder = self.with_size(offset + bytes.len());
        builder.data[offset..offset + bytes.len()].copy_from_slice(bytes);
        builder
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    pub fn build(self) -> MockMemoryReader {
        MockMemoryReader::with_base(self.data, self.base)
    }
}

/// Attached mock process: identity plus its memory view.
#[derive(Debug, Clone)]
pub struct MockProcess {
    pub pid: u32,
    pub object_address: u64,
    pub alive: bool,
    pub memory: MockMemoryReader,
}

impl ProcessInfo for MockProcess {
    fn pid(&self) -> u32 {
        self.pid
    }

    fn object_address(&self) -> u64 {
        self.object_address
    }

    fn is_alive(&self) -> bool {
        self.alive
    }
}

impl ReadMemory for MockProcess {
    fn read_bytes(&self, address: u64, size: usize) -> Result<Vec<u8>> {
        self.memory.read_bytes(address, size)
    }
}

/// Resolves PIDs against a fixed list of mock processes.
#[derive(Debug, Clone, Default)]
pub struct MockProcessProvider {
    processes: Vec<MockProcess>,
}

impl MockProcessProvider {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_process(mut self, process: MockProcess) -> Self {
        self.processes.push(process);
        self
    }
}

impl ProcessProvider for MockProcessProvider {
    type Process = MockProcess;

    fn open_process(&self, pid: u32) -> Result<Self::Process> {
        self.processes
            .iter()
            .find(|p| p.pid == pid)
            .cloned()
            .ok_or_else(|| Error::ProcessNotFound(format!("No mock process with PID {}", pid)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reader_respects_base() {
        let reader = MockMemoryReader::with_base(vec![1, 2, 3, 4], 0xFFFF_8000_0000_0000);

        assert_eq!(
            reader.read_bytes(0xFFFF_8000_0000_0001, 3).unwrap(),
            vec![2, 3, 4]
        );
        assert!(reader.read_bytes(0xFFFF_7FFF_FFFF_FFFF, 1).is_err());
        assert!(reader.read_bytes(0xFFFF_8000_0000_0002, 3).is_err());
    }

    #[test]
    fn test_reader_huge_size() {
        let reader = MockMemoryReader::new(vec![0; 4]);

        assert!(reader.read_bytes(0x1002, usize::MAX).is_err());
    }

    #[test]
    fn test_builder_fields() {
        let reader = MockMemoryBuilder::new()
            .with_size(0x20)
            .write_u32(0, 0x12345678)
            .write_u64(4, 0xDEADBEEFCAFEBABE)
            .write_u8(12, 7)
            .write_u16(0x1E, 0xBEEF)
            .build();

        assert_eq!(reader.len(), 0x20);
        assert_eq!(reader.read_u32(0x1000).unwrap(), 0x12345678);
        assert_eq!(reader.read_u64(0x1004).unwrap(), 0xDEADBEEFCAFEBABE);
        assert_eq!(reader.read_bytes(0x100C, 1).unwrap(), vec![7]);
        assert_eq!(reader.read_u16(0x101E).unwrap(), 0xBEEF);
    }

    #[test]
    fn test_provider_lookup() {
        let process = MockProcess {
            pid: 8,
            object_address: 0x1000,
            alive: true,
            memory: MockMemoryReader::new(vec![0; 8]),
        };
        let provider = MockProcessProvider::new().with_process(process);

        assert_eq!(provider.open_process(8).unwrap().object_address(), 0x1000);
        assert!(matches!(
            provider.open_process(12),
            Err(Error::ProcessNotFound(_))
        ));
    }
}
