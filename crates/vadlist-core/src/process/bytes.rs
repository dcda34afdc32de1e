//! Fixed-offset access to little-endian binary blocks.
//!
//! `ByteBuffer` reads fields out of a node block or a flattened region list.
//! `ByteWriter` is its counterpart for the serializer. Every access is
//! bounds-checked against the underlying slice.

use encoding_rs::UTF_16LE;
use tracing::debug;

use crate::error::{Error, Result};

/// Read-only view over a binary block, addressed by offset.
///
/// # Example
///
/// ```
/// use vadlist_core::process::ByteBuffer;
///
/// let data = [0x78, 0x56, 0x34, 0x12, 0x00, 0x00, 0x00, 0x80];
/// let buf = ByteBuffer::new(&data);
///
/// assert_eq!(buf.read_u32_at(0).unwrap(), 0x12345678);
/// assert_eq!(buf.read_u8_at(7).unwrap(), 0x80);
/// assert!(buf.read_u64_at(4).is_err());
/// ```
#[derive(Debug, Clone, Copy)]
pub struct ByteBuffer<'a> {
    data: &'a [u8],
}

impl<'a> ByteBuffer<'a> {
    pub fn new(data: &'a [u8]) -> Self {
        Self { data }
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Borrow `len` bytes starting at `offset`.
    ///
    /// # Errors
    ///
    /// `CorruptBuffer` if the range does not lie inside the block.
    pub fn slice_at(&self, offset: usize, len: usize) -> Result<&'a [u8]> {
        offset
            .checked_add(len)
            .and_then(|end| self.data.get(offset..end))
            .ok_or_else(|| {
                Error::CorruptBuffer(format!(
                    "Range +{:#x}..+{:#x} outside {}-byte block",
                    offset,
                    offset.saturating_add(len),
                    self.data.len()
                ))
            })
    }

    fn array_at<const N: usize>(&self, offset: usize) -> Result<[u8; N]> {
        let mut out = [0u8; N];
        out.copy_from_slice(self.slice_at(offset, N)?);
        Ok(out)
    }

    pub fn read_u8_at(&self, offset: usize) -> Result<u8> {
        Ok(self.array_at::<1>(offset)?[0])
    }

    pub fn read_u16_at(&self, offset: usize) -> Result<u16> {
        self.array_at(offset).map(u16::from_le_bytes)
    }

    pub fn read_u32_at(&self, offset: usize) -> Result<u32> {
        self.array_at(offset).map(u32::from_le_bytes)
    }

    pub fn read_u64_at(&self, offset: usize) -> Result<u64> {
        self.array_at(offset).map(u64::from_le_bytes)
    }
}

/// A bounds-checked little-endian writer over a fixed destination slice.
pub struct ByteWriter<'a> {
    data: &'a mut [u8],
}

impl<'a> ByteWriter<'a> {
    pub fn new(data: &'a mut [u8]) -> Self {
        Self { data }
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Writes raw bytes at `offset`.
    ///
    /// # Errors
    ///
    /// Returns `InsufficientCapacity` if the bytes do not fit.
    pub fn write_bytes_at(&mut self, offset: usize, bytes: &[u8]) -> Result<()> {
        let available = self.data.len() as u64;
        let target = offset
            .checked_add(bytes.len())
            .and_then(|end| self.data.get_mut(offset..end))
            .ok_or(Error::InsufficientCapacity {
                required: offset as u64 + bytes.len() as u64,
                available,
            })?;
        target.copy_from_slice(bytes);
        Ok(())
    }

    pub fn write_u32_at(&mut self, offset: usize, value: u32) -> Result<()> {
        self.write_bytes_at(offset, &value.to_le_bytes())
    }

    pub fn write_u64_at(&mut self, offset: usize, value: u64) -> Result<()> {
        self.write_bytes_at(offset, &value.to_le_bytes())
    }

    /// Zero-fills `offset..` to the end of the destination.
    pub fn zero_from(&mut self, offset: usize) {
        if let Some(tail) = self.data.get_mut(offset..) {
            tail.fill(0);
        }
    }
}

/// Decodes UTF-16LE bytes to `String`, stopping at the first NUL code unit.
pub fn decode_utf16le(bytes: &[u8]) -> String {
    let len = bytes
        .chunks_exact(2)
        .position(|unit| unit == [0, 0])
        .map_or(bytes.len() & !1, |units| units * 2);

    let (decoded, had_errors) = UTF_16LE.decode_without_bom_handling(&bytes[..len]);
    if had_errors {
        debug!("Lossy UTF-16 name: {:02x?}", &bytes[..len.min(20)]);
    }
    decoded.into_owned()
}

/// Encodes a string as UTF-16LE bytes without a terminator.
pub fn encode_utf16le(text: &str) -> Vec<u8> {
    text.encode_utf16().flat_map(u16::to_le_bytes).collect()
}
