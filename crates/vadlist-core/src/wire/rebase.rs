//! Link rebasing between the engine's view of a buffer and the caller's.

use crate::error::{Error, Result};

/// Translates offsets and local addresses into caller-visible links.
///
/// Links inside a flattened list are caller addresses. The engine may see
/// the same bytes at a different address, so every link is derived from an
/// offset and never from an engine-side pointer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Rebaser {
    caller_base: u64,
    local_base: u64,
    capacity: u64,
}

impl Rebaser {
    /// # Errors
    ///
    /// `InvalidInput` for a null caller base or when `caller_base + capacity`
    /// overflows the address space.
    pub fn new(caller_base: u64, local_base: u64, capacity: u64) -> Result<Self> {
        if caller_base == 0 {
            return Err(Error::InvalidInput("Null destination base".to_string()));
        }
        if caller_base.checked_add(capacity).is_none() {
            return Err(Error::InvalidInput(format!(
                "Destination {:#x}+{:#x} wraps the address space",
                caller_base, capacity
            )));
        }
        Ok(Self {
            caller_base,
            local_base,
            capacity,
        })
    }

    pub fn caller_base(&self) -> u64 {
        self.caller_base
    }

    /// Caller link for a byte offset into the buffer.
    pub fn link_at(&self, offset: usize) -> Result<u64> {
        let offset = offset as u64;
        if offset >= self.capacity {
            return Err(Error::InsufficientCapacity {
                required: offset + 1,
                available: self.capacity,
            });
        }
        Ok(self.caller_base + offset)
    }

    /// Caller link for an address inside the engine's mapping of the buffer.
    pub fn translate(&self, local_address: u64) -> Result<u64> {
        let offset = local_address
            .checked_sub(self.local_base)
            .filter(|&offset| offset < self.capacity)
            .ok_or_else(|| {
                Error::InvalidInput(format!(
                    "Address {:#x} outside local buffer at {:#x}",
                    local_address, self.local_base
                ))
            })?;
        self.link_at(offset as usize)
    }

    /// Byte offset a caller link points at.
    pub fn offset_of(&self, link: u64) -> Option<usize> {
        link.checked_sub(self.caller_base)
            .filter(|&offset| offset < self.capacity)
            .map(|offset| offset as usize)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_link_at() {
        let rebaser = Rebaser::new(0x7FF0_0000_0000, 0xFFFF_9000_0000_0000, 0x2000).unwrap();
        assert_eq!(rebaser.link_at(0x38).unwrap(), 0x7FF0_0000_0038);
        assert!(rebaser.link_at(0x2000).is_err());
    }

    #[test]
    fn test_translate_local_address() {
        let rebaser = Rebaser::new(0x10000, 0xFFFF_9000_0000_0000, 0x1000).unwrap();
        assert_eq!(rebaser.translate(0xFFFF_9000_0000_0090).unwrap(), 0x10090);
        assert!(rebaser.translate(0x10).is_err());
        assert!(rebaser.translate(0xFFFF_9000_0000_1000).is_err());
    }

    #[test]
    fn test_offset_of_round_trips() {
        let rebaser = Rebaser::new(0x10000, 0, 0x1000).unwrap();
        assert_eq!(rebaser.offset_of(rebaser.link_at(0x90).unwrap()), Some(0x90));
        assert_eq!(rebaser.offset_of(0xFFFF), None);
        assert_eq!(rebaser.offset_of(0x11000), None);
    }

    #[test]
    fn test_rejects_bad_bases() {
        assert!(matches!(
            Rebaser::new(0, 0, 0x1000),
            Err(Error::InvalidInput(_))
        ));
        assert!(matches!(
            Rebaser::new(u64::MAX - 0x10, 0, 0x1000),
            Err(Error::InvalidInput(_))
        ));
    }
}
