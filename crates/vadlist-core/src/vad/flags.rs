//! VAD flag words and their interpretation.
//!
//! The three flag words are kept exactly as read from the node. Nothing here
//! alters them; the enums below only interpret bits for display.
//!
//! ```text
//! MMVAD_FLAGS (vad)
//! bits 0-3    Lock, LockContended, DeleteInProgress, NoChange
//! bits 4-6    VadType
//! bits 7-11   Protection (3-bit base + 2-bit modifier)
//! bits 12-17  PreferredNode
//! bits 18-19  PageSize
//! bit  20     PrivateMemory
//!
//! MMVAD_FLAGS1 (vad1)
//! bits 0-30   CommitCharge (low part)
//! bit  31     MemCommit
//!
//! MMVAD_FLAGS2 (vad2)
//! bits 0-23   FileOffset
//! bit  24     Large
//! bit  25     TrimBehind
//! bit  26     Inherit
//! bit  27     NoValidationNeeded
//! bit  28     PrivateDemandZero
//! ```

use serde::{Deserialize, Serialize};
use strum::{FromRepr, IntoStaticStr};

/// Whether a region's pages are private to the process or mapped from a section.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default, IntoStaticStr,
)]
pub enum Ownership {
    #[default]
    #[strum(serialize = "Private")]
    Private,
    #[strum(serialize = "Mapped")]
    Shared,
}

impl std::fmt::Display for Ownership {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name: &'static str = self.into();
        write!(f, "{}", name)
    }
}

#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    Default,
    FromRepr,
    IntoStaticStr,
)]
#[repr(u8)]
pub enum VadType {
    #[default]
    #[strum(serialize = "")]
    None = 0,
    #[strum(serialize = "Phys")]
    DevicePhysicalMemory = 1,
    #[strum(serialize = "Exe")]
    ImageMap = 2,
    #[strum(serialize = "AWE")]
    Awe = 3,
    #[strum(serialize = "WrtWatch")]
    WriteWatch = 4,
    #[strum(serialize = "LargePag")]
    LargePages = 5,
    #[strum(serialize = "Rotate")]
    RotatePhysical = 6,
    #[strum(serialize = "LargePagSec")]
    LargePageSection = 7,
}

impl VadType {
    pub fn from_u8(value: u8) -> Option<Self> {
        Self::from_repr(value)
    }

    pub fn short_name(&self) -> &'static str {
        self.into()
    }
}

impl std::fmt::Display for VadType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.short_name())
    }
}

/// The low three protection bits.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    Default,
    FromRepr,
    IntoStaticStr,
)]
#[repr(u8)]
pub enum BaseProtection {
    #[default]
    #[strum(serialize = "ZERO_ACCESS")]
    ZeroAccess = 0,
    #[strum(serialize = "READONLY")]
    ReadOnly = 1,
    #[strum(serialize = "EXECUTE")]
    Execute = 2,
    #[strum(serialize = "EXECUTE_READ")]
    ExecuteRead = 3,
    #[strum(serialize = "READWRITE")]
    ReadWrite = 4,
    #[strum(serialize = "WRITECOPY")]
    WriteCopy = 5,
    #[strum(serialize = "EXECUTE_READWRITE")]
    ExecuteReadWrite = 6,
    #[strum(serialize = "EXECUTE_WRITECOPY")]
    ExecuteWriteCopy = 7,
}

impl BaseProtection {
    pub fn is_writable(&self) -> bool {
        (*self as u8) & 0b100 != 0
    }

    pub fn is_executable(&self) -> bool {
        (*self as u8) & 0b010 != 0
    }

    pub fn is_copy_on_write(&self) -> bool {
        matches!(self, Self::WriteCopy | Self::ExecuteWriteCopy)
    }
}

/// The upper two protection bits.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, FromRepr, IntoStaticStr,
)]
#[repr(u8)]
pub enum ProtectionModifier {
    #[strum(serialize = "NOCACHE")]
    NoCache = 1,
    #[strum(serialize = "GUARD_PAGE")]
    GuardPage = 2,
    #[strum(serialize = "NO_ACCESS")]
    NoAccess = 3,
}

/// Decoded 5-bit protection code.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub struct Protection {
    pub base: BaseProtection,
    pub modifier: Option<ProtectionModifier>,
}

impl Protection {
    pub fn from_bits(bits: u8) -> Self {
        let base = BaseProtection::from_repr(bits & 0b111).unwrap_or_default();
        let modifier = ProtectionModifier::from_repr((bits >> 3) & 0b11);
        Self { base, modifier }
    }
}

impl std::fmt::Display for Protection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let base: &'static str = self.base.into();
        match self.modifier {
            Some(modifier) => {
                let modifier: &'static str = modifier.into();
                write!(f, "{} {}", base, modifier)
            }
            None => write!(f, "{}", base),
        }
    }
}

/// The three raw flag words of one node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct RegionFlags {
    pub vad: u32,
    pub vad1: u32,
    pub vad2: u32,
}

impl RegionFlags {
    const VAD_TYPE_SHIFT: u32 = 4;
    const PROTECTION_SHIFT: u32 = 7;
    const PREFERRED_NODE_SHIFT: u32 = 12;
    const PAGE_SIZE_SHIFT: u32 = 18;
    const PRIVATE_MEMORY_BIT: u32 = 1 << 20;

    /// Mask of the low commit charge bits in `vad1`.
    pub const COMMIT_CHARGE_MASK: u32 = 0x7FFF_FFFF;
    const MEM_COMMIT_BIT: u32 = 1 << 31;

    const FILE_OFFSET_MASK: u32 = 0x00FF_FFFF;
    const LARGE_BIT: u32 = 1 << 24;
    const TRIM_BEHIND_BIT: u32 = 1 << 25;
    const INHERIT_BIT: u32 = 1 << 26;
    const NO_VALIDATION_NEEDED_BIT: u32 = 1 << 27;
    const PRIVATE_DEMAND_ZERO_BIT: u32 = 1 << 28;

    pub fn new(vad: u32, vad1: u32, vad2: u32) -> Self {
        Self { vad, vad1, vad2 }
    }

    pub fn ownership(&self) -> Ownership {
        if self.vad & Self::PRIVATE_MEMORY_BIT != 0 {
            Ownership::Private
        } else {
            Ownership::Shared
        }
    }

    pub fn is_private(&self) -> bool {
        self.ownership() == Ownership::Private
    }

    pub fn vad_type(&self) -> VadType {
        VadType::from_u8(((self.vad >> Self::VAD_TYPE_SHIFT) & 0b111) as u8).unwrap_or_default()
    }

    pub fn protection_bits(&self) -> u8 {
        ((self.vad >> Self::PROTECTION_SHIFT) & 0x1F) as u8
    }

    pub fn protection(&self) -> Protection {
        Protection::from_bits(self.protection_bits())
    }

    pub fn preferred_node(&self) -> u8 {
        ((self.vad >> Self::PREFERRED_NODE_SHIFT) & 0x3F) as u8
    }

    pub fn page_size(&self) -> u8 {
        ((self.vad >> Self::PAGE_SIZE_SHIFT) & 0b11) as u8
    }

    pub fn commit_charge_low(&self) -> u32 {
        self.vad1 & Self::COMMIT_CHARGE_MASK
    }

    pub fn mem_commit(&self) -> bool {
        self.vad1 & Self::MEM_COMMIT_BIT != 0
    }

    pub fn file_offset(&self) -> u32 {
        self.vad2 & Self::FILE_OFFSET_MASK
    }

    pub fn large(&self) -> bool {
        self.vad2 & Self::LARGE_BIT != 0
    }

    pub fn trim_behind(&self) -> bool {
        self.vad2 & Self::TRIM_BEHIND_BIT != 0
    }

    pub fn inherit(&self) -> bool {
        self.vad2 & Self::INHERIT_BIT != 0
    }

    pub fn no_validation_needed(&self) -> bool {
        self.vad2 & Self::NO_VALIDATION_NEEDED_BIT != 0
    }

    pub fn private_demand_zero(&self) -> bool {
        self.vad2 & Self::PRIVATE_DEMAND_ZERO_BIT != 0
    }

    /// Build a `vad` word from its interpreted parts.
    pub fn compose_vad(vad_type: VadType, protection_bits: u8, private: bool) -> u32 {
        let mut vad = ((vad_type as u32) << Self::VAD_TYPE_SHIFT)
            | (((protection_bits & 0x1F) as u32) << Self::PROTECTION_SHIFT);
        if private {
            vad |= Self::PRIVATE_MEMORY_BIT;
        }
        vad
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mapped_image_flags() {
        // ImageMap, EXECUTE_WRITECOPY, shared
        let flags = RegionFlags::new(RegionFlags::compose_vad(VadType::ImageMap, 7, false), 0, 0);

        assert_eq!(flags.ownership(), Ownership::Shared);
        assert_eq!(flags.vad_type(), VadType::ImageMap);
        assert_eq!(flags.protection().base, BaseProtection::ExecuteWriteCopy);
        assert!(flags.protection().modifier.is_none());
    }

    #[test]
    fn test_raw_bits_are_preserved() {
        let flags = RegionFlags::new(0xFFFF_FFFF, 0x8000_0003, 0x1F00_0010);

        assert!(flags.is_private());
        assert_eq!(flags.vad_type(), VadType::LargePageSection);
        assert_eq!(flags.preferred_node(), 0x3F);
        assert_eq!(flags.page_size(), 3);
        assert_eq!(flags.commit_charge_low(), 3);
        assert!(flags.mem_commit());
        assert_eq!(flags.file_offset(), 0x10);
        assert!(flags.large() && flags.trim_behind() && flags.inherit());
        assert!(flags.no_validation_needed() && flags.private_demand_zero());
        assert_eq!(flags.vad, 0xFFFF_FFFF);
    }

    #[test]
    fn test_protection_modifiers() {
        assert_eq!(Protection::from_bits(0x04).to_string(), "READWRITE");
        assert_eq!(Protection::from_bits(0x0C).to_string(), "READWRITE NOCACHE");
        assert_eq!(Protection::from_bits(0x14).to_string(), "READWRITE GUARD_PAGE");
        assert_eq!(Protection::from_bits(0x18).to_string(), "ZERO_ACCESS NO_ACCESS");
    }

    #[test]
    fn test_base_protection_masks() {
        assert!(BaseProtection::ExecuteReadWrite.is_writable());
        assert!(BaseProtection::ExecuteReadWrite.is_executable());
        assert!(!BaseProtection::ReadOnly.is_writable());
        assert!(BaseProtection::WriteCopy.is_copy_on_write());
    }

    #[test]
    fn test_vad_type_labels() {
        assert_eq!(VadType::ImageMap.short_name(), "Exe");
        assert_eq!(VadType::None.to_string(), "");
        assert_eq!(VadType::from_u8(8), None);
        assert_eq!(Ownership::Shared.to_string(), "Mapped");
    }
}
