//! Region descriptor decoding.
//!
//! One node is read as a single block and parsed at the layout's offsets.
//! Mapped views additionally follow Subsection -> ControlArea -> FileObject
//! to resolve the backing file name, or fall back to the control area's
//! committed page count for pagefile-backed sections.

use tracing::debug;

use crate::config::NodeLayout;
use crate::config::names::MAX_FILE_NAME_BYTES;
use crate::error::{Error, Result};
use crate::process::{ByteBuffer, ReadMemory};
use crate::vad::flags::{Ownership, RegionFlags};
use crate::vad::record::{Backing, FileName, RegionRecord};

/// Low bits of an `EX_FAST_REF` hold the reference count.
const FAST_REF_MASK: u64 = !0xF;

/// `CommittedPageCount` occupies the low 36 bits of `CONTROL_AREA::u3`.
const COMMITTED_PAGES_MASK: u64 = (1 << 36) - 1;

/// Width of the `UNICODE_STRING` header before its buffer pointer.
const UNICODE_STRING_BUFFER: u64 = 8;

/// A decoded node plus the raw addresses of its children (0 if absent).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecodedNode {
    pub record: RegionRecord,
    pub left: u64,
    pub right: u64,
}

/// Merge a 32-bit low field with an 8-bit high extension shifted by `shift`.
pub fn merge_high(low: u64, high: u8, shift: u32) -> u64 {
    if high != 0 {
        low | (u64::from(high) << shift)
    } else {
        low
    }
}

/// Address of the field at `offset` inside the object at `base`.
///
/// `base` comes from target memory, so a corrupt pointer near the top of
/// the address space is reported as unreadable rather than wrapping.
pub(crate) fn field_addr(base: u64, offset: u64) -> Result<u64> {
    base.checked_add(offset).ok_or_else(|| Error::MemoryReadFailed {
        address: base,
        message: format!("Field +{:#x} lies past the end of the address space", offset),
    })
}

fn field(offset: u64) -> usize {
    offset as usize
}

/// Decode the node at `address` at the given tree depth.
///
/// # Errors
///
/// - `InvalidInput` when `address` is null.
/// - `MemoryReadFailed` when the node, its section objects or its file name
///   cannot be read, or when the node's page range is inverted. No partial
///   record is produced.
pub fn decode_node<R: ReadMemory>(
    reader: &R,
    layout: &NodeLayout,
    address: u64,
    depth: u32,
) -> Result<DecodedNode> {
    if address == 0 {
        return Err(Error::InvalidInput("Null VAD node".to_string()));
    }

    let block = reader.read_bytes(address, layout.node_size as usize)?;
    let buf = ByteBuffer::new(&block);

    let left = buf.read_u64_at(field(layout.node_left))?;
    let right = buf.read_u64_at(field(layout.node_right))?;

    let start_vpn = merge_high(
        u64::from(buf.read_u32_at(field(layout.starting_vpn))?),
        buf.read_u8_at(field(layout.starting_vpn_high))?,
        32,
    );
    // The node stores the last page; records use an exclusive end.
    let last_vpn = merge_high(
        u64::from(buf.read_u32_at(field(layout.ending_vpn))?),
        buf.read_u8_at(field(layout.ending_vpn_high))?,
        32,
    );
    if last_vpn < start_vpn {
        return Err(Error::MemoryReadFailed {
            address,
            message: format!(
                "Inverted page range {:#x}..={:#x}",
                start_vpn, last_vpn
            ),
        });
    }

    let flags = RegionFlags::new(
        buf.read_u32_at(field(layout.vad_flags))?,
        buf.read_u32_at(field(layout.vad_flags1))?,
        buf.read_u32_at(field(layout.vad_flags2))?,
    );

    let backing = match flags.ownership() {
        Ownership::Private => Backing::Private,
        Ownership::Shared => {
            let subsection = buf.read_u64_at(field(layout.subsection))?;
            decode_section_backing(reader, layout, subsection)?
        }
    };

    let commit_charge = merge_high(
        u64::from(flags.commit_charge_low()),
        buf.read_u8_at(field(layout.commit_charge_high))?,
        31,
    );

    let record = RegionRecord {
        identity: address,
        depth,
        start_vpn,
        end_vpn: last_vpn + 1,
        flags,
        commit_charge,
        backing,
    };
    debug!(
        "Decoded VAD {:#x}: depth={} vpn={:#x}..{:#x} {}",
        address, depth, record.start_vpn, record.end_vpn, record.flags.ownership()
    );

    Ok(DecodedNode {
        record,
        left,
        right,
    })
}

fn decode_section_backing<R: ReadMemory>(
    reader: &R,
    layout: &NodeLayout,
    subsection: u64,
) -> Result<Backing> {
    if subsection == 0 {
        return Ok(Backing::Pagefile { committed_pages: 0 });
    }

    let control_area = reader.read_u64(field_addr(subsection, layout.subsection_control_area)?)?;
    if control_area == 0 {
        return Ok(Backing::Pagefile { committed_pages: 0 });
    }

    let file_object = reader
        .read_u64(field_addr(control_area, layout.control_area_file_pointer)?)?
        & FAST_REF_MASK;
    if file_object != 0 {
        let name = read_file_name(reader, field_addr(file_object, layout.file_object_name)?)?;
        return Ok(Backing::File { name });
    }

    let committed_pages = reader
        .read_u64(field_addr(control_area, layout.control_area_committed_pages)?)?
        & COMMITTED_PAGES_MASK;
    Ok(Backing::Pagefile { committed_pages })
}

/// Read a `UNICODE_STRING` and copy exactly its reported length.
fn read_file_name<R: ReadMemory>(reader: &R, address: u64) -> Result<FileName> {
    let length = (reader.read_u16(address)? as usize).min(MAX_FILE_NAME_BYTES) & !1;
    if length == 0 {
        return Ok(FileName::default());
    }

    let buffer = reader.read_u64(field_addr(address, UNICODE_STRING_BUFFER)?)?;
    if buffer == 0 {
        return Err(Error::MemoryReadFailed {
            address,
            message: format!("File name of {} bytes has a null buffer", length),
        });
    }

    Ok(FileName::from_utf16le(reader.read_bytes(buffer, length)?))
}
