//! Reader for a flattened region list, as seen by the caller.
//!
//! Only the caller's base address is needed: every link is turned back into
//! an offset and bounds-checked before anything is read through it.

use serde::Serialize;

use crate::error::{Error, Result};
use crate::process::ByteBuffer;
use crate::vad::{Backing, FileName, RegionFlags, RegionRecord};
use crate::wire::format::{ENTRY_SIZE, HEADER_SIZE, NULL_LINK, entry, header};

/// Summary fields at the start of a flattened list.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ListHeader {
    pub size: u64,
    pub max_depth: u32,
    pub node_count: u32,
    pub total_private_commit: u64,
    pub total_shared_commit: u64,
    pub process: u64,
    pub first: u64,
    pub last: u64,
}

impl ListHeader {
    pub fn parse(bytes: &[u8]) -> Result<Self> {
        if bytes.len() < HEADER_SIZE {
            return Err(Error::CorruptBuffer(format!(
                "{} bytes cannot hold a {}-byte header",
                bytes.len(),
                HEADER_SIZE
            )));
        }
        let buf = ByteBuffer::new(bytes);
        Ok(Self {
            size: buf.read_u64_at(header::SIZE)?,
            max_depth: buf.read_u32_at(header::MAX_DEPTH)?,
            node_count: buf.read_u32_at(header::NODE_COUNT)?,
            total_private_commit: buf.read_u64_at(header::TOTAL_PRIVATE_COMMIT)?,
            total_shared_commit: buf.read_u64_at(header::TOTAL_SHARED_COMMIT)?,
            process: buf.read_u64_at(header::PROCESS)?,
            first: buf.read_u64_at(header::FIRST)?,
            last: buf.read_u64_at(header::LAST)?,
        })
    }
}

/// Decoded flattened list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RegionList {
    pub header: ListHeader,
    records: Vec<RegionRecord>,
}

impl RegionList {
    /// Decode `bytes`, which the producer was told live at `caller_base`.
    ///
    /// # Errors
    ///
    /// `CorruptBuffer` when the header size exceeds `bytes`, a link points
    /// outside the list or backwards, an envelope or name runs past the
    /// list, or the record count disagrees with the header.
    pub fn parse(bytes: &[u8], caller_base: u64) -> Result<Self> {
        let header = ListHeader::parse(bytes)?;
        let size = usize::try_from(header.size)
            .ok()
            .filter(|&size| size >= HEADER_SIZE && size <= bytes.len())
            .ok_or_else(|| {
                Error::CorruptBuffer(format!(
                    "Header size {} outside {}..={}",
                    header.size,
                    HEADER_SIZE,
                    bytes.len()
                ))
            })?;
        let buf = ByteBuffer::new(&bytes[..size]);

        let mut records = Vec::with_capacity(header.node_count as usize);
        let mut link = header.first;
        let mut min_offset = HEADER_SIZE;
        let mut last_link = NULL_LINK;
        while link != NULL_LINK {
            let offset = link
                .checked_sub(caller_base)
                .and_then(|offset| usize::try_from(offset).ok())
                .filter(|&offset| offset >= min_offset && offset < size)
                .ok_or_else(|| {
                    Error::CorruptBuffer(format!(
                        "Link {:#x} outside list at {:#x} (+{:#x}..{:#x})",
                        link, caller_base, min_offset, size
                    ))
                })?;
            if records.len() == header.node_count as usize {
                return Err(Error::CorruptBuffer(format!(
                    "More records than the {} announced",
                    header.node_count
                )));
            }

            let (record, end) = read_entry(&buf, offset)?;
            records.push(record);
            last_link = link;
            min_offset = end;
            link = buf.read_u64_at(offset + entry::NEXT)?;
        }

        if records.len() != header.node_count as usize {
            return Err(Error::CorruptBuffer(format!(
                "Decoded {} records, header announces {}",
                records.len(),
                header.node_count
            )));
        }
        if last_link != header.last {
            return Err(Error::CorruptBuffer(format!(
                "Last link {:#x} does not match header {:#x}",
                last_link, header.last
            )));
        }

        Ok(Self { header, records })
    }

    pub fn records(&self) -> &[RegionRecord] {
        &self.records
    }

    pub fn iter(&self) -> std::slice::Iter<'_, RegionRecord> {
        self.records.iter()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn into_records(self) -> Vec<RegionRecord> {
        self.records
    }
}

impl<'a> IntoIterator for &'a RegionList {
    type Item = &'a RegionRecord;
    type IntoIter = std::slice::Iter<'a, RegionRecord>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

/// Read one envelope at `offset`; returns the record and the offset past it.
fn read_entry(buf: &ByteBuffer<'_>, offset: usize) -> Result<(RegionRecord, usize)> {
    let envelope = buf.slice_at(offset, ENTRY_SIZE)?;
    let envelope = ByteBuffer::new(envelope);

    let name_len = envelope.read_u32_at(entry::NAME_LEN)? as usize;
    let entry_size = envelope.read_u64_at(entry::ENTRY_SIZE)?;
    if entry_size != (ENTRY_SIZE + name_len) as u64 {
        return Err(Error::CorruptBuffer(format!(
            "Entry at +{:#x} reports size {} for a {}-byte name",
            offset, entry_size, name_len
        )));
    }
    let name = buf.slice_at(offset + ENTRY_SIZE, name_len)?;

    let backing = match envelope.read_u32_at(entry::BACKING_KIND)? {
        0 => Backing::Private,
        1 => Backing::File {
            name: FileName::from_utf16le(name.to_vec()),
        },
        2 => Backing::Pagefile {
            committed_pages: envelope.read_u64_at(entry::COMMITTED_PAGES)?,
        },
        kind => {
            return Err(Error::CorruptBuffer(format!(
                "Unknown backing kind {} at +{:#x}",
                kind, offset
            )));
        }
    };

    let record = RegionRecord {
        identity: envelope.read_u64_at(entry::IDENTITY)?,
        depth: envelope.read_u32_at(entry::DEPTH)?,
        start_vpn: envelope.read_u64_at(entry::START_VPN)?,
        end_vpn: envelope.read_u64_at(entry::END_VPN)?,
        flags: RegionFlags::new(
            envelope.read_u32_at(entry::VAD)?,
            envelope.read_u32_at(entry::VAD1)?,
            envelope.read_u32_at(entry::VAD2)?,
        ),
        commit_charge: envelope.read_u64_at(entry::COMMIT_CHARGE)?,
        backing,
    };
    Ok((record, offset + ENTRY_SIZE + name_len))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::vad::fixture::{NodeSpec, TreeFixture};
    use crate::vad::{VadTable, walk};
    use crate::wire::estimate::estimate_size;
    use crate::wire::serializer::serialize;

    const CALLER_BASE: u64 = 0x2_0000_0000;

    fn table() -> VadTable {
        let mut fixture = TreeFixture::new();
        let root = fixture.add_node(NodeSpec::private(0x1000, 0x2000));
        let left = fixture.add_node(NodeSpec::mapped_file(0x5000, 0x6000, "C:\\a.dll"));
        let right = fixture.add_node(NodeSpec::pagefile(0x9000, 0xA000, 12));
        fixture.set_left(root, left);
        fixture.set_right(root, right);
        let process = fixture.process();
        walk(&process, fixture.layout(), 0xFFFF_8000_0000_1000, root).unwrap()
    }

    fn flattened(table: &VadTable) -> Vec<u8> {
        let mut bytes = vec![0; estimate_size(table) as usize];
        serialize(table, &mut bytes, CALLER_BASE).unwrap();
        bytes
    }

    #[test]
    fn test_parse_matches_table() {
        let table = table();
        let list = RegionList::parse(&flattened(&table), CALLER_BASE).unwrap();

        assert_eq!(list.header.node_count, 3);
        assert_eq!(list.header.process, 0xFFFF_8000_0000_1000);
        let expected: Vec<_> = table.records().cloned().collect();
        assert_eq!(list.records(), expected.as_slice());
    }

    #[test]
    fn test_wrong_base_is_rejected() {
        let table = table();
        let err = RegionList::parse(&flattened(&table), CALLER_BASE + 0x1000).unwrap_err();
        assert!(matches!(err, Error::CorruptBuffer(_)));
    }

    #[test]
    fn test_backward_link_is_rejected() {
        let table = table();
        let mut bytes = flattened(&table);
        // Point the first record back at itself.
        let first = (CALLER_BASE + HEADER_SIZE as u64).to_le_bytes();
        bytes[HEADER_SIZE + entry::NEXT..HEADER_SIZE + entry::NEXT + 8].copy_from_slice(&first);

        let err = RegionList::parse(&bytes, CALLER_BASE).unwrap_err();
        assert!(matches!(err, Error::CorruptBuffer(_)));
    }

    #[test]
    fn test_oversized_header_is_rejected() {
        let table = table();
        let mut bytes = flattened(&table);
        bytes[..8].copy_from_slice(&0x10_0000u64.to_le_bytes());

        let err = RegionList::parse(&bytes, CALLER_BASE).unwrap_err();
        assert!(matches!(err, Error::CorruptBuffer(_)));
    }

    #[test]
    fn test_count_mismatch_is_rejected() {
        let table = table();
        let mut bytes = flattened(&table);
        bytes[header::NODE_COUNT..header::NODE_COUNT + 4].copy_from_slice(&4u32.to_le_bytes());

        let err = RegionList::parse(&bytes, CALLER_BASE).unwrap_err();
        assert!(matches!(err, Error::CorruptBuffer(_)));
    }

    #[test]
    fn test_short_buffer() {
        let err = RegionList::parse(&[0; 8], CALLER_BASE).unwrap_err();
        assert!(matches!(err, Error::CorruptBuffer(_)));
    }
}
