//! Flattening of a `VadTable` into a caller-supplied buffer.

use tracing::debug;

use crate::error::{Error, Result};
use crate::process::ByteWriter;
use crate::vad::{RegionRecord, VadTable};
use crate::wire::estimate::estimate_size;
use crate::wire::format::{ENTRY_SIZE, HEADER_SIZE, NULL_LINK, entry, header};
use crate::wire::rebase::Rebaser;

/// Write `table` into `dest`, which the caller sees at `caller_base`.
///
/// Returns the number of meaningful bytes (the header's `size` field).
/// Bytes past that point are zeroed up to `estimate_size(table)`; anything
/// in `dest` beyond the estimate is never written.
///
/// # Errors
///
/// - `InvalidInput` for a null `caller_base` or a destination that wraps.
/// - `InsufficientCapacity` when `dest` is smaller than `estimate_size`;
///   `dest` is left untouched in that case.
pub fn serialize(table: &VadTable, dest: &mut [u8], caller_base: u64) -> Result<u64> {
    let local_base = dest.as_ptr() as usize as u64;
    let rebaser = Rebaser::new(caller_base, local_base, dest.len() as u64)?;

    let required = estimate_size(table);
    if (dest.len() as u64) < required {
        return Err(Error::InsufficientCapacity {
            required,
            available: dest.len() as u64,
        });
    }

    let mut out = ByteWriter::new(&mut dest[..required as usize]);
    out.write_u32_at(header::MAX_DEPTH, table.max_depth())?;
    out.write_u32_at(header::NODE_COUNT, table.node_count())?;
    out.write_u64_at(header::TOTAL_PRIVATE_COMMIT, table.total_private_commit())?;
    out.write_u64_at(header::TOTAL_SHARED_COMMIT, table.total_shared_commit())?;
    out.write_u64_at(header::PROCESS, table.process())?;
    out.write_u64_at(header::FIRST, NULL_LINK)?;
    out.write_u64_at(header::LAST, NULL_LINK)?;

    let mut offset = HEADER_SIZE;
    let mut previous: Option<usize> = None;
    for record in table.records() {
        let start = offset;
        let link = rebaser.translate(local_base + start as u64)?;
        let prev_link = match previous {
            Some(prev) => {
                out.write_u64_at(prev + entry::NEXT, link)?;
                rebaser.link_at(prev)?
            }
            None => {
                out.write_u64_at(header::FIRST, link)?;
                NULL_LINK
            }
        };

        offset = write_entry(&mut out, start, record, prev_link)?;
        out.write_u64_at(header::LAST, link)?;
        previous = Some(start);
    }

    let size = offset as u64;
    out.write_u64_at(header::SIZE, size)?;
    out.zero_from(offset);

    debug!(
        "Serialized {} records into {} of {} bytes at {:#x}",
        table.node_count(),
        size,
        out.len(),
        rebaser.caller_base()
    );
    Ok(size)
}

/// Write one envelope plus its name at `offset`; returns the next offset.
fn write_entry(
    out: &mut ByteWriter<'_>,
    offset: usize,
    record: &RegionRecord,
    prev_link: u64,
) -> Result<usize> {
    let name = record.backing_file().map_or(&[][..], |name| name.as_bytes());
    let entry_size = ENTRY_SIZE + name.len();

    out.write_u64_at(offset + entry::NEXT, NULL_LINK)?;
    out.write_u64_at(offset + entry::PREV, prev_link)?;
    out.write_u64_at(offset + entry::ENTRY_SIZE, entry_size as u64)?;
    out.write_u64_at(offset + entry::IDENTITY, record.identity)?;
    out.write_u32_at(offset + entry::DEPTH, record.depth)?;
    out.write_u32_at(offset + entry::BACKING_KIND, record.backing.kind_code())?;
    out.write_u64_at(offset + entry::START_VPN, record.start_vpn)?;
    out.write_u64_at(offset + entry::END_VPN, record.end_vpn)?;
    out.write_u64_at(offset + entry::COMMIT_CHARGE, record.commit_charge)?;
    out.write_u64_at(
        offset + entry::COMMITTED_PAGES,
        record.shared_commit_pages().unwrap_or(0),
    )?;
    out.write_u32_at(offset + entry::VAD, record.flags.vad)?;
    out.write_u32_at(offset + entry::VAD1, record.flags.vad1)?;
    out.write_u32_at(offset + entry::VAD2, record.flags.vad2)?;
    out.write_u32_at(offset + entry::NAME_LEN, name.len() as u32)?;
    out.write_bytes_at(offset + ENTRY_SIZE, name)?;

    Ok(offset + entry_size)
}
