//! List command implementation.

use std::path::Path;

use anyhow::{Result, bail};
use chrono::{DateTime, Utc};
use owo_colors::OwoColorize;
use serde::Serialize;
use tracing::debug;
use vadlist_core::engine::Destination;
use vadlist_core::{Backing, ListHeader, Ownership, RegionList, RegionRecord};

#[derive(Serialize)]
struct ListReport<'a> {
    timestamp: DateTime<Utc>,
    pid: u32,
    header: &'a ListHeader,
    regions: &'a [RegionRecord],
}

/// Run the list command
pub fn run(image: &Path, pid: u32, layout: Option<&Path>, json: bool) -> Result<()> {
    let engine = super::open_engine(image, layout)?;

    // Size first, then fetch into a buffer of exactly that size
    let mut session = engine.query_size(pid)?;
    let mut buffer = vec![0u8; session.required_size() as usize];
    let caller_base = buffer.as_ptr() as usize as u64;
    let written = session.fetch_data_for(pid, Destination::new(caller_base, &mut buffer))?;
    debug!("Fetched {} of {} bytes", written, buffer.len());

    let list = RegionList::parse(&buffer, caller_base)?;
    if list.len() != list.header.node_count as usize {
        bail!(
            "Region list announces {} nodes but holds {}",
            list.header.node_count,
            list.len()
        );
    }

    if json {
        let report = ListReport {
            timestamp: Utc::now(),
            pid,
            header: &list.header,
            regions: list.records(),
        };
        println!("{}", serde_json::to_string_pretty(&report)?);
        return Ok(());
    }

    print_list(&list);
    Ok(())
}

fn print_list(list: &RegionList) {
    println!(
        "{}",
        "VAD               Level  VPN Start    VPN End  Commit    Type         Protection         Pagefile/Image"
            .bold()
    );
    println!(
        "{}",
        "---               -----  ---------    -------  ------    ----         ----------         --------------"
            .dimmed()
    );

    for record in list {
        println!("{}", format_row(record));
    }

    println!();
    println!("EPROCESS     : {:#018x}", list.header.process);
    println!("Total VADs   : {}", list.header.node_count);
    println!("Maximum depth: {}", list.header.max_depth);
    println!(
        "Commit       : {} private, {} shared",
        list.header.total_private_commit, list.header.total_shared_commit
    );
    println!();
}

fn format_row(record: &RegionRecord) -> String {
    let ownership = format!("{:<8}", record.ownership().to_string());
    let ownership = match record.ownership() {
        Ownership::Private => ownership.dimmed().to_string(),
        Ownership::Shared => ownership.cyan().to_string(),
    };

    let backing = match &record.backing {
        Backing::Private => String::new(),
        Backing::File { name } => name.to_string().green().to_string(),
        Backing::Pagefile { committed_pages } => format!(
            "Pagefile section, shared commit {:#x}",
            committed_pages
        )
        .yellow()
        .to_string(),
    };

    format!(
        "{:016x}  {:5}  {:9x}  {:9x}  {:<8}  {}{:<5}{:<19}{}",
        record.identity,
        record.depth,
        record.start_vpn,
        record.end_vpn,
        record.commit_charge,
        ownership,
        record.flags.vad_type().short_name(),
        record.flags.protection().to_string(),
        backing
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use vadlist_core::{FileName, RegionFlags, VadType};

    fn record(backing: Backing) -> RegionRecord {
        let private = backing == Backing::Private;
        RegionRecord {
            identity: 0xFFFF_A50C_1D2E_1000,
            depth: 2,
            start_vpn: 0x7FF6_0000,
            end_vpn: 0x7FF6_0010,
            flags: RegionFlags::new(RegionFlags::compose_vad(VadType::ImageMap, 7, private), 0, 0),
            commit_charge: 3,
            backing,
        }
    }

    #[test]
    fn test_format_row_file() {
        let row = format_row(&record(Backing::File {
            name: FileName::from("C:\\a.dll"),
        }));
        assert!(row.starts_with("ffffa50c1d2e1000      2   7ff60000   7ff60010  3 "));
        assert!(row.contains("Mapped"));
        assert!(row.contains("Exe"));
        assert!(row.contains("EXECUTE_WRITECOPY"));
        assert!(row.contains("C:\\a.dll"));
    }

    #[test]
    fn test_format_row_pagefile() {
        let row = format_row(&record(Backing::Pagefile {
            committed_pages: 0x20,
        }));
        assert!(row.contains("Pagefile section, shared commit 0x20"));
    }
}
