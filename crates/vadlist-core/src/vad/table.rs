//! Arena of decoded region records.

use serde::Serialize;

use crate::vad::flags::Ownership;
use crate::vad::record::RegionRecord;

/// Which child slot of the parent an entry occupies.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Side {
    Left,
    Right,
}

/// One arena slot. Links are indices into the owning table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TableEntry {
    pub record: RegionRecord,
    pub parent: Option<usize>,
    pub left: Option<usize>,
    pub right: Option<usize>,
}

/// Snapshot of one process's region tree in pre-order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct VadTable {
    process: u64,
    entries: Vec<TableEntry>,
    max_depth: u32,
    total_private_commit: u64,
    total_shared_commit: u64,
    skipped_subtrees: u32,
}

impl VadTable {
    pub fn new(process: u64) -> Self {
        Self {
            process,
            ..Self::default()
        }
    }

    /// Identity of the process object the table was built from.
    pub fn process(&self) -> u64 {
        self.process
    }

    /// Append a record under `parent` and update the aggregates.
    ///
    /// Returns the new entry's index.
    pub fn push(&mut self, record: RegionRecord, parent: Option<(usize, Side)>) -> usize {
        let index = self.entries.len();

        self.max_depth = self.max_depth.max(record.depth);
        match record.ownership() {
            Ownership::Private => {
                self.total_private_commit =
                    self.total_private_commit.saturating_add(record.commit_charge)
            }
            Ownership::Shared => {
                self.total_shared_commit =
                    self.total_shared_commit.saturating_add(record.commit_charge)
            }
        }

        if let Some((parent_index, side)) = parent
            && let Some(parent_entry) = self.entries.get_mut(parent_index)
        {
            match side {
                Side::Left => parent_entry.left = Some(index),
                Side::Right => parent_entry.right = Some(index),
            }
        }

        self.entries.push(TableEntry {
            record,
            parent: parent.map(|(parent_index, _)| parent_index),
            left: None,
            right: None,
        });
        index
    }

    /// Count a subtree dropped during the walk.
    ///
    /// One call stands for the dropped node and everything below it, which
    /// was never read and so cannot be counted.
    pub fn note_skipped(&mut self) {
        self.skipped_subtrees += 1;
    }

    pub fn root(&self) -> Option<usize> {
        if self.entries.is_empty() { None } else { Some(0) }
    }

    pub fn node_count(&self) -> u32 {
        self.entries.len() as u32
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn max_depth(&self) -> u32 {
        self.max_depth
    }

    pub fn total_private_commit(&self) -> u64 {
        self.total_private_commit
    }

    pub fn total_shared_commit(&self) -> u64 {
        self.total_shared_commit
    }

    pub fn skipped_subtrees(&self) -> u32 {
        self.skipped_subtrees
    }

    pub fn entries(&self) -> &[TableEntry] {
        &self.entries
    }

    pub fn get(&self, index: usize) -> Option<&TableEntry> {
        self.entries.get(index)
    }

    /// Records in table (pre-order) order.
    pub fn records(&self) -> impl Iterator<Item = &RegionRecord> {
        self.entries.iter().map(|entry| &entry.record)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::vad::flags::{RegionFlags, VadType};
    use crate::vad::record::Backing;

    fn record(depth: u32, private: bool, commit: u64) -> RegionRecord {
        RegionRecord {
            identity: 0x1000 + u64::from(depth),
            depth,
            start_vpn: 0x10,
            end_vpn: 0x20,
            flags: RegionFlags::new(RegionFlags::compose_vad(VadType::None, 4, private), 0, 0),
            commit_charge: commit,
            backing: if private {
                Backing::Private
            } else {
                Backing::Pagefile { committed_pages: 0 }
            },
        }
    }

    #[test]
    fn test_empty_table() {
        let table = VadTable::new(0xFFFF_8000_0000_0000);
        assert!(table.is_empty());
        assert_eq!(table.root(), None);
        assert_eq!(table.node_count(), 0);
        assert_eq!(table.max_depth(), 0);
        assert_eq!(table.process(), 0xFFFF_8000_0000_0000);
    }

    #[test]
    fn test_push_links_children() {
        let mut table = VadTable::new(1);
        let root = table.push(record(0, true, 3), None);
        let left = table.push(record(1, false, 5), Some((root, Side::Left)));
        let right = table.push(record(1, true, 7), Some((root, Side::Right)));

        let root_entry = table.get(root).unwrap();
        assert_eq!(root_entry.left, Some(left));
        assert_eq!(root_entry.right, Some(right));
        assert_eq!(table.get(left).unwrap().parent, Some(root));
        assert_eq!(table.root(), Some(0));
        assert_eq!(table.node_count(), 3);
        assert_eq!(table.max_depth(), 1);
    }

    #[test]
    fn test_commit_totals_by_ownership() {
        let mut table = VadTable::new(1);
        table.push(record(0, true, 3), None);
        table.push(record(1, false, 5), Some((0, Side::Left)));
        table.push(record(1, true, 7), Some((0, Side::Right)));

        assert_eq!(table.total_private_commit(), 10);
        assert_eq!(table.total_shared_commit(), 5);
    }
}
