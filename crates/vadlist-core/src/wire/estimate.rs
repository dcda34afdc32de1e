use crate::config::PAGE_SIZE;
use crate::config::names::NAME_TERMINATOR_SIZE;
use crate::vad::VadTable;
use crate::wire::format::{ENTRY_SIZE, HEADER_SIZE};

/// Bytes a destination needs to hold the flattened `table`.
///
/// Every file name is counted with room for a terminator and the total is
/// rounded up to a whole page, so the result never falls below what the
/// serializer writes.
pub fn estimate_size(table: &VadTable) -> u64 {
    let records: u64 = table
        .records()
        .map(|record| {
            let name = match record.backing_file() {
                Some(name) => name.byte_len() as u64 + NAME_TERMINATOR_SIZE,
                None => 0,
            };
            ENTRY_SIZE as u64 + name
        })
        .sum();
    (HEADER_SIZE as u64 + records).div_ceil(PAGE_SIZE) * PAGE_SIZE
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::vad::fixture::{NodeSpec, TreeFixture};
    use crate::vad::walk;

    #[test]
    fn test_empty_table_is_one_page() {
        assert_eq!(estimate_size(&VadTable::new(1)), PAGE_SIZE);
    }

    #[test]
    fn test_rounds_up_past_a_page() {
        let mut fixture = TreeFixture::new();
        let root = fixture.add_node(NodeSpec::private(0, 1));
        let mut parent = root;
        // 56 + 46 * 88 = 4104 bytes
        for vpn in 1..46 {
            let child = fixture.add_node(NodeSpec::private(vpn, vpn + 1));
            fixture.set_right(parent, child);
            parent = child;
        }
        let process = fixture.process();
        let table = walk(&process, fixture.layout(), 1, root).unwrap();

        assert_eq!(table.node_count(), 46);
        assert_eq!(estimate_size(&table), 2 * PAGE_SIZE);
        assert_eq!(estimate_size(&table), estimate_size(&table));
    }
}
