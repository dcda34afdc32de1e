//! Two-phase region list export.
//!
//! `Engine::query_size` attaches to a process, walks its VAD tree and returns
//! a `Session` that owns the resulting table together with the byte count a
//! destination needs. The caller allocates that many bytes and hands them to
//! `Session::fetch_data`, which flattens the table with links valid at the
//! caller's base address and releases it.
//!
//! Sessions are independent values, so concurrent requests for different
//! processes never share a table.

use tracing::{debug, info, warn};

use crate::config::NodeLayout;
use crate::config::process::is_valid_process_id;
use crate::error::{Error, Result};
use crate::process::{ProcessInfo, ProcessProvider, ReadMemory};
use crate::vad::decoder::field_addr;
use crate::vad::{VadTable, walk};
use crate::wire::{RegionList, estimate_size, serialize};

/// Width of the size result written by `Engine::query_size_into`.
pub const SIZE_RESULT_LEN: usize = 8;

/// Caller-supplied destination for `Session::fetch_data`.
///
/// `caller_base` is where the caller sees `buffer`; links in the flattened
/// list are valid at that address, wherever the engine sees the bytes.
#[derive(Debug)]
pub struct Destination<'a> {
    pub caller_base: u64,
    pub buffer: &'a mut [u8],
}

impl<'a> Destination<'a> {
    pub fn new(caller_base: u64, buffer: &'a mut [u8]) -> Self {
        Self {
            caller_base,
            buffer,
        }
    }
}

/// A sized request awaiting its fetch.
#[derive(Debug)]
pub struct Session {
    pid: u32,
    required_size: u64,
    table: Option<VadTable>,
}

impl Session {
    pub fn pid(&self) -> u32 {
        self.pid
    }

    /// Bytes the destination of `fetch_data` must provide.
    pub fn required_size(&self) -> u64 {
        self.required_size
    }

    /// Whether the table is still held for a fetch.
    pub fn is_pending(&self) -> bool {
        self.table.is_some()
    }

    pub fn table(&self) -> Option<&VadTable> {
        self.table.as_ref()
    }

    /// Flatten the sized table into `dest` and release it.
    ///
    /// Returns the number of meaningful bytes written.
    ///
    /// # Errors
    ///
    /// - `Sequencing` when the table was already fetched or released.
    /// - `InsufficientCapacity` when `dest` is smaller than `required_size`;
    ///   the table is kept so the fetch can be retried.
    /// - `InvalidInput` for a null or wrapping destination; the table is
    ///   released.
    pub fn fetch_data(&mut self, dest: Destination<'_>) -> Result<u64> {
        let Some(table) = self.table.as_ref() else {
            return Err(Error::Sequencing(format!(
                "No sized region list pending for PID {}",
                self.pid
            )));
        };

        match serialize(table, dest.buffer, dest.caller_base) {
            Ok(size) => {
                self.table = None;
                info!(
                    "Fetched region list for PID {}: {} bytes at {:#x}",
                    self.pid, size, dest.caller_base
                );
                Ok(size)
            }
            Err(e @ Error::InsufficientCapacity { .. }) => {
                warn!("Fetch for PID {} rejected, table kept: {}", self.pid, e);
                Err(e)
            }
            Err(e) => {
                self.table = None;
                Err(e)
            }
        }
    }

    /// `fetch_data` for a caller that names the process it expects.
    ///
    /// # Errors
    ///
    /// `Sequencing` when `pid` is not the process this session was sized
    /// for. The table is kept in that case.
    pub fn fetch_data_for(&mut self, pid: u32, dest: Destination<'_>) -> Result<u64> {
        if pid != self.pid {
            return Err(Error::Sequencing(format!(
                "Session was sized for PID {}, fetch asked for PID {}",
                self.pid, pid
            )));
        }
        self.fetch_data(dest)
    }
}

/// Region list exporter over a process provider.
#[derive(Debug, Clone)]
pub struct Engine<P> {
    provider: P,
    layout: NodeLayout,
}

impl<P: ProcessProvider> Engine<P> {
    /// Engine using the default structure layout.
    pub fn new(provider: P) -> Self {
        Self {
            provider,
            layout: NodeLayout::default(),
        }
    }

    /// # Errors
    ///
    /// `InvalidInput` when a node field lies outside the node block.
    pub fn with_layout(provider: P, layout: NodeLayout) -> Result<Self> {
        if !layout.is_valid() {
            return Err(Error::InvalidInput(format!(
                "Layout for {} has node fields beyond node size {:#x}",
                layout.build, layout.node_size
            )));
        }
        Ok(Self { provider, layout })
    }

    pub fn layout(&self) -> &NodeLayout {
        &self.layout
    }

    pub fn provider(&self) -> &P {
        &self.provider
    }

    /// Walk the process's VAD tree and size the flattened list.
    ///
    /// The process is attached only for the duration of the walk.
    ///
    /// # Errors
    ///
    /// - `InvalidProcessId` for reserved or misaligned PIDs.
    /// - `ProcessNotFound` / `ProcessOpenFailed` when the process does not
    ///   resolve or has exited.
    /// - `MemoryReadFailed` when the tree root cannot be read.
    pub fn query_size(&self, pid: u32) -> Result<Session> {
        if !is_valid_process_id(pid) {
            return Err(Error::InvalidProcessId(pid));
        }

        let table = {
            let process = self.provider.open_process(pid)?;
            if !process.is_alive() {
                return Err(Error::ProcessOpenFailed(format!(
                    "PID {} has exited",
                    pid
                )));
            }

            let object = process.object_address();
            let root = process.read_u64(field_addr(object, self.layout.process_vad_root)?)?;
            debug!("PID {}: process object {:#x}, VAD root {:#x}", pid, object, root);
            walk(&process, &self.layout, object, root)?
        };

        let required_size = estimate_size(&table);
        info!(
            "Sized region list for PID {}: {} nodes, max depth {}, {} subtrees skipped, {} bytes",
            pid,
            table.node_count(),
            table.max_depth(),
            table.skipped_subtrees(),
            required_size
        );

        Ok(Session {
            pid,
            required_size,
            table: Some(table),
        })
    }

    /// `query_size` that also writes the size as a little-endian u64 to `out`.
    ///
    /// # Errors
    ///
    /// `InsufficientCapacity` when `out` cannot hold the size, before any
    /// process is attached. Otherwise as `query_size`.
    pub fn query_size_into(&self, pid: u32, out: &mut [u8]) -> Result<Session> {
        if out.len() < SIZE_RESULT_LEN {
            return Err(Error::InsufficientCapacity {
                required: SIZE_RESULT_LEN as u64,
                available: out.len() as u64,
            });
        }

        let session = self.query_size(pid)?;
        out[..SIZE_RESULT_LEN].copy_from_slice(&session.required_size.to_le_bytes());
        Ok(session)
    }

    /// Run both phases in-process and decode the result.
    pub fn snapshot(&self, pid: u32) -> Result<RegionList> {
        let mut session = self.query_size(pid)?;
        let mut buffer = vec![0u8; session.required_size() as usize];
        let caller_base = buffer.as_ptr() as usize as u64;

        session.fetch_data(Destination::new(caller_base, &mut buffer))?;
        RegionList::parse(&buffer, caller_base)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use crate::process::{MockProcess, MockProcessProvider};
    use crate::vad::fixture::{NodeSpec, TreeFixture};

    fn engine() -> Engine<MockProcessProvider> {
        let mut fixture = TreeFixture::new();
        let root = fixture.add_node(NodeSpec::private(0x1000, 0x2000));
        fixture.set_root(root);
        Engine::new(fixture.provider())
    }

    #[test]
    fn test_query_size_rejects_reserved_pid() {
        let engine = engine();
        for pid in [0, 4, 1234] {
            let err = engine.query_size(pid).unwrap_err();
            assert_eq!(err.kind(), ErrorKind::InvalidInput);
        }
    }

    #[test]
    fn test_query_size_unknown_pid() {
        let err = engine().query_size(8).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotFound);
    }

    #[test]
    fn test_query_size_exited_process() {
        let mut process: MockProcess = TreeFixture::new().process();
        process.alive = false;
        let engine = Engine::new(MockProcessProvider::new().with_process(process));

        let err = engine.query_size(TreeFixture::PID).unwrap_err();
        assert!(matches!(err, Error::ProcessOpenFailed(_)));
        assert_eq!(err.kind(), ErrorKind::NotFound);
    }

    #[test]
    fn test_query_size_wild_process_object() {
        let mut process: MockProcess = TreeFixture::new().process();
        process.object_address = u64::MAX - 0x10;
        let engine = Engine::new(MockProcessProvider::new().with_process(process));

        let err = engine.query_size(TreeFixture::PID).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::UnreadableSource);
    }

    #[test]
    fn test_query_size_into_small_output() {
        let mut out = [0u8; 4];
        let err = engine()
            .query_size_into(TreeFixture::PID, &mut out)
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InsufficientCapacity);
    }

    #[test]
    fn test_query_size_into_writes_size() {
        let mut out = [0u8; 8];
        let session = engine().query_size_into(TreeFixture::PID, &mut out).unwrap();
        assert_eq!(u64::from_le_bytes(out), session.required_size());
        assert_eq!(session.required_size(), 0x1000);
    }

    #[test]
    fn test_fetch_twice_is_sequencing_error() {
        let mut session = engine().query_size(TreeFixture::PID).unwrap();
        let mut buffer = vec![0u8; session.required_size() as usize];

        session
            .fetch_data(Destination::new(0x10000, &mut buffer))
            .unwrap();
        assert!(!session.is_pending());

        let err = session
            .fetch_data(Destination::new(0x10000, &mut buffer))
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Sequencing);
    }

    #[test]
    fn test_invalid_destination_releases_table() {
        let mut session = engine().query_size(TreeFixture::PID).unwrap();
        let mut buffer = vec![0u8; session.required_size() as usize];

        let err = session
            .fetch_data(Destination::new(0, &mut buffer))
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidInput);
        assert!(!session.is_pending());
    }

    #[test]
    fn test_invalid_layout_rejected() {
        let layout = NodeLayout {
            node_size: 0x10,
            ..NodeLayout::default()
        };
        assert!(Engine::with_layout(MockProcessProvider::new(), layout).is_err());
    }
}
