//! Storage seam between the path/seek contract and concrete devices.

use crate::error::IoResult;
use service_abi::{stat_mode, IoStat};

/// Handle to a node within a single device.
pub type NodeId = usize;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum NodeKind {
    File,
    Directory,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct NodeStat {
    pub kind: NodeKind,
    pub size: u64,
}

impl NodeStat {
    pub fn is_dir(&self) -> bool {
        self.kind == NodeKind::Directory
    }
}

impl From<NodeStat> for IoStat {
    fn from(stat: NodeStat) -> Self {
        let mode = match stat.kind {
            NodeKind::File => stat_mode::S_IFREG,
            NodeKind::Directory => stat_mode::S_IFDIR,
        };
        IoStat {
            mode,
            size: stat.size,
        }
    }
}

/// A mounted device.
///
/// Paths arrive already resolved: `components` never contain separators,
/// `.`/`..`, or trailing dots, and are matched case-insensitively by the
/// implementation.
pub trait Device: Send {
    /// Canonical mount name.
    fn name(&self) -> &str;

    /// Read-only devices reject every mutation with `ReadOnly`.
    fn is_read_only(&self) -> bool;

    /// Finds the node at `components`; the empty slice is the root.
    fn lookup(&self, components: &[String]) -> IoResult<NodeId>;

    fn stat(&self, node: NodeId) -> IoResult<NodeStat>;

    /// Creates a file, or returns the existing one unless `exclusive`.
    fn create_file(&mut self, components: &[String], exclusive: bool) -> IoResult<NodeId>;

    fn mkdir(&mut self, components: &[String]) -> IoResult<NodeId>;

    /// Unlinks a file. Open descriptors keep the data until released.
    fn remove(&mut self, components: &[String]) -> IoResult<()>;

    /// Removes an empty directory.
    fn rmdir(&mut self, components: &[String]) -> IoResult<()>;

    /// Copies bytes starting at `offset` into `buf`; past the end reads nothing.
    fn read_at(&self, node: NodeId, offset: u64, buf: &mut [u8]) -> IoResult<usize>;

    /// Writes `data` at `offset`, zero-filling any gap past the current end.
    fn write_at(&mut self, node: NodeId, offset: u64, data: &[u8]) -> IoResult<usize>;

    fn truncate(&mut self, node: NodeId, len: u64) -> IoResult<()>;

    /// Marks a node as held by a descriptor.
    fn retain(&mut self, node: NodeId);

    /// Drops a descriptor's hold on a node.
    fn release(&mut self, node: NodeId);
}
