//! Device filesystem core for the firmware I/O compatibility layer.
//!
//! Resolves device-prefixed paths the way the handheld's firmware does,
//! tracks per-device working directories, hands out file descriptors and
//! implements the synchronous and asynchronous seek family on top of a
//! pluggable [`Device`] seam.

#![deny(unsafe_code)]
#![allow(missing_docs)]

pub mod cwd;
pub mod device;
pub mod error;
pub mod fd;
pub mod mem;
pub mod mount;
pub mod path;
pub mod seek;
pub mod vfs;

pub use cwd::WorkingDirs;
pub use device::{Device, NodeId, NodeKind, NodeStat};
pub use error::{encode, IoError, IoResult};
pub use fd::{FileTable, OpenFile, OpenMode, FIRST_FD};
pub use mem::MemDevice;
pub use mount::Mounts;
pub use path::{resolve, DeviceNames, RawPath, ResolvedPath};
pub use seek::{seek_target, PendingSeek, SeekWidth, Whence};
pub use vfs::{Vfs, VfsBuilder, VfsConfig};

#[cfg(test)]
mod tests;
