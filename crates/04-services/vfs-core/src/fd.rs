//! Descriptor table.
//!
//! Descriptors 0, 1 and 2 belong to the standard streams and are never bound
//! here; any operation on them reports `InvalidDescriptor`. Allocation picks
//! the lowest free descriptor, so a closed number is reused by the next open.

use crate::device::NodeId;
use crate::error::{IoError, IoResult};
use service_abi::flags;

/// First descriptor handed out by [`FileTable::insert`].
pub const FIRST_FD: i32 = 3;

/// Access flags decoded from raw open flags.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct OpenMode {
    pub read: bool,
    pub write: bool,
    pub create: bool,
    pub truncate: bool,
    pub append: bool,
    pub exclusive: bool,
}

impl OpenMode {
    /// Decodes raw firmware flags. At least one access bit must be set.
    pub fn from_raw(raw: i32) -> IoResult<Self> {
        let mode = Self {
            read: raw & flags::RDONLY != 0,
            write: raw & flags::WRONLY != 0,
            create: raw & flags::CREAT != 0,
            truncate: raw & flags::TRUNC != 0,
            append: raw & flags::APPEND != 0,
            exclusive: raw & flags::EXCL != 0,
        };
        if !mode.read && !mode.write {
            return Err(IoError::InvalidArgument("open flags carry no access mode"));
        }
        Ok(mode)
    }
}

/// State bound to an open descriptor.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct OpenFile {
    /// Canonical name of the device holding the node.
    pub device: String,
    pub node: NodeId,
    pub position: u64,
    pub mode: OpenMode,
    /// Path the descriptor was opened with, resolved, for diagnostics.
    pub path: String,
    /// Set while an issued asynchronous operation awaits its wait.
    pub async_busy: bool,
}

impl OpenFile {
    pub fn new(device: impl Into<String>, node: NodeId, mode: OpenMode, path: String) -> Self {
        Self {
            device: device.into(),
            node,
            position: 0,
            mode,
            path,
            async_busy: false,
        }
    }

    /// Fails with `AsyncBusy` while an asynchronous operation is outstanding.
    pub fn ensure_idle(&self, fd: i32) -> IoResult<()> {
        if self.async_busy {
            Err(IoError::AsyncBusy(fd))
        } else {
            Ok(())
        }
    }
}

/// Fixed-capacity descriptor table.
#[derive(Debug)]
pub struct FileTable {
    slots: Vec<Option<OpenFile>>,
}

impl FileTable {
    pub fn new(max_open: usize) -> Self {
        Self {
            slots: (0..max_open).map(|_| None).collect(),
        }
    }

    pub fn capacity(&self) -> usize {
        self.slots.len()
    }

    pub fn open_count(&self) -> usize {
        self.slots.iter().filter(|slot| slot.is_some()).count()
    }

    /// Fails with `TooManyOpenFiles` when no descriptor is free.
    pub fn ensure_free(&self) -> IoResult<()> {
        if self.slots.iter().any(Option::is_none) {
            Ok(())
        } else {
            Err(IoError::TooManyOpenFiles(self.slots.len()))
        }
    }

    fn slot(fd: i32) -> Option<usize> {
        fd.checked_sub(FIRST_FD)
            .and_then(|index| usize::try_from(index).ok())
    }

    /// Binds `file` to the lowest free descriptor.
    pub fn insert(&mut self, file: OpenFile) -> IoResult<i32> {
        let index = self
            .slots
            .iter()
            .position(Option::is_none)
            .ok_or(IoError::TooManyOpenFiles(self.slots.len()))?;
        self.slots[index] = Some(file);
        // index < capacity, which the config keeps well inside i32.
        Ok(FIRST_FD + index as i32)
    }

    pub fn get(&self, fd: i32) -> IoResult<&OpenFile> {
        Self::slot(fd)
            .and_then(|index| self.slots.get(index))
            .and_then(Option::as_ref)
            .ok_or(IoError::InvalidDescriptor(fd))
    }

    pub fn get_mut(&mut self, fd: i32) -> IoResult<&mut OpenFile> {
        Self::slot(fd)
            .and_then(|index| self.slots.get_mut(index))
            .and_then(Option::as_mut)
            .ok_or(IoError::InvalidDescriptor(fd))
    }

    /// Unbinds `fd`, returning what it referred to.
    pub fn remove(&mut self, fd: i32) -> IoResult<OpenFile> {
        Self::slot(fd)
            .and_then(|index| self.slots.get_mut(index))
            .and_then(Option::take)
            .ok_or(IoError::InvalidDescriptor(fd))
    }
}
