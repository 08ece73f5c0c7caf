//! Firmware I/O ABI shared between the I/O service and its callers.
//!
//! This crate defines the protocol boundary between guest-facing callers
//! (probe suites, CLIs) and the service backing the device filesystem. Every
//! value here is expressed the way a guest passes it to the firmware: raw
//! integers for descriptors, flags and whence, and the sign convention for
//! results (non-negative = success value, negative = error code).

#![allow(missing_docs)]

mod service;

use serde::Serialize;
use std::sync::Arc;

pub use service::{Service, SubmitOutcome};

/// Open flags accepted by `Open`.
pub mod flags {
    pub const RDONLY: i32 = 0x0001;
    pub const WRONLY: i32 = 0x0002;
    pub const RDWR: i32 = RDONLY | WRONLY;
    pub const NBLOCK: i32 = 0x0004;
    pub const DIROPEN: i32 = 0x0008;
    pub const APPEND: i32 = 0x0100;
    pub const CREAT: i32 = 0x0200;
    pub const TRUNC: i32 = 0x0400;
    pub const EXCL: i32 = 0x0800;
    pub const NOWAIT: i32 = 0x8000;
}

/// Seek reference points. Any other value is rejected by the firmware.
pub mod whence {
    pub const SET: i32 = 0;
    pub const CUR: i32 = 1;
    pub const END: i32 = 2;
}

/// Mode bits reported in [`IoStat::mode`].
pub mod stat_mode {
    pub const S_IFDIR: u32 = 0x1000;
    pub const S_IFREG: u32 = 0x2000;
}

/// Firmware error codes, already sign-converted for the result channel.
pub mod errcode {
    pub const FILE_NOT_FOUND: i32 = 0x8001_0002_u32 as i32;
    pub const ACCESS_DENIED: i32 = 0x8001_000D_u32 as i32;
    pub const FILE_EXISTS: i32 = 0x8001_0011_u32 as i32;
    pub const NOT_A_DIRECTORY: i32 = 0x8001_0014_u32 as i32;
    pub const IS_A_DIRECTORY: i32 = 0x8001_0015_u32 as i32;
    pub const INVALID_ARGUMENT: i32 = 0x8001_0016_u32 as i32;
    pub const READ_ONLY: i32 = 0x8001_001E_u32 as i32;
    pub const DIRECTORY_NOT_EMPTY: i32 = 0x8001_005A_u32 as i32;
    pub const TOO_MANY_OPEN_FILES: i32 = 0x8002_0320_u32 as i32;
    pub const BAD_FILE_DESCRIPTOR: i32 = 0x8002_0323_u32 as i32;
    pub const ASYNC_BUSY: i32 = 0x8002_0329_u32 as i32;
    pub const NO_ASYNC_OP: i32 = 0x8002_032A_u32 as i32;
    /// Seeking before the start of a file reports a bare `-1`.
    pub const NEGATIVE_SEEK: i32 = -1;
}

/// Firmware call identifiers carried on completion reports.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub enum IoOp {
    Open,
    Close,
    Read,
    Write,
    Lseek,
    Lseek32,
    LseekAsync,
    Lseek32Async,
    WaitAsync,
    Remove,
    Mkdir,
    Rmdir,
    Chdir,
    GetStat,
}

/// File status returned by `GetStat`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub struct IoStat {
    /// Type bits from [`stat_mode`].
    pub mode: u32,
    /// Size in bytes (zero for directories).
    pub size: u64,
}

impl IoStat {
    pub fn is_dir(&self) -> bool {
        self.mode & stat_mode::S_IFDIR != 0
    }
}

/// Firmware call directed at the I/O service.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum IoCmd {
    /// Open (and optionally create) a file.
    Open { path: String, flags: i32, mode: i32 },
    /// Release a descriptor.
    Close { fd: i32 },
    /// Read up to `len` bytes from the current position.
    Read { fd: i32, len: u32 },
    /// Write bytes at the current position.
    Write { fd: i32, bytes: Arc<[u8]> },
    /// Reposition with a 64-bit offset.
    Lseek { fd: i32, offset: i64, whence: i32 },
    /// Reposition with a 32-bit offset.
    Lseek32 { fd: i32, offset: i32, whence: i32 },
    /// Issue an asynchronous 64-bit seek; the result arrives through `WaitAsync`.
    LseekAsync { fd: i32, offset: i64, whence: i32 },
    /// Issue an asynchronous 32-bit seek; the result arrives through `WaitAsync`.
    Lseek32Async { fd: i32, offset: i32, whence: i32 },
    /// Complete the outstanding asynchronous operation on a descriptor.
    WaitAsync { fd: i32 },
    /// Unlink a file.
    Remove { path: String },
    /// Create a directory.
    Mkdir { path: String, mode: i32 },
    /// Remove an empty directory.
    Rmdir { path: String },
    /// Change the working directory.
    Chdir { path: String },
    /// Query file status.
    GetStat { path: String },
}

impl IoCmd {
    /// Firmware call this command maps to.
    pub fn op(&self) -> IoOp {
        match self {
            IoCmd::Open { .. } => IoOp::Open,
            IoCmd::Close { .. } => IoOp::Close,
            IoCmd::Read { .. } => IoOp::Read,
            IoCmd::Write { .. } => IoOp::Write,
            IoCmd::Lseek { .. } => IoOp::Lseek,
            IoCmd::Lseek32 { .. } => IoOp::Lseek32,
            IoCmd::LseekAsync { .. } => IoOp::LseekAsync,
            IoCmd::Lseek32Async { .. } => IoOp::Lseek32Async,
            IoCmd::WaitAsync { .. } => IoOp::WaitAsync,
            IoCmd::Remove { .. } => IoOp::Remove,
            IoCmd::Mkdir { .. } => IoOp::Mkdir,
            IoCmd::Rmdir { .. } => IoOp::Rmdir,
            IoCmd::Chdir { .. } => IoOp::Chdir,
            IoCmd::GetStat { .. } => IoOp::GetStat,
        }
    }

    /// Upper bound on the number of reports the command produces.
    pub fn expected_reports(&self) -> usize {
        match self {
            IoCmd::Read { .. } | IoCmd::GetStat { .. } => 2,
            _ => 1,
        }
    }
}

/// Report variants produced by the I/O service.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum IoRep {
    /// A call completed; `result` follows the sign convention.
    Done {
        /// Call that completed.
        op: IoOp,
        /// Descriptor, position, byte count, zero, or a negative error code.
        result: i64,
    },
    /// Bytes produced by a read, emitted ahead of its `Done`.
    Data {
        /// Descriptor that was read.
        fd: i32,
        /// Bytes read.
        bytes: Arc<[u8]>,
    },
    /// Status produced by a successful `GetStat`, emitted ahead of its `Done`.
    Stat {
        /// Status of the queried path.
        stat: IoStat,
    },
    /// Completion of an asynchronous operation.
    AsyncDone {
        /// Descriptor the operation was issued on.
        fd: i32,
        /// Zero when a pending operation was collected, otherwise an error code.
        status: i32,
        /// Result of the collected operation (position or error code).
        result: i64,
    },
}

/// Handle to the I/O service implementation.
pub type IoServiceHandle = Arc<dyn Service<Cmd = IoCmd, Rep = IoRep> + Send + Sync>;
