//! Firmware I/O service backed by the device filesystem.
//!
//! Each submitted [`IoCmd`] runs to completion against the service's [`Vfs`]
//! and leaves its reports in a bounded queue. Asynchronous seeks park their
//! token here, keyed by descriptor, until a `WaitAsync` collects it.

#![allow(missing_docs)]

mod client;
mod queue;

pub use client::{DispatchError, DispatchResult, IoClient};
pub use queue::ReportQueue;

use log::debug;
use parking_lot::Mutex;
use service_abi::{IoCmd, IoRep, IoServiceHandle, Service, SubmitOutcome};
use smallvec::{smallvec, SmallVec};
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use vfs_core::{encode, IoError, IoResult, MemDevice, PendingSeek, Vfs, VfsBuilder, VfsConfig};

const DEFAULT_CAPACITY: usize = 64;

/// Service-level configuration.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct IoServiceConfig {
    /// Maximum number of undrained reports.
    pub report_capacity: usize,
    pub vfs: VfsConfig,
}

impl Default for IoServiceConfig {
    fn default() -> Self {
        Self {
            report_capacity: DEFAULT_CAPACITY,
            vfs: VfsConfig::default(),
        }
    }
}

pub struct IoService {
    vfs: Mutex<Vfs>,
    pending: Mutex<HashMap<i32, PendingSeek>>,
    reports: ReportQueue<IoRep>,
    closed: AtomicBool,
}

impl IoService {
    pub fn from_vfs(vfs: Vfs, report_capacity: usize) -> Self {
        Self {
            vfs: Mutex::new(vfs),
            pending: Mutex::new(HashMap::new()),
            reports: ReportQueue::with_capacity(report_capacity),
            closed: AtomicBool::new(false),
        }
    }

    /// Builds the filesystem from `config.vfs` after `mount` has attached devices.
    pub fn build(
        config: IoServiceConfig,
        mount: impl FnOnce(VfsBuilder) -> IoResult<VfsBuilder>,
    ) -> IoResult<Self> {
        let vfs = mount(Vfs::builder(config.vfs))?.build()?;
        Ok(Self::from_vfs(vfs, config.report_capacity))
    }

    pub fn new_handle(
        config: IoServiceConfig,
        mount: impl FnOnce(VfsBuilder) -> IoResult<VfsBuilder>,
    ) -> IoResult<IoServiceHandle> {
        Ok(Arc::new(Self::build(config, mount)?))
    }

    /// Rejects every later submit with `Closed`. Queued reports stay drainable.
    pub fn shutdown(&self) {
        debug!("io service shutting down");
        self.closed.store(true, Ordering::Release);
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }

    /// Runs `f` with exclusive access to the filesystem.
    pub fn with_vfs<R>(&self, f: impl FnOnce(&mut Vfs) -> R) -> R {
        f(&mut self.vfs.lock())
    }

    fn materialise_reports(&self, cmd: &IoCmd) -> SmallVec<[IoRep; 8]> {
        let op = cmd.op();
        let mut vfs = self.vfs.lock();
        let mut reps = SmallVec::new();
        let result = match cmd {
            IoCmd::Open { path, flags, mode } => encode(vfs.open(path, *flags, *mode)),
            IoCmd::Close { fd } => encode(vfs.close(*fd).map(|()| 0i32)),
            IoCmd::Read { fd, len } => match vfs.read(*fd, *len as usize) {
                Ok(bytes) => {
                    let count = bytes.len() as i64;
                    reps.push(IoRep::Data {
                        fd: *fd,
                        bytes: Arc::from(bytes),
                    });
                    count
                }
                Err(err) => i64::from(err.code()),
            },
            IoCmd::Write { fd, bytes } => encode(vfs.write(*fd, bytes).map(|n| n as i64)),
            IoCmd::Lseek { fd, offset, whence } => encode(vfs.lseek(*fd, *offset, *whence)),
            IoCmd::Lseek32 { fd, offset, whence } => encode(vfs.lseek32(*fd, *offset, *whence)),
            IoCmd::LseekAsync { fd, offset, whence } => {
                encode(vfs.lseek_async(*fd, *offset, *whence).map(|p| self.park(p)))
            }
            IoCmd::Lseek32Async { fd, offset, whence } => {
                encode(vfs.lseek32_async(*fd, *offset, *whence).map(|p| self.park(p)))
            }
            IoCmd::WaitAsync { fd } => {
                let (status, result) = self.collect(&mut vfs, *fd);
                debug!("{op:?} fd={fd} -> status={status:#x} result={result:#x}");
                return smallvec![IoRep::AsyncDone {
                    fd: *fd,
                    status,
                    result,
                }];
            }
            IoCmd::Remove { path } => encode(vfs.remove(path).map(|()| 0i32)),
            IoCmd::Mkdir { path, mode } => encode(vfs.mkdir(path, *mode).map(|()| 0i32)),
            IoCmd::Rmdir { path } => encode(vfs.rmdir(path).map(|()| 0i32)),
            IoCmd::Chdir { path } => encode(vfs.chdir(path).map(|()| 0i32)),
            IoCmd::GetStat { path } => match vfs.getstat(path) {
                Ok(stat) => {
                    reps.push(IoRep::Stat { stat: stat.into() });
                    0
                }
                Err(err) => i64::from(err.code()),
            },
        };
        debug!("{op:?} -> {result:#x}");
        reps.push(IoRep::Done { op, result });
        reps
    }

    fn park(&self, pending: PendingSeek) -> i32 {
        self.pending.lock().insert(pending.fd(), pending);
        0
    }

    /// Completes the operation parked on `fd`: `(status, result)`.
    fn collect(&self, vfs: &mut Vfs, fd: i32) -> (i32, i64) {
        let Some(pending) = self.pending.lock().remove(&fd) else {
            let err = match vfs.check_fd(fd) {
                Err(err) => err,
                Ok(()) => IoError::NoAsync(fd),
            };
            return (err.code(), i64::from(err.code()));
        };
        (0, encode(vfs.wait(pending)))
    }
}

impl Service for IoService {
    type Cmd = IoCmd;
    type Rep = IoRep;

    fn try_submit(&self, cmd: &Self::Cmd) -> SubmitOutcome {
        if self.is_closed() {
            return SubmitOutcome::Closed;
        }
        self.reports
            .try_submit_with(cmd.expected_reports(), || self.materialise_reports(cmd))
    }

    fn drain(&self, max: usize) -> SmallVec<[Self::Rep; 8]> {
        self.reports.drain(max)
    }
}

/// Creates an I/O service with a blank writable `ms0` holding a `PSP` directory.
pub fn default_service() -> IoResult<IoServiceHandle> {
    IoService::new_handle(IoServiceConfig::default(), |builder| {
        let mut ms0 = MemDevice::new("ms0");
        ms0.seed_dir("PSP")?;
        builder.mount(ms0, &["fatms0"])
    })
}
