use service_abi::{IoCmd, IoOp, IoRep, IoServiceHandle, IoStat, SubmitOutcome};
use smallvec::SmallVec;
use std::sync::Arc;
use thiserror::Error;

/// Failure to get a call through to the service. Firmware errors are not
/// dispatch errors; they come back as negative results.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Error)]
pub enum DispatchError {
    #[error("report queue full while submitting {0:?}")]
    WouldBlock(IoOp),
    #[error("io service is closed")]
    Closed,
    #[error("no completion report for {0:?}")]
    MissingReport(IoOp),
}

pub type DispatchResult<T> = Result<T, DispatchError>;

/// Syscall-shaped front for an I/O service.
///
/// Every method returns what the firmware call would: a non-negative value on
/// success, a negative error code otherwise. The client assumes it is the only
/// consumer draining the service's reports.
#[derive(Clone)]
pub struct IoClient {
    service: IoServiceHandle,
}

impl IoClient {
    pub fn new(service: IoServiceHandle) -> Self {
        Self { service }
    }

    pub fn service(&self) -> &IoServiceHandle {
        &self.service
    }

    fn call(&self, cmd: IoCmd) -> DispatchResult<SmallVec<[IoRep; 8]>> {
        match self.service.try_submit(&cmd) {
            SubmitOutcome::Accepted => Ok(self.service.drain(cmd.expected_reports())),
            SubmitOutcome::WouldBlock => Err(DispatchError::WouldBlock(cmd.op())),
            SubmitOutcome::Closed => Err(DispatchError::Closed),
        }
    }

    fn done(&self, cmd: IoCmd) -> DispatchResult<i64> {
        let op = cmd.op();
        self.call(cmd)?
            .into_iter()
            .find_map(|rep| match rep {
                IoRep::Done { op: done, result } if done == op => Some(result),
                _ => None,
            })
            .ok_or(DispatchError::MissingReport(op))
    }

    // Calls below return 32-bit firmware values; their results originate as i32.
    fn done32(&self, cmd: IoCmd) -> DispatchResult<i32> {
        self.done(cmd).map(|result| result as i32)
    }

    pub fn open(&self, path: &str, flags: i32, mode: i32) -> DispatchResult<i32> {
        self.done32(IoCmd::Open {
            path: path.to_owned(),
            flags,
            mode,
        })
    }

    pub fn close(&self, fd: i32) -> DispatchResult<i32> {
        self.done32(IoCmd::Close { fd })
    }

    /// Returns the byte count (or error code) and the bytes read.
    pub fn read(&self, fd: i32, len: u32) -> DispatchResult<(i32, Arc<[u8]>)> {
        let mut data: Arc<[u8]> = Arc::from(Vec::new());
        let mut result = None;
        for rep in self.call(IoCmd::Read { fd, len })? {
            match rep {
                IoRep::Data { bytes, .. } => data = bytes,
                IoRep::Done { op: IoOp::Read, result: r } => result = Some(r as i32),
                _ => {}
            }
        }
        let result = result.ok_or(DispatchError::MissingReport(IoOp::Read))?;
        Ok((result, data))
    }

    pub fn write(&self, fd: i32, bytes: &[u8]) -> DispatchResult<i32> {
        self.done32(IoCmd::Write {
            fd,
            bytes: Arc::from(bytes),
        })
    }

    pub fn lseek(&self, fd: i32, offset: i64, whence: i32) -> DispatchResult<i64> {
        self.done(IoCmd::Lseek { fd, offset, whence })
    }

    pub fn lseek32(&self, fd: i32, offset: i32, whence: i32) -> DispatchResult<i64> {
        self.done(IoCmd::Lseek32 { fd, offset, whence })
    }

    pub fn lseek_async(&self, fd: i32, offset: i64, whence: i32) -> DispatchResult<i32> {
        self.done32(IoCmd::LseekAsync { fd, offset, whence })
    }

    pub fn lseek32_async(&self, fd: i32, offset: i32, whence: i32) -> DispatchResult<i32> {
        self.done32(IoCmd::Lseek32Async { fd, offset, whence })
    }

    /// Collects the outstanding operation on `fd` as `(status, result)`.
    pub fn wait_async(&self, fd: i32) -> DispatchResult<(i32, i64)> {
        self.call(IoCmd::WaitAsync { fd })?
            .into_iter()
            .find_map(|rep| match rep {
                IoRep::AsyncDone {
                    fd: done,
                    status,
                    result,
                } if done == fd => Some((status, result)),
                _ => None,
            })
            .ok_or(DispatchError::MissingReport(IoOp::WaitAsync))
    }

    pub fn remove(&self, path: &str) -> DispatchResult<i32> {
        self.done32(IoCmd::Remove {
            path: path.to_owned(),
        })
    }

    pub fn mkdir(&self, path: &str, mode: i32) -> DispatchResult<i32> {
        self.done32(IoCmd::Mkdir {
            path: path.to_owned(),
            mode,
        })
    }

    pub fn rmdir(&self, path: &str) -> DispatchResult<i32> {
        self.done32(IoCmd::Rmdir {
            path: path.to_owned(),
        })
    }

    pub fn chdir(&self, path: &str) -> DispatchResult<i32> {
        self.done32(IoCmd::Chdir {
            path: path.to_owned(),
        })
    }

    /// Returns the status code and, on success, the file status.
    pub fn getstat(&self, path: &str) -> DispatchResult<(i32, Option<IoStat>)> {
        let mut stat = None;
        let mut result = None;
        for rep in self.call(IoCmd::GetStat {
            path: path.to_owned(),
        })? {
            match rep {
                IoRep::Stat { stat: s } => stat = Some(s),
                IoRep::Done {
                    op: IoOp::GetStat,
                    result: r,
                } => result = Some(r as i32),
                _ => {}
            }
        }
        let result = result.ok_or(DispatchError::MissingReport(IoOp::GetStat))?;
        Ok((result, stat))
    }
}
