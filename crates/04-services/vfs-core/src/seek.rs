//! Seek arithmetic and the asynchronous seek token.

use crate::error::{IoError, IoResult};
use log::trace;
use service_abi::whence;

/// Reference point for a seek offset.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Whence {
    Set,
    Cur,
    End,
}

impl Whence {
    /// Accepts exactly the three firmware values; everything else is rejected.
    pub fn from_raw(raw: i32) -> IoResult<Self> {
        match raw {
            whence::SET => Ok(Whence::Set),
            whence::CUR => Ok(Whence::Cur),
            whence::END => Ok(Whence::End),
            other => Err(IoError::InvalidWhence(other)),
        }
    }
}

/// Offset width of the call that issued a seek.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SeekWidth {
    Bits64,
    Bits32,
}

/// Computes the position a seek lands on.
///
/// Landing before the start is `InvalidOffset`; landing past the end is
/// allowed and leaves the file size untouched.
pub fn seek_target(position: u64, size: u64, offset: i64, whence: Whence) -> IoResult<u64> {
    let base = match whence {
        Whence::Set => 0,
        Whence::Cur => position,
        Whence::End => size,
    };
    let base = i64::try_from(base).map_err(|_| IoError::InvalidArgument("seek base exceeds i64"))?;
    let target = base
        .checked_add(offset)
        .ok_or(IoError::InvalidArgument("seek position overflows"))?;
    trace!("seek_target {whence:?} base={base} offset={offset} -> {target}");
    u64::try_from(target).map_err(|_| IoError::InvalidOffset(target))
}

/// An issued asynchronous seek awaiting its wait.
///
/// The token is the only way to collect the result, and collecting consumes
/// it, so a seek cannot be waited on twice.
#[derive(Debug, PartialEq, Eq)]
#[must_use = "an issued seek keeps its descriptor busy until waited on"]
pub struct PendingSeek {
    /// Identity of the filesystem that issued the seek.
    pub(crate) owner: u64,
    pub(crate) fd: i32,
    pub(crate) offset: i64,
    pub(crate) whence: i32,
    pub(crate) width: SeekWidth,
}

impl PendingSeek {
    /// Descriptor the seek was issued on.
    pub fn fd(&self) -> i32 {
        self.fd
    }

    pub fn width(&self) -> SeekWidth {
        self.width
    }
}
