use service_abi::errcode;
use thiserror::Error;

pub type IoResult<T> = Result<T, IoError>;

/// Failures surfaced by the device filesystem.
///
/// Every variant maps to a firmware error code through [`IoError::code`];
/// callers on the ABI side only ever observe that code.
#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum IoError {
    #[error("no such file or directory: {0}")]
    NotFound(String),

    #[error("bad file descriptor {0}")]
    InvalidDescriptor(i32),

    #[error("invalid whence {0}")]
    InvalidWhence(i32),

    #[error("seek to negative position {0}")]
    InvalidOffset(i64),

    #[error("invalid argument: {0}")]
    InvalidArgument(&'static str),

    #[error("device {0} is read-only")]
    ReadOnly(String),

    #[error("already exists: {0}")]
    AlreadyExists(String),

    #[error("not a directory: {0}")]
    NotADirectory(String),

    #[error("is a directory: {0}")]
    IsADirectory(String),

    #[error("directory not empty: {0}")]
    DirectoryNotEmpty(String),

    #[error("descriptor {fd} not open for {access}")]
    AccessDenied { fd: i32, access: &'static str },

    #[error("too many open files (limit {0})")]
    TooManyOpenFiles(usize),

    #[error("asynchronous operation pending on descriptor {0}")]
    AsyncBusy(i32),

    #[error("no asynchronous operation pending on descriptor {0}")]
    NoAsync(i32),
}

impl IoError {
    /// Firmware error code reported through the result channel. Always negative.
    pub fn code(&self) -> i32 {
        match self {
            IoError::NotFound(_) => errcode::FILE_NOT_FOUND,
            IoError::InvalidDescriptor(_) => errcode::BAD_FILE_DESCRIPTOR,
            IoError::InvalidWhence(_) | IoError::InvalidArgument(_) => errcode::INVALID_ARGUMENT,
            IoError::InvalidOffset(_) => errcode::NEGATIVE_SEEK,
            IoError::ReadOnly(_) => errcode::READ_ONLY,
            IoError::AlreadyExists(_) => errcode::FILE_EXISTS,
            IoError::NotADirectory(_) => errcode::NOT_A_DIRECTORY,
            IoError::IsADirectory(_) => errcode::IS_A_DIRECTORY,
            IoError::DirectoryNotEmpty(_) => errcode::DIRECTORY_NOT_EMPTY,
            IoError::AccessDenied { .. } => errcode::ACCESS_DENIED,
            IoError::TooManyOpenFiles(_) => errcode::TOO_MANY_OPEN_FILES,
            IoError::AsyncBusy(_) => errcode::ASYNC_BUSY,
            IoError::NoAsync(_) => errcode::NO_ASYNC_OP,
        }
    }
}

/// Folds a result into the firmware's single return channel.
pub fn encode<T: Into<i64>>(result: IoResult<T>) -> i64 {
    match result {
        Ok(value) => value.into(),
        Err(err) => i64::from(err.code()),
    }
}
