use std::{fmt, io};

use rustix::io::Errno;

#[derive(Debug)]
pub enum Error {
    NotFound(String),

    NotADirectory(String),

    IsADirectory(String),

    Unsupported(String),

    InvalidArgument(String),

    MalformedBlob(String),

    Backend(io::Error),
}

impl Error {
    /// The POSIX errno a VFS shim should report for this error.
    ///
    /// Backend errors keep the errno of the underlying I/O error when it has
    /// one and fall back to `EIO` otherwise.
    pub fn errno(&self) -> Errno {
        match self {
            Self::NotFound(_) => Errno::NOENT,
            Self::NotADirectory(_) => Errno::NOTDIR,
            Self::IsADirectory(_) => Errno::ISDIR,
            Self::Unsupported(_) => Errno::NOSYS,
            Self::InvalidArgument(_) => Errno::INVAL,
            Self::MalformedBlob(_) => Errno::IO,
            Self::Backend(err) => Errno::from_io_error(err).unwrap_or(Errno::IO),
        }
    }

    pub fn raw_os_error(&self) -> i32 {
        self.errno().raw_os_error()
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NotFound(path) => write!(f, "not found: {}", path),
            Self::NotADirectory(msg) => write!(f, "not a directory: {}", msg),
            Self::IsADirectory(msg) => write!(f, "is a directory: {}", msg),
            Self::Unsupported(msg) => write!(f, "{} not supported", msg),
            Self::InvalidArgument(msg) => write!(f, "invalid argument: {}", msg),
            Self::MalformedBlob(msg) => write!(f, "malformed blob: {}", msg),
            Self::Backend(err) => write!(f, "storage backend error: {}", err),
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Backend(err) => Some(err),
            _ => None,
        }
    }
}

impl From<binrw::Error> for Error {
    // Records are only ever decoded from bytes already fetched into memory.
    fn from(err: binrw::Error) -> Self {
        Self::MalformedBlob(format!("failed to decode record: {}", err))
    }
}

impl From<Error> for io::Error {
    fn from(err: Error) -> Self {
        match err {
            Error::Backend(err) => err,
            err => {
                let kind = io::Error::from(err.errno()).kind();
                io::Error::new(kind, err)
            }
        }
    }
}

pub type Result<T> = core::result::Result<T, Error>;
