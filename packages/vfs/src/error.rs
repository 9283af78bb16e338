//! Error types for the filesystem layer.

use strata_block::BlockError;

/// Errors from filesystem objects, filesystem types and the namespace.
///
/// `InvalidObject` and `Closed` are kept apart so callers can tell an
/// individually deleted object from one whose filesystem was torn down.
#[derive(thiserror::Error, Debug)]
pub enum FsError {
    /// The object was removed from its tree.
    #[error("object is no longer valid")]
    InvalidObject,

    /// The owning filesystem has been closed.
    #[error("filesystem is closed")]
    Closed,

    #[error("not found: {0}")]
    NotFound(String),

    #[error("already exists: {0}")]
    AlreadyExists(String),

    /// A budgeted filesystem cannot grant the requested space.
    #[error("filesystem full: {requested} bytes requested, {available} available")]
    Full { requested: u64, available: u64 },

    #[error("filesystem is read-only")]
    ReadOnly,

    #[error("operation not supported: {0}")]
    Unsupported(String),

    #[error("not a directory: {0}")]
    NotADirectory(String),

    #[error("not a file: {0}")]
    NotAFile(String),

    /// A read or write started past the end of the file.
    #[error("offset {offset} is past end of file (length {length})")]
    OutOfRange { offset: u64, length: u64 },

    /// A length does not fit in memory on this platform.
    #[error("length {0} is too large")]
    TooLarge(u64),

    #[error("device error: {0}")]
    Device(#[from] BlockError),

    /// Failure talking to a remote server.
    #[error("remote error: {0}")]
    Remote(#[source] Box<dyn std::error::Error + Send + Sync>),

    #[error("filesystem lock poisoned")]
    Poisoned,

    #[error("invalid path: {0}")]
    InvalidPath(String),

    #[error("nothing mounted at {0}")]
    NoMount(String),

    #[error("unknown filesystem type: {0}")]
    UnknownType(String),
}

impl FsError {
    pub fn remote(e: impl std::error::Error + Send + Sync + 'static) -> Self {
        FsError::Remote(Box::new(e))
    }

    pub fn unsupported(operation: impl Into<String>) -> Self {
        FsError::Unsupported(operation.into())
    }

    /// True for errors meaning "the object no longer exists", either
    /// individually or because its filesystem closed.
    pub fn is_gone(&self) -> bool {
        matches!(self, FsError::InvalidObject | FsError::Closed)
    }
}

/// Result alias used throughout the filesystem crates.
pub type Result<T> = std::result::Result<T, FsError>;

#[cfg(test)]
mod tests {
    use super::*;
    use std::error::Error as StdError;

    #[test]
    fn display_messages() {
        assert_eq!(
            FsError::Full {
                requested: 256,
                available: 100
            }
            .to_string(),
            "filesystem full: 256 bytes requested, 100 available"
        );
        assert_eq!(FsError::Closed.to_string(), "filesystem is closed");
        assert_eq!(
            FsError::NoMount("/x".into()).to_string(),
            "nothing mounted at /x"
        );
    }

    #[test]
    fn device_errors_convert() {
        let e: FsError = BlockError::NoMedium.into();
        assert!(matches!(e, FsError::Device(BlockError::NoMedium)));
        assert!(e.source().is_some());
    }

    #[test]
    fn remote_keeps_source() {
        let io = std::io::Error::new(std::io::ErrorKind::ConnectionReset, "reset");
        let e = FsError::remote(io);
        assert!(e.to_string().contains("reset"));
        assert!(e.source().is_some());
    }

    #[test]
    fn gone_errors() {
        assert!(FsError::Closed.is_gone());
        assert!(FsError::InvalidObject.is_gone());
        assert!(!FsError::ReadOnly.is_gone());
    }
}
