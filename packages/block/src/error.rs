//! Error types for block devices.
//!
//! Device-specific failures travel inside `Transport` so the original error
//! (with sense data, for SCSI devices) stays reachable through `source()`.

/// Errors from block device operations.
#[derive(thiserror::Error, Debug)]
pub enum BlockError {
    /// Device or transport failure.
    #[error("transport error: {0}")]
    Transport(#[source] Box<dyn std::error::Error + Send + Sync>),

    /// The device did not answer in time.
    #[error("device timed out")]
    Timeout,

    /// A blocking wait was cancelled.
    #[error("operation cancelled")]
    Cancelled,

    /// The device cannot perform this operation (e.g. writing a CD-ROM).
    #[error("operation not supported: {operation}")]
    Unsupported { operation: &'static str },

    /// Medium removal is prevented.
    #[error("device is locked")]
    Locked,

    /// No medium is present.
    #[error("no medium")]
    NoMedium,

    /// The request extends past the end of the device.
    #[error("request at offset {offset} length {length} exceeds device length {device_length}")]
    OutOfBounds {
        offset: u64,
        length: u64,
        device_length: u64,
    },

    /// The request is not aligned to the device's block size.
    #[error("request at offset {offset} length {length} is not aligned to {alignment}")]
    Misaligned {
        offset: u64,
        length: u64,
        alignment: u32,
    },

    /// The driver has not been started (or has been stopped).
    #[error("device not started")]
    NotStarted,
}

impl BlockError {
    pub fn transport(e: impl std::error::Error + Send + Sync + 'static) -> Self {
        BlockError::Transport(Box::new(e))
    }
}

impl From<std::io::Error> for BlockError {
    fn from(e: std::io::Error) -> Self {
        BlockError::Transport(Box::new(e))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::error::Error as StdError;

    #[test]
    fn display_messages() {
        let e = BlockError::Unsupported { operation: "write" };
        assert_eq!(format!("{}", e), "operation not supported: write");

        let e = BlockError::OutOfBounds {
            offset: 10,
            length: 5,
            device_length: 12,
        };
        assert!(format!("{}", e).contains("exceeds device length 12"));
    }

    #[test]
    fn transport_keeps_source() {
        let io = std::io::Error::new(std::io::ErrorKind::Other, "bus reset");
        let e: BlockError = io.into();
        assert!(StdError::source(&e).is_some());
        assert!(format!("{}", e).contains("bus reset"));
        match e {
            BlockError::Transport(inner) => {
                assert!(inner.downcast_ref::<std::io::Error>().is_some())
            }
            _ => panic!("expected transport"),
        }
    }
}
