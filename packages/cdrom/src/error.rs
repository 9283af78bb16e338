//! Driver errors and their mapping onto the block device API.

use strata_block::BlockError;
use strata_scsi::{DecodeError, TransportError};

/// Errors raised by [`CdromDriver`](crate::CdromDriver).
#[derive(thiserror::Error, Debug)]
pub enum DriverError {
    #[error(transparent)]
    Transport(#[from] TransportError),

    #[error(transparent)]
    Decode(#[from] DecodeError),

    #[error("driver not started")]
    NotStarted,

    /// Eject requested while medium removal is prevented.
    #[error("medium removal is prevented")]
    Locked,

    #[error("no medium present")]
    NoMedium,

    #[error("operation not supported: {operation}")]
    Unsupported { operation: &'static str },

    #[error("request at offset {offset} length {length} exceeds device length {device_length}")]
    OutOfBounds {
        offset: u64,
        length: u64,
        device_length: u64,
    },

    #[error("request at offset {offset} length {length} is not aligned to block length {block_length}")]
    Misaligned {
        offset: u64,
        length: u64,
        block_length: u32,
    },

    #[error("driver state lock poisoned")]
    Poisoned,
}

impl From<DriverError> for BlockError {
    fn from(e: DriverError) -> Self {
        match e {
            DriverError::Transport(TransportError::Timeout(_)) => BlockError::Timeout,
            DriverError::Transport(TransportError::Cancelled) => BlockError::Cancelled,
            DriverError::NotStarted => BlockError::NotStarted,
            DriverError::Locked => BlockError::Locked,
            DriverError::NoMedium => BlockError::NoMedium,
            DriverError::Unsupported { operation } => BlockError::Unsupported { operation },
            DriverError::OutOfBounds {
                offset,
                length,
                device_length,
            } => BlockError::OutOfBounds {
                offset,
                length,
                device_length,
            },
            DriverError::Misaligned {
                offset,
                length,
                block_length,
            } => BlockError::Misaligned {
                offset,
                length,
                alignment: block_length,
            },
            other => BlockError::transport(other),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn timeout_and_cancel_stay_distinct() {
        let timeout: BlockError =
            DriverError::from(TransportError::Timeout(Duration::from_secs(1))).into();
        let cancelled: BlockError = DriverError::from(TransportError::Cancelled).into();
        assert!(matches!(timeout, BlockError::Timeout));
        assert!(matches!(cancelled, BlockError::Cancelled));
    }

    #[test]
    fn protocol_errors_are_wrapped() {
        let e: BlockError = DriverError::from(TransportError::protocol(0x28, "medium error")).into();
        match e {
            BlockError::Transport(inner) => {
                let driver = inner.downcast_ref::<DriverError>().unwrap();
                assert!(matches!(
                    driver,
                    DriverError::Transport(TransportError::Protocol { opcode: 0x28, .. })
                ));
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn request_errors_map_directly() {
        let e: BlockError = DriverError::Misaligned {
            offset: 1,
            length: 2048,
            block_length: 2048,
        }
        .into();
        assert!(matches!(e, BlockError::Misaligned { alignment: 2048, .. }));
        let e: BlockError = DriverError::Unsupported { operation: "write" }.into();
        assert!(matches!(e, BlockError::Unsupported { operation: "write" }));
    }
}
