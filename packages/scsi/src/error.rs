//! Error types for the command and transport layers.

use std::time::Duration;

use crate::sense::SenseData;

/// A response buffer could not be decoded.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum DecodeError {
    #[error("{what} response too short: expected at least {expected} bytes, got {actual}")]
    TooShort {
        what: &'static str,
        expected: usize,
        actual: usize,
    },
}

/// Failure of a single `execute_command` call.
///
/// The transport never retries; callers decide whether to issue the command
/// again.
#[derive(thiserror::Error, Debug, Clone)]
pub enum TransportError {
    /// The device rejected the command or reported a failure.
    #[error("command {opcode:#04x} failed: {message}{}", sense_suffix(.sense))]
    Protocol {
        opcode: u8,
        message: String,
        sense: Option<SenseData>,
    },

    /// No response within the caller's deadline.
    #[error("command timed out after {0:?}")]
    Timeout(Duration),

    /// The wait was interrupted through a [`CancelToken`](crate::CancelToken).
    #[error("command cancelled")]
    Cancelled,

    /// The device answered with a malformed response.
    #[error("malformed response: {0}")]
    Decode(#[from] DecodeError),
}

impl TransportError {
    /// Build a protocol error without sense data.
    pub fn protocol(opcode: u8, message: impl Into<String>) -> Self {
        TransportError::Protocol {
            opcode,
            message: message.into(),
            sense: None,
        }
    }

    /// Sense data attached to a protocol error, if any.
    pub fn sense(&self) -> Option<&SenseData> {
        match self {
            TransportError::Protocol { sense, .. } => sense.as_ref(),
            _ => None,
        }
    }
}

fn sense_suffix(sense: &Option<SenseData>) -> String {
    match sense {
        Some(sense) => format!(" ({})", sense),
        None => String::new(),
    }
}
