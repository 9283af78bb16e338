//! FTP errors.

use strata_vfs::FsError;

#[derive(thiserror::Error, Debug)]
pub enum FtpError {
    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),

    #[error("invalid url: {0}")]
    Url(#[from] url::ParseError),

    /// The server answered with a code the command does not accept.
    #[error("unexpected reply to {command}: {code} {message}")]
    UnexpectedReply {
        command: String,
        code: u16,
        message: String,
    },

    /// A reply or listing line could not be parsed.
    #[error("malformed {what}: {line}")]
    Malformed { what: &'static str, line: String },

    #[error("connection closed")]
    Closed,
}

impl FtpError {
    pub(crate) fn malformed(what: &'static str, line: impl Into<String>) -> Self {
        FtpError::Malformed {
            what,
            line: line.into(),
        }
    }
}

impl From<FtpError> for FsError {
    fn from(e: FtpError) -> Self {
        FsError::remote(e)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn maps_to_remote() {
        let e: FsError = FtpError::UnexpectedReply {
            command: "RETR /a".into(),
            code: 550,
            message: "No such file".into(),
        }
        .into();
        assert!(matches!(e, FsError::Remote(_)));
        assert!(e.to_string().contains("550 No such file"));
    }
}
