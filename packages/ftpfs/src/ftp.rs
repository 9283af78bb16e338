//! A minimal passive-mode FTP client.
//!
//! Just enough of RFC 959 and RFC 3659 to browse and download: login,
//! binary mode, `MLSD` listings and `RETR`. Every transfer opens a fresh
//! passive data connection.
//!
//! ```text
//! C: USER anonymous        S: 331
//! C: PASS anonymous@       S: 230
//! C: TYPE I                S: 200
//! C: PASV                  S: 227 Entering Passive Mode (127,0,0,1,195,80)
//! C: MLSD /pub             S: 150 ... data ... 226
//! C: QUIT                  S: 221
//! ```

use std::io::{BufRead, BufReader, Read, Write};
use std::net::{Ipv4Addr, SocketAddr, TcpStream, ToSocketAddrs};
use std::time::Duration;

use bytes::Bytes;

use crate::client::{parse_mlsd_line, RemoteClient, RemoteEntry};
use crate::config::FtpConfig;
use crate::error::FtpError;

/// A parsed server reply. Multi-line replies keep only their last line.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Reply {
    pub code: u16,
    pub message: String,
}

impl Reply {
    fn expect(self, command: &str, accepted: &[u16]) -> Result<Reply, FtpError> {
        if accepted.contains(&self.code) {
            Ok(self)
        } else {
            Err(FtpError::UnexpectedReply {
                command: command.to_string(),
                code: self.code,
                message: self.message,
            })
        }
    }
}

/// An FTP session over one control connection.
pub struct FtpClient {
    control: BufReader<TcpStream>,
    timeout: Duration,
    closed: bool,
}

impl FtpClient {
    /// Connect, log in and switch to binary mode.
    pub fn connect(config: &FtpConfig) -> Result<Self, FtpError> {
        let timeout = config.timeout();
        let stream = connect_any(&config.address(), timeout)?;
        let mut client = Self {
            control: BufReader::new(stream),
            timeout,
            closed: false,
        };
        client.read_reply()?.expect("greeting", &[220])?;
        client.login(&config.user, &config.password)?;
        client.command("TYPE I")?.expect("TYPE I", &[200])?;
        tracing::debug!(address = %config.address(), user = %config.user, "ftp session open");
        Ok(client)
    }

    fn login(&mut self, user: &str, password: &str) -> Result<(), FtpError> {
        let reply = self
            .command(&format!("USER {}", user))?
            .expect("USER", &[230, 331])?;
        if reply.code == 331 {
            self.send_line(&format!("PASS {}", password), "PASS ****")?;
            self.read_reply()?.expect("PASS", &[230, 202])?;
        }
        Ok(())
    }

    /// Send one command line and read its reply.
    pub fn command(&mut self, line: &str) -> Result<Reply, FtpError> {
        self.send_line(line, line)?;
        self.read_reply()
    }

    fn send_line(&mut self, line: &str, logged: &str) -> Result<(), FtpError> {
        if self.closed {
            return Err(FtpError::Closed);
        }
        tracing::trace!(command = logged, "ftp >");
        let stream = self.control.get_mut();
        stream.write_all(line.as_bytes())?;
        stream.write_all(b"\r\n")?;
        stream.flush()?;
        Ok(())
    }

    /// A failed read leaves the control stream at an unknown position, so
    /// the session is closed.
    fn read_line(&mut self) -> Result<String, FtpError> {
        let mut line = String::new();
        match self.control.read_line(&mut line) {
            Ok(0) => {
                self.closed = true;
                Err(FtpError::Closed)
            }
            Ok(_) => Ok(line.trim_end_matches(['\r', '\n']).to_string()),
            Err(e) => {
                self.closed = true;
                Err(e.into())
            }
        }
    }

    /// Read a reply, following `123-` continuation lines to the final
    /// `123 ` line.
    fn read_reply(&mut self) -> Result<Reply, FtpError> {
        let first = self.read_line()?;
        let (code, separator, message) = split_reply(&first)?;
        let mut message = message.to_string();
        if separator == '-' {
            let terminator = format!("{} ", code);
            loop {
                let line = self.read_line()?;
                if let Some(rest) = line.strip_prefix(&terminator) {
                    message = rest.to_string();
                    break;
                }
            }
        }
        tracing::trace!(code, message = %message, "ftp <");
        Ok(Reply { code, message })
    }

    /// Enter passive mode and open the data connection.
    fn passive(&mut self) -> Result<TcpStream, FtpError> {
        let reply = self.command("PASV")?.expect("PASV", &[227])?;
        let address = parse_pasv(&reply.message)?;
        let stream = TcpStream::connect_timeout(&address, self.timeout)?;
        stream.set_read_timeout(Some(self.timeout))?;
        stream.set_write_timeout(Some(self.timeout))?;
        Ok(stream)
    }

    /// Run a command that answers over a data connection and collect what
    /// the server sends.
    fn transfer(&mut self, command: &str) -> Result<Vec<u8>, FtpError> {
        let mut data = self.passive()?;
        self.command(command)?.expect(command, &[125, 150])?;
        let mut content = Vec::new();
        let received = data.read_to_end(&mut content);
        drop(data);
        // The completion reply is consumed even when the data phase failed,
        // so the next command reads its own reply.
        let completion = self.read_reply();
        if let Err(e) = received {
            tracing::debug!(command, error = %e, "data transfer failed");
            return Err(e.into());
        }
        completion?.expect(command, &[226, 250])?;
        tracing::trace!(command, bytes = content.len(), "transfer complete");
        Ok(content)
    }
}

impl RemoteClient for FtpClient {
    fn list(&mut self, path: &str) -> Result<Vec<RemoteEntry>, FtpError> {
        let listing = self.transfer(&format!("MLSD {}", path))?;
        let text = String::from_utf8_lossy(&listing);
        let mut entries = Vec::new();
        for line in text.lines().filter(|l| !l.trim().is_empty()) {
            if let Some(entry) = parse_mlsd_line(line)? {
                entries.push(entry);
            }
        }
        Ok(entries)
    }

    fn retrieve(&mut self, path: &str) -> Result<Bytes, FtpError> {
        Ok(Bytes::from(self.transfer(&format!("RETR {}", path))?))
    }

    fn quit(&mut self) -> Result<(), FtpError> {
        if self.closed {
            return Ok(());
        }
        let reply = self.command("QUIT");
        self.closed = true;
        reply?.expect("QUIT", &[221])?;
        Ok(())
    }
}

impl std::fmt::Debug for FtpClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FtpClient")
            .field("peer", &self.control.get_ref().peer_addr().ok())
            .field("closed", &self.closed)
            .finish()
    }
}

fn connect_any(address: &str, timeout: Duration) -> Result<TcpStream, FtpError> {
    let mut last = None;
    for candidate in address.to_socket_addrs()? {
        match TcpStream::connect_timeout(&candidate, timeout) {
            Ok(stream) => {
                stream.set_read_timeout(Some(timeout))?;
                stream.set_write_timeout(Some(timeout))?;
                return Ok(stream);
            }
            Err(e) => last = Some(e),
        }
    }
    Err(match last {
        Some(e) => e.into(),
        None => FtpError::malformed("address", address),
    })
}

fn split_reply(line: &str) -> Result<(u16, char, &str), FtpError> {
    let code = line
        .get(..3)
        .and_then(|c| c.parse::<u16>().ok())
        .ok_or_else(|| FtpError::malformed("reply", line))?;
    let separator = line[3..].chars().next().unwrap_or(' ');
    if separator != ' ' && separator != '-' {
        return Err(FtpError::malformed("reply", line));
    }
    let message = line.get(4..).unwrap_or("");
    Ok((code, separator, message))
}

/// Parse the `(h1,h2,h3,h4,p1,p2)` address of a 227 reply.
pub fn parse_pasv(message: &str) -> Result<SocketAddr, FtpError> {
    let start = message
        .find('(')
        .ok_or_else(|| FtpError::malformed("PASV reply", message))?;
    let end = message[start..]
        .find(')')
        .map(|i| start + i)
        .ok_or_else(|| FtpError::malformed("PASV reply", message))?;
    let fields = message[start + 1..end]
        .split(',')
        .map(|f| f.trim().parse::<u8>())
        .collect::<Result<Vec<u8>, _>>()
        .map_err(|_| FtpError::malformed("PASV reply", message))?;
    let [a, b, c, d, hi, lo] = fields[..] else {
        return Err(FtpError::malformed("PASV reply", message));
    };
    let port = u16::from(hi) << 8 | u16::from(lo);
    Ok(SocketAddr::from((Ipv4Addr::new(a, b, c, d), port)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_pasv_address() {
        let address = parse_pasv("Entering Passive Mode (127,0,0,1,195,80).").unwrap();
        assert_eq!(address, "127.0.0.1:50000".parse().unwrap());
    }

    #[test]
    fn rejects_bad_pasv() {
        assert!(parse_pasv("Entering Passive Mode").is_err());
        assert!(parse_pasv("(127,0,0,1,195)").is_err());
        assert!(parse_pasv("(127,0,0,1,195,999)").is_err());
    }

    #[test]
    fn splits_reply_lines() {
        assert_eq!(split_reply("220 ready").unwrap(), (220, ' ', "ready"));
        assert_eq!(split_reply("211-Features:").unwrap(), (211, '-', "Features:"));
        assert_eq!(split_reply("200").unwrap(), (200, ' ', ""));
        assert!(split_reply("hello").is_err());
        assert!(split_reply("200x").is_err());
    }

    #[test]
    fn unexpected_code_is_an_error() {
        let reply = Reply {
            code: 550,
            message: "nope".into(),
        };
        assert!(matches!(
            reply.expect("RETR /x", &[150]),
            Err(FtpError::UnexpectedReply { code: 550, .. })
        ));
    }
}
