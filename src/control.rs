//! Control connection.

use std::io::{self, BufRead, BufReader, Write};
use std::net::{Shutdown, SocketAddr, TcpStream, ToSocketAddrs};
use std::time::Duration;

use log::{debug, trace};

use super::reply::Reply;
use super::transcript::Transcript;
use super::types::{FtpError, Result};

/// Command connection to the server. Every read and write is bounded by the
/// timeout given to [`ControlChannel::connect`]; any transport failure
/// closes the channel, so a channel that is still open always sits between
/// two complete replies.
#[derive(Debug)]
pub struct ControlChannel {
    reader: Option<BufReader<TcpStream>>,
    transcript: Transcript,
}

impl ControlChannel {
    /// Opens the command connection. The greeting is left unread.
    pub fn connect(
        host: &str,
        port: u16,
        timeout: Duration,
        transcript: Transcript,
    ) -> Result<ControlChannel> {
        let addr = format!("{}:{}", host, port);
        let stream = open_tcp(host, port, timeout).map_err(|err| {
            if err.kind() == io::ErrorKind::TimedOut {
                FtpError::ConnectTimeout(addr.clone())
            } else {
                FtpError::ConnectRefused {
                    addr: addr.clone(),
                    source: err,
                }
            }
        })?;
        debug!("control connection open to {}", addr);
        Ok(ControlChannel {
            reader: Some(BufReader::new(stream)),
            transcript,
        })
    }

    pub fn is_open(&self) -> bool {
        self.reader.is_some()
    }

    pub fn peer_addr(&self) -> Option<SocketAddr> {
        self.reader
            .as_ref()
            .and_then(|reader| reader.get_ref().peer_addr().ok())
    }

    /// Writes `command` followed by CRLF. The text is not checked.
    pub fn send_command(&mut self, command: &str) -> Result<()> {
        let reader = self.reader.as_mut().ok_or(FtpError::NotConnected)?;
        if command.starts_with("PASS ") {
            trace!(">>> PASS ****");
        } else {
            trace!(">>> {}", command);
        }

        let mut line = Vec::with_capacity(command.len() + 2);
        line.extend_from_slice(command.as_bytes());
        line.extend_from_slice(b"\r\n");
        let stream = reader.get_mut();
        if let Err(err) = stream.write_all(&line).and_then(|_| stream.flush()) {
            self.close();
            return Err(FtpError::from_control_io(err));
        }
        Ok(())
    }

    /// Reads one reply. Each line is appended to the transcript before it is
    /// parsed, so the transcript shows what arrived even when parsing fails.
    ///
    /// For a multi-line reply the lines up to the closing `NNN ` line are
    /// consumed and the closing line is returned, flagged as multi-line.
    pub fn read_reply(&mut self) -> Result<Reply> {
        let line = self.read_line()?;
        let first = self.parse(&line)?;
        if !first.is_multi_line() {
            return Ok(first);
        }

        loop {
            let line = self.read_line()?;
            if first.is_terminated_by(&line) {
                return self.parse(&line).map(Reply::into_multi_line);
            }
            trace!("continuation of {} reply: {}", first.code(), line);
        }
    }

    /// Sends `command` and reads its reply.
    pub fn execute(&mut self, command: &str) -> Result<Reply> {
        self.send_command(command)?;
        self.read_reply()
    }

    /// Sends `command` and fails unless the reply code is one of `expected`.
    pub fn expect(&mut self, command: &str, expected: &[u16]) -> Result<Reply> {
        let reply = self.execute(command)?;
        if expected.contains(&reply.code()) {
            Ok(reply)
        } else {
            Err(FtpError::UnexpectedReply {
                expected: expected.to_vec(),
                reply,
            })
        }
    }

    /// Releases the socket. Safe to call on a closed channel.
    pub fn close(&mut self) {
        if let Some(reader) = self.reader.take() {
            let _ = reader.get_ref().shutdown(Shutdown::Both);
            debug!("control connection closed");
        }
    }

    pub(crate) fn try_clone_stream(&self) -> Option<TcpStream> {
        self.reader
            .as_ref()
            .and_then(|reader| reader.get_ref().try_clone().ok())
    }

    fn read_line(&mut self) -> Result<String> {
        let reader = self.reader.as_mut().ok_or(FtpError::NotConnected)?;
        let mut buf = Vec::new();
        match reader.read_until(b'\n', &mut buf) {
            Ok(0) => {
                self.close();
                return Err(FtpError::ConnectionClosed);
            }
            Ok(_) => {}
            Err(err) => {
                self.close();
                return Err(FtpError::from_control_io(err));
            }
        }

        let line = String::from_utf8_lossy(&buf)
            .trim_end_matches(|c| c == '\r' || c == '\n')
            .to_string();
        trace!("<<< {}", line);
        self.transcript.append(line.clone());
        Ok(line)
    }

    fn parse(&mut self, line: &str) -> Result<Reply> {
        Reply::parse(line).map_err(|err| {
            self.close();
            err
        })
    }
}

impl Drop for ControlChannel {
    fn drop(&mut self) {
        self.close();
    }
}

/// Connects to the first address `host` resolves to that accepts within
/// `timeout`, then applies `timeout` to every read and write on the socket.
pub(crate) fn open_tcp(host: &str, port: u16, timeout: Duration) -> io::Result<TcpStream> {
    let mut last_err = None;
    for addr in (host, port).to_socket_addrs()? {
        match TcpStream::connect_timeout(&addr, timeout) {
            Ok(stream) => {
                stream.set_read_timeout(Some(timeout))?;
                stream.set_write_timeout(Some(timeout))?;
                return Ok(stream);
            }
            Err(err) => last_err = Some(err),
        }
    }
    Err(last_err.unwrap_or_else(|| {
        io::Error::new(
            io::ErrorKind::AddrNotAvailable,
            format!("{}:{} did not resolve to any address", host, port),
        )
    }))
}
