//! Errors and the values passed across the session API.

use std::fmt;
use std::io;
use std::path::PathBuf;

use thiserror::Error;

use crate::reply::Reply;

/// A shorthand for a Result whose error type is always an FtpError.
pub type Result<T> = ::std::result::Result<T, FtpError>;

/// `FtpError` is a library-global error type to describe the different kinds of
/// errors that might occur while driving an FTP session.
#[derive(Debug, Error)]
pub enum FtpError {
    #[error("timed out connecting to {0}")]
    ConnectTimeout(String),
    #[error("could not connect to {addr}: {source}")]
    ConnectRefused {
        addr: String,
        #[source]
        source: io::Error,
    },
    #[error("timed out waiting for the server")]
    OperationTimeout,
    #[error("connection closed by the server")]
    ConnectionClosed,
    #[error("control connection error: {0}")]
    Transport(#[source] io::Error),
    #[error("malformed reply: {0:?}")]
    MalformedReply(String),
    #[error("PASV rejected: {0}")]
    PasvRejected(Reply),
    #[error("malformed PASV reply: {0}")]
    MalformedPasvReply(String),
    #[error("data connection error: {0}")]
    DataChannel(#[source] io::Error),
    #[error("login rejected: {0}")]
    AuthenticationRejected(Reply),
    #[error("LIST failed: {0}")]
    ListFailed(Reply),
    #[error("transfer failed: {0}")]
    TransferFailed(Reply),
    #[error("unexpected reply, wanted {expected:?}: {reply}")]
    UnexpectedReply { expected: Vec<u16>, reply: Reply },
    #[error("local file not found: {}", .0.display())]
    LocalFileNotFound(PathBuf),
    #[error("local I/O error on {}: {source}", .path.display())]
    LocalIo {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("not connected")]
    NotConnected,
    #[error("cannot {operation} while {state}")]
    InvalidTransition {
        operation: &'static str,
        state: SessionState,
    },
    #[error("operation cancelled")]
    Cancelled,
}

impl FtpError {
    /// Whether the error leaves the control connection in an unknown state.
    ///
    /// The session closes every socket and drops back to
    /// [`SessionState::Disconnected`] after a fatal error. Non-fatal errors
    /// were reported by a well-formed reply, so the reply stream is still in
    /// step and the session stays usable.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            FtpError::ConnectTimeout(_)
                | FtpError::ConnectRefused { .. }
                | FtpError::OperationTimeout
                | FtpError::ConnectionClosed
                | FtpError::Transport(_)
                | FtpError::MalformedReply(_)
        )
    }

    /// The reply code carried by the error, if the server sent one.
    pub fn reply_code(&self) -> Option<u16> {
        match self {
            FtpError::PasvRejected(reply)
            | FtpError::AuthenticationRejected(reply)
            | FtpError::ListFailed(reply)
            | FtpError::TransferFailed(reply)
            | FtpError::UnexpectedReply { reply, .. } => Some(reply.code()),
            _ => None,
        }
    }

    pub(crate) fn from_control_io(err: io::Error) -> FtpError {
        if is_timeout(&err) {
            FtpError::OperationTimeout
        } else {
            FtpError::Transport(err)
        }
    }

    pub(crate) fn from_data_io(err: io::Error) -> FtpError {
        if is_timeout(&err) {
            FtpError::OperationTimeout
        } else {
            FtpError::DataChannel(err)
        }
    }
}

/// Socket timeouts surface as `WouldBlock` on Unix and `TimedOut` on Windows.
pub(crate) fn is_timeout(err: &io::Error) -> bool {
    matches!(
        err.kind(),
        io::ErrorKind::WouldBlock | io::ErrorKind::TimedOut
    )
}

/// Lifecycle states of a [`Session`](crate::Session).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SessionState {
    Disconnected,
    Connecting,
    Connected,
    Disconnecting,
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let name = match self {
            SessionState::Disconnected => "disconnected",
            SessionState::Connecting => "connecting",
            SessionState::Connected => "connected",
            SessionState::Disconnecting => "disconnecting",
        };
        f.write_str(name)
    }
}

/// Where to open the data connection, as announced by a `227` reply.
///
/// A descriptor is good for exactly one data operation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DataConnectionDescriptor {
    pub host: String,
    pub port: u16,
}

impl fmt::Display for DataConnectionDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}:{}", self.host, self.port)
    }
}

/// One name from a `LIST` response.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RemoteEntry {
    pub name: String,
}

impl RemoteEntry {
    /// Takes the last whitespace separated token of a listing line as the
    /// name. Type, size, date and permissions are not interpreted, and names
    /// containing spaces come back truncated to their last word.
    pub fn from_list_line(line: &str) -> Option<RemoteEntry> {
        line.split_whitespace().last().map(|name| RemoteEntry {
            name: name.to_string(),
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransferDirection {
    Upload,
    Download,
}

/// A single `STOR` or `RETR`.
///
/// For uploads `local_path` is the source file, for downloads it is the
/// directory the file lands in.
#[derive(Debug, Clone)]
pub struct TransferRequest {
    pub direction: TransferDirection,
    pub local_path: PathBuf,
    pub remote_name: String,
}

impl TransferRequest {
    pub(crate) fn command(&self) -> String {
        match self.direction {
            TransferDirection::Upload => format!("STOR {}", self.remote_name),
            TransferDirection::Download => format!("RETR {}", self.remote_name),
        }
    }
}

/// Text Format Control used in `TYPE` command
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FormatControl {
    /// Default text format control (is NonPrint)
    Default,
    /// Non-print (not destined for printing)
    NonPrint,
    /// Telnet format control (\<CR\>, \<FF\>, etc.)
    Telnet,
    /// ASA (Fortran) Carriage Control
    Asa,
}

/// File Type used in `TYPE` command
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileType {
    /// ASCII text (the argument is the text format control)
    Ascii(FormatControl),
    /// EBCDIC text (the argument is the text format control)
    Ebcdic(FormatControl),
    /// Image,
    Image,
    /// Binary (the synonym to Image)
    Binary,
    /// Local format (the argument is the number of bits in one byte on local machine)
    Local(u8),
}

impl fmt::Display for FormatControl {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            FormatControl::Default | FormatControl::NonPrint => f.write_str("N"),
            FormatControl::Telnet => f.write_str("T"),
            FormatControl::Asa => f.write_str("C"),
        }
    }
}

impl fmt::Display for FileType {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            FileType::Ascii(fc) => write!(f, "A {}", fc),
            FileType::Ebcdic(fc) => write!(f, "E {}", fc),
            FileType::Image | FileType::Binary => f.write_str("I"),
            FileType::Local(bits) => write!(f, "L {}", bits),
        }
    }
}
