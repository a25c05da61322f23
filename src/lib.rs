//! ftp_session is a blocking, passive-mode FTP client session engine.
//!
//! A [`Session`] owns one control connection and opens a short-lived data
//! connection (negotiated with `PASV`) for every listing and transfer.
//! Commands are strictly serial: each data connection is closed and its
//! completion reply read before the next command goes out. Every reply
//! line the session reads is appended to its [`Transcript`], along with a
//! line for each failed operation.
//!
//! ### Usage
//!
//! Here is a basic usage example:
//!
//! ```rust,no_run
//! use ftp_session::{Session, SessionConfig};
//!
//! let mut session = Session::new(SessionConfig::default());
//! session.connect("127.0.0.1", Some(21), "anonymous", "guest").unwrap_or_else(|err|
//!     panic!("{}", err)
//! );
//! for entry in session.list_remote_files().unwrap() {
//!     println!("{}", entry.name);
//! }
//! let _ = session.disconnect();
//! ```
//!
//! Traffic is logged through the `log` crate: commands and reply lines at
//! `trace`, connection and state changes at `debug`, possibly truncated
//! files at `warn`.

#[macro_use]
extern crate lazy_static;

mod cancel;
mod control;
mod data_stream;
mod passive;
mod session;
mod transfer;

pub mod config;
pub mod reply;
pub mod status;
pub mod transcript;
pub mod types;

pub use self::cancel::CancelHandle;
pub use self::config::SessionConfig;
pub use self::control::ControlChannel;
pub use self::passive::parse_pasv_reply;
pub use self::reply::Reply;
pub use self::session::Session;
pub use self::transcript::{Transcript, TranscriptLine};
pub use self::types::{
    DataConnectionDescriptor, FileType, FormatControl, FtpError, RemoteEntry, Result, SessionState,
    TransferDirection, TransferRequest,
};
