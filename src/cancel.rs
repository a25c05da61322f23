//! Interrupting a blocked session from another thread.

use std::net::{Shutdown, TcpStream};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use log::debug;

use crate::types::{FtpError, Result};

#[derive(Debug, Default)]
struct Sockets {
    in_flight: bool,
    cancelled: bool,
    control: Option<TcpStream>,
    data: Option<TcpStream>,
}

/// Cancels whatever call its [`Session`](crate::Session) is blocked in.
///
/// A live data connection is shut down first, which ends the transfer and
/// leaves the control connection free to send `ABOR`. Without one the
/// control connection itself is shut down and the session ends up
/// disconnected. Either way the interrupted call returns
/// [`FtpError::Cancelled`]. Cancelling while no call is running does
/// nothing, so it has no effect on the next call.
#[derive(Debug, Clone, Default)]
pub struct CancelHandle {
    sockets: Arc<Mutex<Sockets>>,
}

impl CancelHandle {
    pub fn cancel(&self) {
        let mut sockets = self.lock();
        if !sockets.in_flight {
            debug!("cancel: session is idle");
            return;
        }
        sockets.cancelled = true;
        if let Some(data) = &sockets.data {
            debug!("cancel: shutting down data connection");
            let _ = data.shutdown(Shutdown::Both);
        } else if let Some(control) = &sockets.control {
            debug!("cancel: shutting down control connection");
            let _ = control.shutdown(Shutdown::Both);
        }
    }

    pub fn is_cancelled(&self) -> bool {
        self.lock().cancelled
    }

    /// Marks the start of a caller-facing call. Only from here until
    /// [`finish`](CancelHandle::finish) does `cancel` touch the sockets.
    pub(crate) fn begin(&self) {
        let mut sockets = self.lock();
        sockets.in_flight = true;
        sockets.cancelled = false;
    }

    pub(crate) fn finish(&self) {
        let mut sockets = self.lock();
        sockets.in_flight = false;
        sockets.cancelled = false;
    }

    /// Fails with `Cancelled` if a cancel arrived since the call began.
    pub(crate) fn checkpoint(&self) -> Result<()> {
        if self.is_cancelled() {
            Err(FtpError::Cancelled)
        } else {
            Ok(())
        }
    }

    pub(crate) fn watch_control(&self, stream: Option<TcpStream>) {
        self.lock().control = stream;
    }

    pub(crate) fn watch_data(&self, stream: Option<TcpStream>) {
        self.lock().data = stream;
    }

    fn lock(&self) -> MutexGuard<'_, Sockets> {
        self.sockets.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
