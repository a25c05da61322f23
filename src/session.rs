//! Session state machine.

use log::{debug, warn};

use super::cancel::CancelHandle;
use super::config::SessionConfig;
use super::control::ControlChannel;
use super::data_stream::DataStream;
use super::status;
use super::transcript::Transcript;
use super::types::{FileType, FtpError, Result, SessionState};

/// A single FTP login: one control connection and at most one data
/// connection, driven by one caller at a time.
///
/// Every operation except [`connect`](Session::connect) requires the
/// session to be [`Connected`](SessionState::Connected) and fails with
/// [`FtpError::NotConnected`] without touching the network otherwise. A
/// fatal error closes both connections and leaves the session
/// `Disconnected`; a fresh `connect` is needed before anything else can be
/// sent.
#[derive(Debug)]
pub struct Session {
    pub(crate) config: SessionConfig,
    state: SessionState,
    pub(crate) control: Option<ControlChannel>,
    pub(crate) data: Option<DataStream>,
    /// The last data command got a `1xx` reply and its completion reply has
    /// not been read yet.
    pub(crate) completion_pending: bool,
    transcript: Transcript,
    pub(crate) cancel: CancelHandle,
}

impl Default for Session {
    fn default() -> Session {
        Session::new(SessionConfig::default())
    }
}

impl Session {
    pub fn new(config: SessionConfig) -> Session {
        Session::with_transcript(config, Transcript::new())
    }

    /// Creates a session that records into an existing transcript.
    pub fn with_transcript(config: SessionConfig, transcript: Transcript) -> Session {
        Session {
            config,
            state: SessionState::Disconnected,
            control: None,
            data: None,
            completion_pending: false,
            transcript,
            cancel: CancelHandle::default(),
        }
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn is_connected(&self) -> bool {
        self.state == SessionState::Connected
    }

    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    /// A handle onto the lines this session records.
    pub fn transcript(&self) -> Transcript {
        self.transcript.clone()
    }

    pub fn cancel_handle(&self) -> CancelHandle {
        self.cancel.clone()
    }

    /// Opens the control connection and logs in.
    ///
    /// The greeting and the `USER` reply are only recorded. The login
    /// succeeds when the `PASS` reply code is below 500; otherwise the error
    /// is [`FtpError::AuthenticationRejected`] and the session is back to
    /// `Disconnected`. Empty `host` and `username` and a missing `port` take
    /// the defaults from [`SessionConfig`]. The transcript is cleared first.
    pub fn connect(
        &mut self,
        host: &str,
        port: Option<u16>,
        username: &str,
        password: &str,
    ) -> Result<()> {
        if self.state != SessionState::Disconnected {
            let err = FtpError::InvalidTransition {
                operation: "connect",
                state: self.state,
            };
            return Err(self.report("FtpConnect", err));
        }

        self.transcript.clear();
        self.cancel.begin();
        self.set_state(SessionState::Connecting);
        let result = match self.login(host, port, username, password) {
            Ok(()) => {
                self.set_state(SessionState::Connected);
                Ok(())
            }
            Err(err) => {
                let err = self.attribute_cancel(err);
                self.shutdown_sockets();
                self.set_state(SessionState::Disconnected);
                Err(self.report("FtpConnect", err))
            }
        };
        self.cancel.finish();
        result
    }

    fn login(
        &mut self,
        host: &str,
        port: Option<u16>,
        username: &str,
        password: &str,
    ) -> Result<()> {
        let host = self.config.host(host).to_string();
        let port = port.unwrap_or(self.config.default_port);
        let username = self.config.username(username).to_string();

        let control = ControlChannel::connect(
            &host,
            port,
            self.config.timeout,
            self.transcript.clone(),
        )?;
        let control = self.control.insert(control);
        self.cancel.watch_control(control.try_clone_stream());
        self.cancel.checkpoint()?;

        let greeting = control.read_reply()?;
        if greeting.code() != status::READY {
            debug!("{}:{} greeted with {}", host, port, greeting);
        }
        control.execute(&format!("USER {}", username))?;
        let reply = control.execute(&format!("PASS {}", password))?;
        if reply.code() >= status::FIRST_PERMANENT_NEGATIVE {
            return Err(FtpError::AuthenticationRejected(reply));
        }
        debug!("logged in to {}:{} as {}", host, port, username);
        Ok(())
    }

    /// Sends `QUIT` and closes the control connection. An open data
    /// connection is aborted first. The session is `Disconnected` afterwards
    /// even when the server misbehaves; the error only reports what went
    /// wrong on the way out.
    pub fn disconnect(&mut self) -> Result<()> {
        match self.state {
            SessionState::Connected => {}
            SessionState::Disconnected => {
                return Err(self.report("FtpDisconnect", FtpError::NotConnected))
            }
            state => {
                let err = FtpError::InvalidTransition {
                    operation: "disconnect",
                    state,
                };
                return Err(self.report("FtpDisconnect", err));
            }
        }

        self.cancel.begin();
        self.set_state(SessionState::Disconnecting);
        let result = self.quit();
        self.shutdown_sockets();
        self.set_state(SessionState::Disconnected);
        let result = result.map_err(|err| {
            let err = self.attribute_cancel(err);
            self.report("FtpDisconnect", err)
        });
        self.cancel.finish();
        result
    }

    fn quit(&mut self) -> Result<()> {
        if self.data_in_progress() {
            self.abort_data()?;
        }
        let reply = self.control_mut()?.execute("QUIT")?;
        if status::is_negative(reply.code()) {
            return Err(FtpError::UnexpectedReply {
                expected: vec![status::CLOSING],
                reply,
            });
        }
        Ok(())
    }

    /// Change the current directory to the path specified.
    pub fn change_directory(&mut self, path: &str) -> Result<()> {
        let command = format!("CWD {}", path);
        self.run("FtpChangeDirectory", |session| {
            session
                .control_mut()?
                .expect(&command, &[status::REQUESTED_FILE_ACTION_OK])
                .map(|_| ())
        })
    }

    /// Gets the current directory
    pub fn print_working_directory(&mut self) -> Result<String> {
        self.run("FtpPrintDirectory", |session| {
            let reply = session
                .control_mut()?
                .expect("PWD", &[status::PATH_CREATED])?;
            let content = reply.message();
            match (content.find('"'), content.rfind('"')) {
                (Some(begin), Some(end)) if begin < end => Ok(content[begin + 1..end].to_string()),
                _ => Err(FtpError::UnexpectedReply {
                    expected: vec![status::PATH_CREATED],
                    reply,
                }),
            }
        })
    }

    /// This does nothing. This is usually just used to keep the connection open.
    pub fn noop(&mut self) -> Result<()> {
        self.run("FtpNoop", |session| {
            session
                .control_mut()?
                .expect("NOOP", &[status::COMMAND_OK])
                .map(|_| ())
        })
    }

    /// Sets the type of file to be transferred. That is the implementation
    /// of `TYPE` command.
    pub fn set_transfer_type(&mut self, file_type: FileType) -> Result<()> {
        let command = format!("TYPE {}", file_type);
        self.run("FtpTransferType", |session| {
            session
                .control_mut()?
                .expect(&command, &[status::COMMAND_OK])
                .map(|_| ())
        })
    }

    /// Runs `op` if the session is connected, and settles the session state
    /// if it fails.
    pub(crate) fn run<T, F>(&mut self, operation: &str, op: F) -> Result<T>
    where
        F: FnOnce(&mut Session) -> Result<T>,
    {
        if self.state != SessionState::Connected {
            return Err(self.report(operation, FtpError::NotConnected));
        }

        self.cancel.begin();
        let result = op(self).map_err(|err| self.recover(operation, err));
        self.cancel.finish();
        result
    }

    /// After a failed operation: keep the session if the control connection
    /// is still in step, otherwise close everything.
    fn recover(&mut self, operation: &str, err: FtpError) -> FtpError {
        let err = self.attribute_cancel(err);
        let control_alive = self.control.as_ref().map_or(false, ControlChannel::is_open);

        if !err.is_fatal() && control_alive && self.data_in_progress() {
            if let Err(abort_err) = self.abort_data() {
                warn!("{}: could not abort data transfer: {}", operation, abort_err);
            }
        }

        let control_alive = self.control.as_ref().map_or(false, ControlChannel::is_open);
        if err.is_fatal() || !control_alive {
            self.shutdown_sockets();
            self.set_state(SessionState::Disconnected);
        }
        self.report(operation, err)
    }

    fn attribute_cancel(&self, err: FtpError) -> FtpError {
        if self.cancel.is_cancelled() {
            FtpError::Cancelled
        } else {
            err
        }
    }

    /// Records a failed operation as `<operation> <message>`.
    fn report(&self, operation: &str, err: FtpError) -> FtpError {
        debug!("{} failed: {}", operation, err);
        self.transcript.append(format!("{} {}", operation, err));
        err
    }

    pub(crate) fn control_mut(&mut self) -> Result<&mut ControlChannel> {
        self.control
            .as_mut()
            .filter(|control| control.is_open())
            .ok_or(FtpError::NotConnected)
    }

    fn data_in_progress(&self) -> bool {
        self.data.is_some() || self.completion_pending
    }

    pub(crate) fn close_data(&mut self) {
        if let Some(data) = self.data.take() {
            data.close();
        }
        self.cancel.watch_data(None);
    }

    fn shutdown_sockets(&mut self) {
        self.close_data();
        self.completion_pending = false;
        if let Some(mut control) = self.control.take() {
            control.close();
        }
        self.cancel.watch_control(None);
    }

    fn set_state(&mut self, state: SessionState) {
        if self.state != state {
            debug!("session {} -> {}", self.state, state);
            self.state = state;
        }
    }
}
