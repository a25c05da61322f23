//! Per-session settings.

use std::time::Duration;

pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);
pub const DEFAULT_HOST: &str = "localhost";
pub const DEFAULT_PORT: u16 = 21;
pub const DEFAULT_USERNAME: &str = "anonymous";

/// Settings applied to every operation of a [`Session`](crate::Session).
///
/// The timeout bounds each individual socket connect, read and write, not
/// a whole operation: logging in takes several round trips and may run for
/// several multiples of it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionConfig {
    pub timeout: Duration,
    /// Used when `connect` is given an empty host.
    pub default_host: String,
    /// Used when `connect` is given no port.
    pub default_port: u16,
    /// Used when `connect` is given an empty username.
    pub default_username: String,
    /// Chunk size for file transfers.
    pub buffer_size: usize,
}

impl Default for SessionConfig {
    fn default() -> SessionConfig {
        SessionConfig {
            timeout: DEFAULT_TIMEOUT,
            default_host: DEFAULT_HOST.to_string(),
            default_port: DEFAULT_PORT,
            default_username: DEFAULT_USERNAME.to_string(),
            buffer_size: 8 * 1024,
        }
    }
}

impl SessionConfig {
    pub fn with_timeout(mut self, timeout: Duration) -> SessionConfig {
        self.timeout = timeout;
        self
    }

    pub fn with_default_host<S: Into<String>>(mut self, host: S) -> SessionConfig {
        self.default_host = host.into();
        self
    }

    pub fn with_default_port(mut self, port: u16) -> SessionConfig {
        self.default_port = port;
        self
    }

    pub fn with_default_username<S: Into<String>>(mut self, username: S) -> SessionConfig {
        self.default_username = username.into();
        self
    }

    pub fn with_buffer_size(mut self, size: usize) -> SessionConfig {
        self.buffer_size = size.max(1);
        self
    }

    pub(crate) fn host<'a>(&'a self, host: &'a str) -> &'a str {
        if host.is_empty() {
            &self.default_host
        } else {
            host
        }
    }

    pub(crate) fn username<'a>(&'a self, username: &'a str) -> &'a str {
        if username.is_empty() {
            &self.default_username
        } else {
            username
        }
    }
}
