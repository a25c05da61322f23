use std::io::{Read, Result, Write};
use std::net::{Shutdown, TcpStream};
use std::time::Duration;

use log::debug;

use super::control::open_tcp;
use super::types::{DataConnectionDescriptor, FtpError};

/// Data connection for a single listing or transfer.
#[derive(Debug)]
pub(crate) struct DataStream {
    stream: TcpStream,
    descriptor: DataConnectionDescriptor,
}

impl DataStream {
    /// Connects to the address a `227` reply announced, with the same
    /// timeout discipline as the control connection.
    pub(crate) fn open(
        descriptor: DataConnectionDescriptor,
        timeout: Duration,
    ) -> ::std::result::Result<DataStream, FtpError> {
        if descriptor.port == 0 {
            return Err(FtpError::MalformedPasvReply(format!(
                "no usable port in {}",
                descriptor
            )));
        }
        let stream =
            open_tcp(&descriptor.host, descriptor.port, timeout).map_err(FtpError::from_data_io)?;
        debug!("data connection open to {}", descriptor);
        Ok(DataStream { stream, descriptor })
    }

    pub(crate) fn descriptor(&self) -> &DataConnectionDescriptor {
        &self.descriptor
    }

    pub(crate) fn try_clone_stream(&self) -> Option<TcpStream> {
        self.stream.try_clone().ok()
    }

    /// Shuts the socket down in both directions. For an upload this is what
    /// tells the server the file is complete.
    pub(crate) fn close(self) {
        let _ = self.stream.shutdown(Shutdown::Both);
        debug!("data connection to {} closed", self.descriptor);
    }
}

impl Read for DataStream {
    fn read(&mut self, buf: &mut [u8]) -> Result<usize> {
        self.stream.read(buf)
    }
}

impl Write for DataStream {
    fn write(&mut self, buf: &[u8]) -> Result<usize> {
        self.stream.write(buf)
    }

    fn flush(&mut self) -> Result<()> {
        self.stream.flush()
    }
}
