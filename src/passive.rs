//! PASV negotiation.

use log::debug;
use regex::Regex;

use super::control::ControlChannel;
use super::data_stream::DataStream;
use super::reply::Reply;
use super::session::Session;
use super::status;
use super::types::{DataConnectionDescriptor, FtpError, Result};

lazy_static! {
    // This regex extracts IP and Port details from PASV command response.
    // The regex looks for the pattern (h1,h2,h3,h4,p1,p2).
    static ref PORT_RE: Regex = Regex::new(
        r"\(\s*(\d+)\s*,\s*(\d+)\s*,\s*(\d+)\s*,\s*(\d+)\s*,\s*(\d+)\s*,\s*(\d+)\s*\)"
    ).unwrap();
}

/// Extracts the data connection address from a `227` reply.
///
/// `(h1,h2,h3,h4,p1,p2)` gives `host = "h1.h2.h3.h4"` and
/// `port = p1 * 256 + p2`. Every field must be a decimal byte.
pub fn parse_pasv_reply(reply: &Reply) -> Result<DataConnectionDescriptor> {
    let message = reply.message();
    let caps = PORT_RE
        .captures(message)
        .ok_or_else(|| FtpError::MalformedPasvReply(reply.to_string()))?;

    let mut fields = [0u8; 6];
    for (i, field) in fields.iter_mut().enumerate() {
        *field = caps[i + 1]
            .parse::<u8>()
            .map_err(|_| FtpError::MalformedPasvReply(reply.to_string()))?;
    }

    let [h1, h2, h3, h4, p1, p2] = fields;
    Ok(DataConnectionDescriptor {
        host: format!("{}.{}.{}.{}", h1, h2, h3, h4),
        port: (u16::from(p1) << 8) + u16::from(p2),
    })
}

/// Sends `PASV` and parses the reply. Anything but `227` is `PasvRejected`.
pub(crate) fn request_passive(control: &mut ControlChannel) -> Result<DataConnectionDescriptor> {
    let reply = control.execute("PASV")?;
    if reply.code() != status::PASSIVE_MODE {
        return Err(FtpError::PasvRejected(reply));
    }
    parse_pasv_reply(&reply)
}

impl Session {
    /// Opens the data connection for the next listing or transfer and
    /// returns where it points. While one is already open this sends
    /// nothing and returns the open connection's address.
    pub fn open_data_channel(&mut self) -> Result<DataConnectionDescriptor> {
        self.run("FtpDataConnect", Session::ensure_data_channel)
    }

    pub(crate) fn ensure_data_channel(&mut self) -> Result<DataConnectionDescriptor> {
        if let Some(data) = &self.data {
            debug!("data connection to {} already open", data.descriptor());
            return Ok(data.descriptor().clone());
        }

        let descriptor = request_passive(self.control_mut()?)?;
        let data = DataStream::open(descriptor.clone(), self.config.timeout)?;
        self.cancel.watch_data(data.try_clone_stream());
        self.data = Some(data);
        self.cancel.checkpoint()?;
        Ok(descriptor)
    }
}
