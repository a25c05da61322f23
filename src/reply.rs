//! Control channel reply lines.

use std::fmt;
use std::str::FromStr;

use crate::types::{FtpError, Result};

/// One parsed reply line: `NNN text` or, for the opening line of a
/// multi-line reply, `NNN-text`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reply {
    code: u16,
    message: String,
    is_multi_line: bool,
}

impl Reply {
    /// Parse a single line, with or without its trailing `\r\n`.
    ///
    /// Only the leading three digits are interpreted. The line is rejected
    /// when they are not digits, when the value is outside `100..=599`, or
    /// when the fourth character is neither a space nor a hyphen.
    pub fn parse(line: &str) -> Result<Reply> {
        let line = line.trim_end_matches(|c| c == '\r' || c == '\n');
        let bytes = line.as_bytes();
        if bytes.len() < 3 || !bytes[..3].iter().all(u8::is_ascii_digit) {
            return Err(FtpError::MalformedReply(line.to_string()));
        }
        let code = bytes[..3]
            .iter()
            .fold(0u16, |acc, b| acc * 10 + u16::from(b - b'0'));
        if !(100..600).contains(&code) {
            return Err(FtpError::MalformedReply(line.to_string()));
        }

        let (is_multi_line, message) = match bytes.get(3) {
            None => (false, ""),
            Some(b' ') => (false, &line[4..]),
            Some(b'-') => (true, &line[4..]),
            Some(_) => return Err(FtpError::MalformedReply(line.to_string())),
        };

        Ok(Reply {
            code,
            message: message.to_string(),
            is_multi_line,
        })
    }

    #[cfg(test)]
    pub(crate) fn new(code: u16, message: impl Into<String>) -> Reply {
        Reply {
            code,
            message: message.into(),
            is_multi_line: false,
        }
    }

    pub fn code(&self) -> u16 {
        self.code
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    /// True when the reply opened with `NNN-`, whatever followed it.
    pub fn is_multi_line(&self) -> bool {
        self.is_multi_line
    }

    /// Whether `line` closes the multi-line reply this one opened.
    pub(crate) fn is_terminated_by(&self, line: &str) -> bool {
        let bytes = line.as_bytes();
        bytes.len() >= 3
            && bytes.get(3).map_or(true, |b| *b == b' ')
            && bytes[..3] == *self.code.to_string().as_bytes()
    }

    pub(crate) fn into_multi_line(mut self) -> Reply {
        self.is_multi_line = true;
        self
    }
}

impl FromStr for Reply {
    type Err = FtpError;

    fn from_str(s: &str) -> Result<Reply> {
        Reply::parse(s)
    }
}

impl fmt::Display for Reply {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let sep = if self.is_multi_line { '-' } else { ' ' };
        if self.message.is_empty() && !self.is_multi_line {
            write!(f, "{}", self.code)
        } else {
            write!(f, "{}{}{}", self.code, sep, self.message)
        }
    }
}
