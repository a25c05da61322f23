//! Reply codes the session engine reacts to.

// 1xx: Positive Preliminary Reply
pub const ALREADY_OPEN: u16 = 125;
pub const ABOUT_TO_SEND: u16 = 150;

// 2xx: Positive Completion Reply
pub const COMMAND_OK: u16 = 200;
pub const READY: u16 = 220;
pub const CLOSING: u16 = 221;
pub const DATA_CONNECTION_OPEN: u16 = 225;
pub const CLOSING_DATA_CONNECTION: u16 = 226;
pub const PASSIVE_MODE: u16 = 227;
pub const LOGGED_IN: u16 = 230;
pub const REQUESTED_FILE_ACTION_OK: u16 = 250;
pub const PATH_CREATED: u16 = 257;

// 3xx: Positive intermediate Reply
pub const NEED_PASSWORD: u16 = 331;

// 4xx: Transient Negative Completion Reply
pub const CANNOT_OPEN_DATA_CONNECTION: u16 = 425;
pub const TRANSFER_ABORTED: u16 = 426;

// 5xx: Permanent Negative Completion Reply
pub const BAD_COMMAND: u16 = 500;
pub const NOT_LOGGED_IN: u16 = 530;
pub const FILE_UNAVAILABLE: u16 = 550;

/// Smallest code that counts as a failed transfer or listing.
pub const FIRST_NEGATIVE: u16 = 400;

/// Smallest PASS reply code that counts as a rejected login.
pub const FIRST_PERMANENT_NEGATIVE: u16 = BAD_COMMAND;

/// Whether `code` is a 4xx or 5xx reply.
pub fn is_negative(code: u16) -> bool {
    code >= FIRST_NEGATIVE
}
