//! FTP response handling
//!
//! Reply codes, reply formatting, and which sockets a reply closes once sent.

use crate::transfer::CloseAction;

pub const OPENING_DATA: u16 = 150;
pub const OK: u16 = 200;
pub const SYSTEM_STATUS: u16 = 211;
pub const FILE_STATUS: u16 = 213;
pub const SYSTEM_TYPE: u16 = 215;
pub const READY: u16 = 220;
pub const GOODBYE: u16 = 221;
pub const TRANSFER_COMPLETE: u16 = 226;
pub const PASSIVE_MODE: u16 = 227;
pub const LOGIN_SUCCESS: u16 = 230;
pub const FILE_ACTION_OK: u16 = 250;
pub const PATH_CREATED: u16 = 257;
pub const PASSWORD_REQUIRED: u16 = 331;
pub const ACCOUNT_REQUIRED: u16 = 332;
pub const PENDING_FURTHER_INFO: u16 = 350;
pub const CANT_OPEN_DATA: u16 = 425;
pub const TRANSFER_ABORTED: u16 = 426;
pub const LOCAL_ERROR: u16 = 451;
pub const NOT_IMPLEMENTED: u16 = 502;
pub const NOT_LOGGED_IN: u16 = 530;
pub const FILE_UNAVAILABLE: u16 = 550;

/// Format an FTP response line
pub fn format_response(code: u16, message: &str) -> String {
    format!("{} {}\r\n", code, message)
}

/// Sockets a reply closes after it has been sent: the goodbye tears down the
/// whole connection, transfer errors drop the data channel.
pub fn close_action_for(code: u16) -> CloseAction {
    match code {
        GOODBYE => CloseAction::ControlAndData,
        TRANSFER_ABORTED | LOCAL_ERROR | FILE_UNAVAILABLE => CloseAction::Data,
        _ => CloseAction::None,
    }
}
