//! FTP protocol implementation
//!
//! Command parsing, reply codes, and the per-command handlers.

pub mod commands;
pub mod handlers;
pub mod responses;

pub use commands::{Command, parse_command};
pub use responses::{close_action_for, format_response};
