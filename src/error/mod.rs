//! Error handling
//!
//! Defines error types for the FTP engine and its collaborators.

pub mod types;

pub use types::*;
