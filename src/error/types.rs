//! Error types
//!
//! Defines domain-specific error types for the collaborators the engine drives.

use std::fmt;
use std::io;

/// Filesystem collaborator errors
#[derive(Debug)]
pub enum FsError {
    NotFound(String),
    AlreadyExists(String),
    NotADirectory(String),
    InvalidPath(String),
    PermissionDenied(String),
    InvalidHandle,
    Io(io::Error),
}

impl FsError {
    /// Reply code sent to the client when a filesystem action fails.
    pub fn reply_code(&self) -> u16 {
        550
    }
}

impl fmt::Display for FsError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FsError::NotFound(p) => write!(f, "Not found: {}", p),
            FsError::AlreadyExists(p) => write!(f, "Already exists: {}", p),
            FsError::NotADirectory(p) => write!(f, "Not a directory: {}", p),
            FsError::InvalidPath(p) => write!(f, "Invalid path: {}", p),
            FsError::PermissionDenied(p) => write!(f, "Permission denied: {}", p),
            FsError::InvalidHandle => write!(f, "Stale file or directory handle"),
            FsError::Io(e) => write!(f, "IO error: {}", e),
        }
    }
}

impl std::error::Error for FsError {}

impl From<io::Error> for FsError {
    fn from(error: io::Error) -> Self {
        match error.kind() {
            io::ErrorKind::NotFound => FsError::NotFound(error.to_string()),
            io::ErrorKind::AlreadyExists => FsError::AlreadyExists(error.to_string()),
            io::ErrorKind::PermissionDenied => FsError::PermissionDenied(error.to_string()),
            _ => FsError::Io(error),
        }
    }
}

/// Firmware update sink errors
#[derive(Debug)]
pub enum UpdateError {
    Busy,
    NotStarted,
    Write(String),
    Io(io::Error),
}

impl fmt::Display for UpdateError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            UpdateError::Busy => write!(f, "Update sink is busy"),
            UpdateError::NotStarted => write!(f, "No update in progress"),
            UpdateError::Write(msg) => write!(f, "Update write failed: {}", msg),
            UpdateError::Io(e) => write!(f, "IO error: {}", e),
        }
    }
}

impl std::error::Error for UpdateError {}

impl From<io::Error> for UpdateError {
    fn from(error: io::Error) -> Self {
        UpdateError::Io(error)
    }
}

/// Navigate module errors
#[derive(Debug, PartialEq)]
pub enum NavigateError {
    PathTooLong(usize),
}

impl fmt::Display for NavigateError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NavigateError::PathTooLong(len) => write!(f, "Path too long: {} bytes", len),
        }
    }
}

impl std::error::Error for NavigateError {}

/// General server error used while bringing the host runtime up
#[derive(Debug)]
pub enum FtpServerError {
    Config(config::ConfigError),
    Storage(FsError),
    IoError(io::Error),
}

impl fmt::Display for FtpServerError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FtpServerError::Config(e) => write!(f, "Configuration error: {}", e),
            FtpServerError::Storage(e) => write!(f, "Storage error: {}", e),
            FtpServerError::IoError(e) => write!(f, "I/O error: {}", e),
        }
    }
}

impl std::error::Error for FtpServerError {}

impl From<config::ConfigError> for FtpServerError {
    fn from(error: config::ConfigError) -> Self {
        FtpServerError::Config(error)
    }
}

impl From<FsError> for FtpServerError {
    fn from(error: FsError) -> Self {
        FtpServerError::Storage(error)
    }
}

impl From<io::Error> for FtpServerError {
    fn from(error: io::Error) -> Self {
        FtpServerError::IoError(error)
    }
}
