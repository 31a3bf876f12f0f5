//! Navigate module
//!
//! Tracks the client's working directory and the child/parent transitions
//! every path-taking command goes through.

mod operations;

pub use operations::WorkingPath;
