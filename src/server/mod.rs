//! Server core functionality
//!
//! The tick-driven engine and the session state it owns.

pub mod core;
pub mod session;

pub use core::Server;
pub use session::{ControlState, Session};
