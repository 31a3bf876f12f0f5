//! Network collaborator
//!
//! Non-blocking socket primitives. Every call returns immediately;
//! `io::ErrorKind::WouldBlock` is the "try again next tick" outcome and is
//! distinct from a hard failure.

pub mod host;
pub mod socket;

pub use host::HostNetwork;
pub use socket::{Network, SocketHandle, close_slot, is_would_block};
