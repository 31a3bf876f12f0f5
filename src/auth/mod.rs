//! Authentication system
//!
//! Handles credential validation and the per-connection login flags.

pub mod credentials;
pub mod validator;

pub use credentials::Credentials;
pub use validator::LoginState;
