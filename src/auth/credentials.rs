//! Credential storage
//!
//! Holds the single configured account the server accepts.

use crate::config::EngineConfig;

/// The configured username/password pair
#[derive(Debug, Clone)]
pub struct Credentials {
    username: String,
    password: String,
}

impl Credentials {
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            password: password.into(),
        }
    }

    pub fn from_config(config: &EngineConfig) -> Self {
        Self::new(config.username.clone(), config.password.clone())
    }

    /// Exact length-and-content comparison against the configured username.
    pub fn user_matches(&self, candidate: &str) -> bool {
        candidate.len() == self.username.len() && candidate.as_bytes() == self.username.as_bytes()
    }

    /// Exact length-and-content comparison against the configured password.
    pub fn password_matches(&self, candidate: &str) -> bool {
        candidate.len() == self.password.len() && candidate.as_bytes() == self.password.as_bytes()
    }
}
