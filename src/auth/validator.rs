//! Login validation
//!
//! Implements the USER/PASS handshake. The two flags are independent and both
//! must be set before any other command is accepted.

use super::credentials::Credentials;

/// Outcome of a PASS attempt
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PassOutcome {
    LoggedIn,
    Rejected,
}

/// Login flags for the current control connection
#[derive(Debug, Default, Clone)]
pub struct LoginState {
    user_valid: bool,
    pass_valid: bool,
    failed_attempts: u8,
}

impl LoginState {
    /// Clears both flags and the failure counter.
    pub fn reset(&mut self) {
        *self = Self::default();
    }

    pub fn is_logged_in(&self) -> bool {
        self.user_valid && self.pass_valid
    }

    pub fn failed_attempts(&self) -> u8 {
        self.failed_attempts
    }

    /// Records the USER argument. The reply is always 331, so the caller
    /// never learns whether it was the username that was wrong.
    pub fn submit_user(&mut self, credentials: &Credentials, username: &str) {
        self.user_valid = credentials.user_matches(username);
        self.pass_valid = false;
    }

    /// Checks the PASS argument against the configured password.
    pub fn submit_password(&mut self, credentials: &Credentials, password: &str) -> PassOutcome {
        if self.user_valid && credentials.password_matches(password) {
            self.pass_valid = true;
            self.failed_attempts = 0;
            PassOutcome::LoggedIn
        } else {
            self.pass_valid = false;
            self.failed_attempts = self.failed_attempts.saturating_add(1);
            PassOutcome::Rejected
        }
    }
}
