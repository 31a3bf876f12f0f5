//! Command handlers
//!
//! Reads one command line from the control connection per tick and runs it.
//! Every handler ends by queuing exactly one reply.

use log::{debug, info, warn};

use crate::auth::validator::PassOutcome;
use crate::clock::Clock;
use crate::network::{Network, close_slot, is_would_block};
use crate::protocol::commands::{Command, parse_command};
use crate::protocol::responses::*;
use crate::server::{ControlState, Server};
use crate::storage::Filesystem;
use crate::transfer::{CloseAction, open_for_read, open_for_write};
use crate::update::UpdateSink;

/// Bytes pulled from the control socket per read.
const CONTROL_READ_SIZE: usize = 128;

/// Outcome of polling the control socket for a command line
enum LineRead {
    Line(String),
    Pending,
    Closed,
}

impl<N, F, U, C> Server<N, F, U, C>
where
    N: Network,
    F: Filesystem,
    U: UpdateSink,
    C: Clock,
{
    pub(crate) fn process_command(&mut self) {
        let line = match self.read_command_line() {
            LineRead::Line(line) => line,
            LineRead::Pending => {
                let budget = self.config.control_timeout_ticks();
                let idle = self.session.control_idle_ticks;
                self.session.control_idle_ticks = idle.saturating_add(1);
                if idle > budget {
                    info!("Control connection idle, closing");
                    self.reply(GOODBYE, "Idle timeout");
                }
                return;
            }
            LineRead::Closed => {
                info!("Client closed the control connection");
                self.apply_disconnect();
                return;
            }
        };

        self.session.control_idle_ticks = 0;
        let (command, param) = parse_command(&line);
        if command == Command::Pass {
            debug!("<- PASS ****");
        } else {
            debug!("<- {}", line.trim_end());
        }

        if !command.allowed_before_login() && !self.session.login.is_logged_in() {
            self.reply(ACCOUNT_REQUIRED, "Need account for login");
            return;
        }

        match command {
            Command::Feat => self.reply(SYSTEM_STATUS, "no-features"),
            Command::Syst => self.reply(SYSTEM_TYPE, "UNIX Type: L8"),
            Command::Cdup => {
                self.session.path.close_child();
                self.reply(FILE_ACTION_OK, "Directory changed");
            }
            Command::Cwd => self.handle_cwd(param),
            Command::Pwd | Command::Xpwd => {
                let message = format!("\"{}\"", self.session.path.as_str());
                self.reply(PATH_CREATED, &message);
            }
            Command::Size => self.handle_size(param),
            Command::Mdtm => self.handle_mdtm(param),
            Command::Type => self.reply(OK, "Type set"),
            Command::User => {
                self.session.login.submit_user(&self.credentials, param);
                self.reply(PASSWORD_REQUIRED, "Password required");
            }
            Command::Pass => self.handle_pass(param),
            Command::Pasv => self.handle_pasv(),
            Command::List => self.handle_list(),
            Command::Retr => self.handle_retr(param),
            Command::Stor => self.handle_stor(param),
            Command::Dele | Command::Rmd => self.handle_unlink(param),
            Command::Mkd => self.handle_mkd(param),
            Command::Rnfr => self.handle_rnfr(param),
            Command::Rnto => self.handle_rnto(param),
            Command::Noop => self.reply(OK, "OK"),
            Command::Quit => self.reply(GOODBYE, "Goodbye"),
            Command::NotSupported => self.reply(NOT_IMPLEMENTED, "Command not implemented"),
        }
    }

    /// Returns the next complete line, reading more from the socket if the
    /// accumulator holds none. Overlong unterminated input is discarded.
    fn read_command_line(&mut self) -> LineRead {
        if let Some(line) = self.take_buffered_line() {
            return LineRead::Line(line);
        }

        let Some(socket) = self.session.control else {
            return LineRead::Pending;
        };

        let mut chunk = [0u8; CONTROL_READ_SIZE];
        match self.net.recv(socket, &mut chunk) {
            Ok(0) => LineRead::Closed,
            Ok(n) => {
                self.session.control_idle_ticks = 0;
                self.session.command_buf.extend_from_slice(&chunk[..n]);
                match self.take_buffered_line() {
                    Some(line) => LineRead::Line(line),
                    None => {
                        if self.session.command_buf.len() > self.max_line_len() {
                            warn!("Discarding overlong command line");
                            self.session.command_buf.clear();
                        }
                        LineRead::Pending
                    }
                }
            }
            Err(e) if is_would_block(&e) => LineRead::Pending,
            Err(e) => {
                warn!("Control connection failed: {}", e);
                LineRead::Closed
            }
        }
    }

    fn take_buffered_line(&mut self) -> Option<String> {
        let end = self.session.command_buf.iter().position(|&b| b == b'\n')?;
        let raw: Vec<u8> = self.session.command_buf.drain(..=end).collect();
        Some(String::from_utf8_lossy(&raw).into_owned())
    }

    fn max_line_len(&self) -> usize {
        self.config.max_path_len + 16
    }

    /// Peer hung up: drop both channels and wait for the next client.
    fn apply_disconnect(&mut self) {
        self.session.data.close_all(&mut self.net);
        close_slot(&mut self.net, &mut self.session.control);
        self.release_resources();
    }

    /// Resolves `param` against the working path without changing it.
    fn resolve_child(&mut self, param: &str) -> Option<String> {
        let previous = self.session.path.as_str().to_owned();
        if let Err(e) = self.session.path.open_child(param) {
            warn!("Rejected path: {}", e);
            return None;
        }
        let target = self.session.path.as_str().to_owned();
        self.session.path.rollback(param, &previous);
        Some(target)
    }

    fn handle_cwd(&mut self, param: &str) {
        if param.trim_end_matches('/') == ".." {
            self.session.path.close_child();
            self.reply(FILE_ACTION_OK, "Directory changed");
            return;
        }

        let previous = self.session.path.as_str().to_owned();
        if self.session.path.open_child(param).is_err() {
            self.reply(FILE_UNAVAILABLE, "Path too long");
            return;
        }

        let exists = self.session.path.is_root()
            || match self.fs.open_dir(self.session.path.as_str()) {
                Ok(dir) => {
                    self.fs.close_dir(dir);
                    true
                }
                Err(_) => false,
            };

        if exists {
            self.reply(FILE_ACTION_OK, "Directory changed");
        } else {
            self.session.path.rollback(param, &previous);
            self.reply(FILE_UNAVAILABLE, "No such directory");
        }
    }

    fn handle_size(&mut self, param: &str) {
        let stat = self.resolve_child(param).map(|target| self.fs.stat(&target));
        match stat {
            Some(Ok(info)) => self.reply(FILE_STATUS, &info.size.to_string()),
            _ => self.reply(FILE_UNAVAILABLE, "File unavailable"),
        }
    }

    fn handle_mdtm(&mut self, param: &str) {
        let stat = self.resolve_child(param).map(|target| self.fs.stat(&target));
        match stat {
            Some(Ok(info)) => self.reply(FILE_STATUS, &info.modified.mdtm()),
            _ => self.reply(FILE_UNAVAILABLE, "File unavailable"),
        }
    }

    fn handle_pass(&mut self, param: &str) {
        match self.session.login.submit_password(&self.credentials, param) {
            PassOutcome::LoggedIn => {
                info!("User logged in");
                self.reply(LOGIN_SUCCESS, "Login successful");
            }
            PassOutcome::Rejected => {
                let attempts = self.session.login.failed_attempts();
                if attempts >= self.config.max_login_attempts {
                    warn!("Too many failed logins ({}), closing", attempts);
                    self.reply_with(NOT_LOGGED_IN, "Login incorrect", CloseAction::ControlAndData);
                } else {
                    self.reply(NOT_LOGGED_IN, "Login incorrect");
                }
            }
        }
    }

    fn handle_pasv(&mut self) {
        match self.session.data.open_passive(&mut self.net) {
            Ok(()) => {
                let [a, b, c, d] = self.net.local_ipv4().octets();
                let port = self.session.data.port();
                let message = format!(
                    "Entering Passive Mode ({},{},{},{},{},{})",
                    a,
                    b,
                    c,
                    d,
                    port >> 8,
                    port & 0xff
                );
                self.reply(PASSIVE_MODE, &message);
            }
            Err(e) => {
                warn!("Passive listener unavailable: {}", e);
                self.reply(CANT_OPEN_DATA, "Can't open data connection");
            }
        }
    }

    fn require_data_connection(&mut self) -> bool {
        if self.session.data.is_connected() {
            return true;
        }
        self.reply(CANT_OPEN_DATA, "Use PASV first");
        false
    }

    fn handle_list(&mut self) {
        if !self.require_data_connection() {
            return;
        }

        let session = &mut self.session;
        let opened = session
            .listing
            .open(&mut self.fs, &mut session.resource, session.path.as_str());
        match opened {
            Ok(()) => {
                self.session.state = ControlState::ContinueListing;
                self.reply(OPENING_DATA, "Opening data connection");
            }
            Err(e) => {
                debug!("LIST failed: {}", e);
                self.session.state = ControlState::EndTransfer;
                self.reply(e.reply_code(), "Directory unavailable");
            }
        }
    }

    fn handle_retr(&mut self, param: &str) {
        if !self.require_data_connection() {
            return;
        }

        let opened = match self.resolve_child(param) {
            Some(target) => open_for_read(&mut self.fs, &mut self.session.resource, &target).is_ok(),
            None => false,
        };
        if opened {
            self.session.state = ControlState::ContinueFileTx;
            self.reply(OPENING_DATA, "Opening data connection");
        } else {
            self.session.state = ControlState::EndTransfer;
            self.reply(FILE_UNAVAILABLE, "File unavailable");
        }
    }

    fn handle_stor(&mut self, param: &str) {
        if !self.require_data_connection() {
            return;
        }

        let Some(target) = self.resolve_child(param) else {
            self.session.state = ControlState::EndTransfer;
            self.reply(FILE_UNAVAILABLE, "File unavailable");
            return;
        };

        let started = if self.updater.accepts(&target) {
            match self.updater.begin() {
                Ok(()) => {
                    info!("Receiving update image");
                    self.session.updating = true;
                    true
                }
                Err(e) => {
                    warn!("Update refused: {}", e);
                    self.updater.finalize();
                    false
                }
            }
        } else {
            open_for_write(&mut self.fs, &mut self.session.resource, &target).is_ok()
        };

        if started {
            self.session.data.touch();
            self.session.state = ControlState::ContinueFileRx;
            self.reply(OPENING_DATA, "Opening data connection");
        } else {
            self.session.state = ControlState::EndTransfer;
            self.reply(FILE_UNAVAILABLE, "File unavailable");
        }
    }

    fn handle_unlink(&mut self, param: &str) {
        let removed = self
            .resolve_child(param)
            .map(|target| self.fs.unlink(&target));
        match removed {
            Some(Ok(())) => self.reply(FILE_ACTION_OK, "Removed"),
            _ => self.reply(FILE_UNAVAILABLE, "Remove failed"),
        }
    }

    fn handle_mkd(&mut self, param: &str) {
        let created = self.resolve_child(param).map(|target| self.fs.mkdir(&target));
        match created {
            Some(Ok(())) => self.reply(FILE_ACTION_OK, "Directory created"),
            _ => self.reply(FILE_UNAVAILABLE, "Create failed"),
        }
    }

    fn handle_rnfr(&mut self, param: &str) {
        let source = self
            .resolve_child(param)
            .filter(|target| self.fs.stat(target).is_ok());
        match source {
            Some(target) => {
                self.session.rename_from = Some(target);
                self.reply(PENDING_FURTHER_INFO, "Ready for RNTO");
            }
            None => {
                self.session.rename_from = None;
                self.reply(FILE_UNAVAILABLE, "File unavailable");
            }
        }
    }

    fn handle_rnto(&mut self, param: &str) {
        let Some(from) = self.session.rename_from.take() else {
            self.reply(FILE_UNAVAILABLE, "RNFR required first");
            return;
        };

        let renamed = self
            .resolve_child(param)
            .map(|target| self.fs.rename(&from, &target));
        match renamed {
            Some(Ok(())) => self.reply(FILE_ACTION_OK, "Renamed"),
            _ => self.reply(FILE_UNAVAILABLE, "Rename failed"),
        }
    }
}
