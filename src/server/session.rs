//! Per-connection session state
//!
//! Everything the engine remembers about the one client it serves: sockets,
//! login progress, working path, the open resource and transfer bookkeeping.

use crate::auth::LoginState;
use crate::config::EngineConfig;
use crate::navigate::WorkingPath;
use crate::network::SocketHandle;
use crate::storage::{DirectoryListing, OpenResource};
use crate::transfer::{DataChannel, DataState};

/// Control state machine. Everything after `Ready` is a transfer in flight.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ControlState {
    Disabled,
    Start,
    Ready,
    EndTransfer,
    ContinueListing,
    ContinueFileTx,
    ContinueFileRx,
}

impl ControlState {
    pub fn is_transfer(&self) -> bool {
        matches!(
            self,
            ControlState::EndTransfer
                | ControlState::ContinueListing
                | ControlState::ContinueFileTx
                | ControlState::ContinueFileRx
        )
    }
}

#[derive(Debug)]
pub struct Session {
    pub(crate) state: ControlState,
    pub(crate) control_listener: Option<SocketHandle>,
    pub(crate) control: Option<SocketHandle>,
    pub(crate) data: DataChannel,
    pub(crate) login: LoginState,
    pub(crate) control_idle_ticks: u32,
    pub(crate) tx_retries: u8,
    pub(crate) path: WorkingPath,
    pub(crate) resource: OpenResource,
    /// Upload is being redirected into the update sink.
    pub(crate) updating: bool,
    pub(crate) listing: DirectoryListing,
    pub(crate) transfer_buf: Box<[u8]>,
    /// Source path stashed by RNFR.
    pub(crate) rename_from: Option<String>,
    /// Bytes of a command line not yet terminated by LF.
    pub(crate) command_buf: Vec<u8>,
}

impl Session {
    pub fn new(config: &EngineConfig) -> Self {
        Self {
            state: ControlState::Disabled,
            control_listener: None,
            control: None,
            data: DataChannel::new(config.data_port),
            login: LoginState::default(),
            control_idle_ticks: 0,
            tx_retries: 0,
            path: WorkingPath::new(config.max_path_len),
            resource: OpenResource::None,
            updating: false,
            listing: DirectoryListing::new(config.entries_per_page),
            transfer_buf: vec![0u8; config.buffer_size].into_boxed_slice(),
            rename_from: None,
            command_buf: Vec::new(),
        }
    }

    /// Clears per-client state when a new control connection is accepted.
    pub(crate) fn begin_client(&mut self, control: SocketHandle) {
        self.control = Some(control);
        self.login.reset();
        self.path.reset();
        self.control_idle_ticks = 0;
        self.tx_retries = 0;
        self.rename_from = None;
        self.command_buf.clear();
    }

    pub fn state(&self) -> ControlState {
        self.state
    }

    pub fn data_state(&self) -> DataState {
        self.data.state()
    }

    pub fn working_path(&self) -> &str {
        self.path.as_str()
    }

    pub fn is_logged_in(&self) -> bool {
        self.login.is_logged_in()
    }

    pub fn has_open_resource(&self) -> bool {
        self.resource.is_open()
    }

    pub fn is_updating(&self) -> bool {
        self.updating
    }

    pub fn control_listener(&self) -> Option<SocketHandle> {
        self.control_listener
    }

    pub fn control_socket(&self) -> Option<SocketHandle> {
        self.control
    }

    pub fn data_listener(&self) -> Option<SocketHandle> {
        self.data.listener()
    }

    pub fn data_socket(&self) -> Option<SocketHandle> {
        self.data.socket()
    }
}
