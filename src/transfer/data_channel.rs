//! Passive data channel
//!
//! Owns the data listening socket and the accepted data socket, and advances
//! the `Disconnected -> ListenForData -> DataConnected` sub-state once per tick
//! with its own idle budget.

use log::{debug, error, info, warn};
use std::io;

use crate::network::{Network, SocketHandle, close_slot, is_would_block};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DataState {
    Disconnected,
    ListenForData,
    DataConnected,
}

/// What happened on the data channel during one poll
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DataEvent {
    Idle,
    Connected,
    /// Nobody connected within the budget. The listener stays open so a
    /// repeated PASV gets the same socket.
    ListenTimedOut,
    /// A connected channel sat unused; both sockets were closed and the
    /// caller must release any open resource.
    IdleTimedOut,
    /// Hard accept error; the caller resets the session.
    AcceptFailed,
}

#[derive(Debug)]
pub struct DataChannel {
    port: u16,
    state: DataState,
    listener: Option<SocketHandle>,
    socket: Option<SocketHandle>,
    idle_ticks: u32,
}

impl DataChannel {
    pub fn new(port: u16) -> Self {
        Self {
            port,
            state: DataState::Disconnected,
            listener: None,
            socket: None,
            idle_ticks: 0,
        }
    }

    pub fn port(&self) -> u16 {
        self.port
    }

    pub fn state(&self) -> DataState {
        self.state
    }

    pub fn listener(&self) -> Option<SocketHandle> {
        self.listener
    }

    pub fn socket(&self) -> Option<SocketHandle> {
        self.socket
    }

    pub fn is_connected(&self) -> bool {
        self.state == DataState::DataConnected && self.socket.is_some()
    }

    pub fn touch(&mut self) {
        self.idle_ticks = 0;
    }

    /// Counts one idle tick and reports whether the budget was already spent.
    pub fn idle_expired(&mut self, budget: u32) -> bool {
        let expired = self.idle_ticks > budget;
        self.idle_ticks = self.idle_ticks.saturating_add(1);
        expired
    }

    /// Arms passive mode. Any previous data connection is dropped; the
    /// listening socket is reused if it is still open, so repeated PASV
    /// commands never leak listeners.
    pub fn open_passive<N: Network>(&mut self, net: &mut N) -> io::Result<()> {
        close_slot(net, &mut self.socket);
        self.state = DataState::Disconnected;

        if self.listener.is_none() {
            self.listener = Some(net.listen(self.port, 1)?);
            debug!("Data listener created on port {}", self.port);
        }

        self.idle_ticks = 0;
        self.state = DataState::ListenForData;
        Ok(())
    }

    /// Advances the sub-state. `control_ready` is true while the control
    /// state machine sits in `Ready`, i.e. no transfer is using the channel.
    pub fn poll<N: Network>(&mut self, net: &mut N, control_ready: bool, budget: u32) -> DataEvent {
        match self.state {
            DataState::Disconnected => DataEvent::Idle,
            DataState::ListenForData => {
                let Some(listener) = self.listener else {
                    self.state = DataState::Disconnected;
                    return DataEvent::Idle;
                };
                match net.accept(listener) {
                    Ok(socket) => {
                        info!("Data connection established");
                        self.socket = Some(socket);
                        self.idle_ticks = 0;
                        self.state = DataState::DataConnected;
                        DataEvent::Connected
                    }
                    Err(e) if is_would_block(&e) => {
                        if self.idle_expired(budget) {
                            warn!("No data connection within budget");
                            self.idle_ticks = 0;
                            self.state = DataState::Disconnected;
                            DataEvent::ListenTimedOut
                        } else {
                            DataEvent::Idle
                        }
                    }
                    Err(e) => {
                        error!("Accept on data listener failed: {}", e);
                        DataEvent::AcceptFailed
                    }
                }
            }
            DataState::DataConnected => {
                if control_ready && self.idle_expired(budget) {
                    warn!("Data connection idle, closing");
                    self.close_all(net);
                    DataEvent::IdleTimedOut
                } else {
                    DataEvent::Idle
                }
            }
        }
    }

    /// Closes only the data socket. The listener stays open for a later PASV.
    pub fn close_socket<N: Network>(&mut self, net: &mut N) {
        close_slot(net, &mut self.socket);
        if self.state == DataState::DataConnected {
            self.state = DataState::Disconnected;
        }
    }

    /// Closes the data socket and its listener.
    pub fn close_all<N: Network>(&mut self, net: &mut N) {
        close_slot(net, &mut self.socket);
        close_slot(net, &mut self.listener);
        self.state = DataState::Disconnected;
    }

    pub fn mark_disconnected(&mut self) {
        self.state = DataState::Disconnected;
    }
}
