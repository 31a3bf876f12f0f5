//! Server core functionality
//!
//! The cooperative engine. The host calls [`Server::tick`] once per cycle;
//! each tick advances the control state machine, the data sub-state, drains
//! the send queue and reconciles a finished transfer back to `Ready`. Nothing
//! in here blocks.

use log::{debug, error, info, warn};

use crate::auth::Credentials;
use crate::clock::Clock;
use crate::config::EngineConfig;
use crate::network::{Network, close_slot, is_would_block};
use crate::protocol::{close_action_for, format_response, responses};
use crate::server::session::{ControlState, Session};
use crate::storage::Filesystem;
use crate::transfer::{
    CloseAction, DataEvent, DataState, Destination, Payload, Progress, SendQueue, read_chunk,
    store_chunk,
};
use crate::update::UpdateSink;

/// Backlog requested for the control listener; one client at a time.
const CONTROL_BACKLOG: u8 = 1;

pub struct Server<N, F, U, C> {
    pub(crate) config: EngineConfig,
    pub(crate) credentials: Credentials,
    pub(crate) net: N,
    pub(crate) fs: F,
    pub(crate) updater: U,
    pub(crate) clock: C,
    pub(crate) session: Session,
    pub(crate) queue: SendQueue,
    enabled: bool,
}

impl<N, F, U, C> Server<N, F, U, C>
where
    N: Network,
    F: Filesystem,
    U: UpdateSink,
    C: Clock,
{
    pub fn new(config: EngineConfig, net: N, fs: F, updater: U, clock: C) -> Self {
        let credentials = Credentials::from_config(&config);
        let session = Session::new(&config);
        let queue = SendQueue::new(config.queue_capacity);

        Self {
            config,
            credentials,
            net,
            fs,
            updater,
            clock,
            session,
            queue,
            enabled: false,
        }
    }

    /// Lets the engine leave `Disabled` on the next tick.
    pub fn enable(&mut self) {
        if !self.enabled {
            info!("FTP server enabled");
        }
        self.enabled = true;
    }

    /// Tears everything down and parks the engine in `Disabled`.
    pub fn disable(&mut self) {
        self.reset();
        self.enabled = false;
        self.session.state = ControlState::Disabled;
        info!("FTP server disabled");
    }

    /// Closes every socket, releases the open resource, aborts an update in
    /// progress and returns to `Start` (or `Disabled` when not enabled).
    pub fn reset(&mut self) {
        debug!("Resetting FTP session");
        close_slot(&mut self.net, &mut self.session.control_listener);
        self.session.data.close_all(&mut self.net);
        close_slot(&mut self.net, &mut self.session.control);
        self.release_resources();

        self.queue.clear();
        self.session.login.reset();
        self.session.rename_from = None;
        self.session.command_buf.clear();
        self.session.tx_retries = 0;
        self.session.control_idle_ticks = 0;
        self.session.state = if self.enabled {
            ControlState::Start
        } else {
            ControlState::Disabled
        };
    }

    /// One scheduler cycle.
    pub fn tick(&mut self) {
        self.advance_control();
        self.advance_data();
        self.drain_queue();
        self.reconcile_transfer();
    }

    pub fn state(&self) -> ControlState {
        self.session.state
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    pub fn queued(&self) -> usize {
        self.queue.len()
    }

    pub fn network(&self) -> &N {
        &self.net
    }

    pub fn network_mut(&mut self) -> &mut N {
        &mut self.net
    }

    pub fn filesystem(&self) -> &F {
        &self.fs
    }

    pub fn updater(&self) -> &U {
        &self.updater
    }

    pub fn updater_mut(&mut self) -> &mut U {
        &mut self.updater
    }

    pub fn clock_mut(&mut self) -> &mut C {
        &mut self.clock
    }

    /// Queues a reply on the control connection. The close action follows
    /// from the code.
    pub(crate) fn reply(&mut self, code: u16, message: &str) {
        self.reply_with(code, message, close_action_for(code));
    }

    pub(crate) fn reply_with(&mut self, code: u16, message: &str, close: CloseAction) {
        let line = format_response(code, message);
        debug!("-> {}", line.trim_end());
        self.queue
            .push(Payload::Owned(line.into_bytes()), Destination::Control, close);
    }

    fn advance_control(&mut self) {
        match self.session.state {
            ControlState::Disabled => {
                if self.enabled {
                    self.session.state = ControlState::Start;
                }
            }
            ControlState::Start => self.start_listening(),
            ControlState::Ready => self.serve_ready(),
            ControlState::EndTransfer => {}
            ControlState::ContinueListing => {
                if self.queue.is_empty() {
                    self.continue_listing();
                }
            }
            ControlState::ContinueFileTx => {
                if self.queue.is_empty() {
                    self.continue_file_tx();
                }
            }
            ControlState::ContinueFileRx => {
                if self.queue.is_empty() {
                    self.continue_file_rx();
                }
            }
        }
    }

    fn start_listening(&mut self) {
        if !self.net.is_up() {
            return;
        }

        match self.net.listen(self.config.control_port, CONTROL_BACKLOG) {
            Ok(listener) => {
                info!("Listening for FTP clients on port {}", self.config.control_port);
                self.session.control_listener = Some(listener);
                self.session.state = ControlState::Ready;
            }
            Err(e) => debug!("Control listener not available yet: {}", e),
        }
    }

    fn serve_ready(&mut self) {
        if self.session.control.is_none() && self.session.data.state() == DataState::Disconnected {
            if let Some(listener) = self.session.control_listener {
                match self.net.accept(listener) {
                    Ok(socket) => {
                        info!("Client connected");
                        self.session.begin_client(socket);
                        self.reply(responses::READY, "embedded-ftpd ready");
                        return;
                    }
                    Err(e) if is_would_block(&e) => {}
                    Err(e) => {
                        error!("Accept on control listener failed: {}", e);
                        self.reset();
                        return;
                    }
                }
            }
        }

        if self.queue.is_empty()
            && self.session.control.is_some()
            && self.session.data.state() != DataState::ListenForData
        {
            self.process_command();
        }
    }

    fn continue_listing(&mut self) {
        self.session.control_idle_ticks = 0;
        let session = &mut self.session;
        let chunk = session.listing.next_page(
            &mut self.fs,
            &self.clock,
            &mut session.resource,
            &mut session.transfer_buf,
        );

        self.send_transfer_buffer(chunk.len);
        if chunk.progress == Progress::Complete {
            self.reply(responses::TRANSFER_COMPLETE, "Transfer complete");
            self.session.state = ControlState::EndTransfer;
        }
    }

    fn continue_file_tx(&mut self) {
        self.session.control_idle_ticks = 0;
        let session = &mut self.session;
        let chunk = read_chunk(&mut self.fs, &mut session.resource, &mut session.transfer_buf);

        match chunk.progress {
            Progress::Failed => {
                self.reply(responses::LOCAL_ERROR, "Error reading file");
                self.session.state = ControlState::EndTransfer;
            }
            Progress::Continue => self.send_transfer_buffer(chunk.len),
            Progress::Complete => {
                self.send_transfer_buffer(chunk.len);
                self.reply(responses::TRANSFER_COMPLETE, "Transfer complete");
                self.session.state = ControlState::EndTransfer;
            }
        }
    }

    fn continue_file_rx(&mut self) {
        let Some(socket) = self.session.data.socket() else {
            return;
        };

        let session = &mut self.session;
        match self.net.recv(socket, &mut session.transfer_buf) {
            Ok(0) => {
                debug!("Upload finished");
                if session.updating {
                    session.updating = false;
                    self.updater.finalize();
                }
                session.resource.close(&mut self.fs);
                self.reply(responses::TRANSFER_COMPLETE, "Transfer complete");
                self.session.state = ControlState::EndTransfer;
            }
            Ok(n) => {
                session.data.touch();
                session.control_idle_ticks = 0;
                let progress = store_chunk(
                    &mut self.fs,
                    &mut self.updater,
                    &mut session.resource,
                    session.updating,
                    &session.transfer_buf[..n],
                );
                if progress != Progress::Complete {
                    self.reply(responses::LOCAL_ERROR, "Error writing file");
                    self.session.state = ControlState::EndTransfer;
                }
            }
            Err(e) if is_would_block(&e) => {
                if session.data.idle_expired(self.config.data_timeout_ticks()) {
                    warn!("Upload stalled, aborting");
                    session.resource.close(&mut self.fs);
                    self.reply(responses::TRANSFER_ABORTED, "Transfer aborted");
                    self.session.state = ControlState::EndTransfer;
                }
            }
            Err(e) => {
                warn!("Upload connection failed: {}", e);
                session.resource.close(&mut self.fs);
                self.reply(responses::TRANSFER_ABORTED, "Connection closed; transfer aborted");
                self.session.state = ControlState::EndTransfer;
            }
        }
    }

    fn send_transfer_buffer(&mut self, len: usize) {
        if len > 0 {
            self.queue
                .push(Payload::TransferBuffer(len), Destination::Data, CloseAction::None);
        }
    }

    fn advance_data(&mut self) {
        let control_ready = self.session.state == ControlState::Ready;
        let budget = self.config.data_timeout_ticks();

        match self.session.data.poll(&mut self.net, control_ready, budget) {
            DataEvent::IdleTimedOut => self.release_resources(),
            DataEvent::AcceptFailed => self.reset(),
            DataEvent::Idle | DataEvent::Connected | DataEvent::ListenTimedOut => {}
        }
    }

    /// Sends as much of the queue head as the socket takes.
    fn drain_queue(&mut self) {
        let Some(head) = self.queue.front() else {
            if self.session.state == ControlState::EndTransfer && self.session.data.socket().is_some() {
                debug!("Transfer flushed, closing data channel");
                self.session.data.close_all(&mut self.net);
                self.session.updating = false;
            }
            return;
        };

        let target = match head.destination {
            Destination::Control => self.session.control,
            Destination::Data => self.session.data.socket(),
        };
        let Some(socket) = target else {
            debug!("Dropping {} bytes for closed {:?} socket", head.remaining(), head.destination);
            self.queue.pop();
            return;
        };

        let bytes = match &head.payload {
            Payload::Owned(bytes) => &bytes[head.sent..],
            Payload::TransferBuffer(len) => &self.session.transfer_buf[head.sent..*len],
        };
        let wanted = bytes.len();

        match self.net.send(socket, bytes) {
            Ok(n) if n >= wanted => {
                self.session.tx_retries = 0;
                if let Some(done) = self.queue.pop() {
                    self.apply_close_action(done.close);
                }
            }
            Ok(n) if n > 0 => {
                self.session.tx_retries = 0;
                if let Some(head) = self.queue.front_mut() {
                    head.sent += n;
                }
            }
            Ok(_) => self.retry_send(),
            Err(e) if is_would_block(&e) => self.retry_send(),
            Err(e) => {
                error!("Send failed: {}", e);
                self.reset();
            }
        }
    }

    fn retry_send(&mut self) {
        self.session.tx_retries = self.session.tx_retries.saturating_add(1);
        if self.session.tx_retries > self.config.max_tx_retries {
            error!("Peer stopped reading after {} retries", self.config.max_tx_retries);
            self.reset();
        }
    }

    fn apply_close_action(&mut self, close: CloseAction) {
        match close {
            CloseAction::None => {}
            CloseAction::Data => {
                self.session.data.close_socket(&mut self.net);
                self.release_resources();
            }
            CloseAction::ControlAndData => {
                self.session.data.close_all(&mut self.net);
                close_slot(&mut self.net, &mut self.session.control);
                self.release_resources();
                info!("Client disconnected");
            }
        }
    }

    /// Closes the open file or directory, forgets a listing in progress and
    /// aborts an active update.
    pub(crate) fn release_resources(&mut self) {
        self.session.resource.close(&mut self.fs);
        self.session.listing.reset();
        if self.session.updating {
            self.session.updating = false;
            self.updater.finalize();
        }
    }

    fn reconcile_transfer(&mut self) {
        if self.session.data.socket().is_none() && self.session.state.is_transfer() {
            if self.session.resource.is_open() {
                warn!("Data channel gone with a resource still open");
                self.release_resources();
            }
            self.session.data.mark_disconnected();
            self.session.state = ControlState::Ready;
        }
    }
}
