//! Outbound send queue
//!
//! Bounded FIFO of pending transmissions. Each entry names the socket slot it
//! goes to rather than a socket, so an entry whose socket closed underneath it
//! is simply dropped when it reaches the head.

use std::collections::VecDeque;

use log::warn;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Destination {
    Control,
    Data,
}

/// Sockets to close once the entry has been sent
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CloseAction {
    None,
    Data,
    ControlAndData,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Payload {
    /// A reply line owned by the entry.
    Owned(Vec<u8>),
    /// The first `n` bytes of the session's transfer buffer.
    TransferBuffer(usize),
}

impl Payload {
    pub fn len(&self) -> usize {
        match self {
            Payload::Owned(bytes) => bytes.len(),
            Payload::TransferBuffer(len) => *len,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Pending {
    pub payload: Payload,
    pub destination: Destination,
    pub close: CloseAction,
    /// Bytes of the payload already accepted by the socket.
    pub sent: usize,
}

impl Pending {
    pub fn remaining(&self) -> usize {
        self.payload.len().saturating_sub(self.sent)
    }
}

#[derive(Debug)]
pub struct SendQueue {
    entries: VecDeque<Pending>,
    capacity: usize,
}

impl SendQueue {
    pub fn new(capacity: usize) -> Self {
        Self {
            entries: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    /// Appends an entry. A full queue discards the payload: replies are
    /// recovered by the client's own timeout.
    pub fn push(&mut self, payload: Payload, destination: Destination, close: CloseAction) -> bool {
        if self.entries.len() >= self.capacity {
            warn!(
                "Send queue full ({} entries), dropping {} bytes for {:?}",
                self.capacity,
                payload.len(),
                destination
            );
            return false;
        }

        self.entries.push_back(Pending {
            payload,
            destination,
            close,
            sent: 0,
        });
        true
    }

    pub fn front(&self) -> Option<&Pending> {
        self.entries.front()
    }

    pub fn front_mut(&mut self) -> Option<&mut Pending> {
        self.entries.front_mut()
    }

    pub fn pop(&mut self) -> Option<Pending> {
        self.entries.pop_front()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }
}
