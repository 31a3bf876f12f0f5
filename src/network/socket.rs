//! Socket handles and the network trait

use std::io;
use std::net::Ipv4Addr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SocketHandle(pub u32);

pub trait Network {
    /// Whether the interface is up and has an address.
    fn is_up(&self) -> bool;

    /// Address advertised to clients in the PASV reply.
    fn local_ipv4(&self) -> Ipv4Addr;

    /// Creates a non-blocking listening socket bound to `port`.
    fn listen(&mut self, port: u16, backlog: u8) -> io::Result<SocketHandle>;

    /// Accepts one pending connection or fails with `WouldBlock`.
    fn accept(&mut self, listener: SocketHandle) -> io::Result<SocketHandle>;

    /// Sends as much of `data` as the socket accepts.
    fn send(&mut self, socket: SocketHandle, data: &[u8]) -> io::Result<usize>;

    /// Receives into `buf`; `Ok(0)` means the peer closed the connection.
    fn recv(&mut self, socket: SocketHandle, buf: &mut [u8]) -> io::Result<usize>;

    fn close(&mut self, socket: SocketHandle);
}

pub fn is_would_block(err: &io::Error) -> bool {
    err.kind() == io::ErrorKind::WouldBlock
}

/// Closes the socket held in `slot`, leaving it empty.
pub fn close_slot<N: Network>(net: &mut N, slot: &mut Option<SocketHandle>) {
    if let Some(socket) = slot.take() {
        net.close(socket);
    }
}
