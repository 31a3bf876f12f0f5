//! Host network backend
//!
//! Implements the collaborator on top of `std::net` sockets switched to
//! non-blocking mode, so the workstation build behaves like the firmware.

use log::{debug, info};
use std::collections::HashMap;
use std::io::{self, Read, Write};
use std::net::{Ipv4Addr, SocketAddrV4, TcpListener, TcpStream};

use super::socket::{Network, SocketHandle};

enum HostSocket {
    Listener(TcpListener),
    Stream(TcpStream),
}

pub struct HostNetwork {
    bind_address: Ipv4Addr,
    advertise_address: Ipv4Addr,
    sockets: HashMap<u32, HostSocket>,
    next_id: u32,
}

impl HostNetwork {
    pub fn new(bind_address: Ipv4Addr, advertise_address: Ipv4Addr) -> Self {
        Self {
            bind_address,
            advertise_address,
            sockets: HashMap::new(),
            next_id: 1,
        }
    }

    fn register(&mut self, socket: HostSocket) -> SocketHandle {
        let id = self.next_id;
        self.next_id = self.next_id.wrapping_add(1).max(1);
        self.sockets.insert(id, socket);
        SocketHandle(id)
    }

    fn stream(&mut self, socket: SocketHandle) -> io::Result<&mut TcpStream> {
        match self.sockets.get_mut(&socket.0) {
            Some(HostSocket::Stream(stream)) => Ok(stream),
            _ => Err(io::Error::new(
                io::ErrorKind::NotConnected,
                format!("socket {} is not a connected stream", socket.0),
            )),
        }
    }
}

impl Network for HostNetwork {
    fn is_up(&self) -> bool {
        true
    }

    fn local_ipv4(&self) -> Ipv4Addr {
        self.advertise_address
    }

    fn listen(&mut self, port: u16, _backlog: u8) -> io::Result<SocketHandle> {
        let listener = TcpListener::bind(SocketAddrV4::new(self.bind_address, port))?;
        listener.set_nonblocking(true)?;
        info!("Listening on {}:{}", self.bind_address, port);
        Ok(self.register(HostSocket::Listener(listener)))
    }

    fn accept(&mut self, listener: SocketHandle) -> io::Result<SocketHandle> {
        let stream = match self.sockets.get(&listener.0) {
            Some(HostSocket::Listener(l)) => {
                let (stream, peer) = l.accept()?;
                debug!("Accepted connection from {}", peer);
                stream
            }
            _ => {
                return Err(io::Error::new(
                    io::ErrorKind::NotConnected,
                    format!("socket {} is not listening", listener.0),
                ));
            }
        };
        stream.set_nonblocking(true)?;
        stream.set_nodelay(true)?;
        Ok(self.register(HostSocket::Stream(stream)))
    }

    fn send(&mut self, socket: SocketHandle, data: &[u8]) -> io::Result<usize> {
        self.stream(socket)?.write(data)
    }

    fn recv(&mut self, socket: SocketHandle, buf: &mut [u8]) -> io::Result<usize> {
        self.stream(socket)?.read(buf)
    }

    fn close(&mut self, socket: SocketHandle) {
        if let Some(HostSocket::Stream(stream)) = self.sockets.remove(&socket.0) {
            let _ = stream.shutdown(std::net::Shutdown::Both);
        }
    }
}
