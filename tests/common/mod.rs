//! In-memory collaborators for driving the engine tick by tick.

#![allow(dead_code)]

use std::collections::{BTreeMap, BTreeSet, HashMap, VecDeque};
use std::io;
use std::net::Ipv4Addr;

use chrono::{NaiveDate, NaiveDateTime};

use embedded_ftpd::Server;
use embedded_ftpd::clock::Clock;
use embedded_ftpd::config::EngineConfig;
use embedded_ftpd::error::{FsError, UpdateError};
use embedded_ftpd::network::{Network, SocketHandle};
use embedded_ftpd::server::ControlState;
use embedded_ftpd::storage::{DirHandle, FatTimestamp, FileHandle, FileInfo, Filesystem, OpenMode};
use embedded_ftpd::update::UpdateSink;

pub const CONTROL_PORT: u16 = 21;
pub const DATA_PORT: u16 = 2024;
pub const UPDATE_PATH: &str = "/flash/sys/mcuimg.bin";

pub type TestServer = Server<MockNet, MemFs, MockUpdater, FixedClock>;

// ---------------------------------------------------------------- network

#[derive(Default)]
struct MockStream {
    inbound: VecDeque<u8>,
    outbound: Vec<u8>,
    peer_closed: bool,
    open: bool,
}

/// Scripted network. Clients "connect" to a port and wait until the engine
/// accepts them; test code then plays the peer side of each stream.
pub struct MockNet {
    pub up: bool,
    pub ip: Ipv4Addr,
    /// Every send fails with WouldBlock while set.
    pub block_sends: bool,
    /// Caps the bytes accepted per send call.
    pub send_limit: Option<usize>,
    pub listen_calls: usize,
    next_id: u32,
    listeners: HashMap<u32, u16>,
    waiting: HashMap<u16, VecDeque<u32>>,
    streams: HashMap<u32, MockStream>,
}

impl MockNet {
    pub fn new() -> Self {
        Self {
            up: true,
            ip: Ipv4Addr::new(192, 168, 1, 10),
            block_sends: false,
            send_limit: None,
            listen_calls: 0,
            next_id: 1,
            listeners: HashMap::new(),
            waiting: HashMap::new(),
            streams: HashMap::new(),
        }
    }

    fn allocate(&mut self) -> u32 {
        let id = self.next_id;
        self.next_id += 1;
        id
    }

    /// Queues a client connection on `port`; returns the id of the stream the
    /// engine will see once it accepts.
    pub fn connect(&mut self, port: u16) -> u32 {
        let id = self.allocate();
        self.streams.insert(
            id,
            MockStream {
                open: true,
                ..MockStream::default()
            },
        );
        self.waiting.entry(port).or_default().push_back(id);
        id
    }

    pub fn client_send(&mut self, conn: u32, data: &[u8]) {
        if let Some(stream) = self.streams.get_mut(&conn) {
            stream.inbound.extend(data.iter().copied());
        }
    }

    pub fn client_close(&mut self, conn: u32) {
        if let Some(stream) = self.streams.get_mut(&conn) {
            stream.peer_closed = true;
        }
    }

    /// Everything the engine has sent on `conn` since the last call.
    pub fn take_output(&mut self, conn: u32) -> Vec<u8> {
        self.streams
            .get_mut(&conn)
            .map(|stream| std::mem::take(&mut stream.outbound))
            .unwrap_or_default()
    }

    pub fn take_text(&mut self, conn: u32) -> String {
        String::from_utf8_lossy(&self.take_output(conn)).into_owned()
    }

    /// True until the engine closes its end.
    pub fn is_open(&self, conn: u32) -> bool {
        self.streams.get(&conn).map(|s| s.open).unwrap_or(false)
    }

    pub fn listener_on(&self, port: u16) -> Option<SocketHandle> {
        self.listeners
            .iter()
            .find(|(_, p)| **p == port)
            .map(|(id, _)| SocketHandle(*id))
    }
}

fn would_block() -> io::Error {
    io::Error::new(io::ErrorKind::WouldBlock, "would block")
}

impl Network for MockNet {
    fn is_up(&self) -> bool {
        self.up
    }

    fn local_ipv4(&self) -> Ipv4Addr {
        self.ip
    }

    fn listen(&mut self, port: u16, _backlog: u8) -> io::Result<SocketHandle> {
        if self.listener_on(port).is_some() {
            return Err(io::Error::new(io::ErrorKind::AddrInUse, "port in use"));
        }
        self.listen_calls += 1;
        let id = self.allocate();
        self.listeners.insert(id, port);
        Ok(SocketHandle(id))
    }

    fn accept(&mut self, listener: SocketHandle) -> io::Result<SocketHandle> {
        let port = *self
            .listeners
            .get(&listener.0)
            .ok_or_else(|| io::Error::new(io::ErrorKind::InvalidInput, "not a listener"))?;
        match self.waiting.get_mut(&port).and_then(|queue| queue.pop_front()) {
            Some(id) => Ok(SocketHandle(id)),
            None => Err(would_block()),
        }
    }

    fn send(&mut self, socket: SocketHandle, data: &[u8]) -> io::Result<usize> {
        if self.block_sends {
            return Err(would_block());
        }
        let limit = self.send_limit.unwrap_or(usize::MAX);
        let stream = self
            .streams
            .get_mut(&socket.0)
            .filter(|s| s.open)
            .ok_or_else(|| io::Error::new(io::ErrorKind::NotConnected, "closed"))?;
        let n = data.len().min(limit);
        stream.outbound.extend_from_slice(&data[..n]);
        Ok(n)
    }

    fn recv(&mut self, socket: SocketHandle, buf: &mut [u8]) -> io::Result<usize> {
        let stream = self
            .streams
            .get_mut(&socket.0)
            .filter(|s| s.open)
            .ok_or_else(|| io::Error::new(io::ErrorKind::NotConnected, "closed"))?;
        if stream.inbound.is_empty() {
            return if stream.peer_closed {
                Ok(0)
            } else {
                Err(would_block())
            };
        }
        let n = buf.len().min(stream.inbound.len());
        for (slot, byte) in buf.iter_mut().zip(stream.inbound.drain(..n)) {
            *slot = byte;
        }
        Ok(n)
    }

    fn close(&mut self, socket: SocketHandle) {
        if self.listeners.remove(&socket.0).is_some() {
            return;
        }
        if let Some(stream) = self.streams.get_mut(&socket.0) {
            stream.open = false;
        }
    }
}

// ------------------------------------------------------------- filesystem

struct OpenFile {
    path: String,
    pos: usize,
}

/// Flat map of absolute paths. `/` is implicit; its children are volumes.
pub struct MemFs {
    pub modified: FatTimestamp,
    files: BTreeMap<String, Vec<u8>>,
    dirs: BTreeSet<String>,
    open_files: HashMap<u32, OpenFile>,
    open_dirs: HashMap<u32, VecDeque<FileInfo>>,
    next_id: u32,
}

fn parent_of(path: &str) -> &str {
    match path.rfind('/') {
        Some(0) | None => "/",
        Some(idx) => &path[..idx],
    }
}

fn name_of(path: &str) -> &str {
    path.rsplit('/').next().unwrap_or(path)
}

impl MemFs {
    pub fn new() -> Self {
        Self {
            modified: FatTimestamp::from_datetime(&at(2015, 6, 1, 12, 30)),
            files: BTreeMap::new(),
            dirs: BTreeSet::new(),
            open_files: HashMap::new(),
            open_dirs: HashMap::new(),
            next_id: 1,
        }
    }

    pub fn with_dir(mut self, path: &str) -> Self {
        self.dirs.insert(path.to_string());
        self
    }

    pub fn with_file(mut self, path: &str, content: &[u8]) -> Self {
        self.files.insert(path.to_string(), content.to_vec());
        self
    }

    pub fn file(&self, path: &str) -> Option<&[u8]> {
        self.files.get(path).map(Vec::as_slice)
    }

    pub fn has_dir(&self, path: &str) -> bool {
        self.dirs.contains(path)
    }

    pub fn open_handles(&self) -> usize {
        self.open_files.len() + self.open_dirs.len()
    }

    fn dir_exists(&self, path: &str) -> bool {
        path == "/" || self.dirs.contains(path)
    }

    fn id(&mut self) -> u32 {
        let id = self.next_id;
        self.next_id += 1;
        id
    }

    fn info(&self, path: &str) -> Option<FileInfo> {
        if let Some(content) = self.files.get(path) {
            return Some(FileInfo {
                name: name_of(path).to_string(),
                size: content.len() as u64,
                modified: self.modified,
                is_directory: false,
            });
        }
        self.dirs.contains(path).then(|| FileInfo {
            name: name_of(path).to_string(),
            size: 0,
            modified: self.modified,
            is_directory: true,
        })
    }
}

impl Filesystem for MemFs {
    fn open(&mut self, path: &str, mode: OpenMode) -> Result<FileHandle, FsError> {
        match mode {
            OpenMode::Read => {
                if !self.files.contains_key(path) {
                    return Err(FsError::NotFound(path.to_string()));
                }
            }
            OpenMode::WriteTruncate => {
                if !self.dirs.contains(parent_of(path)) {
                    return Err(FsError::NotFound(path.to_string()));
                }
                self.files.insert(path.to_string(), Vec::new());
            }
        }
        let id = self.id();
        self.open_files.insert(
            id,
            OpenFile {
                path: path.to_string(),
                pos: 0,
            },
        );
        Ok(FileHandle(id))
    }

    fn read(&mut self, file: FileHandle, buf: &mut [u8]) -> Result<usize, FsError> {
        let open = self.open_files.get_mut(&file.0).ok_or(FsError::InvalidHandle)?;
        let content = self.files.get(&open.path).ok_or(FsError::InvalidHandle)?;
        let n = buf.len().min(content.len() - open.pos);
        buf[..n].copy_from_slice(&content[open.pos..open.pos + n]);
        open.pos += n;
        Ok(n)
    }

    fn write(&mut self, file: FileHandle, buf: &[u8]) -> Result<usize, FsError> {
        let open = self.open_files.get(&file.0).ok_or(FsError::InvalidHandle)?;
        let content = self.files.get_mut(&open.path).ok_or(FsError::InvalidHandle)?;
        content.extend_from_slice(buf);
        Ok(buf.len())
    }

    fn close(&mut self, file: FileHandle) {
        self.open_files.remove(&file.0);
    }

    fn stat(&mut self, path: &str) -> Result<FileInfo, FsError> {
        self.info(path).ok_or_else(|| FsError::NotFound(path.to_string()))
    }

    fn open_dir(&mut self, path: &str) -> Result<DirHandle, FsError> {
        if !self.dir_exists(path) {
            return Err(FsError::NotFound(path.to_string()));
        }
        let mut entries: VecDeque<FileInfo> = VecDeque::new();
        for dot in [".", ".."] {
            entries.push_back(FileInfo {
                name: dot.to_string(),
                size: 0,
                modified: self.modified,
                is_directory: true,
            });
        }
        let children = self
            .dirs
            .iter()
            .chain(self.files.keys())
            .filter(|p| parent_of(p) == path)
            .cloned()
            .collect::<Vec<_>>();
        for child in children {
            if let Some(info) = self.info(&child) {
                entries.push_back(info);
            }
        }
        let id = self.id();
        self.open_dirs.insert(id, entries);
        Ok(DirHandle(id))
    }

    fn read_dir(&mut self, dir: DirHandle) -> Result<Option<FileInfo>, FsError> {
        let entries = self.open_dirs.get_mut(&dir.0).ok_or(FsError::InvalidHandle)?;
        Ok(entries.pop_front())
    }

    fn close_dir(&mut self, dir: DirHandle) {
        self.open_dirs.remove(&dir.0);
    }

    fn unlink(&mut self, path: &str) -> Result<(), FsError> {
        if self.files.remove(path).is_some() {
            return Ok(());
        }
        let has_children = self
            .dirs
            .iter()
            .chain(self.files.keys())
            .any(|p| parent_of(p) == path);
        if self.dirs.contains(path) && !has_children {
            self.dirs.remove(path);
            return Ok(());
        }
        Err(FsError::NotFound(path.to_string()))
    }

    fn mkdir(&mut self, path: &str) -> Result<(), FsError> {
        if self.info(path).is_some() {
            return Err(FsError::AlreadyExists(path.to_string()));
        }
        if !self.dirs.contains(parent_of(path)) {
            return Err(FsError::NotFound(path.to_string()));
        }
        self.dirs.insert(path.to_string());
        Ok(())
    }

    fn rename(&mut self, from: &str, to: &str) -> Result<(), FsError> {
        if let Some(content) = self.files.remove(from) {
            self.files.insert(to.to_string(), content);
            return Ok(());
        }
        if self.dirs.remove(from) {
            self.dirs.insert(to.to_string());
            return Ok(());
        }
        Err(FsError::NotFound(from.to_string()))
    }

    fn volumes(&self) -> Vec<String> {
        self.dirs
            .iter()
            .filter(|p| parent_of(p) == "/")
            .map(|p| name_of(p).to_string())
            .collect()
    }
}

// ----------------------------------------------------------------- update

#[derive(Default)]
pub struct MockUpdater {
    pub active: bool,
    pub image: Vec<u8>,
    pub begun: usize,
    pub finalized: usize,
    pub fail_writes: bool,
}

impl UpdateSink for MockUpdater {
    fn accepts(&self, path: &str) -> bool {
        path == UPDATE_PATH
    }

    fn begin(&mut self) -> Result<(), UpdateError> {
        if self.active {
            return Err(UpdateError::Busy);
        }
        self.active = true;
        self.begun += 1;
        self.image.clear();
        Ok(())
    }

    fn write_chunk(&mut self, data: &[u8]) -> Result<(), UpdateError> {
        if !self.active {
            return Err(UpdateError::NotStarted);
        }
        if self.fail_writes {
            return Err(UpdateError::Write("flash error".into()));
        }
        self.image.extend_from_slice(data);
        Ok(())
    }

    fn finalize(&mut self) {
        self.active = false;
        self.finalized += 1;
    }
}

// ------------------------------------------------------------------ clock

pub struct FixedClock {
    pub now: NaiveDateTime,
}

impl Clock for FixedClock {
    fn now(&self) -> NaiveDateTime {
        self.now
    }
}

pub fn at(y: i32, m: u32, d: u32, hh: u32, mm: u32) -> NaiveDateTime {
    NaiveDate::from_ymd_opt(y, m, d)
        .and_then(|date| date.and_hms_opt(hh, mm, 0))
        .expect("valid test date")
}

// ---------------------------------------------------------------- harness

pub fn test_config() -> EngineConfig {
    EngineConfig {
        control_port: CONTROL_PORT,
        data_port: DATA_PORT,
        buffer_size: 128,
        cycle_time_ms: 10,
        control_timeout_ms: 200,
        data_timeout_ms: 50,
        username: "admin".to_string(),
        password: "secret".to_string(),
        ..EngineConfig::default()
    }
}

pub fn server_with(config: EngineConfig, fs: MemFs) -> TestServer {
    let clock = FixedClock {
        now: at(2015, 7, 1, 9, 0),
    };
    let mut server = Server::new(config, MockNet::new(), fs, MockUpdater::default(), clock);
    server.enable();
    server.tick();
    server.tick();
    assert_eq!(server.state(), ControlState::Ready);
    server
}

pub fn server(fs: MemFs) -> TestServer {
    server_with(test_config(), fs)
}

/// Connects a control client and swallows the greeting.
pub fn connect(server: &mut TestServer) -> u32 {
    let conn = server.network_mut().connect(CONTROL_PORT);
    server.tick();
    let greeting = server.network_mut().take_text(conn);
    assert!(greeting.starts_with("220 "), "unexpected greeting {greeting:?}");
    conn
}

/// Sends one command line and returns what came back on the control socket
/// after a single tick.
pub fn command(server: &mut TestServer, conn: u32, line: &str) -> String {
    server
        .network_mut()
        .client_send(conn, format!("{line}\r\n").as_bytes());
    server.tick();
    server.network_mut().take_text(conn)
}

pub fn login(server: &mut TestServer, conn: u32) {
    assert!(command(server, conn, "USER admin").starts_with("331"));
    assert!(command(server, conn, "PASS secret").starts_with("230"));
}

/// PASV followed by the client connecting to the advertised port.
pub fn open_data(server: &mut TestServer, conn: u32) -> u32 {
    let reply = command(server, conn, "PASV");
    assert!(reply.starts_with("227"), "unexpected PASV reply {reply:?}");
    let data = server.network_mut().connect(DATA_PORT);
    server.tick();
    assert!(server.session().data_socket().is_some());
    data
}

/// Ticks until the transfer settles back in `Ready`, collecting control and
/// data output along the way.
pub fn finish_transfer(server: &mut TestServer, conn: u32, data: u32) -> (String, Vec<u8>) {
    let mut control = String::new();
    let mut bytes = Vec::new();
    for _ in 0..200 {
        server.tick();
        control.push_str(&server.network_mut().take_text(conn));
        bytes.extend(server.network_mut().take_output(data));
        if server.state() == ControlState::Ready && server.queued() == 0 {
            break;
        }
    }
    (control, bytes)
}
