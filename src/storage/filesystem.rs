//! Filesystem collaborator
//!
//! The block filesystem the engine serves. Handles are opaque tokens issued
//! by the implementation; the engine never holds more than one at a time.

use crate::error::FsError;
use crate::storage::timestamp::FatTimestamp;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct FileHandle(pub u32);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct DirHandle(pub u32);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OpenMode {
    Read,
    /// Create the file, truncating any existing content.
    WriteTruncate,
}

/// One directory entry or `stat` result
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileInfo {
    pub name: String,
    pub size: u64,
    pub modified: FatTimestamp,
    pub is_directory: bool,
}

pub trait Filesystem {
    fn open(&mut self, path: &str, mode: OpenMode) -> Result<FileHandle, FsError>;

    /// Reads up to `buf.len()` bytes; a short count means end of file.
    fn read(&mut self, file: FileHandle, buf: &mut [u8]) -> Result<usize, FsError>;

    fn write(&mut self, file: FileHandle, buf: &[u8]) -> Result<usize, FsError>;

    fn close(&mut self, file: FileHandle);

    fn stat(&mut self, path: &str) -> Result<FileInfo, FsError>;

    fn open_dir(&mut self, path: &str) -> Result<DirHandle, FsError>;

    /// Next entry in enumeration order, `None` once exhausted.
    fn read_dir(&mut self, dir: DirHandle) -> Result<Option<FileInfo>, FsError>;

    fn close_dir(&mut self, dir: DirHandle);

    fn unlink(&mut self, path: &str) -> Result<(), FsError>;

    fn mkdir(&mut self, path: &str) -> Result<(), FsError>;

    fn rename(&mut self, from: &str, to: &str) -> Result<(), FsError>;

    /// Names of the mounted volumes, shown as directories under `/`.
    fn volumes(&self) -> Vec<String>;
}
