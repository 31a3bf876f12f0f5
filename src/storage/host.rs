//! Host filesystem backend
//!
//! Serves a directory on the workstation. Every top-level sub-directory of
//! the root is a volume, so `/flash/main.py` maps to `<root>/flash/main.py`.

use chrono::{DateTime, Local};
use log::{debug, warn};
use std::collections::HashMap;
use std::fs::{self, File, Metadata, OpenOptions, ReadDir};
use std::io::{Read, Write};
use std::path::{Path, PathBuf};

use crate::error::FsError;
use crate::storage::filesystem::{DirHandle, FileHandle, FileInfo, Filesystem, OpenMode};
use crate::storage::timestamp::FatTimestamp;
use crate::storage::validation::is_safe_path;

pub struct HostFilesystem {
    root: PathBuf,
    files: HashMap<u32, File>,
    dirs: HashMap<u32, ReadDir>,
    next_id: u32,
}

impl HostFilesystem {
    pub fn new(root: impl Into<PathBuf>) -> Result<Self, FsError> {
        let root = root.into();
        fs::create_dir_all(&root)?;
        Ok(Self {
            root,
            files: HashMap::new(),
            dirs: HashMap::new(),
            next_id: 1,
        })
    }

    fn resolve(&self, path: &str) -> Result<PathBuf, FsError> {
        if !is_safe_path(path) {
            warn!("Rejected unsafe path {}", path);
            return Err(FsError::InvalidPath(path.to_string()));
        }
        Ok(self.root.join(path.trim_start_matches('/')))
    }

    fn next_id(&mut self) -> u32 {
        let id = self.next_id;
        self.next_id = self.next_id.wrapping_add(1).max(1);
        id
    }
}

fn info_from_metadata(name: String, metadata: &Metadata) -> FileInfo {
    let modified = metadata
        .modified()
        .map(|t| FatTimestamp::from_datetime(&DateTime::<Local>::from(t).naive_local()))
        .unwrap_or_default();

    FileInfo {
        name,
        size: if metadata.is_dir() { 0 } else { metadata.len() },
        modified,
        is_directory: metadata.is_dir(),
    }
}

fn file_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_else(|| "/".to_string())
}

impl Filesystem for HostFilesystem {
    fn open(&mut self, path: &str, mode: OpenMode) -> Result<FileHandle, FsError> {
        let real = self.resolve(path)?;
        let file = match mode {
            OpenMode::Read => {
                if real.is_dir() {
                    return Err(FsError::NotFound(path.to_string()));
                }
                File::open(&real)?
            }
            OpenMode::WriteTruncate => OpenOptions::new()
                .write(true)
                .create(true)
                .truncate(true)
                .open(&real)?,
        };
        let id = self.next_id();
        self.files.insert(id, file);
        debug!("Opened {} as file handle {}", real.display(), id);
        Ok(FileHandle(id))
    }

    fn read(&mut self, file: FileHandle, buf: &mut [u8]) -> Result<usize, FsError> {
        let handle = self.files.get_mut(&file.0).ok_or(FsError::InvalidHandle)?;
        let mut filled = 0;
        while filled < buf.len() {
            match handle.read(&mut buf[filled..])? {
                0 => break,
                n => filled += n,
            }
        }
        Ok(filled)
    }

    fn write(&mut self, file: FileHandle, buf: &[u8]) -> Result<usize, FsError> {
        let handle = self.files.get_mut(&file.0).ok_or(FsError::InvalidHandle)?;
        handle.write_all(buf)?;
        Ok(buf.len())
    }

    fn close(&mut self, file: FileHandle) {
        if let Some(mut handle) = self.files.remove(&file.0) {
            let _ = handle.flush();
        }
    }

    fn stat(&mut self, path: &str) -> Result<FileInfo, FsError> {
        let real = self.resolve(path)?;
        let metadata = fs::metadata(&real)?;
        Ok(info_from_metadata(file_name(&real), &metadata))
    }

    fn open_dir(&mut self, path: &str) -> Result<DirHandle, FsError> {
        let real = self.resolve(path)?;
        if !real.is_dir() {
            return Err(FsError::NotADirectory(path.to_string()));
        }
        let entries = fs::read_dir(&real)?;
        let id = self.next_id();
        self.dirs.insert(id, entries);
        Ok(DirHandle(id))
    }

    fn read_dir(&mut self, dir: DirHandle) -> Result<Option<FileInfo>, FsError> {
        let entries = self.dirs.get_mut(&dir.0).ok_or(FsError::InvalidHandle)?;
        for entry in entries.by_ref() {
            let entry = entry?;
            match entry.metadata() {
                Ok(metadata) => {
                    let name = entry.file_name().to_string_lossy().to_string();
                    return Ok(Some(info_from_metadata(name, &metadata)));
                }
                Err(e) => warn!("Skipping {}: {}", entry.path().display(), e),
            }
        }
        Ok(None)
    }

    fn close_dir(&mut self, dir: DirHandle) {
        self.dirs.remove(&dir.0);
    }

    fn unlink(&mut self, path: &str) -> Result<(), FsError> {
        let real = self.resolve(path)?;
        if real.is_dir() {
            fs::remove_dir(&real)?;
        } else {
            fs::remove_file(&real)?;
        }
        Ok(())
    }

    fn mkdir(&mut self, path: &str) -> Result<(), FsError> {
        let real = self.resolve(path)?;
        fs::create_dir(&real)?;
        Ok(())
    }

    fn rename(&mut self, from: &str, to: &str) -> Result<(), FsError> {
        let from_real = self.resolve(from)?;
        let to_real = self.resolve(to)?;
        fs::rename(&from_real, &to_real)?;
        Ok(())
    }

    fn volumes(&self) -> Vec<String> {
        let mut names: Vec<String> = match fs::read_dir(&self.root) {
            Ok(entries) => entries
                .flatten()
                .filter(|e| e.file_type().map(|t| t.is_dir()).unwrap_or(false))
                .map(|e| e.file_name().to_string_lossy().to_string())
                .collect(),
            Err(e) => {
                warn!("Cannot enumerate volumes under {}: {}", self.root.display(), e);
                Vec::new()
            }
        };
        names.sort();
        names
    }
}
