//! The single filesystem resource a session may hold open.

use log::debug;

use crate::storage::filesystem::{DirHandle, FileHandle, Filesystem};

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub enum OpenResource {
    #[default]
    None,
    File(FileHandle),
    Directory(DirHandle),
}

impl OpenResource {
    pub fn is_open(&self) -> bool {
        !matches!(self, OpenResource::None)
    }

    pub fn file(&self) -> Option<FileHandle> {
        match self {
            OpenResource::File(handle) => Some(*handle),
            _ => None,
        }
    }

    pub fn directory(&self) -> Option<DirHandle> {
        match self {
            OpenResource::Directory(handle) => Some(*handle),
            _ => None,
        }
    }

    /// Closes whatever is open and returns to `None`.
    pub fn close<F: Filesystem>(&mut self, fs: &mut F) {
        match std::mem::take(self) {
            OpenResource::None => {}
            OpenResource::File(handle) => {
                debug!("Closing file handle {:?}", handle);
                fs.close(handle);
            }
            OpenResource::Directory(handle) => {
                debug!("Closing directory handle {:?}", handle);
                fs.close_dir(handle);
            }
        }
    }
}
