//! File transfer engine
//!
//! Chunked reads and writes against the one open file, bounded by the size
//! of the buffer handed in. Any failure closes the file before returning.

use log::{debug, warn};

use crate::error::FsError;
use crate::storage::filesystem::{Filesystem, OpenMode};
use crate::storage::resource::OpenResource;
use crate::transfer::{Chunk, Progress};
use crate::update::UpdateSink;

/// Opens `path` for download and records it as the open resource.
pub fn open_for_read<F: Filesystem>(
    fs: &mut F,
    resource: &mut OpenResource,
    path: &str,
) -> Result<(), FsError> {
    let file = fs.open(path, OpenMode::Read)?;
    debug!("Opened {} for reading", path);
    *resource = OpenResource::File(file);
    Ok(())
}

/// Creates (or truncates) `path` for upload and records it as the open resource.
pub fn open_for_write<F: Filesystem>(
    fs: &mut F,
    resource: &mut OpenResource,
    path: &str,
) -> Result<(), FsError> {
    let file = fs.open(path, OpenMode::WriteTruncate)?;
    debug!("Opened {} for writing", path);
    *resource = OpenResource::File(file);
    Ok(())
}

/// Reads the next chunk into `buf`.
///
/// A full buffer means more remains (`Continue`); a short read is end of
/// file (`Complete`) and closes the file.
pub fn read_chunk<F: Filesystem>(fs: &mut F, resource: &mut OpenResource, buf: &mut [u8]) -> Chunk {
    let Some(file) = resource.file() else {
        return Chunk::new(0, Progress::Failed);
    };

    match fs.read(file, buf) {
        Ok(n) if n < buf.len() => {
            resource.close(fs);
            Chunk::new(n, Progress::Complete)
        }
        Ok(n) => Chunk::new(n, Progress::Continue),
        Err(e) => {
            warn!("Read failed: {}", e);
            resource.close(fs);
            Chunk::new(0, Progress::Failed)
        }
    }
}

/// Writes `data` to the open file. Anything short of the full length fails.
pub fn write_chunk<F: Filesystem>(fs: &mut F, resource: &mut OpenResource, data: &[u8]) -> Progress {
    let Some(file) = resource.file() else {
        return Progress::Failed;
    };

    match fs.write(file, data) {
        Ok(n) if n == data.len() => Progress::Complete,
        Ok(n) => {
            warn!("Short write: {} of {} bytes", n, data.len());
            resource.close(fs);
            Progress::Failed
        }
        Err(e) => {
            warn!("Write failed: {}", e);
            resource.close(fs);
            Progress::Failed
        }
    }
}

/// Routes an upload chunk to the update sink while an update is active,
/// otherwise to the open file.
pub fn store_chunk<F: Filesystem, U: UpdateSink>(
    fs: &mut F,
    updater: &mut U,
    resource: &mut OpenResource,
    updating: bool,
    data: &[u8],
) -> Progress {
    if !updating {
        return write_chunk(fs, resource, data);
    }

    match updater.write_chunk(data) {
        Ok(()) => Progress::Complete,
        Err(e) => {
            warn!("Update sink rejected chunk: {}", e);
            Progress::Failed
        }
    }
}
