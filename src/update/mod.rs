//! Firmware update sink
//!
//! An upload to the reserved image path is streamed here instead of into the
//! filesystem.

pub mod file_sink;

pub use file_sink::FileUpdateSink;

use crate::error::UpdateError;

pub trait UpdateSink {
    /// Whether `path` is the reserved update-image path.
    fn accepts(&self, path: &str) -> bool;

    /// Claims the sink; fails with `Busy` if an update is already running.
    fn begin(&mut self) -> Result<(), UpdateError>;

    fn write_chunk(&mut self, data: &[u8]) -> Result<(), UpdateError>;

    /// Commits the image and releases the sink. Also used to unlock the sink
    /// after a failed `begin` or an aborted upload.
    fn finalize(&mut self);
}
