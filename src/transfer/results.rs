//! Transfer result types
//!
//! Every bounded unit of work reports one of three outcomes instead of
//! blocking or erroring out.

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Progress {
    /// The operation finished (end of file, end of listing, write accepted).
    Complete,
    /// More work remains; call again on a later tick.
    Continue,
    /// The operation failed and its resource has been released.
    Failed,
}

/// Bytes produced into the transfer buffer by one unit of work
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Chunk {
    pub len: usize,
    pub progress: Progress,
}

impl Chunk {
    pub fn new(len: usize, progress: Progress) -> Self {
        Self { len, progress }
    }
}
