//! Transfer module
//!
//! Send queue, passive data channel, and the chunked file I/O that the
//! continuation states drive one unit at a time.

pub mod data_channel;
pub mod file_ops;
pub mod queue;
pub mod results;

pub use data_channel::{DataChannel, DataEvent, DataState};
pub use file_ops::{open_for_read, open_for_write, read_chunk, store_chunk, write_chunk};
pub use queue::{CloseAction, Destination, Payload, Pending, SendQueue};
pub use results::{Chunk, Progress};
