//! File system storage
//!
//! The filesystem collaborator, the open-resource slot, listing generation,
//! and the host `std::fs` backend.

pub mod filesystem;
pub mod host;
pub mod listing;
pub mod resource;
pub mod timestamp;
pub mod validation;

pub use filesystem::{DirHandle, FileHandle, FileInfo, Filesystem, OpenMode};
pub use host::HostFilesystem;
pub use listing::{DirectoryListing, format_entry, format_volume};
pub use resource::OpenResource;
pub use timestamp::FatTimestamp;
