//! Core read path for httpmount.
//!
//! Exposes a single HTTP(S) resource that supports byte-range requests as a
//! read-only file inside a FUSE mount. Bytes are fetched on demand with ranged
//! GETs over a pooled curl transport.

pub mod config;
pub mod error;
pub mod logging;

pub mod attrs;
pub mod cache;
pub mod cancel;
pub mod fs;
pub mod probe;
pub mod range;
pub mod remote_file;
pub mod retry;
pub mod transport;
pub mod url_model;

pub use attrs::{FileAttributes, NodeKind, BLOCK_SIZE};
pub use error::{MountError, ProbeError, ReadError};
pub use fs::{HttpMountFs, MountTree};
pub use remote_file::{RemoteFile, RemoteFileOptions};
