//! Zipfs-rs: read-only virtual filesystem over zip archives
//!
//! This library exposes a zip container, given as a file path or a byte
//! stream, as a navigable read-only tree:
//! - Sorted listing of every entry, or of one folder's immediate files
//! - Entry reads as bytes, text, or independent streams
//! - One shared open handle per physical archive, reference counted across readers
//! - Stream-sourced archives materialized to a temporary file removed on close
//!
//! # Example
//!
//! ```no_run
//! use zipfs_rs::ArchiveReader;
//!
//! let mut reader = ArchiveReader::open("site-export.lar")?;
//! let manifest = reader.read_text("/manifest.xml")?;
//! let groups = reader.list_folder("groups")?;
//! reader.close();
//! # Ok::<(), zipfs_rs::error::ZipFsError>(())
//! ```

// Core modules
pub mod archive;
pub mod config;
pub mod error;
pub mod path;
pub mod tempsource;

// Re-export commonly used types
pub use archive::{ArchiveHandle, ArchiveIdentity, ArchiveReader, EntryStream, HandleRegistry};
pub use config::ReaderConfig;
pub use error::{Result, ZipFsError};
pub use tempsource::TemporaryBackingFile;
