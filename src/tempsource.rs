//! Materialization of stream-sourced archives
//!
//! Zip needs random access to its central directory, so an archive handed over
//! as a byte stream is first copied into a uniquely named file.

use crate::config::ReaderConfig;
use crate::error::{Result, ZipFsError};
use std::io::{self, Read, Write};
use std::path::Path;
use tempfile::{Builder, NamedTempFile, TempPath};
use tracing::{debug, warn};

/// File holding a copy of stream-sourced archive bytes
///
/// Owned by exactly one reader. The file is removed by `delete`, or when the
/// value is dropped.
#[derive(Debug)]
pub struct TemporaryBackingFile {
    path: TempPath,
}

impl TemporaryBackingFile {
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Remove the file, logging instead of failing
    pub fn delete(self) {
        let location = self.path.to_path_buf();
        match self.path.close() {
            Ok(()) => debug!(path = %location.display(), "Deleted temporary backing file"),
            Err(e) => warn!(
                path = %location.display(),
                error = %e,
                "Failed to delete temporary backing file"
            ),
        }
    }
}

/// Copy `stream` to exhaustion into a new temporary file
///
/// On failure no file is left behind.
pub fn materialize<R: Read>(mut stream: R, config: &ReaderConfig) -> Result<TemporaryBackingFile> {
    let target_dir = config
        .temp_dir
        .clone()
        .unwrap_or_else(std::env::temp_dir);

    config
        .validate()
        .map_err(|e| ZipFsError::init(&target_dir, e))?;

    let mut file = create_temp_file(&target_dir, config)
        .map_err(|e| ZipFsError::init(&target_dir, ZipFsError::Io(e)))?;

    let copied = copy_into(&mut stream, &mut file)
        .map_err(|e| ZipFsError::init(file.path(), ZipFsError::Io(e)))?;

    let path = file.into_temp_path();
    debug!(path = %path.display(), bytes = copied, "Materialized archive stream");

    Ok(TemporaryBackingFile { path })
}

fn create_temp_file(dir: &Path, config: &ReaderConfig) -> io::Result<NamedTempFile> {
    Builder::new()
        .prefix(&config.temp_prefix)
        .suffix(&config.temp_suffix)
        .tempfile_in(dir)
}

fn copy_into<R: Read>(stream: &mut R, file: &mut NamedTempFile) -> io::Result<u64> {
    let copied = io::copy(stream, file)?;
    file.flush()?;
    file.as_file().sync_all()?;
    Ok(copied)
}
