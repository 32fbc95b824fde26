use crate::archive::handle::{ArchiveHandle, ArchiveIdentity};
use crate::archive::registry::HandleRegistry;
use crate::archive::stream::EntryStream;
use crate::config::ReaderConfig;
use crate::error::{Result, ZipFsError};
use crate::path;
use crate::tempsource::{self, TemporaryBackingFile};
use std::io::Read;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, error};

/// Where the reader's archive bytes live
enum BackingSource {
    /// Caller-supplied file, never touched on close
    File,
    /// Materialized stream, deleted on close
    Temporary(TemporaryBackingFile),
}

/// Read-only filesystem view over one zip archive
///
/// Readers opened on the same file share a single open handle through the
/// handle registry. Call `close` when done; dropping the reader closes it too.
///
/// # Example
///
/// ```no_run
/// use zipfs_rs::ArchiveReader;
///
/// let mut reader = ArchiveReader::open("export.lar")?;
/// for entry in reader.list_entries()? {
///     let bytes = reader.read_bytes(&entry)?;
///     println!("{}: {:?} bytes", entry, bytes.map(|b| b.len()));
/// }
/// reader.close();
/// # Ok::<(), zipfs_rs::ZipFsError>(())
/// ```
pub struct ArchiveReader {
    registry: Arc<HandleRegistry>,
    handle: Option<Arc<ArchiveHandle>>,
    source: BackingSource,
    archive_path: PathBuf,
}

impl ArchiveReader {
    /// Open a zip archive on disk
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        Self::open_with(path, &ReaderConfig::default())
    }

    /// Open a zip archive on disk with explicit options
    pub fn open_with<P: AsRef<Path>>(path: P, config: &ReaderConfig) -> Result<Self> {
        let path = path.as_ref();
        let registry = Self::registry_for(config);
        let handle = Self::acquire(&registry, path)?;

        Ok(Self {
            registry,
            handle: Some(handle),
            source: BackingSource::File,
            archive_path: path.to_path_buf(),
        })
    }

    /// Open a zip archive from a byte stream
    ///
    /// The stream is copied to a temporary file which this reader owns and
    /// deletes on close.
    pub fn from_reader<R: Read>(stream: R) -> Result<Self> {
        Self::from_reader_with(stream, &ReaderConfig::default())
    }

    /// Open a zip archive from a byte stream with explicit options
    pub fn from_reader_with<R: Read>(stream: R, config: &ReaderConfig) -> Result<Self> {
        let temp = tempsource::materialize(stream, config)?;
        let archive_path = temp.path().to_path_buf();
        let registry = Self::registry_for(config);

        let handle = match Self::acquire(&registry, &archive_path) {
            Ok(handle) => handle,
            Err(e) => {
                temp.delete();
                return Err(e);
            }
        };

        Ok(Self {
            registry,
            handle: Some(handle),
            source: BackingSource::Temporary(temp),
            archive_path,
        })
    }

    fn registry_for(config: &ReaderConfig) -> Arc<HandleRegistry> {
        if config.share_handles {
            HandleRegistry::global()
        } else {
            Arc::new(HandleRegistry::new())
        }
    }

    fn acquire(registry: &HandleRegistry, path: &Path) -> Result<Arc<ArchiveHandle>> {
        ArchiveIdentity::from_path(path)
            .and_then(|identity| registry.acquire(&identity))
            .map_err(|e| ZipFsError::init(path, e))
    }

    fn handle(&self) -> Result<&ArchiveHandle> {
        self.handle.as_deref().ok_or(ZipFsError::Closed)
    }

    /// Path of the backing archive file (the temporary copy for stream readers)
    pub fn archive_path(&self) -> &Path {
        &self.archive_path
    }

    /// True while this reader owns a materialized temporary file
    pub fn is_temporary(&self) -> bool {
        matches!(self.source, BackingSource::Temporary(_))
    }

    pub fn is_closed(&self) -> bool {
        self.handle.is_none()
    }

    /// True when both readers are served by the same open handle
    pub fn shares_handle_with(&self, other: &ArchiveReader) -> bool {
        match (&self.handle, &other.handle) {
            (Some(a), Some(b)) => Arc::ptr_eq(a, b),
            _ => false,
        }
    }

    /// Number of regular file entries
    pub fn entry_count(&self) -> Result<usize> {
        Ok(self.handle()?.file_count())
    }

    /// Check if a regular file entry exists
    pub fn contains(&self, name: &str) -> Result<bool> {
        let handle = self.handle()?;
        Ok(path::resolve(name).is_some_and(|entry| handle.is_file(&entry)))
    }

    /// Every regular file in the archive, sorted ascending
    pub fn list_entries(&self) -> Result<Vec<String>> {
        self.handle()?.list_files()
    }

    /// Immediate regular-file children of `folder`, sorted ascending
    ///
    /// Empty for blank names, missing folders and non-folders.
    pub fn list_folder(&self, folder: &str) -> Result<Vec<String>> {
        let handle = self.handle()?;
        match path::resolve(folder) {
            Some(folder) => handle.list_children(&folder),
            None => Ok(Vec::new()),
        }
    }

    /// Full contents of the entry `name`
    ///
    /// `Ok(None)` for blank names, missing entries and folders. Read failures
    /// are logged and also reported as `Ok(None)`; use `try_read_bytes` to
    /// tell them apart. Fails only when the reader is closed.
    pub fn read_bytes(&self, name: &str) -> Result<Option<Vec<u8>>> {
        let handle = self.handle()?;
        let Some(entry) = path::resolve(name) else {
            return Ok(None);
        };

        match handle.read(&entry) {
            Ok(data) => Ok(data),
            Err(e) => {
                error!(
                    archive = %handle.identity(),
                    entry = %entry,
                    error = %e,
                    "Failed to read archive entry"
                );
                Ok(None)
            }
        }
    }

    /// Like `read_bytes`, but read failures are returned as errors
    pub fn try_read_bytes(&self, name: &str) -> Result<Option<Vec<u8>>> {
        let handle = self.handle()?;
        match path::resolve(name) {
            Some(entry) => handle.read(&entry),
            None => Ok(None),
        }
    }

    /// Fresh stream over the entry `name`, with `read_bytes` semantics
    pub fn read_stream(&self, name: &str) -> Result<Option<EntryStream>> {
        let data = self.read_bytes(name)?;
        Ok(data.map(|data| {
            let entry = path::resolve(name).unwrap_or_default();
            EntryStream::new(entry, data)
        }))
    }

    /// Entry contents decoded as UTF-8, invalid sequences replaced
    pub fn read_text(&self, name: &str) -> Result<Option<String>> {
        let data = self.read_bytes(name)?;
        Ok(data.map(|bytes| match String::from_utf8(bytes) {
            Ok(text) => text,
            Err(e) => String::from_utf8_lossy(e.as_bytes()).into_owned(),
        }))
    }

    /// Release the archive handle and delete any temporary backing file
    ///
    /// Idempotent. Teardown failures are logged, never returned.
    pub fn close(&mut self) {
        if let Some(handle) = self.handle.take() {
            self.registry.release(&handle);
            debug!(archive = %self.archive_path.display(), "Closed archive reader");
        }

        if let BackingSource::Temporary(temp) =
            std::mem::replace(&mut self.source, BackingSource::File)
        {
            temp.delete();
        }
    }
}

impl Drop for ArchiveReader {
    fn drop(&mut self) {
        self.close();
    }
}

impl std::fmt::Debug for ArchiveReader {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ArchiveReader")
            .field("archive_path", &self.archive_path)
            .field("temporary", &self.is_temporary())
            .field("closed", &self.is_closed())
            .finish()
    }
}
