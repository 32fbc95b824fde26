use crate::error::{Result, ZipFsError};
use crate::path;
use parking_lot::Mutex;
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::fs::File;
use std::io::{self, Read, Seek};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use tracing::debug;
use zip::ZipArchive;

/// Upper bound on the buffer reserved up front for one entry
const MAX_PREALLOCATION: u64 = 16 * 1024 * 1024;

/// Canonical identity of a backing archive file
///
/// Two readers opened on the same physical file resolve to equal identities,
/// regardless of how the caller spelled the path.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ArchiveIdentity(PathBuf);

impl ArchiveIdentity {
    /// Canonicalize `path`; fails when the file does not exist
    pub fn from_path<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let canonical = std::fs::canonicalize(path)
            .map_err(|e| ZipFsError::open(path, ZipFsError::Io(e)))?;
        Ok(Self(canonical))
    }

    pub fn path(&self) -> &Path {
        &self.0
    }
}

impl fmt::Display for ArchiveIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.display())
    }
}

/// Directory tree derived from the central directory
#[derive(Debug, Default)]
struct EntryIndex {
    /// Normalized path -> raw entry name, regular files only
    files: BTreeMap<String, String>,
    /// Explicit and implied folders, root excluded
    dirs: BTreeSet<String>,
}

impl EntryIndex {
    fn build<R: Read + Seek>(archive: &ZipArchive<R>) -> Self {
        let mut index = EntryIndex::default();

        for raw in archive.file_names() {
            let (normalized, is_dir) = path::normalize_entry_name(raw);
            if normalized.is_empty() {
                continue;
            }

            for ancestor in path::ancestors(&normalized) {
                index.dirs.insert(ancestor.to_string());
            }

            if is_dir {
                index.dirs.insert(normalized);
            } else if index.files.contains_key(&normalized) {
                debug!(entry = raw, "Skipping duplicate archive entry");
            } else {
                index.files.insert(normalized, raw.to_string());
            }
        }

        index
    }

    fn is_dir(&self, folder: &str) -> bool {
        folder.is_empty() || self.dirs.contains(folder)
    }

    fn children(&self, folder: &str) -> Vec<String> {
        if !self.is_dir(folder) {
            return Vec::new();
        }

        if folder.is_empty() {
            return self
                .files
                .keys()
                .filter(|name| !name.contains(path::SEPARATOR))
                .cloned()
                .collect();
        }

        let prefix = format!("{}{}", folder, path::SEPARATOR);
        self.files
            .range(prefix.clone()..)
            .map(|(name, _)| name)
            .take_while(|name| name.starts_with(&prefix))
            .filter(|name| !name[prefix.len()..].contains(path::SEPARATOR))
            .cloned()
            .collect()
    }
}

/// One open zip container, shared by every reader of the same identity
///
/// Handles are created and closed by the `HandleRegistry` only.
pub struct ArchiveHandle {
    identity: ArchiveIdentity,
    archive: Mutex<Option<ZipArchive<File>>>,
    /// Mirrors `archive.is_some()` without taking the archive lock
    open: AtomicBool,
    index: EntryIndex,
}

impl ArchiveHandle {
    /// Open the container and index its central directory
    pub(crate) fn open(identity: ArchiveIdentity) -> Result<Self> {
        let file = File::open(identity.path())?;
        let archive = ZipArchive::new(file)?;
        let index = EntryIndex::build(&archive);

        debug!(
            archive = %identity,
            entries = index.files.len(),
            folders = index.dirs.len(),
            "Opened archive handle"
        );

        Ok(Self {
            identity,
            archive: Mutex::new(Some(archive)),
            open: AtomicBool::new(true),
            index,
        })
    }

    pub fn identity(&self) -> &ArchiveIdentity {
        &self.identity
    }

    pub fn is_open(&self) -> bool {
        self.open.load(Ordering::Acquire)
    }

    /// Number of regular file entries
    pub fn file_count(&self) -> usize {
        self.index.files.len()
    }

    pub fn is_file(&self, entry: &str) -> bool {
        self.index.files.contains_key(entry)
    }

    pub fn is_dir(&self, folder: &str) -> bool {
        self.index.is_dir(folder)
    }

    /// All regular files in ascending order
    pub fn list_files(&self) -> Result<Vec<String>> {
        self.ensure_open()?;
        Ok(self.index.files.keys().cloned().collect())
    }

    /// Immediate regular-file children of `folder` in ascending order
    ///
    /// Empty when `folder` is not a directory in this archive.
    pub fn list_children(&self, folder: &str) -> Result<Vec<String>> {
        self.ensure_open()?;
        Ok(self.index.children(folder))
    }

    /// Read the full contents of a regular file entry
    ///
    /// `Ok(None)` when `entry` is not a regular file.
    pub fn read(&self, entry: &str) -> Result<Option<Vec<u8>>> {
        let Some(raw) = self.index.files.get(entry) else {
            return Ok(None);
        };

        let mut guard = self.archive.lock();
        let archive = guard.as_mut().ok_or_else(|| self.closed_error())?;

        let file = archive.by_name(raw)?;
        let declared = file.size();
        let capacity = usize::try_from(declared.min(MAX_PREALLOCATION)).unwrap_or(0);

        // One byte past the declared size is enough to detect an overrun
        let mut data = Vec::with_capacity(capacity);
        file.take(declared.saturating_add(1)).read_to_end(&mut data)?;

        if data.len() as u64 != declared {
            return Err(ZipFsError::Io(io::Error::new(
                io::ErrorKind::InvalidData,
                format!(
                    "entry {} declares {} bytes but holds {}",
                    entry,
                    declared,
                    data.len()
                ),
            )));
        }

        Ok(Some(data))
    }

    /// Release the underlying container
    ///
    /// Fails with `ZipFsError::Closed` when the handle was already closed.
    pub(crate) fn close(&self) -> Result<()> {
        let mut guard = self.archive.lock();
        self.open.store(false, Ordering::Release);
        match guard.take() {
            Some(archive) => {
                drop(archive);
                debug!(archive = %self.identity, "Closed archive handle");
                Ok(())
            }
            None => Err(ZipFsError::Closed),
        }
    }

    fn ensure_open(&self) -> Result<()> {
        if self.is_open() {
            Ok(())
        } else {
            Err(self.closed_error())
        }
    }

    fn closed_error(&self) -> ZipFsError {
        ZipFsError::Io(io::Error::new(
            io::ErrorKind::Other,
            format!("archive handle for {} is closed", self.identity),
        ))
    }
}

impl fmt::Debug for ArchiveHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ArchiveHandle")
            .field("identity", &self.identity)
            .field("files", &self.index.files.len())
            .field("open", &self.is_open())
            .finish()
    }
}
