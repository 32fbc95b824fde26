//! Process-wide table of open archive handles
//!
//! Readers over the same physical file share one `ArchiveHandle`. The table and
//! every reference count live behind a single mutex, held across the open
//! attempt, so racing acquirers of one identity never open it twice.

use crate::archive::handle::{ArchiveHandle, ArchiveIdentity};
use crate::error::{Result, ZipFsError};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::{Arc, OnceLock};
use tracing::{debug, warn};

static GLOBAL_REGISTRY: OnceLock<Arc<HandleRegistry>> = OnceLock::new();

struct Slot {
    handle: Arc<ArchiveHandle>,
    refs: usize,
}

/// Reference-counted identity -> handle map
#[derive(Default)]
pub struct HandleRegistry {
    slots: Mutex<HashMap<ArchiveIdentity, Slot>>,
}

impl HandleRegistry {
    /// Create an isolated registry
    pub fn new() -> Self {
        Self::default()
    }

    /// The registry shared by every reader in the process
    pub fn global() -> Arc<HandleRegistry> {
        GLOBAL_REGISTRY
            .get_or_init(|| Arc::new(HandleRegistry::new()))
            .clone()
    }

    /// Return the open handle for `identity`, opening it on first use
    ///
    /// Each successful call must be paired with one `release`.
    pub fn acquire(&self, identity: &ArchiveIdentity) -> Result<Arc<ArchiveHandle>> {
        let mut slots = self.slots.lock();

        if let Some(slot) = slots.get_mut(identity) {
            if slot.handle.is_open() {
                slot.refs += 1;
                debug!(archive = %identity, refs = slot.refs, "Reusing archive handle");
                return Ok(Arc::clone(&slot.handle));
            }
            warn!(archive = %identity, "Dropping stale closed archive handle");
            slots.remove(identity);
        }

        let handle = ArchiveHandle::open(identity.clone())
            .map(Arc::new)
            .map_err(|e| ZipFsError::open(identity.path(), e))?;

        slots.insert(
            identity.clone(),
            Slot {
                handle: Arc::clone(&handle),
                refs: 1,
            },
        );

        Ok(handle)
    }

    /// Drop one reference to `handle`, closing it when none remain
    ///
    /// Close failures are logged, never returned.
    pub fn release(&self, handle: &Arc<ArchiveHandle>) {
        let identity = handle.identity();
        let mut slots = self.slots.lock();

        let Some(slot) = slots.get_mut(identity) else {
            warn!(archive = %identity, "Released archive handle is not registered");
            return;
        };

        if !Arc::ptr_eq(&slot.handle, handle) {
            warn!(archive = %identity, "Released archive handle does not match the registered one");
            return;
        }

        slot.refs -= 1;
        if slot.refs > 0 {
            debug!(archive = %identity, refs = slot.refs, "Released archive handle reference");
            return;
        }

        if let Err(e) = slot.handle.close() {
            warn!(archive = %identity, error = %e, "Archive handle was already closed");
        }
        slots.remove(identity);
    }

    /// Live references to `identity` (0 when not registered)
    pub fn ref_count(&self, identity: &ArchiveIdentity) -> usize {
        self.slots
            .lock()
            .get(identity)
            .map(|slot| slot.refs)
            .unwrap_or(0)
    }

    /// Number of distinct open archives
    pub fn open_handles(&self) -> usize {
        self.slots.lock().len()
    }
}
