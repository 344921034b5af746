//! Per-mounted-volume state.
//!
//! Key responsibilities:
//! - Own the hook table and the mount options.
//! - Hand out event ids for create dispatches.
//! - Keep the open-handle table: token → correlation object, bounded by
//!   `max_open_handles`.
//! - Drive the handle lifetime (acquire / release / cleanup / close) and run
//!   the close hook exactly once per handle.

use std::{
    collections::HashMap,
    sync::{
        atomic::{AtomicU64, Ordering},
        Arc, Mutex, MutexGuard, PoisonError, Weak,
    },
};

use log::Level;
use shared::events::EventContext;

use crate::bridge_log;
use crate::error::HandleError;
use crate::fs::open_info::OpenInfo;
use crate::fs::operations::{FileInfo, Operations};

/// Oldest mount version that understands the create-extended hook.
pub const CREATE_FILE_EX_MIN_VERSION: u32 = 100;

/// Options a volume is mounted with.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MountOptions {
    pub version: u32,
    /// Dispatch worker threads.
    pub thread_count: usize,
    /// Capacity of the open-handle table.
    pub max_open_handles: usize,
    pub mount_point: String,
}

impl Default for MountOptions {
    fn default() -> Self {
        Self {
            version: 110,
            thread_count: 4,
            max_open_handles: 4096,
            mount_point: "M:\\".into(),
        }
    }
}

#[derive(Debug)]
pub struct Instance {
    options: MountOptions,
    operations: Operations,
    next_event_id: AtomicU64,
    next_token: AtomicU64,
    handles: Mutex<HashMap<u64, Arc<OpenInfo>>>,
    this: Weak<Instance>,
}

impl Instance {
    pub fn new(options: MountOptions, operations: Operations) -> Arc<Self> {
        Arc::new_cyclic(|this| Self {
            options,
            operations,
            next_event_id: AtomicU64::new(0),
            next_token: AtomicU64::new(1),
            handles: Mutex::new(HashMap::new()),
            this: this.clone(),
        })
    }

    pub fn options(&self) -> &MountOptions {
        &self.options
    }

    pub fn operations(&self) -> &Operations {
        &self.operations
    }

    /// Whether create requests go through the create-extended hook.
    pub fn supports_create_file_ex(&self) -> bool {
        self.options.version >= CREATE_FILE_EX_MIN_VERSION && self.operations.create_file_ex.is_some()
    }

    /// Next diagnostic event id; unique within this instance.
    pub fn next_event_id(&self) -> u64 {
        self.next_event_id.fetch_add(1, Ordering::Relaxed)
    }

    fn table(&self) -> MutexGuard<'_, HashMap<u64, Arc<OpenInfo>>> {
        self.handles.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Register a correlation object for a create in flight.
    /// `None` when the handle table is full.
    pub(crate) fn allocate_open_info(
        &self,
        request: Arc<EventContext>,
        path: &str,
    ) -> Option<Arc<OpenInfo>> {
        let mut table = self.table();
        if table.len() >= self.options.max_open_handles {
            return None;
        }
        let token = self.next_token.fetch_add(1, Ordering::Relaxed);
        let info = Arc::new(OpenInfo::new(token, request, path.to_owned(), self.this.clone()));
        table.insert(token, info.clone());
        Some(info)
    }

    /// Drop a correlation object whose create failed. No handle was opened,
    /// so the close hook does not run.
    pub(crate) fn discard(&self, token: u64) {
        self.table().remove(&token);
    }

    pub fn lookup(&self, token: u64) -> Option<Arc<OpenInfo>> {
        self.table().get(&token).cloned()
    }

    pub fn open_handles(&self) -> usize {
        self.table().len()
    }

    /// Take a reference for an operation on an open handle.
    pub fn acquire(&self, token: u64) -> Result<Arc<OpenInfo>, HandleError> {
        let info = self.lookup(token).ok_or(HandleError::UnknownToken(token))?;
        if !info.retain() {
            return Err(HandleError::Closed(token));
        }
        Ok(info)
    }

    /// Drop one reference; the last one unregisters the handle and runs the
    /// close hook.
    pub fn release(&self, token: u64) -> Result<(), HandleError> {
        let info = self.lookup(token).ok_or(HandleError::UnknownToken(token))?;
        if info.release()? {
            self.table().remove(&token);
            bridge_log!(Level::Debug, "handle", "Close {:04} {}", info.event_id(), info.path());
            if let Some(close_file) = &self.operations.close_file {
                let file_info = FileInfo {
                    process_id: info.request().process_id,
                    is_directory: info.is_directory(),
                    context: info.user_context(),
                    open_token: token,
                };
                close_file(info.path(), &file_info);
            }
        }
        Ok(())
    }

    /// Handle cleanup: drops the reference held by the dispatch.
    pub fn cleanup(&self, token: u64) -> Result<(), HandleError> {
        self.release(token)
    }

    /// Handle close: drops the reference held by the handle.
    pub fn close(&self, token: u64) -> Result<(), HandleError> {
        self.release(token)
    }
}
