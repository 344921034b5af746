//! The hook table a mounted file system plugs into the bridge.
//!
//! Every hook is optional; the dispatcher checks for presence at each call
//! site and answers `STATUS_NOT_IMPLEMENTED` for a missing one.

use std::{fmt, sync::Arc};

use shared::events::LegacyDisposition;
use shared::NtStatus;

/// Per-call state shared between the dispatcher and a hook.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FileInfo {
    /// Requesting process.
    pub process_id: u32,
    /// In: what the dispatcher decided. Out: what the hook actually opened.
    pub is_directory: bool,
    /// Opaque value the hook may set; handed back on every later call.
    pub context: u64,
    /// Correlation token of the handle being opened.
    pub open_token: u64,
}

/// Arguments of the create-extended hook: the raw NT request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CreateFileExArgs<'a> {
    pub path: &'a str,
    pub desired_access: u32,
    pub share_access: u32,
    /// Raw NT disposition, unvalidated.
    pub disposition: u32,
    pub options: u32,
    pub attributes: u32,
    /// Always 0.
    pub reserved: u64,
}

pub type CreateFileFn =
    dyn Fn(&str, u32, u32, LegacyDisposition, u32, &mut FileInfo) -> NtStatus + Send + Sync;
pub type DirectoryFn = dyn Fn(&str, &mut FileInfo) -> NtStatus + Send + Sync;
pub type CreateFileExFn = dyn Fn(&CreateFileExArgs<'_>, &mut FileInfo) -> NtStatus + Send + Sync;
pub type CloseFileFn = dyn Fn(&str, &FileInfo) + Send + Sync;

/// Optional hooks, read-only once the instance is mounted.
#[derive(Clone, Default)]
pub struct Operations {
    /// `(path, desired_access, share_access, disposition, attributes, info)`
    pub create_file: Option<Arc<CreateFileFn>>,
    pub create_directory: Option<Arc<DirectoryFn>>,
    pub open_directory: Option<Arc<DirectoryFn>>,
    pub create_file_ex: Option<Arc<CreateFileExFn>>,
    /// Runs once when the last reference to a handle goes away.
    pub close_file: Option<Arc<CloseFileFn>>,
}

impl Operations {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_create_file<F>(mut self, f: F) -> Self
    where
        F: Fn(&str, u32, u32, LegacyDisposition, u32, &mut FileInfo) -> NtStatus + Send + Sync + 'static,
    {
        self.create_file = Some(Arc::new(f));
        self
    }

    pub fn with_create_directory<F>(mut self, f: F) -> Self
    where
        F: Fn(&str, &mut FileInfo) -> NtStatus + Send + Sync + 'static,
    {
        self.create_directory = Some(Arc::new(f));
        self
    }

    pub fn with_open_directory<F>(mut self, f: F) -> Self
    where
        F: Fn(&str, &mut FileInfo) -> NtStatus + Send + Sync + 'static,
    {
        self.open_directory = Some(Arc::new(f));
        self
    }

    pub fn with_create_file_ex<F>(mut self, f: F) -> Self
    where
        F: Fn(&CreateFileExArgs<'_>, &mut FileInfo) -> NtStatus + Send + Sync + 'static,
    {
        self.create_file_ex = Some(Arc::new(f));
        self
    }

    pub fn with_close_file<F>(mut self, f: F) -> Self
    where
        F: Fn(&str, &FileInfo) + Send + Sync + 'static,
    {
        self.close_file = Some(Arc::new(f));
        self
    }
}

impl fmt::Debug for Operations {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Operations")
            .field("create_file", &self.create_file.is_some())
            .field("create_directory", &self.create_directory.is_some())
            .field("open_directory", &self.open_directory.is_some())
            .field("create_file_ex", &self.create_file_ex.is_some())
            .field("close_file", &self.close_file.is_some())
            .finish()
    }
}
