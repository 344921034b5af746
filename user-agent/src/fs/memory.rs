//! In-memory reference volume.
//!
//! A flat, case-insensitive namespace of files and directories behind one
//! mutex. It follows the conventions the create mapping expects from a real
//! file system: `OPEN_ALWAYS` / `CREATE_ALWAYS` on an existing file succeed
//! in effect but report `STATUS_OBJECT_NAME_COLLISION`.

use std::{
    collections::{BTreeMap, HashMap},
    sync::{
        atomic::{AtomicU64, Ordering},
        Arc, Mutex, MutexGuard, PoisonError,
    },
};

use log::Level;
use shared::constants::{FILE_DIRECTORY_FILE, FILE_FLAG_DELETE_ON_CLOSE, FILE_DELETE_ON_CLOSE, FILE_NON_DIRECTORY_FILE};
use shared::events::{CreateDisposition, LegacyDisposition};
use shared::NtStatus;

use crate::bridge_log;
use crate::fs::operations::{CreateFileExArgs, FileInfo, Operations};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Node {
    pub is_directory: bool,
    pub size: u64,
}

#[derive(Debug)]
struct OpenEntry {
    key: String,
    delete_on_close: bool,
}

#[derive(Debug, Default)]
struct Namespace {
    nodes: BTreeMap<String, Node>,
    opens: HashMap<u64, OpenEntry>,
}

#[derive(Debug)]
pub struct MemoryFs {
    ns: Mutex<Namespace>,
    next_context: AtomicU64,
}

/// Case-folded key with `\` separators and a leading root.
fn key_of(path: &str) -> String {
    let mut key: String = path.chars().map(|c| if c == '/' { '\\' } else { c }).collect();
    key.make_ascii_lowercase();
    while key.len() > 1 && key.ends_with('\\') {
        key.pop();
    }
    if !key.starts_with('\\') {
        key.insert(0, '\\');
    }
    key
}

fn parent_of(key: &str) -> Option<&str> {
    match key.rfind('\\') {
        Some(0) if key.len() > 1 => Some("\\"),
        Some(0) | None => None,
        Some(i) => Some(&key[..i]),
    }
}

impl MemoryFs {
    pub fn new() -> Arc<Self> {
        let mut ns = Namespace::default();
        ns.nodes.insert("\\".into(), Node { is_directory: true, size: 0 });
        Arc::new(Self { ns: Mutex::new(ns), next_context: AtomicU64::new(1) })
    }

    fn lock(&self) -> MutexGuard<'_, Namespace> {
        self.ns.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Hook table backed by this volume.
    pub fn operations(self: &Arc<Self>) -> Operations {
        let (a, b, c, d, e) = (self.clone(), self.clone(), self.clone(), self.clone(), self.clone());
        Operations::new()
            .with_create_file(move |path, access, share, disposition, attributes, info| {
                a.create_file(path, access, share, disposition, attributes, info)
            })
            .with_create_directory(move |path, info| b.create_directory(path, info))
            .with_open_directory(move |path, info| c.open_directory(path, info))
            .with_create_file_ex(move |args, info| d.create_file_ex(args, info))
            .with_close_file(move |path, info| e.close_file(path, info))
    }

    /*──────────────────────────── seeding / queries ────────────────────*/

    pub fn insert_directory(&self, path: &str) {
        self.lock().nodes.insert(key_of(path), Node { is_directory: true, size: 0 });
    }

    pub fn insert_file(&self, path: &str, size: u64) {
        self.lock().nodes.insert(key_of(path), Node { is_directory: false, size });
    }

    pub fn node(&self, path: &str) -> Option<Node> {
        self.lock().nodes.get(&key_of(path)).copied()
    }

    pub fn exists(&self, path: &str) -> bool {
        self.node(path).is_some()
    }

    /// Handles opened through this volume and not yet closed.
    pub fn open_contexts(&self) -> usize {
        self.lock().opens.len()
    }

    /*──────────────────────────── hooks ────────────────────────────────*/

    fn open(&self, ns: &mut Namespace, key: String, delete_on_close: bool, info: &mut FileInfo) {
        let context = self.next_context.fetch_add(1, Ordering::Relaxed);
        ns.opens.insert(context, OpenEntry { key, delete_on_close });
        info.context = context;
    }

    fn parent_is_directory(ns: &Namespace, key: &str) -> bool {
        parent_of(key)
            .and_then(|p| ns.nodes.get(p))
            .is_some_and(|n| n.is_directory)
    }

    pub fn create_file(
        &self,
        path: &str,
        _desired_access: u32,
        _share_access: u32,
        disposition: LegacyDisposition,
        attributes: u32,
        info: &mut FileInfo,
    ) -> NtStatus {
        let key = key_of(path);
        let delete_on_close = attributes & FILE_FLAG_DELETE_ON_CLOSE != 0;
        let mut ns = self.lock();

        let existing = ns.nodes.get(&key).copied();
        let status = match (existing, disposition) {
            (Some(node), _) if node.is_directory => match disposition {
                LegacyDisposition::OpenExisting | LegacyDisposition::OpenAlways => {
                    info.is_directory = true;
                    NtStatus::SUCCESS
                }
                LegacyDisposition::CreateNew => NtStatus::OBJECT_NAME_COLLISION,
                _ => NtStatus::FILE_IS_A_DIRECTORY,
            },
            (Some(_), LegacyDisposition::CreateNew) => NtStatus::OBJECT_NAME_COLLISION,
            (Some(_), LegacyDisposition::OpenExisting) => NtStatus::SUCCESS,
            (Some(_), LegacyDisposition::OpenAlways) => NtStatus::OBJECT_NAME_COLLISION,
            (Some(_), LegacyDisposition::TruncateExisting) => {
                ns.nodes.insert(key.clone(), Node { is_directory: false, size: 0 });
                NtStatus::SUCCESS
            }
            (Some(_), LegacyDisposition::CreateAlways) => {
                ns.nodes.insert(key.clone(), Node { is_directory: false, size: 0 });
                NtStatus::OBJECT_NAME_COLLISION
            }
            (None, LegacyDisposition::OpenExisting | LegacyDisposition::TruncateExisting) => {
                NtStatus::OBJECT_NAME_NOT_FOUND
            }
            (None, _) if !Self::parent_is_directory(&ns, &key) => NtStatus::OBJECT_PATH_NOT_FOUND,
            (None, _) => {
                ns.nodes.insert(key.clone(), Node { is_directory: false, size: 0 });
                NtStatus::SUCCESS
            }
        };

        // a collision on *_ALWAYS still opened the file
        let opened = status == NtStatus::SUCCESS
            || (status == NtStatus::OBJECT_NAME_COLLISION
                && existing.is_some_and(|n| !n.is_directory)
                && matches!(disposition, LegacyDisposition::OpenAlways | LegacyDisposition::CreateAlways));
        if opened {
            self.open(&mut ns, key, delete_on_close, info);
        }
        bridge_log!(Level::Trace, "memfs", "CreateFile {} {} -> {:?}", path, disposition, status);
        status
    }

    pub fn create_directory(&self, path: &str, info: &mut FileInfo) -> NtStatus {
        let key = key_of(path);
        let mut ns = self.lock();
        if ns.nodes.contains_key(&key) {
            return NtStatus::OBJECT_NAME_COLLISION;
        }
        if !Self::parent_is_directory(&ns, &key) {
            return NtStatus::OBJECT_PATH_NOT_FOUND;
        }
        ns.nodes.insert(key.clone(), Node { is_directory: true, size: 0 });
        info.is_directory = true;
        self.open(&mut ns, key, false, info);
        NtStatus::SUCCESS
    }

    pub fn open_directory(&self, path: &str, info: &mut FileInfo) -> NtStatus {
        let key = key_of(path);
        let mut ns = self.lock();
        match ns.nodes.get(&key) {
            None => NtStatus::OBJECT_NAME_NOT_FOUND,
            Some(node) if !node.is_directory => NtStatus::NOT_A_DIRECTORY,
            Some(_) => {
                info.is_directory = true;
                self.open(&mut ns, key, false, info);
                NtStatus::SUCCESS
            }
        }
    }

    pub fn create_file_ex(&self, args: &CreateFileExArgs<'_>, info: &mut FileInfo) -> NtStatus {
        let Some(disposition) = CreateDisposition::from_u32(args.disposition) else {
            return NtStatus::INVALID_PARAMETER;
        };
        let want_directory = args.options & FILE_DIRECTORY_FILE != 0;
        let want_file = args.options & FILE_NON_DIRECTORY_FILE != 0;
        let delete_on_close = args.options & FILE_DELETE_ON_CLOSE != 0;
        let key = key_of(args.path);
        let mut ns = self.lock();

        let status = match ns.nodes.get(&key).copied() {
            Some(node) => {
                if node.is_directory && want_file {
                    NtStatus::FILE_IS_A_DIRECTORY
                } else if !node.is_directory && want_directory {
                    NtStatus::NOT_A_DIRECTORY
                } else {
                    match disposition {
                        CreateDisposition::Create => NtStatus::OBJECT_NAME_COLLISION,
                        CreateDisposition::Open | CreateDisposition::OpenIf => NtStatus::SUCCESS,
                        _ if node.is_directory => NtStatus::ACCESS_DENIED,
                        _ => {
                            ns.nodes.insert(key.clone(), Node { is_directory: false, size: 0 });
                            NtStatus::SUCCESS
                        }
                    }
                }
            }
            None => match disposition {
                CreateDisposition::Open | CreateDisposition::Overwrite => NtStatus::OBJECT_NAME_NOT_FOUND,
                _ if !Self::parent_is_directory(&ns, &key) => NtStatus::OBJECT_PATH_NOT_FOUND,
                _ => {
                    ns.nodes.insert(key.clone(), Node { is_directory: want_directory, size: 0 });
                    NtStatus::SUCCESS
                }
            },
        };

        if status == NtStatus::SUCCESS {
            info.is_directory = ns.nodes.get(&key).is_some_and(|n| n.is_directory);
            self.open(&mut ns, key, delete_on_close, info);
        }
        bridge_log!(Level::Trace, "memfs", "CreateFileEx {} {:?} -> {:?}", args.path, disposition, status);
        status
    }

    pub fn close_file(&self, path: &str, info: &FileInfo) {
        let mut ns = self.lock();
        let Some(entry) = ns.opens.remove(&info.context) else {
            bridge_log!(Level::Warn, "memfs", "close of unknown context {:#x} ({})", info.context, path);
            return;
        };
        if entry.delete_on_close {
            ns.nodes.remove(&entry.key);
        }
    }
}
