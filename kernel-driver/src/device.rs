//! Device objects and the tagged control blocks hanging off them.
//!
//!  * A disk device carries a **DCB** in its extension, a volume device a
//!    **VCB**; the global control device carries the driver-wide block.
//!  * Every open handle owns a **CCB** that points at the per-file **FCB**.
//!
//! Extensions are a sum type, so callers must match on the variant before
//! touching any block-specific field.

use alloc::{string::String, sync::Arc};
use core::{
    cell::UnsafeCell,
    fmt,
    hint,
    ops::{Deref, DerefMut},
    sync::atomic::{AtomicBool, Ordering},
};

use crate::consts::{MAXIMUM_VOLUME_LABEL_LENGTH, VOLUME_LABEL, VOLUME_SERIAL_NUMBER};

/*──────────────────────────── identifiers ───────────────────────────────*/

/// Opaque identity of a `DEVICE_OBJECT`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct DeviceId(pub u64);

/// Tag stored at the head of every control block.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IdentifierType {
    Global,
    Dcb,
    Vcb,
    Fcb,
    Ccb,
}

impl IdentifierType {
    /// Four-character pool tag, as printed by the debugger extension.
    pub const fn tag(self) -> &'static str {
        match self {
            Self::Global => ":DGL",
            Self::Dcb    => ":DCB",
            Self::Vcb    => ":VCB",
            Self::Fcb    => ":FCB",
            Self::Ccb    => ":CCB",
        }
    }
}

/*──────────────────────────── device objects ────────────────────────────*/

/// What a device's extension holds.
#[derive(Debug, Clone)]
pub enum ControlBlock {
    Global,
    Dcb(Arc<Dcb>),
    Vcb(Arc<Vcb>),
}

impl ControlBlock {
    pub fn identifier_type(&self) -> IdentifierType {
        match self {
            Self::Global => IdentifierType::Global,
            Self::Dcb(_) => IdentifierType::Dcb,
            Self::Vcb(_) => IdentifierType::Vcb,
        }
    }
}

#[derive(Debug, Clone)]
pub struct DeviceObject {
    pub id: DeviceId,
    /// `None` for devices we did not create.
    pub extension: Option<ControlBlock>,
}

impl DeviceObject {
    pub fn new(id: DeviceId, extension: Option<ControlBlock>) -> Self {
        Self { id, extension }
    }
}

/*──────────────────────────── volume blocks ─────────────────────────────*/

/// Disk control block: one per mounted volume instance.
pub struct Dcb {
    /// The disk device that owns this DCB.
    pub disk_device: DeviceId,
    pub vcb: Arc<Vcb>,
    /// Serializes keepalive updates against the liveness checker.
    pub resource: Resource<KeepAlive>,
}

impl Dcb {
    pub fn new(disk_device: DeviceId, vcb: Arc<Vcb>) -> Self {
        Self { disk_device, vcb, resource: Resource::new(KeepAlive::default()) }
    }
}

impl fmt::Debug for Dcb {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Dcb")
            .field("disk_device", &self.disk_device)
            .field("vcb", &self.vcb)
            .finish_non_exhaustive()
    }
}

/// Volume control block.
#[derive(Debug)]
pub struct Vcb {
    pub volume_device: DeviceId,
}

/// Keepalive bookkeeping guarded by the DCB resource.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct KeepAlive {
    /// Tick (ms) after which the liveness checker tears the volume down.
    pub deadline_ms: u64,
}

impl KeepAlive {
    /// Push the deadline `timeout_ms` past `now_ms`.
    pub fn update_timeout(&mut self, now_ms: u64, timeout_ms: u64) {
        self.deadline_ms = now_ms.saturating_add(timeout_ms);
    }

    pub fn expired(&self, now_ms: u64) -> bool {
        now_ms >= self.deadline_ms
    }
}

/*──────────────────────────── file blocks ───────────────────────────────*/

/// Oplock sub-state of an FCB. Owned by the OS oplock package; the driver
/// only hands it back when delegating.
#[derive(Debug, Default)]
pub struct Oplock {
    pub id: u64,
}

/// File control block, shared by every handle on the same name.
#[derive(Debug)]
pub struct Fcb {
    pub file_name: String,
    pub oplock: Oplock,
}

impl Fcb {
    pub fn new(file_name: impl Into<String>, oplock: Oplock) -> Self {
        Self { file_name: file_name.into(), oplock }
    }
}

/// Context control block: one per open handle.
#[derive(Debug)]
pub struct Ccb {
    pub fcb: Arc<Fcb>,
    /// Correlation token returned by the agent's create response.
    pub user_context: u64,
}

/// The parts of `FILE_OBJECT` the driver reads.
#[derive(Debug, Clone, Default)]
pub struct FileObject {
    pub file_name: String,
    /// `FsContext2`: the handle's CCB, unset for stream/volume objects.
    pub fs_context2: Option<Arc<Ccb>>,
}

/*──────────────────────────── VPB ───────────────────────────────────────*/

/// Volume parameter block.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Vpb {
    pub device_object: Option<DeviceId>,
    pub real_device: Option<DeviceId>,
    pub volume_label: String,
    /// Label length in bytes.
    pub volume_label_length: u16,
    pub serial_number: u32,
}

impl Vpb {
    /// Link the VPB to the volume device and stamp the fixed identity.
    pub fn init(&mut self, disk_device: DeviceId, volume_device: DeviceId) {
        let label: String = VOLUME_LABEL.chars().take(MAXIMUM_VOLUME_LABEL_LENGTH).collect();
        self.device_object = Some(volume_device);
        self.real_device.get_or_insert(disk_device);
        self.volume_label_length = (label.encode_utf16().count() * 2) as u16;
        self.volume_label = label;
        self.serial_number = VOLUME_SERIAL_NUMBER;
    }
}

/*──────────────────────────── resource ──────────────────────────────────*/

/// Exclusive-only stand-in for `ERESOURCE`.
///
/// Acquisition spins; holders never block (no hook calls, no I/O), so the
/// critical sections stay a few instructions long.
pub struct Resource<T> {
    locked: AtomicBool,
    value: UnsafeCell<T>,
}

// SAFETY: access to `value` is serialized by `locked`.
unsafe impl<T: Send> Send for Resource<T> {}
unsafe impl<T: Send> Sync for Resource<T> {}

impl<T> Resource<T> {
    pub const fn new(value: T) -> Self {
        Self { locked: AtomicBool::new(false), value: UnsafeCell::new(value) }
    }

    /// `ExAcquireResourceExclusiveLite(.., TRUE)`; released on guard drop.
    pub fn acquire_exclusive(&self) -> ResourceGuard<'_, T> {
        while self
            .locked
            .compare_exchange_weak(false, true, Ordering::Acquire, Ordering::Relaxed)
            .is_err()
        {
            while self.locked.load(Ordering::Relaxed) {
                hint::spin_loop();
            }
        }
        ResourceGuard { resource: self }
    }

    pub fn is_acquired(&self) -> bool {
        self.locked.load(Ordering::Acquire)
    }
}

pub struct ResourceGuard<'a, T> {
    resource: &'a Resource<T>,
}

impl<T> Deref for ResourceGuard<'_, T> {
    type Target = T;

    fn deref(&self) -> &T {
        // SAFETY: the guard proves exclusive ownership.
        unsafe { &*self.resource.value.get() }
    }
}

impl<T> DerefMut for ResourceGuard<'_, T> {
    fn deref_mut(&mut self) -> &mut T {
        // SAFETY: the guard proves exclusive ownership.
        unsafe { &mut *self.resource.value.get() }
    }
}

impl<T> Drop for ResourceGuard<'_, T> {
    fn drop(&mut self) {
        self.resource.locked.store(false, Ordering::Release);
    }
}
