//! Executive services the file-system dispatch calls into.
//!
//! The driver only decides *when* to call these; stream file objects, volume
//! notifications, the oplock package and the system tick belong to the OS.
//! Keeping them behind a trait lets the same dispatch code run against a
//! user-mode double in `tests/`.

use alloc::sync::Arc;

use shared::NtStatus;

use crate::device::{Dcb, DeviceId, FileObject, Oplock};
use crate::irp::Irp;

/// `FSRTL_VOLUME_*` events the mount path raises.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VolumeEvent {
    Mount,
}

pub trait KernelServices: Sync {
    /// `IoCreateStreamFileObjectLite` for the volume device.
    fn create_stream_file_object(&self, volume_device: DeviceId) -> Result<FileObject, NtStatus>;

    /// `FsRtlNotifyVolumeEvent`.
    fn notify_volume_event(&self, file_object: &FileObject, event: VolumeEvent);

    /// Start the per-volume liveness checker.
    fn start_check_thread(&self, dcb: &Arc<Dcb>) -> Result<(), NtStatus>;

    /// `FsRtlOplockFsctrl`: run the OS oplock state machine for `irp`.
    fn oplock_fsctrl(&self, oplock: &Oplock, irp: &Irp, open_count: u32) -> NtStatus;

    /// Monotonic tick in milliseconds.
    fn tick_count_ms(&self) -> u64;
}
