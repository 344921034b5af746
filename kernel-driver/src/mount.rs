//! `IRP_MN_MOUNT_VOLUME`: volume bootstrap.
//!
//! Key responsibilities:
//! * refuse anything that is not one of our disk devices,
//! * stamp the VPB with the volume device, label and serial,
//! * announce the mount through a stream file object (best effort),
//! * start the liveness checker and arm the first keepalive deadline.

use shared::NtStatus;

use crate::consts::{KEEPALIVE_TIMEOUT_MS, MOUNT_KEEPALIVE_GRACE};
use crate::device::ControlBlock;
use crate::irp::{Irp, Parameters};
use crate::services::{KernelServices, VolumeEvent};

/// Bootstrap the volume. Does not complete the IRP.
///
/// Once the disk device has been identified the mount reports success;
/// failures of the notification steps are logged and tolerated.
pub fn mount_volume(irp: &mut Irp, services: &dyn KernelServices) -> NtStatus {
    let Parameters::MountVolume { device_object, vpb } = &mut irp.stack.parameters else {
        log::debug!("  IRP_MN_MOUNT_VOLUME without mount parameters");
        return NtStatus::INVALID_PARAMETER;
    };

    // 1 ▸ only our own disk devices
    let dcb = match device_object.extension.as_ref() {
        Some(ControlBlock::Dcb(dcb)) => dcb.clone(),
        Some(other) => {
            log::debug!("  not a bridge disk device ({})", other.identifier_type().tag());
            return NtStatus::INVALID_PARAMETER;
        }
        None => {
            log::debug!("  not a bridge disk device (no extension)");
            return NtStatus::INVALID_PARAMETER;
        }
    };
    let volume_device = dcb.vcb.volume_device;

    // 2 ▸ VPB identity
    match vpb.as_mut() {
        Some(vpb) => vpb.init(dcb.disk_device, volume_device),
        None => log::warn!("  mount request carries no VPB"),
    }

    // 3 ▸ stream object + mount notification
    match services.create_stream_file_object(volume_device) {
        Ok(stream) => services.notify_volume_event(&stream, VolumeEvent::Mount),
        Err(status) => log::warn!("  stream file object failed: {status:?}; skipping notify"),
    }

    // 4 ▸ liveness checker
    if let Err(status) = services.start_check_thread(&dcb) {
        log::warn!("  check thread failed to start: {status:?}");
    }

    // 5 ▸ first keepalive deadline
    {
        let mut keepalive = dcb.resource.acquire_exclusive();
        keepalive.update_timeout(
            services.tick_count_ms(),
            KEEPALIVE_TIMEOUT_MS * MOUNT_KEEPALIVE_GRACE,
        );
    }

    log::info!("  volume mounted (disk={:?}, volume={:?})", dcb.disk_device, volume_device);
    NtStatus::SUCCESS
}
