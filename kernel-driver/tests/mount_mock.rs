//! User-mode tests for `IRP_MN_MOUNT_VOLUME`.

mod common;

use std::sync::Arc;

use common::{disk_dcb, Call, MockServices};
use fsbridge_driver::consts::{
    IRP_MJ_FILE_SYSTEM_CONTROL, IRP_MN_MOUNT_VOLUME, KEEPALIVE_TIMEOUT_MS, VOLUME_LABEL,
    VOLUME_SERIAL_NUMBER,
};
use fsbridge_driver::device::{ControlBlock, DeviceId, DeviceObject, Vcb, Vpb};
use fsbridge_driver::irp::{Irp, Parameters};
use fsbridge_driver::{dispatch_file_system_control, VolumeEvent};
use shared::NtStatus;

fn mount_irp(device: DeviceObject) -> Irp {
    Irp::new(
        IRP_MJ_FILE_SYSTEM_CONTROL,
        IRP_MN_MOUNT_VOLUME,
        Parameters::MountVolume { device_object: Arc::new(device), vpb: Some(Vpb::default()) },
    )
}

fn vpb_of(irp: &Irp) -> &Vpb {
    match &irp.stack.parameters {
        Parameters::MountVolume { vpb: Some(vpb), .. } => vpb,
        other => panic!("unexpected parameters {other:?}"),
    }
}

#[test]
fn mount_on_dcb_initialises_volume() {
    let services = MockServices { now_ms: 10_000, ..Default::default() };
    let dcb = disk_dcb(1, 2);
    let mut irp = mount_irp(DeviceObject::new(DeviceId(1), Some(ControlBlock::Dcb(dcb.clone()))));

    let status = dispatch_file_system_control(&mut irp, &services);
    assert_eq!(status, NtStatus::SUCCESS);
    assert!(irp.is_completed());

    let vpb = vpb_of(&irp);
    assert_eq!(vpb.device_object, Some(DeviceId(2)));
    assert_eq!(vpb.real_device, Some(DeviceId(1)));
    assert_eq!(vpb.volume_label, VOLUME_LABEL);
    assert_eq!(vpb.volume_label_length as usize, VOLUME_LABEL.len() * 2);
    assert_eq!(vpb.serial_number, VOLUME_SERIAL_NUMBER);

    assert_eq!(
        services.calls(),
        vec![
            Call::StreamFileObject(DeviceId(2)),
            Call::Notify("stream-2".into(), VolumeEvent::Mount),
            Call::StartCheckThread(DeviceId(1)),
        ]
    );

    assert!(!dcb.resource.is_acquired());
    let keepalive = dcb.resource.acquire_exclusive();
    assert_eq!(keepalive.deadline_ms, 10_000 + 3 * KEEPALIVE_TIMEOUT_MS);
    assert!(!keepalive.expired(10_000 + 45_000 - 1));
    assert!(keepalive.expired(55_000));
}

#[test]
fn stream_failure_skips_notify_but_mount_succeeds() {
    let services = MockServices { fail_stream: true, fail_check_thread: true, ..Default::default() };
    let dcb = disk_dcb(5, 6);
    let mut irp = mount_irp(DeviceObject::new(DeviceId(5), Some(ControlBlock::Dcb(dcb.clone()))));

    assert_eq!(dispatch_file_system_control(&mut irp, &services), NtStatus::SUCCESS);
    assert_eq!(
        services.calls(),
        vec![Call::StreamFileObject(DeviceId(6)), Call::StartCheckThread(DeviceId(5))]
    );
    assert_eq!(dcb.resource.acquire_exclusive().deadline_ms, 1_000 + 45_000);
}

#[test]
fn mount_on_foreign_device_is_rejected_untouched() {
    let services = MockServices::default();
    let vcb = Arc::new(Vcb { volume_device: DeviceId(9) });
    for extension in [None, Some(ControlBlock::Global), Some(ControlBlock::Vcb(vcb))] {
        let mut irp = mount_irp(DeviceObject::new(DeviceId(8), extension));
        let status = dispatch_file_system_control(&mut irp, &services);
        assert_eq!(status, NtStatus::INVALID_PARAMETER);
        assert_eq!(vpb_of(&irp), &Vpb::default());
        assert!(irp.is_completed());
    }
    assert!(services.calls().is_empty());
}
