//! User-mode stand-in for the executive services the driver calls.

#![allow(dead_code)]

use std::sync::{Arc, Mutex};

use fsbridge_driver::consts::{IRP_MJ_FILE_SYSTEM_CONTROL, IRP_MN_USER_FS_REQUEST};
use fsbridge_driver::device::{Ccb, Dcb, DeviceId, Fcb, FileObject, Oplock, Vcb};
use fsbridge_driver::irp::{Irp, Parameters};
use fsbridge_driver::{KernelServices, VolumeEvent};
use shared::NtStatus;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Call {
    StreamFileObject(DeviceId),
    Notify(String, VolumeEvent),
    StartCheckThread(DeviceId),
    OplockFsctrl { oplock_id: u64, open_count: u32 },
}

pub struct MockServices {
    pub now_ms: u64,
    pub fail_stream: bool,
    pub fail_check_thread: bool,
    pub oplock_status: NtStatus,
    pub calls: Mutex<Vec<Call>>,
}

impl Default for MockServices {
    fn default() -> Self {
        Self {
            now_ms: 1_000,
            fail_stream: false,
            fail_check_thread: false,
            oplock_status: NtStatus::SUCCESS,
            calls: Mutex::new(Vec::new()),
        }
    }
}

impl MockServices {
    pub fn calls(&self) -> Vec<Call> {
        self.calls.lock().unwrap().clone()
    }

    fn record(&self, call: Call) {
        self.calls.lock().unwrap().push(call);
    }
}

impl KernelServices for MockServices {
    fn create_stream_file_object(&self, volume_device: DeviceId) -> Result<FileObject, NtStatus> {
        self.record(Call::StreamFileObject(volume_device));
        if self.fail_stream {
            return Err(NtStatus::INSUFFICIENT_RESOURCES);
        }
        Ok(FileObject { file_name: format!("stream-{}", volume_device.0), fs_context2: None })
    }

    fn notify_volume_event(&self, file_object: &FileObject, event: VolumeEvent) {
        self.record(Call::Notify(file_object.file_name.clone(), event));
    }

    fn start_check_thread(&self, dcb: &Arc<Dcb>) -> Result<(), NtStatus> {
        self.record(Call::StartCheckThread(dcb.disk_device));
        if self.fail_check_thread {
            return Err(NtStatus::INSUFFICIENT_RESOURCES);
        }
        Ok(())
    }

    fn oplock_fsctrl(&self, oplock: &Oplock, _irp: &Irp, open_count: u32) -> NtStatus {
        self.record(Call::OplockFsctrl { oplock_id: oplock.id, open_count });
        self.oplock_status
    }

    fn tick_count_ms(&self) -> u64 {
        self.now_ms
    }
}

pub fn fsctl_irp(code: u32, input: u32, output: u32) -> Irp {
    Irp::new(
        IRP_MJ_FILE_SYSTEM_CONTROL,
        IRP_MN_USER_FS_REQUEST,
        Parameters::FileSystemControl {
            fs_control_code: code,
            input_buffer_length: input,
            output_buffer_length: output,
        },
    )
}

/// A handle on `name` whose FCB carries oplock `oplock_id`.
pub fn open_handle(name: &str, oplock_id: u64) -> FileObject {
    let fcb = Arc::new(Fcb::new(name, Oplock { id: oplock_id }));
    FileObject {
        file_name: name.to_owned(),
        fs_context2: Some(Arc::new(Ccb { fcb, user_context: 42 })),
    }
}

pub fn disk_dcb(disk: u64, volume: u64) -> Arc<Dcb> {
    Arc::new(Dcb::new(DeviceId(disk), Arc::new(Vcb { volume_device: DeviceId(volume) })))
}
