//! The slice of an I/O request packet the file-system dispatch reads.

use alloc::sync::Arc;

use shared::NtStatus;

use crate::device::{DeviceObject, FileObject, Vpb};

/// `IO_STATUS_BLOCK`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IoStatusBlock {
    pub status: NtStatus,
    pub information: u64,
}

impl Default for IoStatusBlock {
    fn default() -> Self {
        Self { status: NtStatus::SUCCESS, information: 0 }
    }
}

/// Stack-location parameters, one variant per request shape we consume.
#[derive(Debug, Clone)]
pub enum Parameters {
    None,
    MountVolume {
        /// The disk device the I/O manager asks us to mount.
        device_object: Arc<DeviceObject>,
        vpb: Option<Vpb>,
    },
    FileSystemControl {
        fs_control_code: u32,
        input_buffer_length: u32,
        output_buffer_length: u32,
    },
}

/// `IO_STACK_LOCATION`.
#[derive(Debug, Clone)]
pub struct IoStackLocation {
    pub major_function: u8,
    pub minor_function: u8,
    pub parameters: Parameters,
    pub file_object: Option<FileObject>,
}

/// `IRP`, reduced to a single stack location.
#[derive(Debug, Clone)]
pub struct Irp {
    pub requestor_process_id: u32,
    pub stack_count: u8,
    pub current_location: u8,
    pub stack: IoStackLocation,
    pub io_status: IoStatusBlock,
    completed: bool,
}

impl Irp {
    pub fn new(major_function: u8, minor_function: u8, parameters: Parameters) -> Self {
        Self {
            requestor_process_id: 0,
            stack_count: 1,
            current_location: 1,
            stack: IoStackLocation { major_function, minor_function, parameters, file_object: None },
            io_status: IoStatusBlock::default(),
            completed: false,
        }
    }

    pub fn with_file_object(mut self, file_object: FileObject) -> Self {
        self.stack.file_object = Some(file_object);
        self
    }

    pub fn is_completed(&self) -> bool {
        self.completed
    }
}

/// Validate `CurrentLocation` before handing out the stack location.
pub fn current_stack_location(irp: &Irp) -> Result<&IoStackLocation, NtStatus> {
    if irp.current_location == 0 || irp.current_location > irp.stack_count + 1 {
        return Err(NtStatus::INVALID_PARAMETER);
    }
    Ok(&irp.stack)
}

/// Finish an IRP and return the given status.
pub fn complete(irp: &mut Irp, status: NtStatus, information: u64) -> NtStatus {
    irp.io_status = IoStatusBlock { status, information };
    irp.completed = true;
    status
}
