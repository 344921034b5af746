//! dispatch.rs
//! Major-function table and the `IRP_MJ_FILE_SYSTEM_CONTROL` entry point.

use shared::NtStatus;

use crate::consts::{
    IRP_MJ_FILE_SYSTEM_CONTROL, IRP_MJ_MAXIMUM_FUNCTION, IRP_MN_KERNEL_CALL,
    IRP_MN_LOAD_FILE_SYSTEM, IRP_MN_MOUNT_VOLUME, IRP_MN_USER_FS_REQUEST, IRP_MN_VERIFY_VOLUME,
};
use crate::fscontrol::user_fs_request;
use crate::irp::{complete, current_stack_location, Irp};
use crate::mount::mount_volume;
use crate::services::KernelServices;

/// Prototype for IRP handlers. A handler completes the IRP it is given.
pub type DispatchFn = fn(irp: &mut Irp, services: &dyn KernelServices) -> NtStatus;

const TABLE_LEN: usize = IRP_MJ_MAXIMUM_FUNCTION as usize + 1;

/// Default handler: completes the IRP with `STATUS_INVALID_DEVICE_REQUEST`.
fn default_handler(irp: &mut Irp, _services: &dyn KernelServices) -> NtStatus {
    complete(irp, NtStatus::INVALID_DEVICE_REQUEST, 0)
}

/// Handlers for each major function (0–27).
pub struct Dispatcher {
    handlers: [DispatchFn; TABLE_LEN],
}

impl Default for Dispatcher {
    fn default() -> Self {
        Self::new()
    }
}

impl Dispatcher {
    /// All slots initialize to `default_handler`.
    pub const fn new() -> Self {
        Self { handlers: [default_handler; TABLE_LEN] }
    }

    /// Table with every handler this driver implements.
    pub fn with_file_system_handlers() -> Self {
        let mut dispatcher = Self::new();
        dispatcher.register(IRP_MJ_FILE_SYSTEM_CONTROL, dispatch_file_system_control);
        dispatcher
    }

    /// Register a handler for a given IRP major code; out-of-range codes are ignored.
    pub fn register(&mut self, major_fn: u8, handler: DispatchFn) {
        if let Some(slot) = self.handlers.get_mut(major_fn as usize) {
            *slot = handler;
        }
    }

    /// Route an IRP by its major function.
    pub fn dispatch(&self, irp: &mut Irp, services: &dyn KernelServices) -> NtStatus {
        let major = irp.stack.major_function as usize;
        match self.handlers.get(major) {
            Some(handler) => handler(irp, services),
            None => default_handler(irp, services),
        }
    }
}

// ------------------------------------------------------------
// IRP_MJ_FILE_SYSTEM_CONTROL

/// Switch on the minor function and always complete the IRP.
pub fn dispatch_file_system_control(irp: &mut Irp, services: &dyn KernelServices) -> NtStatus {
    let minor = match current_stack_location(irp) {
        Ok(stack) => stack.minor_function,
        Err(status) => return complete(irp, status, 0),
    };

    log::debug!("==> file_system_control (pid={})", irp.requestor_process_id);

    let status = match minor {
        IRP_MN_USER_FS_REQUEST => {
            log::debug!("  IRP_MN_USER_FS_REQUEST");
            user_fs_request(irp, services)
        }
        IRP_MN_MOUNT_VOLUME => {
            log::debug!("  IRP_MN_MOUNT_VOLUME");
            mount_volume(irp, services)
        }
        IRP_MN_VERIFY_VOLUME | IRP_MN_LOAD_FILE_SYSTEM | IRP_MN_KERNEL_CALL => {
            log::debug!("  minor function {minor:#x} not handled");
            NtStatus::INVALID_PARAMETER
        }
        other => {
            log::debug!("  unknown minor function {other:#x}");
            NtStatus::INVALID_PARAMETER
        }
    };

    log::debug!("<== file_system_control {status:?}");
    complete(irp, status, 0)
}
