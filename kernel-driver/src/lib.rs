//! Kernel half of the file-system bridge.
//!
//! Key responsibilities:
//! * route `IRP_MJ_FILE_SYSTEM_CONTROL` by minor function,
//! * answer volume control codes in-kernel (acknowledge, delegate oplock
//!   requests, refuse the rest),
//! * bootstrap a volume on `IRP_MN_MOUNT_VOLUME`.
//!
//! Everything the OS provides (stream file objects, volume notifications,
//! the oplock package, ticks) is reached through [`KernelServices`], which
//! the WDK glue implements and the tests mock.

#![no_std]

extern crate alloc;

pub mod consts;
pub mod device;
pub mod dispatch;
pub mod fscontrol;
pub mod irp;
pub mod mount;
pub mod services;

pub use dispatch::{dispatch_file_system_control, Dispatcher};
pub use services::{KernelServices, VolumeEvent};
