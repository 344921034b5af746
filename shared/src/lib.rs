#![cfg_attr(feature = "kernel", no_std)]

extern crate alloc; // gives Vec and String

pub mod events;
pub mod status;
pub mod constants;

pub use status::NtStatus;
