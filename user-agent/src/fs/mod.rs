//! The create side of the bridge: hook table, correlation objects, mount
//! instance and the dispatcher that ties them together.

pub mod create;
pub mod disposition;
pub mod instance;
pub mod memory;
pub mod open_info;
pub mod operations;

pub use create::dispatch_create;
pub use instance::{Instance, MountOptions};
pub use memory::MemoryFs;
pub use open_info::OpenInfo;
pub use operations::{CreateFileExArgs, FileInfo, Operations};
