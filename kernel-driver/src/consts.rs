//! Assorted WDK constants the driver switches on.

/*────────── I/O major / minor codes ─────────*/

pub const IRP_MJ_CREATE: u8              = 0x00;
pub const IRP_MJ_FILE_SYSTEM_CONTROL: u8 = 0x0D;
pub const IRP_MJ_MAXIMUM_FUNCTION: u8    = 0x1B;

pub const IRP_MN_USER_FS_REQUEST: u8   = 0x00;
pub const IRP_MN_MOUNT_VOLUME: u8      = 0x01;
pub const IRP_MN_VERIFY_VOLUME: u8     = 0x02;
pub const IRP_MN_LOAD_FILE_SYSTEM: u8  = 0x03;
pub const IRP_MN_KERNEL_CALL: u8       = 0x04;

/*────────── CTL_CODE pieces ─────────*/

pub const FILE_DEVICE_FILE_SYSTEM: u32 = 0x0000_0009;

pub const METHOD_BUFFERED: u32 = 0;
pub const METHOD_NEITHER: u32  = 3;

pub const FILE_ANY_ACCESS: u32     = 0;
pub const FILE_SPECIAL_ACCESS: u32 = FILE_ANY_ACCESS;
pub const FILE_READ_DATA: u32      = 0x0001;
pub const FILE_WRITE_DATA: u32     = 0x0002;

/// Rust equivalent of the `CTL_CODE` macro.
#[inline]
pub const fn ctl_code(device_type: u32, function: u32, method: u32, access: u32) -> u32 {
    (device_type << 16) | (access << 14) | (function << 2) | method
}

/// Function number of a control code (bits 2..14), used for diagnostics.
#[inline]
pub const fn ctl_function(code: u32) -> u32 {
    (code >> 2) & 0xFFF
}

/*────────── oplock request buffers ─────────*/

/// `sizeof(REQUEST_OPLOCK_INPUT_BUFFER)`: version, length, level, flags.
pub const REQUEST_OPLOCK_INPUT_BUFFER_SIZE: u32 = 12;
/// `sizeof(REQUEST_OPLOCK_OUTPUT_BUFFER)` including tail padding.
pub const REQUEST_OPLOCK_OUTPUT_BUFFER_SIZE: u32 = 24;
/// Open count handed to the oplock package; the driver does not track
/// unclean opens per FCB.
pub const OPLOCK_OPEN_COUNT: u32 = 0;

/*────────── volume identity ─────────*/

pub const VOLUME_LABEL: &str = "FSBRIDGE";
pub const VOLUME_SERIAL_NUMBER: u32 = 0x1983_1116;
/// `VPB.VolumeLabel` holds at most 32 UTF-16 units.
pub const MAXIMUM_VOLUME_LABEL_LENGTH: usize = 32;

/*────────── liveness ─────────*/

/// Interval the agent must ping within before the volume is considered dead.
pub const KEEPALIVE_TIMEOUT_MS: u64 = 15_000;
/// Grace given right after mount, in keepalive intervals.
pub const MOUNT_KEEPALIVE_GRACE: u64 = 3;
