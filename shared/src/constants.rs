//! Raw protocol values shared by the driver and the agent.

/*──────────────────────── CreateOptions (low 24 bits) ─────────────────────*/

pub const FILE_DIRECTORY_FILE: u32     = 0x0000_0001;
pub const FILE_NON_DIRECTORY_FILE: u32 = 0x0000_0040;
pub const FILE_DELETE_ON_CLOSE: u32    = 0x0000_1000;
pub const FILE_VALID_OPTION_FLAGS: u32 = 0x00FF_FFFF;

/// The disposition lives in the high 8 bits of the packed create-options word.
pub const DISPOSITION_SHIFT: u32 = 24;

/*──────────────────────── request flags ───────────────────────────────────*/

/// Caller wants the parent of the named object (rename / link targets).
pub const SL_OPEN_TARGET_DIRECTORY: u32 = 0x04;

/*──────────────────────── file attributes ─────────────────────────────────*/

pub const FILE_ATTRIBUTE_NORMAL: u32     = 0x0000_0080;
/// Win32 flag used to carry delete-on-close through the legacy create hook.
pub const FILE_FLAG_DELETE_ON_CLOSE: u32 = 0x0400_0000;

/*──────────────────────── response flags ──────────────────────────────────*/

/// Set in `EventInformation::flags` when the opened object is a directory.
pub const RESPONSE_FLAG_DIRECTORY: u32 = 0x0000_0001;

/*──────────────────────── framing ─────────────────────────────────────────*/

/// Every frame is `u32` little-endian length + encoded message.
pub const FRAME_HEADER_LEN: usize = 4;
/// Upper bound accepted by the frame reader.
pub const MAX_FRAME_LEN: usize = 64 * 1024;
