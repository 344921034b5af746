//! `NTSTATUS` values exchanged between the driver and the agent.
//!
//! Both halves resolve every request to exactly one of these. Only the codes
//! the bridge actually produces or inspects are listed.

use core::fmt;

/// Completion status of one request (signed 32-bit, like the native type).
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct NtStatus(pub i32);

impl NtStatus {
    pub const SUCCESS: Self                = Self(0x0000_0000);
    pub const NOT_IMPLEMENTED: Self        = Self(0xC000_0002_u32 as i32);
    pub const INVALID_PARAMETER: Self      = Self(0xC000_000D_u32 as i32);
    pub const INVALID_DEVICE_REQUEST: Self = Self(0xC000_0010_u32 as i32);
    pub const ACCESS_DENIED: Self          = Self(0xC000_0022_u32 as i32);
    pub const BUFFER_TOO_SMALL: Self       = Self(0xC000_0023_u32 as i32);
    pub const OBJECT_NAME_NOT_FOUND: Self  = Self(0xC000_0034_u32 as i32);
    pub const OBJECT_NAME_COLLISION: Self  = Self(0xC000_0035_u32 as i32);
    pub const OBJECT_PATH_NOT_FOUND: Self  = Self(0xC000_003A_u32 as i32);
    pub const INSUFFICIENT_RESOURCES: Self = Self(0xC000_009A_u32 as i32);
    pub const FILE_IS_A_DIRECTORY: Self    = Self(0xC000_00BA_u32 as i32);
    pub const NOT_A_DIRECTORY: Self        = Self(0xC000_0103_u32 as i32);
    pub const NOT_A_REPARSE_POINT: Self    = Self(0xC000_0275_u32 as i32);

    /// Severity bits `00` (success) or `01` (informational).
    #[inline]
    pub const fn is_success(self) -> bool {
        self.0 >= 0
    }

    #[inline]
    pub const fn as_u32(self) -> u32 {
        self.0 as u32
    }

    fn name(self) -> Option<&'static str> {
        Some(match self {
            Self::SUCCESS                => "STATUS_SUCCESS",
            Self::NOT_IMPLEMENTED        => "STATUS_NOT_IMPLEMENTED",
            Self::INVALID_PARAMETER      => "STATUS_INVALID_PARAMETER",
            Self::INVALID_DEVICE_REQUEST => "STATUS_INVALID_DEVICE_REQUEST",
            Self::ACCESS_DENIED          => "STATUS_ACCESS_DENIED",
            Self::BUFFER_TOO_SMALL       => "STATUS_BUFFER_TOO_SMALL",
            Self::OBJECT_NAME_NOT_FOUND  => "STATUS_OBJECT_NAME_NOT_FOUND",
            Self::OBJECT_NAME_COLLISION  => "STATUS_OBJECT_NAME_COLLISION",
            Self::OBJECT_PATH_NOT_FOUND  => "STATUS_OBJECT_PATH_NOT_FOUND",
            Self::INSUFFICIENT_RESOURCES => "STATUS_INSUFFICIENT_RESOURCES",
            Self::FILE_IS_A_DIRECTORY    => "STATUS_FILE_IS_A_DIRECTORY",
            Self::NOT_A_DIRECTORY        => "STATUS_NOT_A_DIRECTORY",
            Self::NOT_A_REPARSE_POINT    => "STATUS_NOT_A_REPARSE_POINT",
            _ => return None,
        })
    }
}

impl From<i32> for NtStatus {
    fn from(raw: i32) -> Self {
        Self(raw)
    }
}

impl From<NtStatus> for i32 {
    fn from(st: NtStatus) -> Self {
        st.0
    }
}

impl fmt::Debug for NtStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.name() {
            Some(name) => write!(f, "{name}"),
            None => write!(f, "NtStatus({:#010x})", self.as_u32()),
        }
    }
}

impl fmt::Display for NtStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:#010x}", self.as_u32())
    }
}
