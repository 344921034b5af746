//! Request / response messages crossing the kernel <-> agent boundary.
//!
//! The driver fills an [`EventContext`] for every operation it forwards and
//! the agent answers each one with an [`EventInformation`]. Both are `prost`
//! messages so they can be length-prefixed into the shared frame stream.

use alloc::string::String;
use core::fmt;

use crate::constants::{
    DISPOSITION_SHIFT, FILE_VALID_OPTION_FLAGS, RESPONSE_FLAG_DIRECTORY, SL_OPEN_TARGET_DIRECTORY,
};
use crate::NtStatus;

/*──────────────────────────── request ────────────────────────────────────*/

/// One forwarded kernel request.
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct EventContext {
    /// Monotonic per-volume request number, echoed in the response.
    #[prost(uint64, tag = "1")]
    pub serial_number: u64,
    #[prost(uint32, tag = "2")]
    pub process_id: u32,
    /// `SL_*` stack-location flags.
    #[prost(uint32, tag = "3")]
    pub flags: u32,
    #[prost(oneof = "event_context::Operation", tags = "10, 11")]
    pub operation: Option<event_context::Operation>,
}

pub mod event_context {
    /// The operation payload; only create is dispatched by this bridge.
    #[derive(Clone, PartialEq, ::prost::Oneof)]
    pub enum Operation {
        #[prost(message, tag = "10")]
        Create(super::CreateContext),
        /// Any other major function, kept opaque.
        #[prost(uint32, tag = "11")]
        Other(u32),
    }
}

/// Parameters of an open/create request.
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct CreateContext {
    #[prost(string, tag = "1")]
    pub file_name: String,
    #[prost(uint32, tag = "2")]
    pub desired_access: u32,
    #[prost(uint32, tag = "3")]
    pub share_access: u32,
    /// High 8 bits: disposition. Low 24 bits: create options.
    #[prost(uint32, tag = "4")]
    pub create_options: u32,
    #[prost(uint32, tag = "5")]
    pub file_attributes: u32,
}

impl CreateContext {
    #[inline]
    pub fn disposition(&self) -> u32 {
        (self.create_options >> DISPOSITION_SHIFT) & 0xFF
    }

    #[inline]
    pub fn options(&self) -> u32 {
        self.create_options & FILE_VALID_OPTION_FLAGS
    }

    /// Build the packed word from its two halves.
    #[inline]
    pub fn pack_options(disposition: u32, options: u32) -> u32 {
        ((disposition & 0xFF) << DISPOSITION_SHIFT) | (options & FILE_VALID_OPTION_FLAGS)
    }
}

impl EventContext {
    pub fn create(serial_number: u64, process_id: u32, flags: u32, create: CreateContext) -> Self {
        Self {
            serial_number,
            process_id,
            flags,
            operation: Some(event_context::Operation::Create(create)),
        }
    }

    #[inline]
    pub fn open_target_directory(&self) -> bool {
        self.flags & SL_OPEN_TARGET_DIRECTORY != 0
    }

    pub fn as_create(&self) -> Option<&CreateContext> {
        match &self.operation {
            Some(event_context::Operation::Create(c)) => Some(c),
            _ => None,
        }
    }
}

/*──────────────────────────── response ───────────────────────────────────*/

/// Completion of one request, sent back to the driver.
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct EventInformation {
    #[prost(uint64, tag = "1")]
    pub serial_number: u64,
    #[prost(int32, tag = "2")]
    pub status: i32,
    /// `CreateInformation` code for create requests.
    #[prost(uint32, tag = "3")]
    pub information: u32,
    /// `RESPONSE_FLAG_*` bits.
    #[prost(uint32, tag = "4")]
    pub flags: u32,
    /// Correlation token the driver hands back on later operations.
    #[prost(uint64, tag = "5")]
    pub context: u64,
}

impl EventInformation {
    /// Zeroed response bound to `serial_number`.
    pub fn for_request(serial_number: u64) -> Self {
        Self { serial_number, ..Default::default() }
    }

    #[inline]
    pub fn nt_status(&self) -> NtStatus {
        NtStatus(self.status)
    }

    #[inline]
    pub fn set_status(&mut self, status: NtStatus) {
        self.status = status.0;
    }

    #[inline]
    pub fn is_directory(&self) -> bool {
        self.flags & RESPONSE_FLAG_DIRECTORY != 0
    }

    pub fn create_information(&self) -> Option<CreateInformation> {
        CreateInformation::from_u32(self.information)
    }
}

/*──────────────────────────── create codes ───────────────────────────────*/

/// Caller intent of an open/create (`FILE_*` disposition values).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u32)]
pub enum CreateDisposition {
    Supersede   = 0,
    Open        = 1,
    Create      = 2,
    OpenIf      = 3,
    Overwrite   = 4,
    OverwriteIf = 5,
}

impl CreateDisposition {
    pub const ALL: [Self; 6] = [
        Self::Supersede,
        Self::Open,
        Self::Create,
        Self::OpenIf,
        Self::Overwrite,
        Self::OverwriteIf,
    ];

    pub fn from_u32(raw: u32) -> Option<Self> {
        Self::ALL.into_iter().find(|d| *d as u32 == raw)
    }
}

/// What actually happened (`IO_STATUS_BLOCK.Information` of a create).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[repr(u32)]
pub enum CreateInformation {
    #[default]
    Superseded   = 0,
    Opened       = 1,
    Created      = 2,
    Overwritten  = 3,
    Exists       = 4,
    DoesNotExist = 5,
}

impl CreateInformation {
    pub fn from_u32(raw: u32) -> Option<Self> {
        Some(match raw {
            0 => Self::Superseded,
            1 => Self::Opened,
            2 => Self::Created,
            3 => Self::Overwritten,
            4 => Self::Exists,
            5 => Self::DoesNotExist,
            _ => return None,
        })
    }
}

/// Win32 creation dispositions understood by the legacy create-file hook.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u32)]
pub enum LegacyDisposition {
    CreateNew        = 1,
    CreateAlways     = 2,
    OpenExisting     = 3,
    OpenAlways       = 4,
    TruncateExisting = 5,
}

impl fmt::Display for LegacyDisposition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::CreateNew        => "CREATE_NEW",
            Self::CreateAlways     => "CREATE_ALWAYS",
            Self::OpenExisting     => "OPEN_EXISTING",
            Self::OpenAlways       => "OPEN_ALWAYS",
            Self::TruncateExisting => "TRUNCATE_EXISTING",
        };
        f.write_str(s)
    }
}
