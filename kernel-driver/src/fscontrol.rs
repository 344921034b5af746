//! `IRP_MN_USER_FS_REQUEST`: the file-system control-code switch.
//!
//! Most codes exist only to satisfy what the I/O manager and the redirector
//! expect from a local file system:
//!
//! * oplock requests of the pre-Win7 flavour and volume lock/unlock are
//!   acknowledged without side effects,
//! * `FSCTL_REQUEST_OPLOCK` is validated and handed to the OS oplock package,
//! * everything else we know of answers `STATUS_NOT_IMPLEMENTED`, except
//!   `FSCTL_GET_REPARSE_POINT` (nothing on this volume is a reparse point),
//! * unknown codes are `STATUS_INVALID_DEVICE_REQUEST`.

use shared::NtStatus;

use crate::consts::{
    ctl_code, ctl_function, FILE_ANY_ACCESS, FILE_DEVICE_FILE_SYSTEM, FILE_READ_DATA,
    FILE_SPECIAL_ACCESS, FILE_WRITE_DATA, METHOD_BUFFERED, METHOD_NEITHER, OPLOCK_OPEN_COUNT,
    REQUEST_OPLOCK_INPUT_BUFFER_SIZE, REQUEST_OPLOCK_OUTPUT_BUFFER_SIZE,
};
use crate::irp::{Irp, Parameters};
use crate::services::KernelServices;

/// What the switch does for a recognised code.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FsctlAction {
    /// Complete with success, no side effects.
    Acknowledge,
    /// Validate buffers and delegate to the oplock package.
    RequestOplock,
    /// `STATUS_NOT_A_REPARSE_POINT`.
    NotAReparsePoint,
    /// Known but unsupported.
    NotImplemented,
}

macro_rules! fs_control_codes {
    ($( $variant:ident = ($name:literal, $function:expr, $method:expr, $access:expr) => $action:ident ),+ $(,)?) => {
        /// File-system control codes the switch recognises.
        #[derive(Debug, Clone, Copy, PartialEq, Eq)]
        pub enum FsControlCode {
            $($variant),+
        }

        impl FsControlCode {
            pub const ALL: &'static [Self] = &[$(Self::$variant),+];

            pub const fn code(self) -> u32 {
                match self {
                    $(Self::$variant => ctl_code(FILE_DEVICE_FILE_SYSTEM, $function, $method, $access)),+
                }
            }

            pub const fn name(self) -> &'static str {
                match self {
                    $(Self::$variant => $name),+
                }
            }

            pub const fn action(self) -> FsctlAction {
                match self {
                    $(Self::$variant => FsctlAction::$action),+
                }
            }
        }
    };
}

fs_control_codes! {
    RequestOplockLevel1     = ("FSCTL_REQUEST_OPLOCK_LEVEL_1", 0, METHOD_BUFFERED, FILE_ANY_ACCESS) => Acknowledge,
    RequestOplockLevel2     = ("FSCTL_REQUEST_OPLOCK_LEVEL_2", 1, METHOD_BUFFERED, FILE_ANY_ACCESS) => Acknowledge,
    RequestBatchOplock      = ("FSCTL_REQUEST_BATCH_OPLOCK", 2, METHOD_BUFFERED, FILE_ANY_ACCESS) => Acknowledge,
    OplockBreakAcknowledge  = ("FSCTL_OPLOCK_BREAK_ACKNOWLEDGE", 3, METHOD_BUFFERED, FILE_ANY_ACCESS) => Acknowledge,
    OpbatchAckClosePending  = ("FSCTL_OPBATCH_ACK_CLOSE_PENDING", 4, METHOD_BUFFERED, FILE_ANY_ACCESS) => Acknowledge,
    OplockBreakNotify       = ("FSCTL_OPLOCK_BREAK_NOTIFY", 5, METHOD_BUFFERED, FILE_ANY_ACCESS) => Acknowledge,
    LockVolume              = ("FSCTL_LOCK_VOLUME", 6, METHOD_BUFFERED, FILE_ANY_ACCESS) => Acknowledge,
    UnlockVolume            = ("FSCTL_UNLOCK_VOLUME", 7, METHOD_BUFFERED, FILE_ANY_ACCESS) => Acknowledge,
    DismountVolume          = ("FSCTL_DISMOUNT_VOLUME", 8, METHOD_BUFFERED, FILE_ANY_ACCESS) => NotImplemented,
    IsVolumeMounted         = ("FSCTL_IS_VOLUME_MOUNTED", 10, METHOD_BUFFERED, FILE_ANY_ACCESS) => Acknowledge,
    IsPathnameValid         = ("FSCTL_IS_PATHNAME_VALID", 11, METHOD_BUFFERED, FILE_ANY_ACCESS) => NotImplemented,
    MarkVolumeDirty         = ("FSCTL_MARK_VOLUME_DIRTY", 12, METHOD_BUFFERED, FILE_ANY_ACCESS) => NotImplemented,
    QueryRetrievalPointers  = ("FSCTL_QUERY_RETRIEVAL_POINTERS", 14, METHOD_NEITHER, FILE_ANY_ACCESS) => NotImplemented,
    GetCompression          = ("FSCTL_GET_COMPRESSION", 15, METHOD_BUFFERED, FILE_ANY_ACCESS) => NotImplemented,
    SetCompression          = ("FSCTL_SET_COMPRESSION", 16, METHOD_BUFFERED, FILE_READ_DATA | FILE_WRITE_DATA) => NotImplemented,
    MarkAsSystemHive        = ("FSCTL_MARK_AS_SYSTEM_HIVE", 19, METHOD_NEITHER, FILE_ANY_ACCESS) => NotImplemented,
    OplockBreakAckNo2       = ("FSCTL_OPLOCK_BREAK_ACK_NO_2", 20, METHOD_BUFFERED, FILE_ANY_ACCESS) => NotImplemented,
    InvalidateVolumes       = ("FSCTL_INVALIDATE_VOLUMES", 21, METHOD_BUFFERED, FILE_ANY_ACCESS) => NotImplemented,
    QueryFatBpb             = ("FSCTL_QUERY_FAT_BPB", 22, METHOD_BUFFERED, FILE_ANY_ACCESS) => NotImplemented,
    RequestFilterOplock     = ("FSCTL_REQUEST_FILTER_OPLOCK", 23, METHOD_BUFFERED, FILE_ANY_ACCESS) => NotImplemented,
    FilesystemGetStatistics = ("FSCTL_FILESYSTEM_GET_STATISTICS", 24, METHOD_BUFFERED, FILE_ANY_ACCESS) => NotImplemented,
    GetNtfsVolumeData       = ("FSCTL_GET_NTFS_VOLUME_DATA", 25, METHOD_BUFFERED, FILE_ANY_ACCESS) => NotImplemented,
    GetNtfsFileRecord       = ("FSCTL_GET_NTFS_FILE_RECORD", 26, METHOD_BUFFERED, FILE_ANY_ACCESS) => NotImplemented,
    GetVolumeBitmap         = ("FSCTL_GET_VOLUME_BITMAP", 27, METHOD_NEITHER, FILE_ANY_ACCESS) => NotImplemented,
    GetRetrievalPointers    = ("FSCTL_GET_RETRIEVAL_POINTERS", 28, METHOD_NEITHER, FILE_ANY_ACCESS) => NotImplemented,
    MoveFile                = ("FSCTL_MOVE_FILE", 29, METHOD_BUFFERED, FILE_SPECIAL_ACCESS) => NotImplemented,
    IsVolumeDirty           = ("FSCTL_IS_VOLUME_DIRTY", 30, METHOD_BUFFERED, FILE_ANY_ACCESS) => NotImplemented,
    AllowExtendedDasdIo     = ("FSCTL_ALLOW_EXTENDED_DASD_IO", 32, METHOD_NEITHER, FILE_ANY_ACCESS) => NotImplemented,
    FindFilesBySid          = ("FSCTL_FIND_FILES_BY_SID", 35, METHOD_NEITHER, FILE_ANY_ACCESS) => NotImplemented,
    SetObjectId             = ("FSCTL_SET_OBJECT_ID", 38, METHOD_BUFFERED, FILE_SPECIAL_ACCESS) => NotImplemented,
    GetObjectId             = ("FSCTL_GET_OBJECT_ID", 39, METHOD_BUFFERED, FILE_ANY_ACCESS) => NotImplemented,
    DeleteObjectId          = ("FSCTL_DELETE_OBJECT_ID", 40, METHOD_BUFFERED, FILE_SPECIAL_ACCESS) => NotImplemented,
    SetReparsePoint         = ("FSCTL_SET_REPARSE_POINT", 41, METHOD_BUFFERED, FILE_SPECIAL_ACCESS) => NotImplemented,
    GetReparsePoint         = ("FSCTL_GET_REPARSE_POINT", 42, METHOD_BUFFERED, FILE_ANY_ACCESS) => NotAReparsePoint,
    DeleteReparsePoint      = ("FSCTL_DELETE_REPARSE_POINT", 43, METHOD_BUFFERED, FILE_SPECIAL_ACCESS) => NotImplemented,
    EnumUsnData             = ("FSCTL_ENUM_USN_DATA", 44, METHOD_NEITHER, FILE_ANY_ACCESS) => NotImplemented,
    SecurityIdCheck         = ("FSCTL_SECURITY_ID_CHECK", 45, METHOD_NEITHER, FILE_READ_DATA) => NotImplemented,
    ReadUsnJournal          = ("FSCTL_READ_USN_JOURNAL", 46, METHOD_NEITHER, FILE_ANY_ACCESS) => NotImplemented,
    SetObjectIdExtended     = ("FSCTL_SET_OBJECT_ID_EXTENDED", 47, METHOD_BUFFERED, FILE_SPECIAL_ACCESS) => NotImplemented,
    CreateOrGetObjectId     = ("FSCTL_CREATE_OR_GET_OBJECT_ID", 48, METHOD_BUFFERED, FILE_ANY_ACCESS) => NotImplemented,
    SetSparse               = ("FSCTL_SET_SPARSE", 49, METHOD_BUFFERED, FILE_SPECIAL_ACCESS) => NotImplemented,
    SetZeroData             = ("FSCTL_SET_ZERO_DATA", 50, METHOD_BUFFERED, FILE_WRITE_DATA) => NotImplemented,
    QueryAllocatedRanges    = ("FSCTL_QUERY_ALLOCATED_RANGES", 51, METHOD_NEITHER, FILE_READ_DATA) => NotImplemented,
    SetEncryption           = ("FSCTL_SET_ENCRYPTION", 53, METHOD_NEITHER, FILE_ANY_ACCESS) => NotImplemented,
    EncryptionFsctlIo       = ("FSCTL_ENCRYPTION_FSCTL_IO", 54, METHOD_NEITHER, FILE_ANY_ACCESS) => NotImplemented,
    WriteRawEncrypted       = ("FSCTL_WRITE_RAW_ENCRYPTED", 55, METHOD_NEITHER, FILE_SPECIAL_ACCESS) => NotImplemented,
    ReadRawEncrypted        = ("FSCTL_READ_RAW_ENCRYPTED", 56, METHOD_NEITHER, FILE_SPECIAL_ACCESS) => NotImplemented,
    CreateUsnJournal        = ("FSCTL_CREATE_USN_JOURNAL", 57, METHOD_NEITHER, FILE_ANY_ACCESS) => NotImplemented,
    ReadFileUsnData         = ("FSCTL_READ_FILE_USN_DATA", 58, METHOD_NEITHER, FILE_ANY_ACCESS) => NotImplemented,
    WriteUsnCloseRecord     = ("FSCTL_WRITE_USN_CLOSE_RECORD", 59, METHOD_NEITHER, FILE_ANY_ACCESS) => NotImplemented,
    ExtendVolume            = ("FSCTL_EXTEND_VOLUME", 60, METHOD_BUFFERED, FILE_ANY_ACCESS) => NotImplemented,
    QueryUsnJournal         = ("FSCTL_QUERY_USN_JOURNAL", 61, METHOD_BUFFERED, FILE_ANY_ACCESS) => NotImplemented,
    DeleteUsnJournal        = ("FSCTL_DELETE_USN_JOURNAL", 62, METHOD_BUFFERED, FILE_ANY_ACCESS) => NotImplemented,
    MarkHandle              = ("FSCTL_MARK_HANDLE", 63, METHOD_BUFFERED, FILE_ANY_ACCESS) => NotImplemented,
    SisCopyfile             = ("FSCTL_SIS_COPYFILE", 64, METHOD_BUFFERED, FILE_ANY_ACCESS) => NotImplemented,
    SisLinkFiles            = ("FSCTL_SIS_LINK_FILES", 65, METHOD_BUFFERED, FILE_READ_DATA | FILE_WRITE_DATA) => NotImplemented,
    RecallFile              = ("FSCTL_RECALL_FILE", 69, METHOD_NEITHER, FILE_ANY_ACCESS) => NotImplemented,
    SetZeroOnDeallocation   = ("FSCTL_SET_ZERO_ON_DEALLOCATION", 101, METHOD_BUFFERED, FILE_SPECIAL_ACCESS) => NotImplemented,
    CscInternal             = ("FSCTL_CSC_INTERNAL", 107, METHOD_NEITHER, FILE_ANY_ACCESS) => NotImplemented,
    RequestOplock           = ("FSCTL_REQUEST_OPLOCK", 144, METHOD_BUFFERED, FILE_ANY_ACCESS) => RequestOplock,
}

impl FsControlCode {
    pub fn from_code(code: u32) -> Option<Self> {
        Self::ALL.iter().copied().find(|c| c.code() == code)
    }
}

/*──────────────────────────── dispatch ──────────────────────────────────*/

/// Run the control-code switch. Does not complete the IRP.
pub fn user_fs_request(irp: &Irp, services: &dyn KernelServices) -> NtStatus {
    let Parameters::FileSystemControl { fs_control_code, .. } = irp.stack.parameters else {
        log::debug!("    user fs request without FSCTL parameters");
        return NtStatus::INVALID_PARAMETER;
    };

    let Some(code) = FsControlCode::from_code(fs_control_code) else {
        log::debug!("    Unknown FSCTL {}", ctl_function(fs_control_code));
        return NtStatus::INVALID_DEVICE_REQUEST;
    };

    log::debug!("    {}", code.name());
    match code.action() {
        FsctlAction::Acknowledge      => NtStatus::SUCCESS,
        FsctlAction::NotAReparsePoint => NtStatus::NOT_A_REPARSE_POINT,
        FsctlAction::NotImplemented   => NtStatus::NOT_IMPLEMENTED,
        FsctlAction::RequestOplock    => request_oplock(irp, services),
    }
}

/// `FSCTL_REQUEST_OPLOCK`: size check first, then hand the FCB's oplock to
/// the OS.
fn request_oplock(irp: &Irp, services: &dyn KernelServices) -> NtStatus {
    let Parameters::FileSystemControl { input_buffer_length, output_buffer_length, .. } =
        irp.stack.parameters
    else {
        return NtStatus::INVALID_PARAMETER;
    };

    if input_buffer_length < REQUEST_OPLOCK_INPUT_BUFFER_SIZE
        || output_buffer_length < REQUEST_OPLOCK_OUTPUT_BUFFER_SIZE
    {
        log::debug!(
            "    STATUS_BUFFER_TOO_SMALL (in={}, out={})",
            input_buffer_length,
            output_buffer_length
        );
        return NtStatus::BUFFER_TOO_SMALL;
    }

    let Some(file_object) = irp.stack.file_object.as_ref() else {
        log::warn!("    FSCTL_REQUEST_OPLOCK without a file object");
        return NtStatus::INVALID_PARAMETER;
    };
    log::debug!("    FileName: {}", file_object.file_name);

    let Some(ccb) = file_object.fs_context2.as_ref() else {
        log::warn!("    FSCTL_REQUEST_OPLOCK on a handle without CCB");
        return NtStatus::INVALID_PARAMETER;
    };
    let fcb = &ccb.fcb;

    services.oplock_fsctrl(&fcb.oplock, irp, OPLOCK_OPEN_COUNT)
}
