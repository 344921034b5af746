//! Pure decision logic for create requests.
//!
//! Key responsibilities:
//! - Decide whether a request targets a directory, including the
//!   open-target-directory idiom used by rename and hard-link.
//! - Normalize NT dispositions for the legacy create-file hook.
//! - Turn a hook's status into the `(status, information)` pair the kernel
//!   expects, with its special cases.
//!
//! Nothing in here performs I/O or touches an `Instance`.

use shared::constants::{FILE_DIRECTORY_FILE, SL_OPEN_TARGET_DIRECTORY};
use shared::events::{CreateDisposition, CreateInformation, LegacyDisposition};
use shared::NtStatus;

/// Path and directory-ness derived from a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Classification<'a> {
    /// The path handed to the hook; a prefix of the request path.
    pub path: &'a str,
    pub is_directory: bool,
}

/// Which legacy hook a request ends up calling.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HookChoice {
    CreateDirectory,
    OpenDirectory,
    CreateFile(LegacyDisposition),
    /// Disposition the legacy hooks cannot express.
    Unsupported,
}

/*──────────────────────────── paths ─────────────────────────────────────*/

#[inline]
fn is_separator(c: char) -> bool {
    c == '\\' || c == '/'
}

/// Parent of `path` for an open-target-directory request.
///
/// Truncates at the last separator that is followed by at least one more
/// character. A leading separator keeps the root (`\foo` gives `\`).
/// `None` when there is no such separator.
pub fn strip_last_component(path: &str) -> Option<&str> {
    let mut last = None;
    let mut chars = path.char_indices().peekable();
    while let Some((i, c)) = chars.next() {
        if is_separator(c) && chars.peek().is_some() {
            last = Some(i);
        }
    }
    last.map(|i| if i == 0 { &path[..1] } else { &path[..i] })
}

/// Path adjustment only, as done before the create-extended hook.
pub fn target_directory_path(path: &str, flags: u32) -> &str {
    if flags & SL_OPEN_TARGET_DIRECTORY == 0 {
        return path;
    }
    strip_last_component(path).unwrap_or(path)
}

/// Directory classification for the legacy hooks.
///
/// `FILE_DIRECTORY_FILE` wins outright and leaves the path alone. Otherwise
/// the open-target-directory flag strips the last component and makes the
/// request a directory request, unless there is nothing to strip.
pub fn classify(path: &str, options: u32, flags: u32) -> Classification<'_> {
    if options & FILE_DIRECTORY_FILE != 0 {
        return Classification { path, is_directory: true };
    }
    if flags & SL_OPEN_TARGET_DIRECTORY != 0 {
        if let Some(parent) = strip_last_component(path) {
            return Classification { path: parent, is_directory: true };
        }
    }
    Classification { path, is_directory: false }
}

/*──────────────────────────── hook selection ────────────────────────────*/

/// NT disposition → Win32 creation disposition.
pub fn legacy_disposition(disposition: CreateDisposition) -> Option<LegacyDisposition> {
    match disposition {
        CreateDisposition::Create      => Some(LegacyDisposition::CreateNew),
        CreateDisposition::Open        => Some(LegacyDisposition::OpenExisting),
        CreateDisposition::OpenIf      => Some(LegacyDisposition::OpenAlways),
        CreateDisposition::Overwrite   => Some(LegacyDisposition::TruncateExisting),
        CreateDisposition::OverwriteIf => Some(LegacyDisposition::CreateAlways),
        CreateDisposition::Supersede   => None,
    }
}

pub fn select_hook(is_directory: bool, disposition: u32) -> HookChoice {
    let Some(disposition) = CreateDisposition::from_u32(disposition) else {
        return HookChoice::Unsupported;
    };
    if is_directory {
        return match disposition {
            CreateDisposition::Create | CreateDisposition::OpenIf => HookChoice::CreateDirectory,
            CreateDisposition::Open => HookChoice::OpenDirectory,
            _ => HookChoice::Unsupported,
        };
    }
    legacy_disposition(disposition).map_or(HookChoice::Unsupported, HookChoice::CreateFile)
}

/*──────────────────────────── outcome ───────────────────────────────────*/

/// Information for a successful legacy create.
pub fn legacy_success_information(disposition: u32) -> CreateInformation {
    match CreateDisposition::from_u32(disposition) {
        Some(CreateDisposition::Create | CreateDisposition::OpenIf | CreateDisposition::OverwriteIf) => {
            CreateInformation::Created
        }
        _ => CreateInformation::Opened,
    }
}

/// Information for a successful create-extended call; `None` for a
/// disposition outside the NT range.
pub fn extended_success_information(disposition: u32) -> Option<CreateInformation> {
    Some(match CreateDisposition::from_u32(disposition)? {
        CreateDisposition::Create => CreateInformation::Created,
        CreateDisposition::Open | CreateDisposition::OpenIf => CreateInformation::Opened,
        CreateDisposition::Overwrite | CreateDisposition::OverwriteIf => CreateInformation::Overwritten,
        CreateDisposition::Supersede => CreateInformation::Superseded,
    })
}

/// `(status, information)` for a hook that did not return success.
///
/// Starts from `DOES_NOT_EXIST` with the hook's status, then:
/// 1 ▸ name-not-found on an open-target-directory request is a success
///     (the target name is free),
/// 2 ▸ a collision is `EXISTS`, or a success for the `*_IF` dispositions.
pub fn failure_outcome(
    status: NtStatus,
    disposition: u32,
    open_target_directory: bool,
) -> (NtStatus, CreateInformation) {
    let mut outcome = (status, CreateInformation::DoesNotExist);

    if status == NtStatus::OBJECT_NAME_NOT_FOUND && open_target_directory {
        outcome.0 = NtStatus::SUCCESS;
    }

    if status == NtStatus::OBJECT_NAME_COLLISION {
        outcome.1 = CreateInformation::Exists;
        match CreateDisposition::from_u32(disposition) {
            Some(CreateDisposition::OpenIf) => {
                outcome = (NtStatus::SUCCESS, CreateInformation::Opened);
            }
            Some(CreateDisposition::OverwriteIf) => {
                outcome = (NtStatus::SUCCESS, CreateInformation::Overwritten);
            }
            _ => {}
        }
    }

    outcome
}
