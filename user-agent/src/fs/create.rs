//! Create dispatch: one open/create request in, one response out.
//!
//! 1 ▸ register a correlation object (or answer INSUFFICIENT_RESOURCES)
//! 2 ▸ call exactly one hook, create-extended when the mount supports it
//! 3 ▸ map the hook's status onto `(status, information)`
//! 4 ▸ record the result on the correlation object and send the response

use std::sync::Arc;

use log::Level;
use shared::constants::{FILE_DELETE_ON_CLOSE, FILE_FLAG_DELETE_ON_CLOSE, RESPONSE_FLAG_DIRECTORY};
use shared::events::{CreateContext, CreateInformation, EventContext, EventInformation};
use shared::NtStatus;

use crate::bridge_log;
use crate::comms::transport::EventSink;
use crate::fs::disposition::{
    classify, extended_success_information, failure_outcome, legacy_success_information,
    select_hook, target_directory_path, HookChoice,
};
use crate::fs::instance::Instance;
use crate::fs::open_info::OpenInfo;
use crate::fs::operations::{CreateFileExArgs, FileInfo};

/// Dispatch one create request and send its response through `sink`.
pub fn dispatch_create(request: Arc<EventContext>, instance: &Instance, sink: &dyn EventSink) {
    let mut response = EventInformation::for_request(request.serial_number);

    let Some(create) = request.as_create() else {
        bridge_log!(Level::Warn, "create", "request {} is not a create", request.serial_number);
        response.set_status(NtStatus::INVALID_PARAMETER);
        sink.send_event_information(&response, Some(instance));
        return;
    };

    let extended = instance.supports_create_file_ex();
    let (path, is_directory) = if extended {
        (target_directory_path(&create.file_name, request.flags), false)
    } else {
        let c = classify(&create.file_name, create.options(), request.flags);
        (c.path, c.is_directory)
    };

    // 1 ▸ correlation object
    let Some(open_info) = instance.allocate_open_info(request.clone(), path) else {
        bridge_log!(
            Level::Warn,
            "create",
            "handle table full ({}), refusing {}",
            instance.options().max_open_handles,
            create.file_name
        );
        response.set_status(NtStatus::INSUFFICIENT_RESOURCES);
        sink.send_event_information(&response, Some(instance));
        return;
    };

    let mut file_info = FileInfo {
        process_id: request.process_id,
        is_directory,
        context: 0,
        open_token: open_info.token(),
    };
    response.context = open_info.token();
    open_info.set_event_id(instance.next_event_id());

    // 2 ▸ hook
    let hook_status = if extended {
        call_create_extended(create, path, instance, &open_info, &mut file_info)
    } else {
        call_legacy(create, path, instance, &open_info, &mut file_info)
    };

    // 3 ▸ mapping
    let disposition = create.disposition();
    let (status, information) = if hook_status != NtStatus::SUCCESS {
        failure_outcome(hook_status, disposition, request.open_target_directory())
    } else if extended {
        let information = extended_success_information(disposition).unwrap_or_else(|| {
            bridge_log!(Level::Warn, "create", "Create other disposition : {}", disposition);
            CreateInformation::Opened
        });
        (hook_status, information)
    } else {
        (hook_status, legacy_success_information(disposition))
    };

    // 4 ▸ bookkeeping + response
    open_info.store_result(file_info.is_directory, file_info.context);
    response.set_status(status);
    response.information = information as u32;
    if hook_status == NtStatus::SUCCESS && file_info.is_directory {
        response.flags |= RESPONSE_FLAG_DIRECTORY;
    }
    if status != NtStatus::SUCCESS {
        instance.discard(open_info.token());
        response.context = 0;
    }

    bridge_log!(
        Level::Debug,
        "create",
        "Create {:04} done: hook={:?} status={:?} information={:?} directory={} token={:#x}",
        open_info.event_id(),
        hook_status,
        status,
        information,
        response.is_directory(),
        response.context
    );
    sink.send_event_information(&response, Some(instance));
}

fn call_create_extended(
    create: &CreateContext,
    path: &str,
    instance: &Instance,
    open_info: &OpenInfo,
    file_info: &mut FileInfo,
) -> NtStatus {
    let Some(create_file_ex) = instance.operations().create_file_ex.as_ref() else {
        return NtStatus::NOT_IMPLEMENTED;
    };

    let args = CreateFileExArgs {
        path,
        desired_access: create.desired_access,
        share_access: create.share_access,
        disposition: create.disposition(),
        options: create.options(),
        attributes: create.file_attributes,
        reserved: 0,
    };
    let status = create_file_ex(&args, file_info);

    bridge_log!(
        Level::Debug,
        "create",
        "[{:04}] CreateFileEx(FileName=\"{}\", DesiredAccess={:#x}, ShareAccess={:#x}, \
         CreateDisposition={}, CreateOptions={:#x}, FileAttributes={:#x}, Context={:#x}) = {:?}",
        open_info.event_id(),
        path,
        args.desired_access,
        args.share_access,
        args.disposition,
        args.options,
        args.attributes,
        file_info.context,
        status
    );
    status
}

fn call_legacy(
    create: &CreateContext,
    path: &str,
    instance: &Instance,
    open_info: &OpenInfo,
    file_info: &mut FileInfo,
) -> NtStatus {
    let disposition = create.disposition();
    let options = create.options();
    let mut attributes = create.file_attributes;
    if options & FILE_DELETE_ON_CLOSE != 0 {
        attributes |= FILE_FLAG_DELETE_ON_CLOSE;
    }

    let ops = instance.operations();
    let choice = select_hook(file_info.is_directory, disposition);
    let status = match choice {
        HookChoice::CreateDirectory => ops
            .create_directory
            .as_ref()
            .map(|hook| hook(path, file_info)),
        HookChoice::OpenDirectory => ops
            .open_directory
            .as_ref()
            .map(|hook| hook(path, file_info)),
        HookChoice::CreateFile(legacy) => ops.create_file.as_ref().map(|hook| {
            hook(path, create.desired_access, create.share_access, legacy, attributes, file_info)
        }),
        HookChoice::Unsupported => {
            bridge_log!(Level::Warn, "create", "Create other disposition : {}", disposition);
            None
        }
    };
    let status = status.unwrap_or(NtStatus::NOT_IMPLEMENTED);

    bridge_log!(
        Level::Debug,
        "create",
        "[{:04}] {:?}(FileName=\"{}\", DesiredAccess={:#x}, ShareAccess={:#x}, \
         CreateDisposition={}, FileAttributes={:#x}, Context={:#x}) = {:?}",
        open_info.event_id(),
        choice,
        path,
        create.desired_access,
        create.share_access,
        disposition,
        attributes,
        file_info.context,
        status
    );
    status
}
