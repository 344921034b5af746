//! Integration tests for the create dispatcher.
//!
//! Key responsibilities:
//! - Check every disposition against an existing and an absent name, on both
//!   the legacy hooks and the create-extended hook.
//! - Check the open-target-directory path handling and its overrides.
//! - Check that missing hooks, unsupported dispositions and a full handle
//!   table produce explicit failures without calling any hook.

use std::collections::HashSet;
use std::sync::{
    atomic::{AtomicUsize, Ordering},
    Arc, Mutex,
};
use std::thread;

use agent::comms::ChannelTransport;
use agent::fs::{dispatch_create, FileInfo, Instance, MemoryFs, MountOptions, Operations};
use crossbeam::channel::Receiver;
use shared::constants::{
    FILE_ATTRIBUTE_NORMAL, FILE_DELETE_ON_CLOSE, FILE_DIRECTORY_FILE, FILE_FLAG_DELETE_ON_CLOSE,
    SL_OPEN_TARGET_DIRECTORY,
};
use shared::events::{
    CreateContext, CreateDisposition, CreateInformation, EventContext, EventInformation,
    LegacyDisposition,
};
use shared::NtStatus;

const LEGACY_VERSION: u32 = 99;

fn options(version: u32) -> MountOptions {
    MountOptions { version, ..MountOptions::default() }
}

fn request(serial: u64, path: &str, disposition: CreateDisposition, options: u32, flags: u32) -> Arc<EventContext> {
    Arc::new(EventContext::create(
        serial,
        4242,
        flags,
        CreateContext {
            file_name: path.into(),
            desired_access: 0x0012_019F,
            share_access: 0x3,
            create_options: CreateContext::pack_options(disposition as u32, options),
            file_attributes: FILE_ATTRIBUTE_NORMAL,
        },
    ))
}

fn run(instance: &Instance, req: Arc<EventContext>) -> EventInformation {
    let (sink, rx): (ChannelTransport, Receiver<EventInformation>) = ChannelTransport::pair();
    dispatch_create(req, instance, &sink);
    let response = rx.try_recv().expect("exactly one response");
    assert!(rx.try_recv().is_err(), "more than one response");
    response
}

fn outcome(r: &EventInformation) -> (NtStatus, CreateInformation) {
    (r.nt_status(), r.create_information().expect("known information code"))
}

/// Hook table that records which hook saw which path.
#[derive(Default)]
struct Recorder {
    calls: Mutex<Vec<(String, String)>>,
}

impl Recorder {
    fn operations(self: &Arc<Self>, status: NtStatus) -> Operations {
        let (a, b, c) = (self.clone(), self.clone(), self.clone());
        Operations::new()
            .with_create_file(move |path, _, _, disposition, attributes, info: &mut FileInfo| {
                a.push("create_file", &format!("{path}|{disposition}|{attributes:#x}"));
                info.context = 0xC0FFEE;
                status
            })
            .with_create_directory(move |path, _info| {
                b.push("create_directory", path);
                status
            })
            .with_open_directory(move |path, _info| {
                c.push("open_directory", path);
                status
            })
    }

    fn push(&self, hook: &str, arg: &str) {
        self.calls.lock().unwrap().push((hook.into(), arg.into()));
    }

    fn calls(&self) -> Vec<(String, String)> {
        self.calls.lock().unwrap().clone()
    }
}

/*──────────────────────────── disposition table ─────────────────────────*/

#[test]
fn legacy_disposition_table() {
    use CreateDisposition::*;
    use CreateInformation::*;

    let cases = [
        (Create,      true,  (NtStatus::OBJECT_NAME_COLLISION, Exists)),
        (Create,      false, (NtStatus::SUCCESS, Created)),
        (Open,        true,  (NtStatus::SUCCESS, Opened)),
        (Open,        false, (NtStatus::OBJECT_NAME_NOT_FOUND, DoesNotExist)),
        (OpenIf,      true,  (NtStatus::SUCCESS, Opened)),
        (OpenIf,      false, (NtStatus::SUCCESS, Created)),
        (Overwrite,   true,  (NtStatus::SUCCESS, Opened)),
        (Overwrite,   false, (NtStatus::OBJECT_NAME_NOT_FOUND, DoesNotExist)),
        (OverwriteIf, true,  (NtStatus::SUCCESS, Overwritten)),
        (OverwriteIf, false, (NtStatus::SUCCESS, Created)),
    ];

    for (serial, (disposition, exists, expected)) in cases.into_iter().enumerate() {
        let fs = MemoryFs::new();
        if exists {
            fs.insert_file(r"\doc.txt", 10);
        }
        let instance = Instance::new(options(LEGACY_VERSION), fs.operations());
        let r = run(&instance, request(serial as u64, r"\doc.txt", disposition, 0, 0));

        assert_eq!(outcome(&r), expected, "{disposition:?} exists={exists}");
        assert_eq!(r.serial_number, serial as u64);
        assert!(!r.is_directory());
        if r.nt_status() == NtStatus::SUCCESS {
            assert_ne!(r.context, 0);
            assert_eq!(instance.open_handles(), 1);
        } else {
            assert_eq!(r.context, 0);
            assert_eq!(instance.open_handles(), 0);
        }
    }
}

#[test]
fn extended_disposition_table() {
    use CreateDisposition::*;
    use CreateInformation::*;

    let cases = [
        (Supersede,   true,  (NtStatus::SUCCESS, Superseded)),
        (Create,      true,  (NtStatus::OBJECT_NAME_COLLISION, Exists)),
        (Create,      false, (NtStatus::SUCCESS, Created)),
        (Open,        true,  (NtStatus::SUCCESS, Opened)),
        (Open,        false, (NtStatus::OBJECT_NAME_NOT_FOUND, DoesNotExist)),
        (OpenIf,      true,  (NtStatus::SUCCESS, Opened)),
        (OpenIf,      false, (NtStatus::SUCCESS, Opened)),
        (Overwrite,   true,  (NtStatus::SUCCESS, Overwritten)),
        (Overwrite,   false, (NtStatus::OBJECT_NAME_NOT_FOUND, DoesNotExist)),
        (OverwriteIf, true,  (NtStatus::SUCCESS, Overwritten)),
        (OverwriteIf, false, (NtStatus::SUCCESS, Overwritten)),
    ];

    for (disposition, exists, expected) in cases {
        let fs = MemoryFs::new();
        if exists {
            fs.insert_file(r"\doc.txt", 10);
        }
        let instance = Instance::new(MountOptions::default(), fs.operations());
        assert!(instance.supports_create_file_ex());
        let r = run(&instance, request(1, r"\doc.txt", disposition, 0, 0));
        assert_eq!(outcome(&r), expected, "{disposition:?} exists={exists}");
    }
}

#[test]
fn extended_hook_receives_raw_request_and_reports_directory() {
    let seen = Arc::new(Mutex::new(None));
    let seen_in_hook = seen.clone();
    let ops = Operations::new().with_create_file_ex(move |args, info| {
        *seen_in_hook.lock().unwrap() = Some((args.path.to_owned(), args.disposition, args.options, args.reserved));
        info.is_directory = true;
        info.context = 99;
        NtStatus::SUCCESS
    });
    let instance = Instance::new(MountOptions::default(), ops);

    let opts = FILE_DIRECTORY_FILE | FILE_DELETE_ON_CLOSE;
    let r = run(
        &instance,
        request(3, r"\a\b\c", CreateDisposition::OpenIf, opts, SL_OPEN_TARGET_DIRECTORY),
    );

    assert_eq!(outcome(&r), (NtStatus::SUCCESS, CreateInformation::Opened));
    assert!(r.is_directory());
    assert_eq!(
        *seen.lock().unwrap(),
        Some((r"\a\b".to_owned(), CreateDisposition::OpenIf as u32, opts, 0))
    );
    let info = instance.lookup(r.context).unwrap();
    assert!(info.is_directory());
    assert_eq!(info.user_context(), 99);
}

#[test]
fn extended_hook_failure_uses_the_override_table() {
    let ops = Operations::new().with_create_file_ex(|_, _| NtStatus::OBJECT_NAME_COLLISION);
    let instance = Instance::new(MountOptions::default(), ops);

    let r = run(&instance, request(1, r"\x", CreateDisposition::OverwriteIf, 0, 0));
    assert_eq!(outcome(&r), (NtStatus::SUCCESS, CreateInformation::Overwritten));
    let r = run(&instance, request(2, r"\x", CreateDisposition::Create, 0, 0));
    assert_eq!(outcome(&r), (NtStatus::OBJECT_NAME_COLLISION, CreateInformation::Exists));
}

#[test]
fn extended_success_with_unknown_disposition_reports_opened() {
    let ops = Operations::new().with_create_file_ex(|args, _| {
        assert_eq!(args.disposition, 9);
        NtStatus::SUCCESS
    });
    let instance = Instance::new(MountOptions::default(), ops);
    let req = Arc::new(EventContext::create(
        4,
        4242,
        0,
        CreateContext {
            file_name: r"\odd".into(),
            create_options: CreateContext::pack_options(9, 0),
            ..Default::default()
        },
    ));

    let r = run(&instance, req);
    assert_eq!(outcome(&r), (NtStatus::SUCCESS, CreateInformation::Opened));
    assert_ne!(r.context, 0);
    assert_eq!(instance.open_handles(), 1);
}

#[test]
fn old_mount_version_ignores_the_extended_hook() {
    let ex_calls = Arc::new(AtomicUsize::new(0));
    let counter = ex_calls.clone();
    let ops = Operations::new()
        .with_create_file_ex(move |_, _| {
            counter.fetch_add(1, Ordering::SeqCst);
            NtStatus::SUCCESS
        })
        .with_create_file(|_, _, _, _, _, _| NtStatus::SUCCESS);
    let instance = Instance::new(options(LEGACY_VERSION), ops);
    assert!(!instance.supports_create_file_ex());

    let r = run(&instance, request(1, r"\f", CreateDisposition::Create, 0, 0));
    assert_eq!(outcome(&r), (NtStatus::SUCCESS, CreateInformation::Created));
    assert_eq!(ex_calls.load(Ordering::SeqCst), 0);
}

/*──────────────────────────── target directory ──────────────────────────*/

#[test]
fn target_directory_strips_last_component_and_opens_directory() {
    let rec = Arc::new(Recorder::default());
    let instance = Instance::new(options(LEGACY_VERSION), rec.operations(NtStatus::SUCCESS));

    let r = run(
        &instance,
        request(1, r"\dir\sub\new.txt", CreateDisposition::Open, 0, SL_OPEN_TARGET_DIRECTORY),
    );

    assert_eq!(rec.calls(), vec![("open_directory".into(), r"\dir\sub".into())]);
    assert_eq!(outcome(&r), (NtStatus::SUCCESS, CreateInformation::Opened));
    assert!(r.is_directory());
    let info = instance.lookup(r.context).unwrap();
    assert_eq!(info.path(), r"\dir\sub");
    assert_eq!(info.request().as_create().unwrap().file_name, r"\dir\sub\new.txt");
}

#[test]
fn target_directory_without_separator_is_a_file_open() {
    let rec = Arc::new(Recorder::default());
    let instance = Instance::new(options(LEGACY_VERSION), rec.operations(NtStatus::SUCCESS));

    let r = run(&instance, request(1, "new.txt", CreateDisposition::Open, 0, SL_OPEN_TARGET_DIRECTORY));

    assert_eq!(
        rec.calls(),
        vec![("create_file".into(), format!("new.txt|{}|{:#x}", LegacyDisposition::OpenExisting, FILE_ATTRIBUTE_NORMAL))]
    );
    assert!(!r.is_directory());
    assert_eq!(instance.lookup(r.context).unwrap().user_context(), 0xC0FFEE);
}

#[test]
fn not_found_under_target_directory_is_success() {
    let fs = MemoryFs::new();
    let instance = Instance::new(options(LEGACY_VERSION), fs.operations());

    let r = run(&instance, request(1, r"\missing\x", CreateDisposition::Open, 0, SL_OPEN_TARGET_DIRECTORY));
    assert_eq!(outcome(&r), (NtStatus::SUCCESS, CreateInformation::DoesNotExist));
    assert!(!r.is_directory());

    let r = run(&instance, request(2, r"\missing", CreateDisposition::Open, 0, 0));
    assert_eq!(outcome(&r), (NtStatus::OBJECT_NAME_NOT_FOUND, CreateInformation::DoesNotExist));
}

#[test]
fn directory_collisions_follow_the_disposition() {
    let fs = MemoryFs::new();
    fs.insert_directory(r"\d");
    let instance = Instance::new(options(LEGACY_VERSION), fs.operations());

    let r = run(&instance, request(1, r"\d", CreateDisposition::OpenIf, FILE_DIRECTORY_FILE, 0));
    assert_eq!(outcome(&r), (NtStatus::SUCCESS, CreateInformation::Opened));

    let r = run(&instance, request(2, r"\d", CreateDisposition::Create, FILE_DIRECTORY_FILE, 0));
    assert_eq!(outcome(&r), (NtStatus::OBJECT_NAME_COLLISION, CreateInformation::Exists));

    let r = run(&instance, request(3, r"\d\e", CreateDisposition::Create, FILE_DIRECTORY_FILE, 0));
    assert_eq!(outcome(&r), (NtStatus::SUCCESS, CreateInformation::Created));
    assert!(r.is_directory());
    assert!(fs.node(r"\d\e").unwrap().is_directory);
}

/*──────────────────────────── explicit failures ─────────────────────────*/

#[test]
fn missing_hooks_report_not_implemented() {
    let instance = Instance::new(options(LEGACY_VERSION), Operations::new());

    for (serial, (disposition, opts)) in [
        (CreateDisposition::Create, 0),
        (CreateDisposition::Open, 0),
        (CreateDisposition::OpenIf, FILE_DIRECTORY_FILE),
        (CreateDisposition::Open, FILE_DIRECTORY_FILE),
    ]
    .into_iter()
    .enumerate()
    {
        let r = run(&instance, request(serial as u64, r"\f", disposition, opts, 0));
        assert_eq!(outcome(&r), (NtStatus::NOT_IMPLEMENTED, CreateInformation::DoesNotExist));
        assert_eq!(r.context, 0);
    }
    assert_eq!(instance.open_handles(), 0);
}

#[test]
fn unsupported_legacy_dispositions_call_no_hook() {
    let rec = Arc::new(Recorder::default());
    let instance = Instance::new(options(LEGACY_VERSION), rec.operations(NtStatus::SUCCESS));

    let r = run(&instance, request(1, r"\f", CreateDisposition::Supersede, 0, 0));
    assert_eq!(outcome(&r), (NtStatus::NOT_IMPLEMENTED, CreateInformation::DoesNotExist));

    let r = run(&instance, request(2, r"\d", CreateDisposition::Overwrite, FILE_DIRECTORY_FILE, 0));
    assert_eq!(outcome(&r), (NtStatus::NOT_IMPLEMENTED, CreateInformation::DoesNotExist));

    assert!(rec.calls().is_empty());
}

#[test]
fn full_handle_table_refuses_without_calling_hooks() {
    let rec = Arc::new(Recorder::default());
    let opts = MountOptions { max_open_handles: 1, ..options(LEGACY_VERSION) };
    let instance = Instance::new(opts, rec.operations(NtStatus::SUCCESS));

    let first = run(&instance, request(1, r"\a", CreateDisposition::Open, 0, 0));
    assert_eq!(first.nt_status(), NtStatus::SUCCESS);

    let second = run(&instance, request(2, r"\b", CreateDisposition::Open, 0, 0));
    assert_eq!(second.nt_status(), NtStatus::INSUFFICIENT_RESOURCES);
    assert_eq!(second.serial_number, 2);
    assert_eq!(second.context, 0);
    assert_eq!(rec.calls().len(), 1);
    assert_eq!(instance.open_handles(), 1);
}

#[test]
fn non_create_request_is_rejected() {
    let instance = Instance::new(MountOptions::default(), Operations::new());
    let req = Arc::new(EventContext {
        serial_number: 5,
        operation: Some(shared::events::event_context::Operation::Other(3)),
        ..Default::default()
    });
    let r = run(&instance, req);
    assert_eq!(r.nt_status(), NtStatus::INVALID_PARAMETER);
    assert_eq!(instance.open_handles(), 0);
}

/*──────────────────────────── attributes & ids ──────────────────────────*/

#[test]
fn delete_on_close_is_folded_into_attributes() {
    let rec = Arc::new(Recorder::default());
    let instance = Instance::new(options(LEGACY_VERSION), rec.operations(NtStatus::SUCCESS));

    run(&instance, request(1, r"\tmp", CreateDisposition::OpenIf, FILE_DELETE_ON_CLOSE, 0));

    let expected = format!(
        r"\tmp|{}|{:#x}",
        LegacyDisposition::OpenAlways,
        FILE_ATTRIBUTE_NORMAL | FILE_FLAG_DELETE_ON_CLOSE
    );
    assert_eq!(rec.calls(), vec![("create_file".into(), expected)]);
}

#[test]
fn event_ids_are_per_instance_and_increasing() {
    let rec = Arc::new(Recorder::default());
    let one = Instance::new(options(LEGACY_VERSION), rec.operations(NtStatus::SUCCESS));
    let two = Instance::new(options(LEGACY_VERSION), rec.operations(NtStatus::SUCCESS));

    let a = run(&one, request(1, r"\a", CreateDisposition::Open, 0, 0));
    let b = run(&one, request(2, r"\b", CreateDisposition::Open, 0, 0));
    let c = run(&two, request(3, r"\c", CreateDisposition::Open, 0, 0));

    assert_eq!(one.lookup(a.context).unwrap().event_id(), 0);
    assert_eq!(one.lookup(b.context).unwrap().event_id(), 1);
    assert_eq!(two.lookup(c.context).unwrap().event_id(), 0);
}

#[test]
fn concurrent_dispatches_get_unique_event_ids() {
    const THREADS: u64 = 8;
    const PER_THREAD: u64 = 200;

    let ops = Operations::new().with_create_file_ex(|_, _| NtStatus::SUCCESS);
    let instance = Instance::new(MountOptions::default(), ops);

    let tokens: Vec<u64> = thread::scope(|scope| {
        let workers: Vec<_> = (0..THREADS)
            .map(|t| {
                let instance = &instance;
                scope.spawn(move || {
                    (0..PER_THREAD)
                        .map(|i| {
                            let serial = t * PER_THREAD + i;
                            let path = format!(r"\t{t}\f{i}");
                            run(instance, request(serial, &path, CreateDisposition::OpenIf, 0, 0)).context
                        })
                        .collect::<Vec<_>>()
                })
            })
            .collect();
        workers.into_iter().flat_map(|w| w.join().unwrap()).collect()
    });

    let total = (THREADS * PER_THREAD) as usize;
    assert_eq!(tokens.len(), total);
    assert_eq!(instance.open_handles(), total);

    let ids: HashSet<u64> = tokens.iter().map(|&t| instance.lookup(t).unwrap().event_id()).collect();
    assert_eq!(ids.len(), total);
    assert_eq!(ids, (0..THREADS * PER_THREAD).collect());
}
