//! Integration tests for correlation-object lifetime.
//!
//! Key responsibilities:
//! - A successful create leaves exactly one registered object with two
//!   references; a failed one leaves nothing.
//! - Racing retains and releases reach zero once, run the close hook once
//!   and never underflow.

use std::sync::{
    atomic::{AtomicUsize, Ordering},
    Arc,
};
use std::thread;

use agent::comms::ChannelTransport;
use agent::error::HandleError;
use agent::fs::{dispatch_create, Instance, MemoryFs, MountOptions, Operations};
use rand::seq::SliceRandom;
use rand::Rng;
use shared::constants::{FILE_ATTRIBUTE_NORMAL, FILE_DELETE_ON_CLOSE};
use shared::events::{CreateContext, CreateDisposition, EventContext, EventInformation};
use shared::NtStatus;

fn create(instance: &Instance, serial: u64, path: &str, disposition: CreateDisposition, options: u32) -> EventInformation {
    let req = Arc::new(EventContext::create(
        serial,
        1,
        0,
        CreateContext {
            file_name: path.into(),
            create_options: CreateContext::pack_options(disposition as u32, options),
            file_attributes: FILE_ATTRIBUTE_NORMAL,
            ..Default::default()
        },
    ));
    let (sink, rx) = ChannelTransport::pair();
    dispatch_create(req, instance, &sink);
    rx.try_recv().expect("response")
}

fn counting_instance() -> (Arc<Instance>, Arc<AtomicUsize>) {
    let closes = Arc::new(AtomicUsize::new(0));
    let counter = closes.clone();
    let ops = Operations::new()
        .with_create_file_ex(|_, info| {
            info.context = 7;
            NtStatus::SUCCESS
        })
        .with_close_file(move |_, info| {
            assert_eq!(info.context, 7);
            counter.fetch_add(1, Ordering::SeqCst);
        });
    (Instance::new(MountOptions::default(), ops), closes)
}

#[test]
fn successful_create_registers_two_references() {
    let (instance, closes) = counting_instance();
    let r = create(&instance, 1, r"\f", CreateDisposition::OpenIf, 0);

    let info = instance.lookup(r.context).expect("registered");
    assert_eq!(info.open_count(), 2);
    assert_eq!(info.token(), r.context);
    assert!(Arc::ptr_eq(&info.instance().unwrap(), &instance));
    drop(info);

    instance.cleanup(r.context).unwrap();
    assert_eq!(closes.load(Ordering::SeqCst), 0);
    instance.close(r.context).unwrap();
    assert_eq!(closes.load(Ordering::SeqCst), 1);
    assert_eq!(instance.open_handles(), 0);

    assert_eq!(instance.close(r.context), Err(HandleError::UnknownToken(r.context)));
    assert_eq!(closes.load(Ordering::SeqCst), 1);
}

#[test]
fn failed_create_leaves_nothing_behind() {
    let fs = MemoryFs::new();
    let instance = Instance::new(MountOptions::default(), fs.operations());

    let r = create(&instance, 1, r"\nope", CreateDisposition::Open, 0);
    assert_eq!(r.nt_status(), NtStatus::OBJECT_NAME_NOT_FOUND);
    assert_eq!(r.context, 0);
    assert_eq!(instance.open_handles(), 0);
    assert_eq!(fs.open_contexts(), 0);
}

#[test]
fn acquire_after_last_release_is_refused() {
    let (instance, _) = counting_instance();
    let token = create(&instance, 1, r"\f", CreateDisposition::Create, 0).context;

    let held = instance.acquire(token).unwrap();
    assert_eq!(held.open_count(), 3);
    for _ in 0..3 {
        instance.release(token).unwrap();
    }
    assert_eq!(held.open_count(), 0);
    assert!(!held.retain());
    assert_eq!(held.release(), Err(HandleError::Underflow(token)));
    assert_eq!(instance.acquire(token).unwrap_err(), HandleError::UnknownToken(token));
}

#[test]
fn delete_on_close_removes_the_file_on_last_release() {
    let fs = MemoryFs::new();
    let instance = Instance::new(MountOptions::default(), fs.operations());

    let token = create(&instance, 1, r"\scratch.tmp", CreateDisposition::Create, FILE_DELETE_ON_CLOSE).context;
    assert!(fs.exists(r"\scratch.tmp"));
    assert_eq!(fs.open_contexts(), 1);

    instance.cleanup(token).unwrap();
    assert!(fs.exists(r"\scratch.tmp"));
    instance.close(token).unwrap();
    assert!(!fs.exists(r"\scratch.tmp"));
    assert_eq!(fs.open_contexts(), 0);
}

#[test]
fn concurrent_retain_release_reaches_zero_exactly_once() {
    let mut rng = rand::thread_rng();

    for round in 0..20 {
        let (instance, closes) = counting_instance();
        let token = create(&instance, round, r"\shared.bin", CreateDisposition::OpenIf, 0).context;
        let weak = Arc::downgrade(&instance.lookup(token).unwrap());
        let retains: usize = rng.gen_range(8..64);

        // N concurrent retains
        thread::scope(|s| {
            for _ in 0..retains {
                let instance = &instance;
                s.spawn(move || {
                    let info = instance.acquire(token).expect("handle still open");
                    drop(info);
                });
            }
        });
        assert_eq!(instance.lookup(token).unwrap().open_count(), retains as i32 + 2);

        // N + 2 releases, shuffled across threads
        let mut releases: Vec<usize> = (0..retains + 2).collect();
        releases.shuffle(&mut rng);
        let workers = rng.gen_range(2..8);
        thread::scope(|s| {
            for chunk in releases.chunks(releases.len().div_ceil(workers)) {
                let instance = &instance;
                s.spawn(move || {
                    for _ in chunk {
                        instance.release(token).expect("no underflow");
                    }
                });
            }
        });

        assert_eq!(closes.load(Ordering::SeqCst), 1, "round {round}");
        assert_eq!(instance.open_handles(), 0);
        assert!(weak.upgrade().is_none(), "correlation object still alive");
        assert_eq!(instance.release(token), Err(HandleError::UnknownToken(token)));
    }
}
