//! Request router
//! ==============
//! Fixed pool of worker threads draining one `crossbeam` queue of forwarded
//! kernel requests. Create requests go to `dispatch_create`; other operation
//! kinds are logged and dropped (they belong to other dispatchers).
//!
//! Workers share nothing but the `Instance` and the sink, so several creates
//! run concurrently exactly as they would on the driver's event threads.

use std::{
    sync::{
        atomic::{AtomicUsize, Ordering},
        Arc,
    },
    thread::{self, JoinHandle},
};

use crossbeam::channel::{self, Receiver, Sender};
use log::Level;
use shared::events::{event_context::Operation, EventContext};

use crate::bridge_log;
use crate::comms::transport::EventSink;
use crate::fs::{dispatch_create, Instance};

/// Requests buffered per worker before `submit` blocks.
const QUEUE_DEPTH_PER_WORKER: usize = 64;

pub struct RequestRouter {
    tx: Option<Sender<Arc<EventContext>>>,
    workers: Vec<JoinHandle<()>>,
    dispatched: Arc<AtomicUsize>,
}

impl RequestRouter {
    /// Start `instance.options().thread_count` workers.
    pub fn spawn(instance: Arc<Instance>, sink: Arc<dyn EventSink>) -> Self {
        let count = instance.options().thread_count.max(1);
        let (tx, rx) = channel::bounded::<Arc<EventContext>>(count * QUEUE_DEPTH_PER_WORKER);
        let dispatched = Arc::new(AtomicUsize::new(0));

        let workers = (0..count)
            .map(|n| {
                let rx = rx.clone();
                let instance = Arc::clone(&instance);
                let sink = Arc::clone(&sink);
                let dispatched = Arc::clone(&dispatched);
                thread::Builder::new()
                    .name(format!("dispatch-{n}"))
                    .spawn(move || worker_loop(rx, &instance, sink.as_ref(), &dispatched))
            })
            .filter_map(|spawned| match spawned {
                Ok(handle) => Some(handle),
                Err(e) => {
                    bridge_log!(Level::Error, "router", "worker spawn failed: {}", e);
                    None
                }
            })
            .collect::<Vec<_>>();

        bridge_log!(Level::Info, "router", "{} dispatch worker(s) started", workers.len());
        Self { tx: Some(tx), workers, dispatched }
    }

    /// Queue one request; `false` once the router is shutting down.
    pub fn submit(&self, request: EventContext) -> bool {
        match &self.tx {
            Some(tx) => tx.send(Arc::new(request)).is_ok(),
            None => false,
        }
    }

    pub fn worker_count(&self) -> usize {
        self.workers.len()
    }

    /// Close the queue, wait for the workers to drain it, and return how
    /// many create requests were dispatched.
    pub fn shutdown(mut self) -> usize {
        self.stop();
        self.dispatched.load(Ordering::Acquire)
    }

    fn stop(&mut self) {
        self.tx.take();
        for worker in self.workers.drain(..) {
            if worker.join().is_err() {
                bridge_log!(Level::Error, "router", "dispatch worker panicked");
            }
        }
    }
}

impl Drop for RequestRouter {
    fn drop(&mut self) {
        self.stop();
    }
}

fn worker_loop(
    rx: Receiver<Arc<EventContext>>,
    instance: &Instance,
    sink: &dyn EventSink,
    dispatched: &AtomicUsize,
) {
    for request in rx {
        match &request.operation {
            Some(Operation::Create(_)) => {
                dispatch_create(Arc::clone(&request), instance, sink);
                dispatched.fetch_add(1, Ordering::AcqRel);
            }
            Some(Operation::Other(major)) => {
                bridge_log!(
                    Level::Debug,
                    "router",
                    "request {} (major {:#x}) ignored: no handler",
                    request.serial_number,
                    major
                );
            }
            None => {
                bridge_log!(Level::Warn, "router", "request {} has no operation", request.serial_number);
            }
        }
    }
}
