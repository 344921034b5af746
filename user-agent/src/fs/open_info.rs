//! Per-handle correlation object.
//!
//! Created by the create dispatch with two references: one for the handle,
//! one for the dispatch in flight. Later operations on the same handle retain
//! and release it; the release that takes the count from 1 to 0 is the only
//! one allowed to tear it down.

use std::sync::{
    atomic::{AtomicBool, AtomicI32, AtomicU64, Ordering},
    Arc, Weak,
};

use shared::events::EventContext;

use crate::error::HandleError;
use crate::fs::instance::Instance;

/// References a freshly created correlation object starts with.
pub const INITIAL_OPEN_COUNT: i32 = 2;

#[derive(Debug)]
pub struct OpenInfo {
    token: u64,
    open_count: AtomicI32,
    /// The request that opened the handle.
    request: Arc<EventContext>,
    /// Path as handed to the create hook.
    path: String,
    instance: Weak<Instance>,
    event_id: AtomicU64,
    is_directory: AtomicBool,
    user_context: AtomicU64,
}

impl OpenInfo {
    pub(crate) fn new(
        token: u64,
        request: Arc<EventContext>,
        path: String,
        instance: Weak<Instance>,
    ) -> Self {
        Self {
            token,
            open_count: AtomicI32::new(INITIAL_OPEN_COUNT),
            request,
            path,
            instance,
            event_id: AtomicU64::new(0),
            is_directory: AtomicBool::new(false),
            user_context: AtomicU64::new(0),
        }
    }

    pub fn token(&self) -> u64 {
        self.token
    }

    pub fn request(&self) -> &EventContext {
        &self.request
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    /// The owning instance, if it is still mounted.
    pub fn instance(&self) -> Option<Arc<Instance>> {
        self.instance.upgrade()
    }

    pub fn open_count(&self) -> i32 {
        self.open_count.load(Ordering::Acquire)
    }

    pub fn event_id(&self) -> u64 {
        self.event_id.load(Ordering::Relaxed)
    }

    pub(crate) fn set_event_id(&self, id: u64) {
        self.event_id.store(id, Ordering::Relaxed);
    }

    pub fn is_directory(&self) -> bool {
        self.is_directory.load(Ordering::Acquire)
    }

    pub fn user_context(&self) -> u64 {
        self.user_context.load(Ordering::Acquire)
    }

    /// Record what the create hook reported.
    pub(crate) fn store_result(&self, is_directory: bool, user_context: u64) {
        self.is_directory.store(is_directory, Ordering::Release);
        self.user_context.store(user_context, Ordering::Release);
    }

    /// Take one more reference. Refused once the count has reached zero.
    pub fn retain(&self) -> bool {
        self.open_count
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |c| (c > 0).then_some(c + 1))
            .is_ok()
    }

    /// Drop one reference. `Ok(true)` for the release that reached zero.
    pub fn release(&self) -> Result<bool, HandleError> {
        match self
            .open_count
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |c| (c > 0).then_some(c - 1))
        {
            Ok(previous) => Ok(previous == 1),
            Err(_) => Err(HandleError::Underflow(self.token)),
        }
    }
}
