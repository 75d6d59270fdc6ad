use std::{
    any::Any,
    panic::{catch_unwind, AssertUnwindSafe},
    sync::Arc,
};

use tokio::sync::RwLock;

use crate::errors::Error;

/// Callback invoked with a failure the poll loop swallowed.
pub type FailureCallback = Arc<dyn Fn(&Error) + Send + Sync>;

/// Callback invoked once when the session gives up; receives the configured try limit.
pub type ExhaustedCallback = Arc<dyn Fn(u32) + Send + Sync>;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Failure {
    StartFailed,
    GetUpdateFailed,
    HandlerError,
}

impl Failure {
    fn name(self) -> &'static str {
        match self {
            Failure::StartFailed => "start_failed",
            Failure::GetUpdateFailed => "get_update_failed",
            Failure::HandlerError => "handler_error",
        }
    }
}

/// Run a callback on the poll task; a panic is logged and swallowed.
fn contain(callback: &'static str, f: impl FnOnce()) {
    if let Err(payload) = catch_unwind(AssertUnwindSafe(f)) {
        tracing::error!(callback, panic = %panic_text(payload.as_ref()), "failure callback panicked");
    }
}

pub(crate) fn panic_text(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        return s.to_string();
    }
    if let Some(s) = payload.downcast_ref::<String>() {
        return s.clone();
    }
    "unknown panic payload".to_string()
}

/// Optional application hooks for each failure class.
///
/// A missing hook means the failure is only logged.
#[derive(Default)]
pub struct FailureCallbacks {
    start_failed: RwLock<Option<FailureCallback>>,
    get_update_failed: RwLock<Option<FailureCallback>>,
    handler_error: RwLock<Option<FailureCallback>>,
    retries_exhausted: RwLock<Option<ExhaustedCallback>>,
}

impl FailureCallbacks {
    pub fn new() -> Self {
        Self::default()
    }

    fn slot(&self, kind: Failure) -> &RwLock<Option<FailureCallback>> {
        match kind {
            Failure::StartFailed => &self.start_failed,
            Failure::GetUpdateFailed => &self.get_update_failed,
            Failure::HandlerError => &self.handler_error,
        }
    }

    pub async fn set(&self, kind: Failure, cb: FailureCallback) {
        *self.slot(kind).write().await = Some(cb);
    }

    pub async fn set_retries_exhausted(&self, cb: ExhaustedCallback) {
        *self.retries_exhausted.write().await = Some(cb);
    }

    pub async fn report(&self, kind: Failure, err: &Error) {
        match kind {
            Failure::StartFailed => tracing::error!(error = %err, "failed to start polling session"),
            Failure::GetUpdateFailed => tracing::warn!(error = %err, "failed to get update"),
            Failure::HandlerError => tracing::warn!(error = %err, "update handler failed"),
        }

        // Clone out of the lock so a callback may re-register hooks without deadlocking.
        let cb = self.slot(kind).read().await.clone();
        if let Some(cb) = cb {
            contain(kind.name(), || cb(err));
        }
    }

    pub async fn report_exhausted(&self, max_tries: u32) {
        tracing::warn!(max_tries, "connection tries exhausted, giving up");
        let cb = self.retries_exhausted.read().await.clone();
        if let Some(cb) = cb {
            contain("retries_exhausted", || cb(max_tries));
        }
    }
}
