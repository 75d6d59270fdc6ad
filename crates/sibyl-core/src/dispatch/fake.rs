//! In-memory `PollingPort` used by the dispatcher tests.

use std::{
    collections::VecDeque,
    sync::{
        atomic::{AtomicBool, AtomicUsize, Ordering},
        Mutex,
    },
    time::Duration,
};

use async_trait::async_trait;

use crate::{
    domain::{PollingIdentifier, UpdateContainer},
    errors::Error,
    ports::PollingPort,
    Result,
};

pub(crate) struct FakePort {
    start_calls: AtomicUsize,
    get_calls: AtomicUsize,
    refuse_starts: AtomicBool,
    refuse_updates: AtomicBool,
    panic_updates: AtomicBool,
    starts: Mutex<VecDeque<Result<PollingIdentifier>>>,
    updates: Mutex<VecDeque<Result<Option<UpdateContainer>>>>,
    idle_delay: Duration,
}

impl FakePort {
    pub(crate) fn new() -> Self {
        Self {
            start_calls: AtomicUsize::new(0),
            get_calls: AtomicUsize::new(0),
            refuse_starts: AtomicBool::new(false),
            refuse_updates: AtomicBool::new(false),
            panic_updates: AtomicBool::new(false),
            starts: Mutex::new(VecDeque::new()),
            updates: Mutex::new(VecDeque::new()),
            idle_delay: Duration::from_millis(5),
        }
    }

    pub(crate) fn refusing_starts(self) -> Self {
        self.refuse_starts.store(true, Ordering::SeqCst);
        self
    }

    pub(crate) fn refusing_updates(self) -> Self {
        self.refuse_updates.store(true, Ordering::SeqCst);
        self
    }

    pub(crate) fn panicking_updates(self) -> Self {
        self.panic_updates.store(true, Ordering::SeqCst);
        self
    }

    pub(crate) fn push_start(&self, res: Result<PollingIdentifier>) {
        self.starts.lock().unwrap().push_back(res);
    }

    pub(crate) fn push_update(&self, res: Result<Option<UpdateContainer>>) {
        self.updates.lock().unwrap().push_back(res);
    }

    pub(crate) fn start_calls(&self) -> usize {
        self.start_calls.load(Ordering::SeqCst)
    }

    pub(crate) fn get_calls(&self) -> usize {
        self.get_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl PollingPort for FakePort {
    async fn start_polling(&self) -> Result<PollingIdentifier> {
        let n = self.start_calls.fetch_add(1, Ordering::SeqCst) + 1;
        if self.refuse_starts.load(Ordering::SeqCst) {
            return Err(Error::TransportRefused("fake: connection refused".to_string()));
        }
        if let Some(res) = self.starts.lock().unwrap().pop_front() {
            return res;
        }
        Ok(PollingIdentifier {
            unique_id: format!("session-{n}"),
            access_hash: format!("hash-{n}"),
        })
    }

    async fn get_updates(
        &self,
        _timeout_seconds: u32,
        _id: &PollingIdentifier,
    ) -> Result<Option<UpdateContainer>> {
        self.get_calls.fetch_add(1, Ordering::SeqCst);
        if self.panic_updates.load(Ordering::SeqCst) {
            panic!("fake: get_updates panicked");
        }
        if self.refuse_updates.load(Ordering::SeqCst) {
            return Err(Error::TransportRefused("fake: connection refused".to_string()));
        }
        let scripted = self.updates.lock().unwrap().pop_front();
        if let Some(res) = scripted {
            return res;
        }
        // Stand-in for a server-side long-poll timeout.
        tokio::time::sleep(self.idle_delay).await;
        Ok(None)
    }
}

/// Poll `cond` until it holds or two seconds pass.
pub(crate) async fn eventually(cond: impl Fn() -> bool) -> bool {
    for _ in 0..400 {
        if cond() {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
    cond()
}
