use std::{
    future::Future,
    sync::{
        atomic::{AtomicU32, Ordering},
        Arc,
    },
};

use tokio::sync::{watch, Mutex};
use tokio_util::sync::CancellationToken;

use crate::{
    config::DispatcherConfig,
    dispatch::{
        callbacks::{Failure, FailureCallbacks},
        registry::{handler_fn, HandlerRegistry},
        router::UpdateRouter,
        session::{PollingSession, SessionPhase},
    },
    domain::UpdateType,
    errors::Error,
    ports::PollingPort,
    updates::UpdateContext,
    Result,
};

/// Public entry point: registers handlers and runs the long-poll session.
///
/// Cheap to clone; clones share the same registry and session.
#[derive(Clone)]
pub struct Dispatcher {
    inner: Arc<DispatcherInner>,
}

struct DispatcherInner {
    client: Arc<dyn PollingPort>,
    config: DispatcherConfig,
    registry: Arc<HandlerRegistry>,
    callbacks: Arc<FailureCallbacks>,
    router: Arc<UpdateRouter>,
    total_tries: Arc<AtomicU32>,
    phase: Arc<watch::Sender<SessionPhase>>,
    stop: Mutex<Option<CancellationToken>>,
}

impl Dispatcher {
    pub fn new(client: Arc<dyn PollingPort>, config: DispatcherConfig) -> Result<Self> {
        config.validate()?;

        let registry = Arc::new(HandlerRegistry::new());
        let callbacks = Arc::new(FailureCallbacks::new());
        let router = Arc::new(UpdateRouter::new(
            client.clone(),
            registry.clone(),
            callbacks.clone(),
        ));
        let (phase, _) = watch::channel(SessionPhase::Idle);

        Ok(Self {
            inner: Arc::new(DispatcherInner {
                client,
                config,
                registry,
                callbacks,
                router,
                total_tries: Arc::new(AtomicU32::new(0)),
                phase: Arc::new(phase),
                stop: Mutex::new(None),
            }),
        })
    }

    pub fn config(&self) -> &DispatcherConfig {
        &self.inner.config
    }

    pub fn phase(&self) -> SessionPhase {
        *self.inner.phase.borrow()
    }

    /// Start attempts made by the current (or last) session.
    pub fn total_tries(&self) -> u32 {
        self.inner.total_tries.load(Ordering::SeqCst)
    }

    /// Spawn the polling session and return immediately.
    ///
    /// Rejected with [`Error::AlreadyListening`] while a session is active,
    /// including one that was asked to stop but has not exited yet.
    pub async fn listen(&self) -> Result<()> {
        let mut stop_slot = self.inner.stop.lock().await;
        if self.phase().is_active() {
            return Err(Error::AlreadyListening);
        }

        self.inner.total_tries.store(0, Ordering::SeqCst);
        self.inner.phase.send_replace(SessionPhase::Starting);

        let stop = CancellationToken::new();
        *stop_slot = Some(stop.clone());

        let session = PollingSession {
            client: self.inner.client.clone(),
            router: self.inner.router.clone(),
            callbacks: self.inner.callbacks.clone(),
            config: self.inner.config.clone(),
            total_tries: self.inner.total_tries.clone(),
            phase: self.inner.phase.clone(),
            stop,
        };
        tokio::spawn(session.run());

        tracing::info!(
            timeout_seconds = self.inner.config.timeout_seconds,
            max_connection_tries = self.inner.config.max_connection_tries,
            "listening for updates"
        );
        Ok(())
    }

    /// Ask the session to stop; it exits before its next poll.
    ///
    /// The poll already in flight is not interrupted. Returns whether a live
    /// session was signalled.
    pub async fn stop(&self) -> bool {
        let mut stop_slot = self.inner.stop.lock().await;
        let Some(stop) = stop_slot.take() else {
            return false;
        };
        stop.cancel();
        let was_active = self.phase().is_active();
        if was_active {
            tracing::info!("stop requested");
        }
        was_active
    }

    /// Resolve once the session is no longer active and return its final phase.
    pub async fn wait(&self) -> SessionPhase {
        let mut rx = self.inner.phase.subscribe();
        loop {
            let phase = *rx.borrow_and_update();
            if !phase.is_active() {
                return phase;
            }
            if rx.changed().await.is_err() {
                return *rx.borrow();
            }
        }
    }

    pub async fn add_handler<F, Fut>(&self, update_type: UpdateType, handler: F)
    where
        F: Fn(Arc<dyn PollingPort>, UpdateContext) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<()>> + Send + 'static,
    {
        self.inner
            .registry
            .register(update_type, handler_fn(handler))
            .await;
    }

    pub async fn handler_count(&self, update_type: UpdateType) -> usize {
        self.inner.registry.len(update_type).await
    }

    pub async fn set_on_start_failed(&self, cb: impl Fn(&Error) + Send + Sync + 'static) {
        self.inner
            .callbacks
            .set(Failure::StartFailed, Arc::new(cb))
            .await;
    }

    pub async fn set_on_get_update_failed(&self, cb: impl Fn(&Error) + Send + Sync + 'static) {
        self.inner
            .callbacks
            .set(Failure::GetUpdateFailed, Arc::new(cb))
            .await;
    }

    pub async fn set_on_handler_error(&self, cb: impl Fn(&Error) + Send + Sync + 'static) {
        self.inner
            .callbacks
            .set(Failure::HandlerError, Arc::new(cb))
            .await;
    }

    /// Called with the configured limit when the session runs out of connection tries.
    pub async fn set_on_retries_exhausted(&self, cb: impl Fn(u32) + Send + Sync + 'static) {
        self.inner
            .callbacks
            .set_retries_exhausted(Arc::new(cb))
            .await;
    }
}
