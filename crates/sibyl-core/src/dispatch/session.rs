use std::sync::{
    atomic::{AtomicU32, Ordering},
    Arc,
};

use tokio::sync::watch;
use tokio::time::sleep;
use tokio_util::sync::CancellationToken;

use crate::{
    config::DispatcherConfig,
    dispatch::{
        callbacks::{Failure, FailureCallbacks},
        router::UpdateRouter,
    },
    domain::PollingIdentifier,
    ports::PollingPort,
};

/// Where the polling state machine currently is.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SessionPhase {
    Idle,
    Starting,
    Listening,
    Reconnecting,
    /// Start failed or connection tries ran out.
    GivenUp,
    /// Exited after a stop request.
    Stopped,
}

impl SessionPhase {
    /// A session task is alive (or about to be) in this phase.
    pub fn is_active(self) -> bool {
        matches!(
            self,
            SessionPhase::Starting | SessionPhase::Listening | SessionPhase::Reconnecting
        )
    }
}

enum StartOutcome {
    Listening(PollingIdentifier),
    Reconnect,
    GivenUp,
}

/// Moves a still-active phase to `GivenUp` if the session task unwinds.
struct TerminalPhaseGuard<'a>(&'a watch::Sender<SessionPhase>);

impl Drop for TerminalPhaseGuard<'_> {
    fn drop(&mut self) {
        self.0.send_if_modified(|phase| {
            if !phase.is_active() {
                return false;
            }
            tracing::error!(phase = ?*phase, "polling session aborted");
            *phase = SessionPhase::GivenUp;
            true
        });
    }
}

/// One run of the connect/poll/reconnect loop, owned by its spawned task.
pub(crate) struct PollingSession {
    pub(crate) client: Arc<dyn PollingPort>,
    pub(crate) router: Arc<UpdateRouter>,
    pub(crate) callbacks: Arc<FailureCallbacks>,
    pub(crate) config: DispatcherConfig,
    pub(crate) total_tries: Arc<AtomicU32>,
    pub(crate) phase: Arc<watch::Sender<SessionPhase>>,
    pub(crate) stop: CancellationToken,
}

impl PollingSession {
    pub(crate) async fn run(self) {
        let _guard = TerminalPhaseGuard(&self.phase);
        let final_phase = self.run_inner().await;
        tracing::info!(phase = ?final_phase, "polling session finished");
        self.set_phase(final_phase);
    }

    async fn run_inner(&self) -> SessionPhase {
        // Reconnects re-enter here instead of recursing.
        'session: loop {
            if self.stop.is_cancelled() {
                return SessionPhase::Stopped;
            }

            let id = match self.start().await {
                StartOutcome::Listening(id) => id,
                StartOutcome::Reconnect => {
                    if !self.backoff().await {
                        return SessionPhase::Stopped;
                    }
                    continue 'session;
                }
                StartOutcome::GivenUp => return SessionPhase::GivenUp,
            };

            loop {
                if self.stop.is_cancelled() {
                    return SessionPhase::Stopped;
                }

                match self
                    .client
                    .get_updates(self.config.timeout_seconds, &id)
                    .await
                {
                    Ok(None) => {}
                    Ok(Some(container)) => {
                        tracing::debug!(update_type = %container.update_type, "update received");
                        let router = Arc::clone(&self.router);
                        tokio::spawn(async move {
                            router.route(container).await;
                        });
                    }
                    Err(e) if e.is_connection_refused() => {
                        tracing::warn!(error = %e, "polling connection refused, reconnecting");
                        if !self.backoff().await {
                            return SessionPhase::Stopped;
                        }
                        continue 'session;
                    }
                    Err(e) => {
                        self.callbacks.report(Failure::GetUpdateFailed, &e).await;
                    }
                }
            }
        }
    }

    async fn start(&self) -> StartOutcome {
        let max = self.config.max_connection_tries;
        let tries = self.total_tries.fetch_add(1, Ordering::SeqCst) + 1;
        if tries > max {
            self.callbacks.report_exhausted(max).await;
            return StartOutcome::GivenUp;
        }

        self.set_phase(SessionPhase::Starting);
        match self.client.start_polling().await {
            Ok(id) => {
                tracing::info!(attempt = tries, unique_id = %id.unique_id, "polling session started");
                self.set_phase(SessionPhase::Listening);
                StartOutcome::Listening(id)
            }
            Err(e) if e.is_connection_refused() => {
                tracing::warn!(attempt = tries, error = %e, "start polling refused");
                StartOutcome::Reconnect
            }
            Err(e) => {
                self.callbacks.report(Failure::StartFailed, &e).await;
                StartOutcome::GivenUp
            }
        }
    }

    /// Sleep the fixed reconnect delay; `false` if a stop arrived meanwhile.
    async fn backoff(&self) -> bool {
        self.set_phase(SessionPhase::Reconnecting);
        tokio::select! {
            _ = self.stop.cancelled() => false,
            _ = sleep(self.config.reconnect_backoff) => true,
        }
    }

    fn set_phase(&self, phase: SessionPhase) {
        self.phase.send_replace(phase);
    }
}
