use std::sync::Arc;

use tokio::task::JoinError;

use crate::{
    dispatch::{
        callbacks::{panic_text, Failure, FailureCallbacks},
        registry::HandlerRegistry,
    },
    domain::UpdateContainer,
    errors::Error,
    ports::PollingPort,
    updates::UpdateContext,
};

/// Decodes raw containers and fans them out to the registered handlers.
pub struct UpdateRouter {
    client: Arc<dyn PollingPort>,
    registry: Arc<HandlerRegistry>,
    callbacks: Arc<FailureCallbacks>,
}

impl UpdateRouter {
    pub fn new(
        client: Arc<dyn PollingPort>,
        registry: Arc<HandlerRegistry>,
        callbacks: Arc<FailureCallbacks>,
    ) -> Self {
        Self {
            client,
            registry,
            callbacks,
        }
    }

    /// Route one container; returns how many handlers were invoked.
    ///
    /// Handlers run one after another in registration order, each on its own
    /// task so a panic is contained and reported like an error.
    pub async fn route(&self, container: UpdateContainer) -> usize {
        let ctx = match UpdateContext::decode(&container) {
            Ok(ctx) => ctx,
            Err(e) => {
                self.callbacks.report(Failure::GetUpdateFailed, &e).await;
                return 0;
            }
        };

        let Some(update_type) = ctx.update_type() else {
            tracing::debug!(update_type = %container.update_type, "ignoring unknown update");
            return 0;
        };

        let handlers = self.registry.lookup(update_type).await;
        if handlers.is_empty() {
            tracing::debug!(%update_type, "no handlers registered");
            return 0;
        }

        let mut invoked = 0usize;
        for handler in handlers {
            invoked += 1;
            let fut = handler(self.client.clone(), ctx.clone());
            match tokio::spawn(fut).await {
                Ok(Ok(())) => {}
                Ok(Err(e)) => self.callbacks.report(Failure::HandlerError, &e).await,
                Err(join) => {
                    let err = Error::HandlerPanicked(panic_message(join));
                    self.callbacks.report(Failure::HandlerError, &err).await;
                }
            }
        }
        invoked
    }
}

fn panic_message(err: JoinError) -> String {
    if !err.is_panic() {
        return err.to_string();
    }
    panic_text(err.into_panic().as_ref())
}
