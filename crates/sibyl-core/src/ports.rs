use async_trait::async_trait;

use crate::{
    domain::{PollingIdentifier, UpdateContainer},
    Result,
};

/// Hexagonal port for the remote long-poll endpoint.
///
/// The HTTP implementation lives in `sibyl-http`; tests drive the dispatcher
/// through in-memory fakes.
#[async_trait]
pub trait PollingPort: Send + Sync {
    /// Open a new polling session on the server.
    async fn start_polling(&self) -> Result<PollingIdentifier>;

    /// Wait up to `timeout_seconds` for the next update of the session.
    ///
    /// `Ok(None)` means the server timed out without an event.
    async fn get_updates(
        &self,
        timeout_seconds: u32,
        id: &PollingIdentifier,
    ) -> Result<Option<UpdateContainer>>;
}
