//! Long-poll session, handler registry and update routing.

pub mod callbacks;
pub mod dispatcher;
pub mod registry;
pub mod router;
pub mod session;

#[cfg(test)]
pub(crate) mod fake;

pub use callbacks::{ExhaustedCallback, Failure, FailureCallback, FailureCallbacks};
pub use dispatcher::Dispatcher;
pub use registry::{handler_fn, BoxFuture, Handler, HandlerRegistry};
pub use router::UpdateRouter;
pub use session::SessionPhase;
