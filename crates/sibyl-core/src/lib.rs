//! Core of the Sibyl update listener.
//!
//! The remote endpoint sits behind [`ports::PollingPort`], implemented over
//! HTTP in the `sibyl-http` crate. `reqwest` is only used here for status
//! reason phrases in [`errors::RemoteError`].

pub mod config;
pub mod dispatch;
pub mod domain;
pub mod errors;
pub mod logging;
pub mod ports;
pub mod updates;

pub use dispatch::{Dispatcher, SessionPhase};
pub use errors::{Error, Result};
