//! Streamer events: types and broadcast bus.
//!
//! ## Contents
//! - [`EventKind`], [`Event`] event classification and payload metadata
//! - [`Bus`] thin wrapper over `tokio::sync::broadcast`
//!
//! ## Quick reference
//! - **Publishers**: the tick loop (`Streamer`), transition tasks
//!   (`TransitionExecutor`), shutdown draining.
//! - **Consumers**: the fan-out listener feeding `SubscriberSet`, and any
//!   receiver obtained from `Streamer::subscribe()`.

mod bus;
mod event;

pub use bus::Bus;
pub use event::{Event, EventKind};
