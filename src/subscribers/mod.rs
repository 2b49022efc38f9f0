//! # Event subscribers.
//!
//! ## Architecture
//! ```text
//!   tick loop / transitions ── publish(Event) ──► Bus ──► fan-out listener
//!                                                             │
//!                                                       SubscriberSet::emit
//!                                                   ┌─────────┼─────────┐
//!                                                   ▼         ▼         ▼
//!                                               LogWriter  Metrics   Custom
//! ```
//!
//! Implement [`Subscribe`] for custom sinks; enable the `logging` feature for
//! the built-in `LogWriter`.

mod set;
mod subscriber;

#[cfg(feature = "logging")]
mod embedded;

pub use set::SubscriberSet;
pub use subscriber::Subscribe;

#[cfg(feature = "logging")]
pub use embedded::LogWriter;
