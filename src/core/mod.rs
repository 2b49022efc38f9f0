//! Runtime core: the residency loop and its lifecycle.
//!
//! The public surface is [`Streamer`] (built through [`StreamerBuilder`]),
//! its [`StreamerConfig`], the [`TransitionExecutor`] it drives and the
//! [`Snapshot`] it reports.
//!
//! Internal modules:
//! - [`table`]: per-location residency slots behind one mutex;
//! - [`distance`]: per-tick distance refresh;
//! - [`executor`]: starts loads/unloads and applies their outcome;
//! - [`scheduler`]: the periodic tick, start/stop/shutdown;
//! - [`signal`]: cross-platform shutdown signal handling.

mod builder;
mod config;
mod distance;
mod executor;
mod scheduler;
mod signal;
mod snapshot;
mod table;

pub use builder::StreamerBuilder;
pub use config::StreamerConfig;
pub use executor::TransitionExecutor;
pub use scheduler::{Streamer, TickReport};
pub use snapshot::{LocationStatus, Snapshot};
