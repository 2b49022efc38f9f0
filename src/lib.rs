//! # worldstream
//!
//! **Worldstream** keeps the content of spatially anchored locations resident
//! while an observer is near them, and releases it once the observer has moved
//! away, under a fixed budget of resident locations.
//!
//! The host registers locations, injects an observer source and a content
//! loader, and starts the [`Streamer`]. Every tick the streamer measures the
//! observer's distance to each location, decides which locations to load and
//! which to unload, and dispatches those transitions without waiting for them.
//!
//! ## Architecture
//! ### Overview
//! ```text
//!   ObserverSource              LocationRegistry              ContentLoader
//!  (current_position)        (id, anchor, content)           (load / unload)
//!          │                           │                            ▲
//!          ▼                           ▼                            │
//! ┌───────────────────────────────────────────────────────────┐     │
//! │  Streamer (periodic tick)                                 │     │
//! │  - ResidencyTable (state, handle, distance, in_flight)    │     │
//! │  - DistanceEvaluator (refresh under the table lock)       │     │
//! │  - ResidencyPolicy (hysteresis + max_loaded budget)       │     │
//! │  - TransitionExecutor (one task per transition) ──────────┼─────┘
//! └───────────────────────────┬───────────────────────────────┘
//!                             │ publishes
//!                             ▼
//! ┌───────────────────────────────────────────────────────────┐
//! │                  Bus (broadcast channel)                  │
//! │           (capacity: StreamerConfig::bus_capacity)        │
//! └────────────┬──────────────────────────────────┬───────────┘
//!              ▼                                  ▼
//!   subscriber_listener ──► SubscriberSet   Streamer::subscribe()
//!                       ┌─────────┼─────────┐
//!                       ▼         ▼         ▼
//!                   LogWriter  worker2   workerN
//! ```
//!
//! ### Residency state machine
//! ```text
//!             begin_load                    load Ok
//! Unloaded ───────────────► Loading ───────────────────► Loaded
//!    ▲                         │                            │
//!    │        load Err/panic   │                            │ begin_unload
//!    ├─────────────────────────┘                            ▼
//!    │                      unload Ok                   Unloading
//!    └──────────────────────────────────────────────────────┤
//!                                       unload Err/panic    │
//!                            Loaded (handle kept) ◄─────────┘
//! ```
//!
//! ## Features
//! | Area              | Description                                               | Key types / traits                         |
//! |-------------------|-----------------------------------------------------------|--------------------------------------------|
//! | **World**         | Locations, anchors, registration-ordered registry.        | [`Location`], [`LocationRegistry`]         |
//! | **Collaborators** | Observer position source and async content loader.        | [`ObserverSource`], [`ContentLoader`]      |
//! | **Policy**        | Hysteresis thresholds and resident budget.                | [`ResidencyPolicy`]                        |
//! | **Runtime**       | Periodic tick, transitions, graceful shutdown.            | [`Streamer`], [`TransitionExecutor`]       |
//! | **Subscriber API**| Hook into residency events (logging, metrics, custom).    | [`Subscribe`], [`Event`]                   |
//! | **Errors**        | Typed errors for setup, lifecycle and transitions.        | [`SetupError`], [`RuntimeError`]           |
//! | **Configuration** | Centralize thresholds and timings.                        | [`StreamerConfig`]                         |
//!
//! ## Optional features
//! - `logging`: exports a built-in [`LogWriter`] that renders events through `tracing`.
//!
//! ## Example
//! ```rust
//! use std::sync::Arc;
//! use std::time::Duration;
//! use async_trait::async_trait;
//! use worldstream::{
//!     ContentDescriptor, ContentError, ContentHandle, ContentLoader, Location, Position,
//!     Streamer, StreamerConfig, TrackedObserver,
//! };
//!
//! struct Prefabs;
//!
//! #[async_trait]
//! impl ContentLoader for Prefabs {
//!     async fn load(&self, content: &ContentDescriptor) -> Result<ContentHandle, ContentError> {
//!         println!("instantiate {content}");
//!         Ok(ContentHandle::new(content.as_str().len() as u64))
//!     }
//!
//!     async fn unload(&self, handle: &ContentHandle) -> Result<(), ContentError> {
//!         println!("destroy {handle}");
//!         Ok(())
//!     }
//! }
//!
//! #[tokio::main(flavor = "current_thread")]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let player = TrackedObserver::arc();
//!     player.set(Position::ZERO);
//!
//!     let streamer = Streamer::builder(StreamerConfig::default())
//!         .with_location(Location::new(
//!             "harbor",
//!             Position::new(120.0, 0.0, 40.0),
//!             ContentDescriptor::new("prefabs/harbor"),
//!         ))
//!         .with_observer(player.clone())
//!         .with_loader(Arc::new(Prefabs))
//!         .build()?;
//!
//!     // Drive one tick by hand instead of `start()`.
//!     let report = streamer.tick()?;
//!     assert_eq!(report.loads_started, 1);
//!
//!     streamer.shutdown().await?;
//!     assert_eq!(streamer.snapshot().loaded, 1);
//!     Ok(())
//! }
//! ```
mod content;
mod core;
mod error;
mod events;
mod policies;
mod subscribers;
mod world;

// ---- Public re-exports ----

pub use crate::core::{
    LocationStatus, Snapshot, Streamer, StreamerBuilder, StreamerConfig, TickReport,
    TransitionExecutor,
};
pub use content::{
    ContentHandle, ContentLoader, LoaderRef, ObserverFn, ObserverRef, ObserverSource,
    TrackedObserver,
};
pub use error::{ContentError, RuntimeError, SetupError, TickError, TransitionError};
pub use events::{Bus, Event, EventKind};
pub use policies::{Candidate, Decision, ResidencyPolicy};
pub use subscribers::{Subscribe, SubscriberSet};
pub use world::{ContentDescriptor, Location, LocationId, LocationRegistry, LocationState, Position};

// Optional: expose a built-in tracing subscriber.
// Enable with: `--features logging`
#[cfg(feature = "logging")]
pub use subscribers::LogWriter;
