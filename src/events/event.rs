//! # Runtime events emitted by the streamer and its transitions.
//!
//! The [`EventKind`] enum classifies events in three groups:
//! - **Lifecycle events**: streamer start/stop and shutdown draining
//! - **Tick events**: skipped ticks and per-tick residency snapshots
//! - **Transition events**: load/unload start, completion and failure
//!
//! The [`Event`] struct carries optional metadata (location, reason, distance,
//! handle, elapsed time, snapshot) depending on the kind.
//!
//! ## Ordering guarantees
//! Each event has a globally unique sequence number (`seq`) that increases
//! monotonically. Transition completions race each other, so use `seq` rather
//! than arrival order when reconstructing history.
//!
//! ## Example
//! ```rust
//! use worldstream::{Event, EventKind, LocationId};
//!
//! let ev = Event::new(EventKind::LoadFailed)
//!     .with_location(LocationId::from("quarry"))
//!     .with_reason("prefab missing")
//!     .with_distance(120.0);
//!
//! assert_eq!(ev.kind, EventKind::LoadFailed);
//! assert_eq!(ev.location.as_ref().map(|l| l.as_str()), Some("quarry"));
//! assert_eq!(ev.reason.as_deref(), Some("prefab missing"));
//! ```

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering as AtomicOrdering};
use std::time::{Duration, SystemTime};

use crate::content::ContentHandle;
use crate::core::Snapshot;
use crate::world::LocationId;

/// Global sequence counter for event ordering.
static EVENT_SEQ: AtomicU64 = AtomicU64::new(0);

/// Classification of runtime events.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventKind {
    // === Lifecycle ===
    /// Tick loop started.
    StreamerStarted,

    /// Tick loop stopped; outstanding transitions keep running.
    StreamerStopped,

    /// Termination signal observed by `run_until_signal`.
    ShutdownRequested,

    /// Every outstanding transition completed within the grace period.
    AllSettledWithin,

    /// Grace period elapsed with transitions still in flight.
    ///
    /// Sets:
    /// - `reason`: ids still in flight
    GraceExceeded,

    // === Ticks ===
    /// Observer position unavailable; the tick did nothing.
    ///
    /// Sets:
    /// - `tick`: tick number
    ObserverUnavailable,

    /// Tick dispatched all its decisions.
    ///
    /// Sets:
    /// - `tick`: tick number
    /// - `snapshot`: residency right after dispatch
    TickCompleted,

    // === Transitions ===
    /// Load dispatched.
    ///
    /// Sets:
    /// - `location`, `distance`
    LoadStarted,

    /// Load finished; the location is resident.
    ///
    /// Sets:
    /// - `location`, `handle`, `elapsed_ms`
    LoadCompleted,

    /// Load failed; the location is back to `Unloaded`.
    ///
    /// Sets:
    /// - `location`, `reason`, `elapsed_ms`
    LoadFailed,

    /// Unload dispatched.
    ///
    /// Sets:
    /// - `location`, `distance`, `handle`
    UnloadStarted,

    /// Unload finished; the handle was released.
    ///
    /// Sets:
    /// - `location`, `handle`, `elapsed_ms`
    UnloadCompleted,

    /// Unload failed; the location is back to `Loaded` with its handle.
    ///
    /// Sets:
    /// - `location`, `handle`, `reason`, `elapsed_ms`
    UnloadFailed,

    /// A selected transition was refused by the executor (still in flight,
    /// no longer eligible, unknown id).
    ///
    /// Sets:
    /// - `location`, `reason`, `tick`
    TransitionSkipped,
}

impl EventKind {
    /// True for load/unload failures.
    #[inline]
    pub fn is_failure(&self) -> bool {
        matches!(self, EventKind::LoadFailed | EventKind::UnloadFailed)
    }
}

/// Runtime event with optional metadata.
///
/// - `seq`: monotonic global sequence for ordering
/// - `at`: wall-clock timestamp (for logs)
/// - other optional fields are set depending on the [`EventKind`]
#[derive(Clone, Debug)]
pub struct Event {
    /// Globally unique, monotonically increasing sequence number.
    pub seq: u64,
    /// Wall-clock timestamp.
    pub at: SystemTime,
    /// Event classification.
    pub kind: EventKind,

    /// Location the event is about.
    pub location: Option<LocationId>,
    /// Human-readable reason (errors, stuck ids).
    pub reason: Option<Arc<str>>,
    /// Observer distance at dispatch time.
    pub distance: Option<f32>,
    /// Content handle involved.
    pub handle: Option<ContentHandle>,
    /// Transition duration in milliseconds (compact).
    pub elapsed_ms: Option<u32>,
    /// Tick number (1-based).
    pub tick: Option<u64>,
    /// Residency snapshot (only for `TickCompleted`).
    pub snapshot: Option<Arc<Snapshot>>,
}

impl Event {
    /// Creates a new event of the given kind with current timestamp and next sequence number.
    pub fn new(kind: EventKind) -> Self {
        Self {
            seq: EVENT_SEQ.fetch_add(1, AtomicOrdering::Relaxed),
            at: SystemTime::now(),
            kind,
            location: None,
            reason: None,
            distance: None,
            handle: None,
            elapsed_ms: None,
            tick: None,
            snapshot: None,
        }
    }

    #[inline]
    pub fn with_location(mut self, id: LocationId) -> Self {
        self.location = Some(id);
        self
    }

    #[inline]
    pub fn with_reason(mut self, reason: impl Into<Arc<str>>) -> Self {
        self.reason = Some(reason.into());
        self
    }

    #[inline]
    pub fn with_distance(mut self, d: f32) -> Self {
        self.distance = Some(d);
        self
    }

    #[inline]
    pub fn with_handle(mut self, h: ContentHandle) -> Self {
        self.handle = Some(h);
        self
    }

    /// Attaches a transition duration (stored as milliseconds).
    #[inline]
    pub fn with_elapsed(mut self, d: Duration) -> Self {
        let ms = d.as_millis().min(u128::from(u32::MAX)) as u32;
        self.elapsed_ms = Some(ms);
        self
    }

    #[inline]
    pub fn with_tick(mut self, n: u64) -> Self {
        self.tick = Some(n);
        self
    }

    #[inline]
    pub fn with_snapshot(mut self, s: Snapshot) -> Self {
        self.snapshot = Some(Arc::new(s));
        self
    }
}
