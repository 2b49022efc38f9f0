//! # Event subscriber trait.
//!
//! [`Subscribe`] is the observability sink of the streamer: logging, metrics,
//! debug overlays, test recorders.
//!
//! Each subscriber gets:
//! - **Dedicated worker task** (runs independently of the tick)
//! - **Per-subscriber bounded queue** (capacity via [`Subscribe::queue_capacity`])
//! - **Panic isolation** (a panicking subscriber is logged and keeps receiving)
//!
//! ## Rules
//! - A slow subscriber only fills its own queue; the tick never waits for it.
//! - On overflow the event is dropped **for this subscriber only**.
//! - Events are processed sequentially (FIFO) per subscriber.
//! - Kinds rejected by [`Subscribe::wants`] never reach the queue, so a sink
//!   that ignores `TickCompleted` does not pay for one snapshot per tick.
//!
//! ## Example
//! ```rust
//! use std::sync::atomic::{AtomicU64, Ordering};
//! use async_trait::async_trait;
//! use worldstream::{Event, EventKind, Subscribe};
//!
//! #[derive(Default)]
//! struct FailureCounter(AtomicU64);
//!
//! #[async_trait]
//! impl Subscribe for FailureCounter {
//!     async fn on_event(&self, ev: &Event) {
//!         if ev.kind.is_failure() {
//!             self.0.fetch_add(1, Ordering::Relaxed);
//!         }
//!     }
//!
//!     fn wants(&self, kind: EventKind) -> bool {
//!         kind.is_failure()
//!     }
//!
//!     fn name(&self) -> &'static str { "failure-counter" }
//! }
//! ```

use async_trait::async_trait;

use crate::events::{Event, EventKind};

/// Event subscriber for streamer observability.
///
/// Implementations should use async I/O and handle their own errors.
#[async_trait]
pub trait Subscribe: Send + Sync + 'static {
    /// Processes a single event, on the subscriber's own worker task.
    async fn on_event(&self, event: &Event);

    /// Whether events of `kind` should be queued for this subscriber.
    ///
    /// Default: every kind.
    fn wants(&self, kind: EventKind) -> bool {
        let _ = kind;
        true
    }

    /// Name used in overflow/panic diagnostics.
    ///
    /// The default uses `type_name::<Self>()`, which can be verbose.
    fn name(&self) -> &'static str {
        std::any::type_name::<Self>()
    }

    /// Preferred queue capacity (clamped to a minimum of 1).
    ///
    /// Default: 1024.
    fn queue_capacity(&self) -> usize {
        1024
    }
}
