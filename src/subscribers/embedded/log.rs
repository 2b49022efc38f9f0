//! # LogWriter: events as tracing records
//!
//! A subscriber that turns every [`Event`] into one `tracing` record under the
//! `worldstream` target. Install any `tracing` subscriber to see them.
//!
//! ## Example output (fmt layer)
//! ```text
//! INFO  worldstream: loading location=quarry distance=150.0
//! INFO  worldstream: loaded location=quarry handle=#2 elapsed_ms=503
//! WARN  worldstream: load failed location=mine reason="prefab missing"
//! DEBUG worldstream: residency tick=7 loaded=2 in_progress=1 resident=[quarry, harbor]
//! WARN  worldstream: observer unavailable, tick skipped tick=8
//! ```

use async_trait::async_trait;
use tracing::{debug, info, warn};

use crate::events::{Event, EventKind};
use crate::subscribers::Subscribe;

/// Event writer subscriber.
#[derive(Default)]
pub struct LogWriter;

impl LogWriter {
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl Subscribe for LogWriter {
    async fn on_event(&self, e: &Event) {
        let location = e.location.as_ref().map(|l| l.as_str()).unwrap_or("-");
        let reason = e.reason.as_deref().unwrap_or("-");

        match e.kind {
            EventKind::StreamerStarted => info!(target: "worldstream", "streamer started"),
            EventKind::StreamerStopped => info!(target: "worldstream", "streamer stopped"),
            EventKind::ShutdownRequested => {
                info!(target: "worldstream", "shutdown requested")
            }
            EventKind::AllSettledWithin => {
                info!(target: "worldstream", "all transitions settled within grace")
            }
            EventKind::GraceExceeded => {
                warn!(target: "worldstream", stuck = reason, "grace exceeded")
            }
            EventKind::ObserverUnavailable => {
                warn!(target: "worldstream", tick = e.tick, "observer unavailable, tick skipped")
            }
            EventKind::TickCompleted => {
                if let Some(s) = &e.snapshot {
                    let resident: Vec<&str> = s.loaded_ids().map(|id| id.as_str()).collect();
                    debug!(
                        target: "worldstream",
                        tick = e.tick,
                        loaded = s.loaded,
                        in_progress = s.loading + s.unloading,
                        resident = ?resident,
                        "residency"
                    );
                }
            }
            EventKind::LoadStarted => {
                info!(target: "worldstream", location, distance = e.distance, "loading")
            }
            EventKind::LoadCompleted => info!(
                target: "worldstream",
                location,
                handle = e.handle.map(|h| h.raw()),
                elapsed_ms = e.elapsed_ms,
                "loaded"
            ),
            EventKind::LoadFailed => {
                warn!(target: "worldstream", location, reason, "load failed")
            }
            EventKind::UnloadStarted => {
                info!(target: "worldstream", location, distance = e.distance, "unloading")
            }
            EventKind::UnloadCompleted => info!(
                target: "worldstream",
                location,
                elapsed_ms = e.elapsed_ms,
                "unloaded"
            ),
            EventKind::UnloadFailed => {
                warn!(target: "worldstream", location, reason, "unload failed")
            }
            EventKind::TransitionSkipped => {
                debug!(target: "worldstream", location, reason, "transition skipped")
            }
        }
    }

    fn name(&self) -> &'static str {
        "LogWriter"
    }
}
