//! # Demo: walkthrough
//!
//! An observer walks along a road lined with five locations while the
//! streamer keeps at most three of them resident.
//!
//! Shows how to:
//! - Implement [`ContentLoader`] with slow, occasionally failing loads.
//! - Feed the observer position through a [`TrackedObserver`].
//! - Attach the built-in [`LogWriter`] and a custom [`Subscribe`] sink.
//!
//! ## Flow
//! ```text
//! walker task ── set(Position) ──► TrackedObserver
//!                                        │
//! Streamer::start() ── every 250ms ──► tick()
//!     ├─► begin_unload / begin_load ──► SlowLoader (sleeps, may fail)
//!     └─► Bus ──► LogWriter (tracing) + Failures (counter)
//! ```
//!
//! ## Run
//! ```bash
//! RUST_LOG=worldstream=debug cargo run --example walkthrough --features logging
//! ```

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use tracing::info;
use tracing_subscriber::EnvFilter;
use worldstream::{
    ContentDescriptor, ContentError, ContentHandle, ContentLoader, Event, EventKind, Location, LogWriter,
    Position, Streamer, StreamerConfig, Subscribe, TrackedObserver,
};

/// Instantiates content after a short delay; `ruins` never loads.
#[derive(Default)]
struct SlowLoader {
    next: AtomicU64,
}

#[async_trait]
impl ContentLoader for SlowLoader {
    async fn load(&self, content: &ContentDescriptor) -> Result<ContentHandle, ContentError> {
        tokio::time::sleep(Duration::from_millis(400)).await;
        if content.as_str().ends_with("ruins") {
            return Err(ContentError::load("asset bundle corrupted"));
        }
        Ok(ContentHandle::new(self.next.fetch_add(1, Ordering::Relaxed) + 1))
    }

    async fn unload(&self, _handle: &ContentHandle) -> Result<(), ContentError> {
        tokio::time::sleep(Duration::from_millis(150)).await;
        Ok(())
    }
}

/// Counts failed transitions.
#[derive(Default)]
struct Failures(AtomicUsize);

#[async_trait]
impl Subscribe for Failures {
    async fn on_event(&self, _ev: &Event) {
        self.0.fetch_add(1, Ordering::Relaxed);
    }

    fn wants(&self, kind: EventKind) -> bool {
        kind.is_failure()
    }

    fn name(&self) -> &'static str {
        "failures"
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_target(true)
        .init();

    let road = [
        ("farm", 0.0),
        ("mill", 180.0),
        ("ruins", 360.0),
        ("village", 540.0),
        ("castle", 720.0),
    ];
    let locations = road.iter().map(|&(name, x)| {
        Location::new(
            name,
            Position::new(x, 0.0, 25.0),
            ContentDescriptor::new(format!("prefabs/{name}")),
        )
    });

    let cfg = StreamerConfig {
        tick_interval: Duration::from_millis(250),
        startup_delay: Duration::from_millis(100),
        grace: Duration::from_secs(2),
        ..StreamerConfig::default()
    };

    let walker = TrackedObserver::arc();
    let failures = Arc::new(Failures::default());
    let streamer = Streamer::builder(cfg)
        .with_locations(locations)
        .with_observer(walker.clone())
        .with_loader(Arc::new(SlowLoader::default()))
        .with_subscribers(vec![Arc::new(LogWriter::new()), failures.clone()])
        .build()?;

    streamer.start()?;

    for step in 0..=40 {
        walker.set(Position::new(step as f32 * 20.0, 0.0, 0.0));
        tokio::time::sleep(Duration::from_millis(100)).await;
        if step % 10 == 0 {
            info!(step, residency = %streamer.snapshot(), "walker");
        }
    }

    streamer.shutdown().await?;
    info!(
        failures = failures.0.load(Ordering::Relaxed),
        residency = %streamer.snapshot(),
        "walk finished"
    );
    Ok(())
}
