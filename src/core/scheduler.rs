//! # Streamer: the periodic residency loop.
//!
//! The [`Streamer`] owns the tick, the residency table and the transition
//! executor. Each tick samples the observer, refreshes distances, asks the
//! [`ResidencyPolicy`] what to do and dispatches the resulting transitions
//! without waiting for them.
//!
//! ## Tick
//! ```text
//! tick()
//!   ├─► observer.current_position()
//!   ├─► lock table
//!   │     ├─► DistanceEvaluator::refresh ── None ──► ObserverUnavailable (no-op tick)
//!   │     └─► ResidencyPolicy::decide(candidates)
//!   ├─► unlock
//!   ├─► begin_unload(id) for every unload     (all of them, capacity ignored)
//!   ├─► begin_load(id)   for every load       (nearest first, within capacity)
//!   └─► publish TickCompleted { snapshot }
//! ```
//!
//! ## Lifecycle
//! ```text
//! start() ──► StreamerStarted
//!   └─► spawn loop(Weak<Streamer>, token)
//!         ├─ sleep(startup_delay)        (cancellable)
//!         └─ every tick_interval: tick() (MissedTickBehavior::Delay)
//!
//! stop()      ──► token.cancel() ──► StreamerStopped  (transitions keep running)
//! shutdown()  ──► stop() + settle(grace)
//!                   ├─ Ok       ──► AllSettledWithin
//!                   └─ timeout  ──► GraceExceeded + RuntimeError::GraceExceeded
//! run_until_signal() ──► start() ─► OS signal ─► ShutdownRequested ─► shutdown()
//! ```
//!
//! The loop holds only a `Weak` reference: dropping the last `Arc<Streamer>`
//! ends it at the next tick.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError, Weak};
use std::time::Duration;

use tokio::runtime::Handle;
use tokio::sync::broadcast;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::content::ObserverRef;
use crate::core::{
    builder::StreamerBuilder,
    config::StreamerConfig,
    distance::DistanceEvaluator,
    executor::TransitionExecutor,
    signal,
    snapshot::Snapshot,
    table::{ResidencyTable, Slot},
};
use crate::error::{RuntimeError, TickError, TransitionError};
use crate::events::{Bus, Event, EventKind};
use crate::policies::{Candidate, ResidencyPolicy};
use crate::world::{LocationId, LocationRegistry};

/// What one tick dispatched.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TickReport {
    /// Tick number (1-based).
    pub tick: u64,
    pub unloads_started: usize,
    pub loads_started: usize,
    /// Selected transitions the executor refused to start.
    pub skipped: usize,
}

impl TickReport {
    /// True when the tick started nothing.
    pub fn is_idle(&self) -> bool {
        self.unloads_started == 0 && self.loads_started == 0
    }
}

/// Periodic residency scheduler.
pub struct Streamer {
    cfg: StreamerConfig,
    registry: Arc<LocationRegistry>,
    table: Arc<ResidencyTable>,
    executor: TransitionExecutor,
    policy: ResidencyPolicy,
    observer: ObserverRef,
    bus: Bus,

    loop_token: Mutex<Option<CancellationToken>>,
    ticks: AtomicU64,
}

impl Streamer {
    /// Starts building a streamer from `cfg`.
    pub fn builder(cfg: StreamerConfig) -> StreamerBuilder {
        StreamerBuilder::new(cfg)
    }

    pub(crate) fn new_internal(
        cfg: StreamerConfig,
        registry: Arc<LocationRegistry>,
        table: Arc<ResidencyTable>,
        executor: TransitionExecutor,
        observer: ObserverRef,
        bus: Bus,
    ) -> Self {
        let policy = ResidencyPolicy::from_config(&cfg);
        Self {
            cfg,
            registry,
            table,
            executor,
            policy,
            observer,
            bus,
            loop_token: Mutex::new(None),
            ticks: AtomicU64::new(0),
        }
    }

    /// Starts the periodic loop.
    ///
    /// The first tick fires after `startup_delay`, then every `tick_interval`.
    /// Must be called within a tokio runtime.
    ///
    /// # Errors
    /// [`RuntimeError::AlreadyRunning`] if the loop is already running.
    pub fn start(self: &Arc<Self>) -> Result<(), RuntimeError> {
        let token = {
            let mut current = self.token_slot();
            if current.as_ref().is_some_and(|t| !t.is_cancelled()) {
                return Err(RuntimeError::AlreadyRunning);
            }
            let token = CancellationToken::new();
            *current = Some(token.clone());
            token
        };

        info!(
            locations = self.registry.len(),
            interval_ms = self.cfg.tick_interval.as_millis() as u64,
            max_loaded = self.cfg.max_loaded,
            "streamer started"
        );
        self.bus.publish(Event::new(EventKind::StreamerStarted));

        tokio::spawn(tick_loop(
            Arc::downgrade(self),
            token,
            self.cfg.startup_delay_opt(),
            self.cfg.tick_interval,
        ));
        Ok(())
    }

    /// Stops future ticks. Outstanding transitions still complete.
    ///
    /// Returns `false` if the loop was not running.
    pub fn stop(&self) -> bool {
        let Some(token) = self.token_slot().take() else {
            return false;
        };
        if token.is_cancelled() {
            return false;
        }
        token.cancel();

        info!(in_flight = self.executor.in_flight_count(), "streamer stopped");
        self.bus.publish(Event::new(EventKind::StreamerStopped));
        true
    }

    /// True while the periodic loop is active.
    pub fn is_running(&self) -> bool {
        self.token_slot().as_ref().is_some_and(|t| !t.is_cancelled())
    }

    /// Runs one decision cycle now.
    ///
    /// Dispatches transitions and returns without awaiting them. Distances,
    /// the decision and the marking of every selected slot happen in one
    /// critical section, so concurrent ticks never decide on the same
    /// free capacity.
    ///
    /// # Errors
    /// - [`TickError::ObserverUnavailable`] when the observer has no position;
    ///   an `ObserverUnavailable` event is published and nothing changes
    /// - [`TickError::NoRuntime`] when called outside a tokio runtime
    pub fn tick(&self) -> Result<TickReport, TickError> {
        let rt = Handle::try_current().map_err(|_| TickError::NoRuntime)?;
        let tick = self.ticks.fetch_add(1, Ordering::Relaxed) + 1;
        let observer = self.observer.current_position();

        let (marked, refusals) = {
            let mut slots = self.table.lock();
            if let Err(e) = DistanceEvaluator::refresh(observer, &self.registry, slots.as_mut_slice()) {
                drop(slots);
                debug!(tick, "observer unavailable, tick skipped");
                self.bus
                    .publish(Event::new(EventKind::ObserverUnavailable).with_tick(tick));
                return Err(e);
            }
            let decision = self.policy.decide(&self.candidates(&slots));

            let mut marked = Vec::new();
            let mut refusals = Vec::new();
            let unloads = decision.to_unload.iter().map(|id| (id, false));
            let loads = decision.to_load.iter().map(|id| (id, true));
            for (id, load) in unloads.chain(loads) {
                let res = if load {
                    self.executor.mark_load(slots.as_mut_slice(), id.as_str())
                } else {
                    self.executor.mark_unload(slots.as_mut_slice(), id.as_str())
                };
                match res {
                    Ok(m) => marked.push(m),
                    Err(e) => refusals.push((id.clone(), e)),
                }
            }
            (marked, refusals)
        };

        let mut report = TickReport {
            tick,
            ..TickReport::default()
        };
        for (id, err) in refusals {
            self.refused(tick, &id, err, &mut report);
        }
        for m in marked {
            if m.is_load() {
                report.loads_started += 1;
            } else {
                report.unloads_started += 1;
            }
            self.executor.launch(&rt, m);
        }

        if !report.is_idle() {
            debug!(
                tick,
                unloads = report.unloads_started,
                loads = report.loads_started,
                "transitions dispatched"
            );
        }
        self.bus.publish(
            Event::new(EventKind::TickCompleted)
                .with_tick(tick)
                .with_snapshot(self.snapshot()),
        );
        Ok(report)
    }

    /// Point-in-time residency of every location.
    pub fn snapshot(&self) -> Snapshot {
        self.table.snapshot(&self.registry)
    }

    /// Stops the loop and waits up to `grace` for outstanding transitions.
    ///
    /// # Errors
    /// [`RuntimeError::GraceExceeded`] listing the locations still in flight.
    pub async fn shutdown(&self) -> Result<(), RuntimeError> {
        self.stop();

        let grace = self.cfg.grace;
        match self.executor.settle(grace).await {
            Ok(()) => {
                info!("all transitions settled");
                self.bus.publish(Event::new(EventKind::AllSettledWithin));
                Ok(())
            }
            Err(stuck) => {
                let ids = join_ids(&stuck);
                warn!(grace_ms = grace.as_millis() as u64, stuck = %ids, "shutdown grace exceeded");
                self.bus
                    .publish(Event::new(EventKind::GraceExceeded).with_reason(ids));
                Err(RuntimeError::GraceExceeded { grace, stuck })
            }
        }
    }

    /// Starts the loop and runs until SIGINT / SIGTERM / Ctrl-C, then shuts down.
    ///
    /// # Errors
    /// - [`RuntimeError::AlreadyRunning`] if already started
    /// - [`RuntimeError::Signal`] if the signal listeners cannot be installed
    /// - [`RuntimeError::GraceExceeded`] from the final [`shutdown`](Self::shutdown)
    pub async fn run_until_signal(self: &Arc<Self>) -> Result<(), RuntimeError> {
        self.start()?;

        if let Err(e) = signal::wait_for_shutdown_signal().await {
            let _ = self.shutdown().await;
            return Err(e.into());
        }

        info!("shutdown requested");
        self.bus.publish(Event::new(EventKind::ShutdownRequested));
        self.shutdown().await
    }

    /// Raw receiver of every event published from now on.
    pub fn subscribe(&self) -> broadcast::Receiver<Event> {
        self.bus.subscribe()
    }

    pub fn executor(&self) -> &TransitionExecutor {
        &self.executor
    }

    pub fn registry(&self) -> &LocationRegistry {
        &self.registry
    }

    pub fn config(&self) -> &StreamerConfig {
        &self.cfg
    }

    fn candidates<'a>(&'a self, slots: &[Slot]) -> Vec<Candidate<'a>> {
        self.registry
            .all()
            .iter()
            .zip(slots)
            .map(|(location, slot)| Candidate {
                id: location.id(),
                state: slot.state,
                in_flight: slot.in_flight,
                distance: slot.distance,
            })
            .collect()
    }

    fn refused(&self, tick: u64, id: &LocationId, err: TransitionError, report: &mut TickReport) {
        report.skipped += 1;
        if err.is_race() {
            debug!(tick, location = %id, "transition already in flight, skipped");
        } else {
            warn!(tick, location = %id, error = %err, label = err.as_label(), "transition refused");
        }
        self.bus.publish(
            Event::new(EventKind::TransitionSkipped)
                .with_tick(tick)
                .with_location(id.clone())
                .with_reason(err.to_string()),
        );
    }

    fn token_slot(&self) -> std::sync::MutexGuard<'_, Option<CancellationToken>> {
        self.loop_token.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Drop for Streamer {
    fn drop(&mut self) {
        let token = self
            .loop_token
            .get_mut()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        if let Some(token) = token {
            token.cancel();
        }
    }
}

async fn tick_loop(
    streamer: Weak<Streamer>,
    token: CancellationToken,
    startup_delay: Option<Duration>,
    period: Duration,
) {
    if let Some(delay) = startup_delay {
        tokio::select! {
            biased;
            _ = token.cancelled() => return,
            _ = tokio::time::sleep(delay) => {}
        }
    }

    let mut interval = tokio::time::interval(period);
    interval.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            biased;
            _ = token.cancelled() => break,
            _ = interval.tick() => {}
        }
        let Some(streamer) = streamer.upgrade() else {
            break;
        };
        // Failures are published by `tick` itself.
        let _ = streamer.tick();
    }
}

fn join_ids(ids: &[LocationId]) -> String {
    ids.iter()
        .map(LocationId::as_str)
        .collect::<Vec<_>>()
        .join(", ")
}
