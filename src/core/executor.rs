//! # TransitionExecutor: runs loads and unloads.
//!
//! Starts one tokio task per transition and applies its outcome to the
//! location's slot when the loader call returns.
//!
//! ## Event flow
//! ```text
//! begin_load(id)
//!   ├─► runtime handle? ── none ──► NoRuntime (slot untouched)
//!   ├─► lock: check in_flight, Unloaded → Loading, in_flight = true   (mark)
//!   ├─► publish LoadStarted                                           (launch)
//!   └─► spawn ──► loader.load(descriptor)
//!                    ├─ Ok(handle) ──► lock: Loaded + handle   ──► LoadCompleted
//!                    └─ Err / panic ─► lock: Unloaded          ──► LoadFailed
//!
//! begin_unload(id)
//!   ├─► runtime handle? ── none ──► NoRuntime (slot untouched)
//!   ├─► lock: check in_flight, Loaded → Unloading, in_flight = true
//!   ├─► publish UnloadStarted
//!   └─► spawn ──► loader.unload(&handle)
//!                    ├─ Ok ──────────► lock: Unloaded, handle dropped ──► UnloadCompleted
//!                    └─ Err / panic ─► lock: Loaded, handle kept      ──► UnloadFailed
//! ```
//!
//! The tick uses `mark_*` directly while it still holds the table lock it
//! decided under, and launches the marked transitions after releasing it.
//!
//! ## Rules
//! - At most one transition per location (`in_flight` is checked and set in
//!   the same critical section)
//! - A slot is only marked once a runtime is known to exist, so every mark
//!   is followed by a spawn
//! - Every spawned transition publishes **exactly one** terminal event and
//!   clears `in_flight`, including when the loader panics
//! - Failures are absorbed into the slot; nothing propagates to the caller
//!   of `begin_*` beyond the refusal to start
//! - Transitions are never cancelled; `settle` only waits for them

use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::{Duration, Instant};

use futures::FutureExt;
use tokio::runtime::Handle;
use tokio_util::task::TaskTracker;

use crate::content::{ContentHandle, LoaderRef};
use crate::core::table::{Refusal, ResidencyTable, Slot};
use crate::error::{ContentError, TransitionError, panic_message};
use crate::events::{Bus, Event, EventKind};
use crate::world::{LocationId, LocationIndex, LocationRegistry};

/// A transition already marked in the table, waiting to be spawned.
#[derive(Debug)]
pub(crate) enum Marked {
    Load {
        idx: LocationIndex,
        distance: f32,
    },
    Unload {
        idx: LocationIndex,
        handle: ContentHandle,
        distance: f32,
    },
}

impl Marked {
    pub fn is_load(&self) -> bool {
        matches!(self, Marked::Load { .. })
    }
}

/// Starts and completes residency transitions.
pub struct TransitionExecutor {
    registry: Arc<LocationRegistry>,
    table: Arc<ResidencyTable>,
    loader: LoaderRef,
    bus: Bus,
    tracker: TaskTracker,
    settling: tokio::sync::Mutex<()>,
}

impl TransitionExecutor {
    pub(crate) fn new(
        registry: Arc<LocationRegistry>,
        table: Arc<ResidencyTable>,
        loader: LoaderRef,
        bus: Bus,
    ) -> Self {
        Self {
            registry,
            table,
            loader,
            bus,
            tracker: TaskTracker::new(),
            settling: tokio::sync::Mutex::new(()),
        }
    }

    /// Starts loading `id`.
    ///
    /// Returns once the load is dispatched; the outcome arrives later as a
    /// `LoadCompleted` / `LoadFailed` event and in the location's state.
    ///
    /// # Errors
    /// - [`TransitionError::AlreadyInFlight`] a transition is outstanding
    /// - [`TransitionError::NotEligible`] the location is not `Unloaded`
    /// - [`TransitionError::UnknownLocation`] no such id
    /// - [`TransitionError::NoRuntime`] called outside a tokio runtime
    pub fn begin_load(&self, id: &str) -> Result<(), TransitionError> {
        let rt = self.runtime(id)?;
        let marked = self.mark_load(&mut self.table.lock(), id)?;
        self.launch(&rt, marked);
        Ok(())
    }

    /// Starts releasing the content of `id`.
    ///
    /// The loader receives the exact handle produced by the matching load.
    ///
    /// # Errors
    /// - [`TransitionError::AlreadyInFlight`] a transition is outstanding
    /// - [`TransitionError::NotEligible`] the location is not `Loaded`
    /// - [`TransitionError::UnknownLocation`] no such id
    /// - [`TransitionError::NoRuntime`] called outside a tokio runtime
    pub fn begin_unload(&self, id: &str) -> Result<(), TransitionError> {
        let rt = self.runtime(id)?;
        let marked = self.mark_unload(&mut self.table.lock(), id)?;
        self.launch(&rt, marked);
        Ok(())
    }

    /// `Unloaded` → `Loading` on the caller's locked slots.
    ///
    /// The caller must [`launch`](Self::launch) the result once the lock is released.
    pub(crate) fn mark_load(&self, slots: &mut [Slot], id: &str) -> Result<Marked, TransitionError> {
        let idx = self.resolve(id)?;
        let slot = &mut slots[idx.0];
        slot.begin_load()
            .map_err(|r| refusal_error(r, self.registry.at(idx).id()))?;
        Ok(Marked::Load {
            idx,
            distance: slot.distance,
        })
    }

    /// `Loaded` → `Unloading` on the caller's locked slots.
    pub(crate) fn mark_unload(
        &self,
        slots: &mut [Slot],
        id: &str,
    ) -> Result<Marked, TransitionError> {
        let idx = self.resolve(id)?;
        let slot = &mut slots[idx.0];
        let handle = slot
            .begin_unload()
            .map_err(|r| refusal_error(r, self.registry.at(idx).id()))?;
        Ok(Marked::Unload {
            idx,
            handle,
            distance: slot.distance,
        })
    }

    /// Publishes the start event and spawns the loader call on `rt`.
    ///
    /// Must not be called while holding the table lock.
    pub(crate) fn launch(&self, rt: &Handle, marked: Marked) {
        match marked {
            Marked::Load { idx, distance } => self.launch_load(rt, idx, distance),
            Marked::Unload {
                idx,
                handle,
                distance,
            } => self.launch_unload(rt, idx, handle, distance),
        }
    }

    fn launch_load(&self, rt: &Handle, idx: LocationIndex, distance: f32) {
        let location = self.registry.at(idx);
        self.bus.publish(
            Event::new(EventKind::LoadStarted)
                .with_location(location.id().clone())
                .with_distance(distance),
        );

        let id = location.id().clone();
        let content = location.content().clone();
        let loader = Arc::clone(&self.loader);
        let table = Arc::clone(&self.table);
        let bus = self.bus.clone();

        self.tracker.spawn_on(
            async move {
                let started = Instant::now();
                let res = match AssertUnwindSafe(loader.load(&content)).catch_unwind().await {
                    Ok(res) => res,
                    Err(panic) => Err(ContentError::load(format!(
                        "loader panicked: {}",
                        panic_message(&*panic)
                    ))),
                };

                table.lock()[idx.0].finish_load(res.as_ref().ok().copied());

                let ev = match res {
                    Ok(handle) => Event::new(EventKind::LoadCompleted).with_handle(handle),
                    Err(e) => Event::new(EventKind::LoadFailed).with_reason(e.to_string()),
                };
                bus.publish(ev.with_location(id).with_elapsed(started.elapsed()));
            },
            rt,
        );
    }

    fn launch_unload(&self, rt: &Handle, idx: LocationIndex, handle: ContentHandle, distance: f32) {
        let location = self.registry.at(idx);
        self.bus.publish(
            Event::new(EventKind::UnloadStarted)
                .with_location(location.id().clone())
                .with_distance(distance)
                .with_handle(handle),
        );

        let id = location.id().clone();
        let loader = Arc::clone(&self.loader);
        let table = Arc::clone(&self.table);
        let bus = self.bus.clone();

        self.tracker.spawn_on(
            async move {
                let started = Instant::now();
                let res = match AssertUnwindSafe(loader.unload(&handle)).catch_unwind().await {
                    Ok(res) => res,
                    Err(panic) => Err(ContentError::unload(format!(
                        "loader panicked: {}",
                        panic_message(&*panic)
                    ))),
                };

                table.lock()[idx.0].finish_unload(res.is_ok());

                let ev = match res {
                    Ok(()) => Event::new(EventKind::UnloadCompleted),
                    Err(e) => Event::new(EventKind::UnloadFailed).with_reason(e.to_string()),
                };
                bus.publish(
                    ev.with_location(id)
                        .with_handle(handle)
                        .with_elapsed(started.elapsed()),
                );
            },
            rt,
        );
    }

    /// Ids with an outstanding transition, in registration order.
    pub fn in_flight_ids(&self) -> Vec<LocationId> {
        let slots = self.table.lock();
        self.registry
            .all()
            .iter()
            .zip(slots.iter())
            .filter(|(_, slot)| slot.in_flight)
            .map(|(location, _)| location.id().clone())
            .collect()
    }

    /// Number of outstanding transitions.
    pub fn in_flight_count(&self) -> usize {
        self.tracker.len()
    }

    /// Waits up to `grace` for every outstanding transition to complete.
    ///
    /// Transitions started while waiting are waited for too. On timeout the
    /// ids still in flight are returned; nothing is cancelled. Concurrent
    /// calls wait their turn, within their own `grace`.
    pub async fn settle(&self, grace: Duration) -> Result<(), Vec<LocationId>> {
        let deadline = tokio::time::Instant::now() + grace;
        let Ok(_turn) = tokio::time::timeout_at(deadline, self.settling.lock()).await else {
            return Err(self.in_flight_ids());
        };

        self.tracker.close();
        let res = tokio::time::timeout_at(deadline, self.tracker.wait()).await;
        self.tracker.reopen();

        match res {
            Ok(()) => Ok(()),
            Err(_elapsed) => Err(self.in_flight_ids()),
        }
    }

    fn runtime(&self, id: &str) -> Result<Handle, TransitionError> {
        Handle::try_current().map_err(|_| TransitionError::NoRuntime { id: id.into() })
    }

    fn resolve(&self, id: &str) -> Result<LocationIndex, TransitionError> {
        self.registry
            .index_of(id)
            .ok_or_else(|| TransitionError::UnknownLocation { id: id.into() })
    }
}

fn refusal_error(refusal: Refusal, id: &LocationId) -> TransitionError {
    match refusal {
        Refusal::InFlight => TransitionError::AlreadyInFlight { id: id.clone() },
        Refusal::NotEligible(state) => TransitionError::NotEligible {
            id: id.clone(),
            state,
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::content::ContentLoader;
    use crate::world::{ContentDescriptor, Location, LocationState, Position};
    use async_trait::async_trait;
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicU64, Ordering};
    use tokio::sync::Semaphore;

    /// Loader whose calls block until the test releases permits.
    struct GatedLoader {
        gate: Semaphore,
        next: AtomicU64,
        fail_load: Option<&'static str>,
        fail_unload: bool,
        panic_load: bool,
        unloaded: Mutex<Vec<ContentHandle>>,
    }

    impl GatedLoader {
        fn new() -> Self {
            Self {
                gate: Semaphore::new(0),
                next: AtomicU64::new(100),
                fail_load: None,
                fail_unload: false,
                panic_load: false,
                unloaded: Mutex::new(Vec::new()),
            }
        }
    }

    #[async_trait]
    impl ContentLoader for GatedLoader {
        async fn load(&self, content: &ContentDescriptor) -> Result<ContentHandle, ContentError> {
            self.gate.acquire().await.unwrap().forget();
            if self.panic_load {
                panic!("asset pipeline exploded");
            }
            if self.fail_load == Some(content.as_str()) {
                return Err(ContentError::load("prefab missing"));
            }
            Ok(ContentHandle::new(self.next.fetch_add(1, Ordering::SeqCst)))
        }

        async fn unload(&self, handle: &ContentHandle) -> Result<(), ContentError> {
            self.gate.acquire().await.unwrap().forget();
            if self.fail_unload {
                return Err(ContentError::unload("still referenced"));
            }
            self.unloaded.lock().unwrap().push(*handle);
            Ok(())
        }
    }

    fn executor(loader: Arc<GatedLoader>) -> (TransitionExecutor, Arc<ResidencyTable>, Bus) {
        let registry = Arc::new(
            LocationRegistry::from_locations([
                Location::new("harbor", Position::ZERO, ContentDescriptor::new("harbor")),
                Location::new("mine", Position::ZERO, ContentDescriptor::new("mine")),
            ])
            .unwrap(),
        );
        let table = Arc::new(ResidencyTable::new(registry.len()));
        let bus = Bus::new(64);
        let exec = TransitionExecutor::new(registry, table.clone(), loader, bus.clone());
        (exec, table, bus)
    }

    const GRACE: Duration = Duration::from_secs(5);

    #[tokio::test]
    async fn load_then_unload_round_trip() {
        let loader = Arc::new(GatedLoader::new());
        let (exec, table, _bus) = executor(loader.clone());

        exec.begin_load("harbor").unwrap();
        assert_eq!(table.lock()[0].state, LocationState::Loading);
        assert_eq!(exec.in_flight_ids(), vec![LocationId::from("harbor")]);

        loader.gate.add_permits(1);
        exec.settle(GRACE).await.unwrap();
        let produced = {
            let slots = table.lock();
            assert_eq!(slots[0].state, LocationState::Loaded);
            assert!(!slots[0].in_flight);
            slots[0].handle.unwrap()
        };

        exec.begin_unload("harbor").unwrap();
        assert_eq!(table.lock()[0].state, LocationState::Unloading);
        assert_eq!(table.lock()[0].handle, Some(produced));

        loader.gate.add_permits(1);
        exec.settle(GRACE).await.unwrap();
        {
            let slots = table.lock();
            assert_eq!(slots[0].state, LocationState::Unloaded);
            assert_eq!(slots[0].handle, None);
            assert!(!slots[0].in_flight);
        }
        assert_eq!(*loader.unloaded.lock().unwrap(), vec![produced]);
    }

    #[tokio::test]
    async fn second_begin_while_in_flight_is_refused() {
        let loader = Arc::new(GatedLoader::new());
        let (exec, _table, _bus) = executor(loader.clone());

        exec.begin_load("harbor").unwrap();
        let err = exec.begin_load("harbor").unwrap_err();
        assert!(err.is_race());
        let err = exec.begin_unload("harbor").unwrap_err();
        assert!(err.is_race());
        assert_eq!(exec.in_flight_count(), 1);

        loader.gate.add_permits(1);
        exec.settle(GRACE).await.unwrap();
    }

    #[tokio::test]
    async fn failed_load_reverts_and_reports() {
        let mut loader = GatedLoader::new();
        loader.fail_load = Some("mine");
        let loader = Arc::new(loader);
        let (exec, table, bus) = executor(loader.clone());
        let mut rx = bus.subscribe();

        exec.begin_load("mine").unwrap();
        loader.gate.add_permits(1);
        exec.settle(GRACE).await.unwrap();

        {
            let slots = table.lock();
            assert_eq!(slots[1].state, LocationState::Unloaded);
            assert_eq!(slots[1].handle, None);
            assert!(!slots[1].in_flight);
        }

        assert_eq!(rx.recv().await.unwrap().kind, EventKind::LoadStarted);
        let failed = rx.recv().await.unwrap();
        assert_eq!(failed.kind, EventKind::LoadFailed);
        assert_eq!(failed.reason.as_deref(), Some("load failed: prefab missing"));
    }

    #[tokio::test]
    async fn panicking_loader_clears_in_flight() {
        let mut loader = GatedLoader::new();
        loader.panic_load = true;
        let loader = Arc::new(loader);
        let (exec, table, _bus) = executor(loader.clone());

        exec.begin_load("harbor").unwrap();
        loader.gate.add_permits(1);
        exec.settle(GRACE).await.unwrap();

        let slots = table.lock();
        assert_eq!(slots[0].state, LocationState::Unloaded);
        assert!(!slots[0].in_flight);
    }

    #[tokio::test]
    async fn failed_unload_keeps_handle() {
        let mut loader = GatedLoader::new();
        loader.fail_unload = true;
        let loader = Arc::new(loader);
        let (exec, table, _bus) = executor(loader.clone());

        exec.begin_load("harbor").unwrap();
        loader.gate.add_permits(1);
        exec.settle(GRACE).await.unwrap();
        let handle = table.lock()[0].handle;

        exec.begin_unload("harbor").unwrap();
        loader.gate.add_permits(1);
        exec.settle(GRACE).await.unwrap();

        let slots = table.lock();
        assert_eq!(slots[0].state, LocationState::Loaded);
        assert_eq!(slots[0].handle, handle);
        assert!(!slots[0].in_flight);
    }

    #[tokio::test]
    async fn refuses_ineligible_and_unknown() {
        let loader = Arc::new(GatedLoader::new());
        let (exec, _table, _bus) = executor(loader);

        assert_eq!(
            exec.begin_unload("harbor").unwrap_err(),
            TransitionError::NotEligible {
                id: LocationId::from("harbor"),
                state: LocationState::Unloaded
            }
        );
        assert_eq!(
            exec.begin_load("atlantis").unwrap_err().as_label(),
            "transition_unknown_location"
        );
    }

    #[tokio::test(start_paused = true)]
    async fn settle_reports_stuck_locations() {
        let loader = Arc::new(GatedLoader::new());
        let (exec, _table, _bus) = executor(loader.clone());

        exec.begin_load("mine").unwrap();
        let stuck = exec.settle(Duration::from_millis(50)).await.unwrap_err();
        assert_eq!(stuck, vec![LocationId::from("mine")]);

        loader.gate.add_permits(1);
        exec.settle(GRACE).await.unwrap();
        assert!(exec.in_flight_ids().is_empty());
    }

    #[test]
    fn outside_a_runtime_nothing_is_marked() {
        let loader = Arc::new(GatedLoader::new());
        let (exec, table, _bus) = executor(loader);

        let err = exec.begin_load("harbor").unwrap_err();
        assert_eq!(err, TransitionError::NoRuntime { id: LocationId::from("harbor") });
        assert!(!err.is_race());

        let slots = table.lock();
        assert_eq!(slots[0].state, LocationState::Unloaded);
        assert!(!slots[0].in_flight);
    }

    #[tokio::test]
    async fn call_from_a_foreign_thread_leaves_the_slot_usable() {
        let loader = Arc::new(GatedLoader::new());
        let (exec, table, _bus) = executor(loader.clone());

        let res = std::thread::scope(|s| s.spawn(|| exec.begin_load("harbor")).join().unwrap());
        assert!(matches!(res, Err(TransitionError::NoRuntime { .. })));

        exec.begin_load("harbor").unwrap();
        loader.gate.add_permits(1);
        exec.settle(GRACE).await.unwrap();
        assert_eq!(table.lock()[0].state, LocationState::Loaded);
    }

    #[tokio::test(start_paused = true)]
    async fn overlapping_settles_do_not_strand_each_other() {
        let loader = Arc::new(GatedLoader::new());
        let (exec, _table, _bus) = executor(loader.clone());
        exec.begin_load("harbor").unwrap();

        let release = async {
            tokio::time::sleep(Duration::from_millis(50)).await;
            loader.gate.add_permits(1);
        };
        let (short, long, ()) = tokio::join!(
            exec.settle(Duration::from_millis(10)),
            exec.settle(GRACE),
            release
        );

        assert_eq!(short, Err(vec![LocationId::from("harbor")]));
        assert_eq!(long, Ok(()));
        assert!(exec.in_flight_ids().is_empty());
    }
}
