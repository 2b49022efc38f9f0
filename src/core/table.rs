//! # Residency table: mutable per-location state.
//!
//! Arena of [`Slot`]s indexed by registration index. One mutex guards the
//! whole arena; every critical section is short and never spans an `.await`.
//!
//! ## Writers
//! - distance: the distance evaluator, at tick start
//! - state / handle / in_flight: the transition executor, when it starts a
//!   transition and when that transition completes
//!
//! ## Rules
//! - `in_flight` ⇔ `state` is `Loading` or `Unloading`
//! - `handle.is_some()` ⇔ `state` is `Loaded` or `Unloading`
//! - a slot leaves a transient state only through `finish_load` / `finish_unload`

use std::sync::{Mutex, MutexGuard, PoisonError};

use crate::content::ContentHandle;
use crate::core::snapshot::{LocationStatus, Snapshot};
use crate::world::{LocationRegistry, LocationState};

/// Why a slot refused to start a transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Refusal {
    InFlight,
    NotEligible(LocationState),
}

/// Mutable residency record of one location.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct Slot {
    pub state: LocationState,
    pub handle: Option<ContentHandle>,
    /// `+∞` until the first refresh, so never load-eligible before it.
    pub distance: f32,
    pub in_flight: bool,
}

impl Default for Slot {
    fn default() -> Self {
        Self {
            state: LocationState::Unloaded,
            handle: None,
            distance: f32::INFINITY,
            in_flight: false,
        }
    }
}

impl Slot {
    /// `Unloaded` → `Loading`.
    pub fn begin_load(&mut self) -> Result<(), Refusal> {
        if self.in_flight {
            return Err(Refusal::InFlight);
        }
        if self.state != LocationState::Unloaded {
            return Err(Refusal::NotEligible(self.state));
        }
        self.in_flight = true;
        self.state = LocationState::Loading;
        Ok(())
    }

    /// `Loading` → `Loaded` with `handle`, or back to `Unloaded` on failure.
    pub fn finish_load(&mut self, handle: Option<ContentHandle>) {
        debug_assert_eq!(self.state, LocationState::Loading);
        match handle {
            Some(h) => {
                self.handle = Some(h);
                self.state = LocationState::Loaded;
            }
            None => {
                self.handle = None;
                self.state = LocationState::Unloaded;
            }
        }
        self.in_flight = false;
    }

    /// `Loaded` → `Unloading`; returns the handle to release.
    ///
    /// The handle stays in the slot until the release succeeds.
    pub fn begin_unload(&mut self) -> Result<ContentHandle, Refusal> {
        if self.in_flight {
            return Err(Refusal::InFlight);
        }
        let handle = match (self.state, self.handle) {
            (LocationState::Loaded, Some(h)) => h,
            (state, _) => return Err(Refusal::NotEligible(state)),
        };
        self.in_flight = true;
        self.state = LocationState::Unloading;
        Ok(handle)
    }

    /// `Unloading` → `Unloaded` when `released`, otherwise back to `Loaded`.
    pub fn finish_unload(&mut self, released: bool) {
        debug_assert_eq!(self.state, LocationState::Unloading);
        if released {
            self.handle = None;
            self.state = LocationState::Unloaded;
        } else {
            self.state = LocationState::Loaded;
        }
        self.in_flight = false;
    }
}

/// Lock-guarded arena of slots.
#[derive(Debug)]
pub(crate) struct ResidencyTable {
    slots: Mutex<Vec<Slot>>,
}

impl ResidencyTable {
    pub fn new(len: usize) -> Self {
        Self {
            slots: Mutex::new(vec![Slot::default(); len]),
        }
    }

    /// Locks the arena.
    ///
    /// Critical sections cannot panic half-way through a transition update,
    /// so a poisoned lock still holds consistent slots and is recovered.
    pub fn lock(&self) -> MutexGuard<'_, Vec<Slot>> {
        self.slots.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn snapshot(&self, registry: &LocationRegistry) -> Snapshot {
        let slots = self.lock();
        let mut snap = Snapshot {
            locations: Vec::with_capacity(slots.len()),
            ..Snapshot::default()
        };

        for (location, slot) in registry.all().iter().zip(slots.iter()) {
            match slot.state {
                LocationState::Loaded => snap.loaded += 1,
                LocationState::Loading => snap.loading += 1,
                LocationState::Unloading => snap.unloading += 1,
                LocationState::Unloaded => {}
            }
            snap.locations.push(LocationStatus {
                id: location.id().clone(),
                state: slot.state,
                distance: slot.distance.is_finite().then_some(slot.distance),
                in_flight: slot.in_flight,
                handle: slot.handle,
            });
        }
        snap
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn loaded(h: u64) -> Slot {
        Slot {
            state: LocationState::Loaded,
            handle: Some(ContentHandle::new(h)),
            distance: 10.0,
            in_flight: false,
        }
    }

    #[test]
    fn load_cycle() {
        let mut slot = Slot::default();
        slot.begin_load().unwrap();
        assert_eq!(slot.state, LocationState::Loading);
        assert!(slot.in_flight);
        assert_eq!(slot.begin_load(), Err(Refusal::InFlight));

        slot.finish_load(Some(ContentHandle::new(9)));
        assert_eq!(slot.state, LocationState::Loaded);
        assert_eq!(slot.handle, Some(ContentHandle::new(9)));
        assert!(!slot.in_flight);
    }

    #[test]
    fn failed_load_reverts_to_unloaded() {
        let mut slot = Slot::default();
        slot.begin_load().unwrap();
        slot.finish_load(None);
        assert_eq!(slot.state, LocationState::Unloaded);
        assert_eq!(slot.handle, None);
        assert!(!slot.in_flight);
    }

    #[test]
    fn unload_keeps_handle_until_released() {
        let mut slot = loaded(4);
        let h = slot.begin_unload().unwrap();
        assert_eq!(h, ContentHandle::new(4));
        assert_eq!(slot.state, LocationState::Unloading);
        assert_eq!(slot.handle, Some(h));
        assert_eq!(slot.begin_unload(), Err(Refusal::InFlight));

        slot.finish_unload(true);
        assert_eq!(slot.state, LocationState::Unloaded);
        assert_eq!(slot.handle, None);
        assert!(!slot.in_flight);
    }

    #[test]
    fn failed_unload_reverts_to_loaded_with_handle() {
        let mut slot = loaded(4);
        slot.begin_unload().unwrap();
        slot.finish_unload(false);
        assert_eq!(slot.state, LocationState::Loaded);
        assert_eq!(slot.handle, Some(ContentHandle::new(4)));
        assert!(!slot.in_flight);
    }

    #[test]
    fn wrong_state_is_not_eligible() {
        let mut unloaded = Slot::default();
        assert_eq!(
            unloaded.begin_unload(),
            Err(Refusal::NotEligible(LocationState::Unloaded))
        );
        let mut resident = loaded(1);
        assert_eq!(
            resident.begin_load(),
            Err(Refusal::NotEligible(LocationState::Loaded))
        );
    }
}
