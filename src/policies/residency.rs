//! # Residency policy.
//!
//! [`ResidencyPolicy::decide`] is a pure function from the per-location view
//! of one tick to the transitions that tick should start.
//!
//! ## Algorithm
//! ```text
//! unload: state == Loaded   && !in_flight && distance > unload_distance   (all of them)
//! load:   state == Unloaded && !in_flight && distance < load_distance
//!         sorted by (distance, id), taken while occupied + taken < max_loaded
//!
//! occupied = Loaded + Loading + Unloading
//! ```
//!
//! ## Hysteresis
//! ```text
//! 0 ────── load_distance ────────── unload_distance ────────► distance
//!   load-eligible   │   dead band: nothing   │   unload-eligible
//! ```
//! Both comparisons are strict, and `unload_distance > load_distance` is
//! enforced at setup, so a location parked in the band never flaps.
//!
//! ## Capacity
//! Transitions in progress keep their slot until they complete: an unload
//! dispatched this tick does not free room for a load in the same tick, and
//! a load still in progress is counted as if it had finished.
//!
//! # Example
//! ```rust
//! use worldstream::{Candidate, LocationId, LocationState, ResidencyPolicy};
//!
//! let policy = ResidencyPolicy::new(200.0, 300.0, 1);
//! let (near, far) = (LocationId::from("near"), LocationId::from("far"));
//! let decision = policy.decide(&[
//!     Candidate { id: &near, state: LocationState::Unloaded, in_flight: false, distance: 20.0 },
//!     Candidate { id: &far, state: LocationState::Loaded, in_flight: false, distance: 900.0 },
//! ]);
//!
//! assert_eq!(decision.to_unload, vec![far.clone()]);
//! // `far` still occupies the single slot until its unload completes.
//! assert!(decision.to_load.is_empty());
//! ```

use crate::core::StreamerConfig;
use crate::world::{LocationId, LocationState};

/// One location as seen by the policy during a tick.
#[derive(Debug, Clone, Copy)]
pub struct Candidate<'a> {
    pub id: &'a LocationId,
    pub state: LocationState,
    pub in_flight: bool,
    pub distance: f32,
}

/// Transitions to start this tick. The two lists are disjoint.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Decision {
    /// In input order.
    pub to_unload: Vec<LocationId>,
    /// Nearest first.
    pub to_load: Vec<LocationId>,
}

impl Decision {
    pub fn is_empty(&self) -> bool {
        self.to_unload.is_empty() && self.to_load.is_empty()
    }
}

/// Thresholds and budget driving residency decisions.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ResidencyPolicy {
    /// Strict upper bound for load eligibility.
    pub load_distance: f32,
    /// Strict lower bound for unload eligibility.
    pub unload_distance: f32,
    /// Maximum resident (or becoming resident) locations.
    pub max_loaded: usize,
}

impl ResidencyPolicy {
    pub fn new(load_distance: f32, unload_distance: f32, max_loaded: usize) -> Self {
        Self {
            load_distance,
            unload_distance,
            max_loaded,
        }
    }

    pub fn from_config(cfg: &StreamerConfig) -> Self {
        Self::new(cfg.load_distance, cfg.unload_distance, cfg.max_loaded)
    }

    /// Computes this tick's unloads and loads.
    pub fn decide(&self, candidates: &[Candidate<'_>]) -> Decision {
        let to_unload: Vec<LocationId> = candidates
            .iter()
            .filter(|c| {
                c.state == LocationState::Loaded
                    && !c.in_flight
                    && c.distance > self.unload_distance
            })
            .map(|c| c.id.clone())
            .collect();

        let occupied = candidates
            .iter()
            .filter(|c| c.state != LocationState::Unloaded)
            .count();
        let room = self.max_loaded.saturating_sub(occupied);

        let mut eligible: Vec<&Candidate<'_>> = candidates
            .iter()
            .filter(|c| {
                c.state == LocationState::Unloaded
                    && !c.in_flight
                    && c.distance < self.load_distance
            })
            .collect();
        eligible.sort_by(|a, b| a.distance.total_cmp(&b.distance).then_with(|| a.id.cmp(b.id)));

        let to_load = eligible.into_iter().take(room).map(|c| c.id.clone()).collect();

        Decision { to_unload, to_load }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ids(names: &[&str]) -> Vec<LocationId> {
        names.iter().map(|n| LocationId::from(*n)).collect()
    }

    fn view<'a>(
        ids: &'a [LocationId],
        states: &[LocationState],
        distances: &[f32],
    ) -> Vec<Candidate<'a>> {
        ids.iter()
            .zip(states)
            .zip(distances)
            .map(|((id, &state), &distance)| Candidate {
                id,
                state,
                in_flight: state.is_transient(),
                distance,
            })
            .collect()
    }

    use LocationState::{Loaded, Loading, Unloaded, Unloading};

    #[test]
    fn first_tick_loads_everything_under_threshold() {
        let names = ids(&["l0", "l1", "l2", "l3", "l4"]);
        let policy = ResidencyPolicy::new(200.0, 300.0, 3);
        let d = policy.decide(&view(
            &names,
            &[Unloaded; 5],
            &[50.0, 150.0, 250.0, 350.0, 450.0],
        ));
        assert_eq!(d.to_load, ids(&["l0", "l1"]));
        assert!(d.to_unload.is_empty());
    }

    #[test]
    fn loads_nearest_first_up_to_cap() {
        let names = ids(&["a", "b", "c", "d"]);
        let policy = ResidencyPolicy::new(200.0, 300.0, 2);
        let d = policy.decide(&view(&names, &[Unloaded; 4], &[90.0, 10.0, 50.0, 199.0]));
        assert_eq!(d.to_load, ids(&["b", "c"]));
    }

    #[test]
    fn equal_distances_break_ties_by_id() {
        let names = ids(&["zeta", "alpha", "mid"]);
        let policy = ResidencyPolicy::new(200.0, 300.0, 2);
        let d = policy.decide(&view(&names, &[Unloaded; 3], &[10.0, 10.0, 10.0]));
        assert_eq!(d.to_load, ids(&["alpha", "mid"]));
    }

    #[test]
    fn unloads_ignore_capacity() {
        let names = ids(&["a", "b", "c"]);
        let policy = ResidencyPolicy::new(200.0, 300.0, 0);
        let d = policy.decide(&view(&names, &[Loaded; 3], &[301.0, 1000.0, 299.0]));
        assert_eq!(d.to_unload, ids(&["a", "b"]));
        assert!(d.to_load.is_empty());
    }

    #[test]
    fn transient_states_occupy_capacity() {
        let names = ids(&["loading", "unloading", "resident", "near"]);
        let policy = ResidencyPolicy::new(200.0, 300.0, 3);
        let d = policy.decide(&view(
            &names,
            &[Loading, Unloading, Loaded, Unloaded],
            &[10.0, 400.0, 20.0, 5.0],
        ));
        assert!(d.is_empty());
    }

    #[test]
    fn same_tick_unload_does_not_free_a_slot() {
        let names = ids(&["gone", "near"]);
        let policy = ResidencyPolicy::new(200.0, 300.0, 1);
        let d = policy.decide(&view(&names, &[Loaded, Unloaded], &[320.0, 10.0]));
        assert_eq!(d.to_unload, ids(&["gone"]));
        assert!(d.to_load.is_empty());
    }

    #[test]
    fn hysteresis_band_is_inert() {
        let names = ids(&["resident", "absent"]);
        let policy = ResidencyPolicy::new(200.0, 300.0, 5);
        for distance in [200.0, 250.0, 300.0] {
            let d = policy.decide(&view(&names, &[Loaded, Unloaded], &[distance, distance]));
            assert!(d.is_empty(), "distance {distance} should not trigger");
        }
    }

    #[test]
    fn in_flight_locations_are_never_selected() {
        let id = LocationId::from("busy");
        let policy = ResidencyPolicy::new(200.0, 300.0, 5);
        let d = policy.decide(&[Candidate {
            id: &id,
            state: Unloaded,
            in_flight: true,
            distance: 1.0,
        }]);
        assert!(d.to_load.is_empty());
    }

    #[test]
    fn unrefreshed_locations_are_not_load_eligible() {
        let names = ids(&["unknown"]);
        let policy = ResidencyPolicy::new(200.0, 300.0, 5);
        let d = policy.decide(&view(&names, &[Unloaded], &[f32::INFINITY]));
        assert!(d.is_empty());
    }
}
