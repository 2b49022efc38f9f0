//! # Residency snapshot.
//!
//! Point-in-time copy of every location's residency, taken under the table
//! lock so the counts and the per-location entries always agree.

use std::fmt;

use crate::content::ContentHandle;
use crate::world::{LocationId, LocationState};

/// Residency of one location at snapshot time.
#[derive(Clone, Debug, PartialEq)]
pub struct LocationStatus {
    pub id: LocationId,
    pub state: LocationState,
    /// Last computed observer distance (`None` before the first refresh).
    pub distance: Option<f32>,
    pub in_flight: bool,
    pub handle: Option<ContentHandle>,
}

/// Residency of all locations, in registration order.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Snapshot {
    pub loaded: usize,
    pub loading: usize,
    pub unloading: usize,
    pub locations: Vec<LocationStatus>,
}

impl Snapshot {
    pub fn status(&self, id: &str) -> Option<&LocationStatus> {
        self.locations.iter().find(|s| s.id.as_str() == id)
    }

    pub fn state_of(&self, id: &str) -> Option<LocationState> {
        self.status(id).map(|s| s.state)
    }

    /// Ids of resident locations, in registration order.
    pub fn loaded_ids(&self) -> impl Iterator<Item = &LocationId> {
        self.locations
            .iter()
            .filter(|s| s.state == LocationState::Loaded)
            .map(|s| &s.id)
    }

    /// Number of outstanding transitions.
    pub fn in_progress(&self) -> usize {
        self.loading + self.unloading
    }
}

impl fmt::Display for Snapshot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} loaded, {} in progress |", self.loaded, self.in_progress())?;
        for (i, id) in self.loaded_ids().enumerate() {
            let sep = if i == 0 { " " } else { ", " };
            write!(f, "{sep}{id}")?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn status(id: &str, state: LocationState) -> LocationStatus {
        LocationStatus {
            id: LocationId::from(id),
            state,
            distance: Some(10.0),
            in_flight: state.is_transient(),
            handle: state.holds_handle().then(|| ContentHandle::new(1)),
        }
    }

    fn sample() -> Snapshot {
        Snapshot {
            loaded: 2,
            loading: 1,
            unloading: 0,
            locations: vec![
                status("harbor", LocationState::Loaded),
                status("mine", LocationState::Loading),
                status("quarry", LocationState::Loaded),
                status("ruins", LocationState::Unloaded),
            ],
        }
    }

    #[test]
    fn lookups_by_id() {
        let snap = sample();
        assert_eq!(snap.state_of("mine"), Some(LocationState::Loading));
        assert_eq!(snap.state_of("atlantis"), None);
        assert!(snap.status("mine").unwrap().in_flight);
        assert_eq!(snap.in_progress(), 1);
    }

    #[test]
    fn display_lists_resident_ids() {
        assert_eq!(sample().to_string(), "2 loaded, 1 in progress | harbor, quarry");
        assert_eq!(Snapshot::default().to_string(), "0 loaded, 0 in progress |");
    }
}
