//! # Distance evaluator.
//!
//! Recomputes every location's distance to the observer, once per tick and
//! under the table lock, so the policy always decides on one consistent set
//! of distances.

use crate::core::table::Slot;
use crate::error::TickError;
use crate::world::{LocationRegistry, Position};

/// Per-tick distance refresh.
pub(crate) struct DistanceEvaluator;

impl DistanceEvaluator {
    /// Sets `slot.distance = |observer - anchor|` for every location.
    ///
    /// Without an observer nothing is touched and
    /// [`TickError::ObserverUnavailable`] is returned; stale distances must
    /// not be acted on.
    pub fn refresh(
        observer: Option<Position>,
        registry: &LocationRegistry,
        slots: &mut [Slot],
    ) -> Result<(), TickError> {
        let observer = observer.ok_or(TickError::ObserverUnavailable)?;
        for (location, slot) in registry.all().iter().zip(slots.iter_mut()) {
            slot.distance = observer.distance(&location.anchor());
        }
        Ok(())
    }
}
