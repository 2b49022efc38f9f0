//! # Location registry.
//!
//! Registration-ordered table of [`Location`]s with an id index.
//!
//! ## Rules
//! - Ids are unique; a repeated id fails with [`SetupError::DuplicateId`]
//! - Order is registration order and never changes
//! - A location's position in that order is its [`LocationIndex`], which the
//!   residency table uses as its arena key

use std::collections::HashMap;

use crate::error::SetupError;

use super::{Location, LocationId};

/// Arena key of a registered location (its registration index).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub(crate) struct LocationIndex(pub(crate) usize);

/// Static table of known locations.
#[derive(Debug, Default)]
pub struct LocationRegistry {
    entries: Vec<Location>,
    index: HashMap<LocationId, LocationIndex>,
}

impl LocationRegistry {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds a registry from `locations`, keeping their order.
    ///
    /// Fails on the first repeated id.
    pub fn from_locations(
        locations: impl IntoIterator<Item = Location>,
    ) -> Result<Self, SetupError> {
        let mut registry = Self::new();
        for location in locations {
            registry.register(location)?;
        }
        Ok(registry)
    }

    /// Appends a location.
    pub fn register(&mut self, location: Location) -> Result<(), SetupError> {
        if self.index.contains_key(location.id()) {
            return Err(SetupError::DuplicateId {
                id: location.id().clone(),
            });
        }
        let idx = LocationIndex(self.entries.len());
        self.index.insert(location.id().clone(), idx);
        self.entries.push(location);
        Ok(())
    }

    /// All locations in registration order.
    pub fn all(&self) -> &[Location] {
        &self.entries
    }

    /// Looks a location up by id.
    pub fn get(&self, id: &str) -> Option<&Location> {
        self.index.get(id).map(|idx| &self.entries[idx.0])
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub(crate) fn index_of(&self, id: &str) -> Option<LocationIndex> {
        self.index.get(id).copied()
    }

    /// Location at a registration index handed out by this registry.
    pub(crate) fn at(&self, idx: LocationIndex) -> &Location {
        &self.entries[idx.0]
    }
}
