//! # Locations and their residency states.
//!
//! A [`Location`] is the immutable half of a streamed unit: id, anchor and the
//! opaque [`ContentDescriptor`] handed to the loader. Its mutable half (state,
//! handle, distance, in-flight guard) is kept by the streamer's residency table.
//!
//! ## State machine
//! ```text
//!            begin_load                 load ok
//! Unloaded ────────────► Loading ───────────────► Loaded
//!    ▲                      │                       │
//!    │      load failed     │                       │ begin_unload
//!    ├──────────────────────┘                       ▼
//!    │                  unload ok               Unloading
//!    └──────────────────────────────────────────────┤
//!                                                   │ unload failed
//!                                    Loaded ◄───────┘
//! ```

use std::borrow::Borrow;
use std::fmt;
use std::sync::Arc;

use super::Position;

/// Stable identifier of a location, unique within a registry.
///
/// Cheap to clone (`Arc<str>`); ordering is lexical and is used to break
/// distance ties deterministically.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct LocationId(Arc<str>);

impl LocationId {
    pub fn new(id: impl Into<Arc<str>>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for LocationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for LocationId {
    fn from(s: &str) -> Self {
        Self(Arc::from(s))
    }
}

impl From<String> for LocationId {
    fn from(s: String) -> Self {
        Self(Arc::from(s))
    }
}

impl Borrow<str> for LocationId {
    fn borrow(&self) -> &str {
        &self.0
    }
}

/// Opaque reference to the content a loader should bring in (asset key,
/// prefab path, archive name...). The streamer never looks inside.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct ContentDescriptor(Arc<str>);

impl ContentDescriptor {
    pub fn new(key: impl Into<Arc<str>>) -> Self {
        Self(key.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ContentDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A registered location.
#[derive(Clone, Debug)]
pub struct Location {
    id: LocationId,
    anchor: Position,
    content: ContentDescriptor,
}

impl Location {
    pub fn new(id: impl Into<LocationId>, anchor: Position, content: ContentDescriptor) -> Self {
        Self {
            id: id.into(),
            anchor,
            content,
        }
    }

    pub fn id(&self) -> &LocationId {
        &self.id
    }

    /// Fixed world-space anchor used for distance checks.
    pub fn anchor(&self) -> Position {
        self.anchor
    }

    pub fn content(&self) -> &ContentDescriptor {
        &self.content
    }
}

/// Residency state of one location.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum LocationState {
    /// Not resident. Initial state.
    #[default]
    Unloaded,
    /// Load outstanding.
    Loading,
    /// Resident; a content handle is held.
    Loaded,
    /// Release outstanding; the handle is still held.
    Unloading,
}

impl LocationState {
    /// Returns a short stable label (snake_case).
    pub fn as_label(&self) -> &'static str {
        match self {
            LocationState::Unloaded => "unloaded",
            LocationState::Loading => "loading",
            LocationState::Loaded => "loaded",
            LocationState::Unloading => "unloading",
        }
    }

    /// True while a transition is outstanding.
    #[inline]
    pub fn is_transient(&self) -> bool {
        matches!(self, LocationState::Loading | LocationState::Unloading)
    }

    /// True for the states in which a content handle must be present.
    #[inline]
    pub fn holds_handle(&self) -> bool {
        matches!(self, LocationState::Loaded | LocationState::Unloading)
    }
}

impl fmt::Display for LocationState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_label())
    }
}
