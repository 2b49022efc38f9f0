//! # Static world description.
//!
//! - [`Position`] 3D coordinate and euclidean distance
//! - [`Location`], [`LocationId`], [`ContentDescriptor`] the registered units
//! - [`LocationState`] residency state machine labels
//! - [`LocationRegistry`] registration-ordered table with id lookup
//!
//! Nothing in here changes after the streamer is built; mutable residency
//! state lives in `core`.

mod location;
mod position;
mod registry;

pub use location::{ContentDescriptor, Location, LocationId, LocationState};
pub use position::Position;
pub use registry::LocationRegistry;

pub(crate) use registry::LocationIndex;
