//! # External collaborators.
//!
//! The streamer never finds its inputs on its own; both are injected through
//! the builder:
//! - [`ContentLoader`] brings content in and releases it (async, may fail)
//! - [`ObserverSource`] reports where the observer currently is
//!
//! Ready-made observer sources: [`ObserverFn`] (closure-backed) and
//! [`TrackedObserver`] (a watch cell the game loop writes into).

mod loader;
mod observer;

pub use loader::{ContentHandle, ContentLoader, LoaderRef};
pub use observer::{ObserverFn, ObserverRef, ObserverSource, TrackedObserver};
