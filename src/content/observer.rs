//! # Observer position sources.
//!
//! [`ObserverSource::current_position`] is sampled once at the start of every
//! tick. `None` means the observer does not exist (yet); the tick then does
//! nothing.
//!
//! ## Implementations
//! - [`ObserverFn`] wraps a closure, e.g. reading a transform from an ECS
//! - [`TrackedObserver`] is a `tokio::sync::watch` cell; the game loop calls
//!   [`TrackedObserver::set`] and the streamer reads the latest value

use std::borrow::Cow;
use std::fmt;
use std::sync::Arc;

use tokio::sync::watch;

use crate::world::Position;

/// Shared handle to an observer source.
pub type ObserverRef = Arc<dyn ObserverSource>;

/// Reports the observer's current position.
///
/// Called from the tick; must not block.
pub trait ObserverSource: Send + Sync + 'static {
    fn current_position(&self) -> Option<Position>;
}

/// Closure-backed observer source.
///
/// ## Example
/// ```rust
/// use worldstream::{ObserverFn, ObserverSource, Position};
///
/// let fixed = ObserverFn::new("spawn-point", || Some(Position::new(0.0, 5.0, 0.0)));
/// assert_eq!(fixed.current_position(), Some(Position::new(0.0, 5.0, 0.0)));
/// assert_eq!(fixed.name(), "spawn-point");
/// ```
pub struct ObserverFn<F> {
    name: Cow<'static, str>,
    f: F,
}

impl<F> ObserverFn<F> {
    pub fn new(name: impl Into<Cow<'static, str>>, f: F) -> Self {
        Self {
            name: name.into(),
            f,
        }
    }

    /// Creates the source and returns it as a shared handle.
    pub fn arc(name: impl Into<Cow<'static, str>>, f: F) -> Arc<Self> {
        Arc::new(Self::new(name, f))
    }

    pub fn name(&self) -> &str {
        &self.name
    }
}

impl<F> fmt::Debug for ObserverFn<F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ObserverFn").field("name", &self.name).finish()
    }
}

impl<F> ObserverSource for ObserverFn<F>
where
    F: Fn() -> Option<Position> + Send + Sync + 'static,
{
    fn current_position(&self) -> Option<Position> {
        (self.f)()
    }
}

/// Observer position cell written by the host and read by the streamer.
///
/// Starts empty (observer not spawned yet).
#[derive(Debug)]
pub struct TrackedObserver {
    tx: watch::Sender<Option<Position>>,
}

impl TrackedObserver {
    pub fn new() -> Self {
        let (tx, _rx) = watch::channel(None);
        Self { tx }
    }

    pub fn arc() -> Arc<Self> {
        Arc::new(Self::new())
    }

    /// Publishes a new observer position.
    pub fn set(&self, pos: Position) {
        self.tx.send_replace(Some(pos));
    }

    /// Marks the observer as gone (despawned, teleporting between scenes...).
    pub fn clear(&self) {
        self.tx.send_replace(None);
    }

    /// Receiver that wakes on every position change.
    pub fn watch(&self) -> watch::Receiver<Option<Position>> {
        self.tx.subscribe()
    }
}

impl Default for TrackedObserver {
    fn default() -> Self {
        Self::new()
    }
}

impl ObserverSource for TrackedObserver {
    fn current_position(&self) -> Option<Position> {
        *self.tx.borrow()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tracked_observer_starts_unavailable() {
        let obs = TrackedObserver::new();
        assert_eq!(obs.current_position(), None);
    }

    #[test]
    fn tracked_observer_reports_latest() {
        let obs = TrackedObserver::new();
        obs.set(Position::new(1.0, 0.0, 0.0));
        obs.set(Position::new(2.0, 0.0, 0.0));
        assert_eq!(obs.current_position(), Some(Position::new(2.0, 0.0, 0.0)));
        obs.clear();
        assert_eq!(obs.current_position(), None);
    }

    #[test]
    fn watch_sees_updates() {
        let obs = TrackedObserver::new();
        let mut rx = obs.watch();
        obs.set(Position::ZERO);
        assert!(rx.has_changed().unwrap());
        assert_eq!(*rx.borrow_and_update(), Some(Position::ZERO));
    }
}
