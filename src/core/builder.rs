use std::sync::Arc;

use tokio::sync::broadcast::error::RecvError;
use tracing::warn;

use crate::{
    content::{LoaderRef, ObserverRef},
    core::StreamerConfig,
    error::SetupError,
    events::Bus,
    subscribers::{Subscribe, SubscriberSet},
    world::{Location, LocationRegistry},
};
use super::{executor::TransitionExecutor, scheduler::Streamer, table::ResidencyTable};

/// Builder for constructing a [`Streamer`] with its collaborators.
pub struct StreamerBuilder {
    cfg: StreamerConfig,
    locations: Vec<Location>,
    observer: Option<ObserverRef>,
    loader: Option<LoaderRef>,
    subscribers: Vec<Arc<dyn Subscribe>>,
}

impl StreamerBuilder {
    /// Creates a new builder with the given configuration.
    pub fn new(cfg: StreamerConfig) -> Self {
        Self {
            cfg,
            locations: Vec::new(),
            observer: None,
            loader: None,
            subscribers: Vec::new(),
        }
    }

    /// Registers one location. Registration order is snapshot order.
    pub fn with_location(mut self, location: Location) -> Self {
        self.locations.push(location);
        self
    }

    /// Registers several locations, in iteration order.
    pub fn with_locations(mut self, locations: impl IntoIterator<Item = Location>) -> Self {
        self.locations.extend(locations);
        self
    }

    /// Sets the source of the observer position (required).
    pub fn with_observer(mut self, observer: ObserverRef) -> Self {
        self.observer = Some(observer);
        self
    }

    /// Sets the content loader (required).
    pub fn with_loader(mut self, loader: LoaderRef) -> Self {
        self.loader = Some(loader);
        self
    }

    /// Sets event subscribers for observability.
    ///
    /// Subscribers receive every streamer event through dedicated workers
    /// with bounded queues.
    pub fn with_subscribers(mut self, subscribers: Vec<Arc<dyn Subscribe>>) -> Self {
        self.subscribers = subscribers;
        self
    }

    /// Validates everything and builds the streamer (not started).
    ///
    /// Must be called within a tokio runtime when subscribers are set.
    ///
    /// # Errors
    /// - [`SetupError::InvalidConfiguration`] from [`StreamerConfig::validate`]
    /// - [`SetupError::DuplicateId`] when two locations share an id
    /// - [`SetupError::MissingCollaborator`] without observer or loader
    pub fn build(self) -> Result<Arc<Streamer>, SetupError> {
        self.cfg.validate()?;
        let registry = Arc::new(LocationRegistry::from_locations(self.locations)?);
        let observer = self
            .observer
            .ok_or(SetupError::MissingCollaborator { what: "observer" })?;
        let loader = self
            .loader
            .ok_or(SetupError::MissingCollaborator { what: "loader" })?;

        let bus = Bus::new(self.cfg.bus_capacity_clamped());
        if !self.subscribers.is_empty() {
            subscriber_listener(&bus, SubscriberSet::new(self.subscribers));
        }

        let table = Arc::new(ResidencyTable::new(registry.len()));
        let executor = TransitionExecutor::new(
            Arc::clone(&registry),
            Arc::clone(&table),
            loader,
            bus.clone(),
        );

        Ok(Arc::new(Streamer::new_internal(
            self.cfg, registry, table, executor, observer, bus,
        )))
    }
}

/// Forwards bus events to the subscriber set until every publisher is gone.
fn subscriber_listener(bus: &Bus, set: SubscriberSet) {
    let mut rx = bus.subscribe();
    tokio::spawn(async move {
        loop {
            match rx.recv().await {
                Ok(ev) => set.emit(&ev),
                Err(RecvError::Lagged(skipped)) => {
                    warn!(skipped, "subscriber listener lagged, events dropped");
                }
                Err(RecvError::Closed) => break,
            }
        }
        set.shutdown().await;
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::content::{ContentHandle, ContentLoader, ObserverFn, TrackedObserver};
    use crate::error::ContentError;
    use crate::events::{Event, EventKind};
    use crate::world::{ContentDescriptor, LocationId, Position};
    use async_trait::async_trait;
    use std::time::Duration;
    use tokio::sync::mpsc;

    struct Immediate;

    #[async_trait]
    impl ContentLoader for Immediate {
        async fn load(&self, _content: &ContentDescriptor) -> Result<ContentHandle, ContentError> {
            Ok(ContentHandle::new(1))
        }

        async fn unload(&self, _handle: &ContentHandle) -> Result<(), ContentError> {
            Ok(())
        }
    }

    struct Forward(mpsc::UnboundedSender<EventKind>);

    #[async_trait]
    impl Subscribe for Forward {
        async fn on_event(&self, ev: &Event) {
            let _ = self.0.send(ev.kind);
        }
    }

    fn site(id: &str) -> Location {
        Location::new(id, Position::ZERO, ContentDescriptor::new(id))
    }

    fn base() -> StreamerBuilder {
        Streamer::builder(StreamerConfig::default())
            .with_observer(TrackedObserver::arc())
            .with_loader(Arc::new(Immediate))
    }

    #[test]
    fn missing_collaborators_are_reported() {
        let err = Streamer::builder(StreamerConfig::default())
            .with_loader(Arc::new(Immediate))
            .build()
            .err();
        assert_eq!(err, Some(SetupError::MissingCollaborator { what: "observer" }));

        let err = Streamer::builder(StreamerConfig::default())
            .with_observer(ObserverFn::arc("fixed", || Some(Position::ZERO)))
            .build()
            .err();
        assert_eq!(err, Some(SetupError::MissingCollaborator { what: "loader" }));
    }

    #[test]
    fn duplicate_ids_fail_the_build() {
        let err = base()
            .with_locations([site("a"), site("b"), site("a")])
            .build()
            .err();
        assert_eq!(
            err,
            Some(SetupError::DuplicateId {
                id: LocationId::from("a")
            })
        );
    }

    #[test]
    fn inverted_thresholds_fail_the_build() {
        let cfg = StreamerConfig {
            load_distance: 300.0,
            unload_distance: 200.0,
            ..StreamerConfig::default()
        };
        let err = Streamer::builder(cfg)
            .with_observer(TrackedObserver::arc())
            .with_loader(Arc::new(Immediate))
            .build()
            .err();
        assert!(matches!(err, Some(SetupError::InvalidConfiguration { .. })));
    }

    #[test]
    fn locations_keep_registration_order() {
        let streamer = base()
            .with_location(site("c"))
            .with_locations([site("a"), site("b")])
            .build()
            .unwrap();
        let ids: Vec<&str> = streamer
            .registry()
            .all()
            .iter()
            .map(|l| l.id().as_str())
            .collect();
        assert_eq!(ids, ["c", "a", "b"]);
        assert_eq!(streamer.snapshot().locations.len(), 3);
    }

    #[tokio::test]
    async fn subscribers_receive_streamer_events() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let observer = TrackedObserver::arc();
        observer.set(Position::ZERO);

        let streamer = Streamer::builder(StreamerConfig::default())
            .with_location(site("here"))
            .with_observer(observer)
            .with_loader(Arc::new(Immediate))
            .with_subscribers(vec![Arc::new(Forward(tx))])
            .build()
            .unwrap();

        streamer.tick().unwrap();

        let mut seen = Vec::new();
        while seen.len() < 3 {
            let kind = tokio::time::timeout(Duration::from_secs(1), rx.recv())
                .await
                .unwrap()
                .unwrap();
            seen.push(kind);
        }
        assert!(seen.contains(&EventKind::LoadStarted));
        assert!(seen.contains(&EventKind::TickCompleted));
        assert!(seen.contains(&EventKind::LoadCompleted));
    }
}
