use crate::common::DOCKET_EVENT;
use crate::errors::{DocketError, DocketResult, ErrorKind};
use basu::error::BasuError;
use basu::event::Event;
use basu::{EventBus, Handle, HandlerId};
use std::marker::PhantomData;
use std::sync::Arc;

/// Publishes store events to registered listeners.
///
/// A thin wrapper over a `basu` event bus with a single event type. Stores
/// publish one event per committed change; each live subscription registers
/// one listener.
///
/// # Example
///
/// ```ignore
/// let event_bus: DocketEventBus<StoreChange, ChangeListener> = DocketEventBus::new();
/// let subscriber = event_bus.register(listener)?;
/// event_bus.publish(change)?;
/// event_bus.deregister(subscriber)?;
/// ```
#[derive(Clone)]
pub struct DocketEventBus<E, L> {
    inner: Arc<DocketEventBusInner<E, L>>,
}

impl<E, L> Default for DocketEventBus<E, L>
where
    L: Handle<E> + 'static,
    E: Send + Sync,
{
    fn default() -> Self {
        Self::new()
    }
}

impl<E, L> DocketEventBus<E, L>
where
    L: Handle<E> + 'static,
    E: Send + Sync,
{
    /// Creates a new event bus instance.
    pub fn new() -> Self {
        DocketEventBus {
            inner: Arc::new(DocketEventBusInner::new()),
        }
    }

    /// Registers an event listener with the bus.
    pub fn register(&self, listener: L) -> DocketResult<SubscriberRef> {
        self.inner.register(listener)
    }

    /// Deregisters a previously registered event listener.
    pub fn deregister(&self, subscriber: SubscriberRef) -> DocketResult<()> {
        self.inner.deregister(subscriber)
    }

    /// Publishes an event to all registered listeners.
    pub fn publish(&self, event: E) -> DocketResult<()> {
        self.inner.publish(event)
    }

    /// Closes the event bus and clears all registered listeners.
    pub fn close(&self) -> DocketResult<()> {
        self.inner.close()
    }

    /// Returns true if there are any registered listeners.
    pub fn has_listeners(&self) -> bool {
        self.inner.has_listeners()
    }
}

pub struct SubscriberRef {
    pub(crate) inner: HandlerId,
}

impl SubscriberRef {
    pub fn new(inner: HandlerId) -> Self {
        SubscriberRef { inner }
    }
}

struct DocketEventBusInner<E, L> {
    event_bus: EventBus<E>,
    phantom_data: PhantomData<L>,
}

impl<E, L> DocketEventBusInner<E, L>
where
    L: Handle<E> + 'static,
    E: Send + Sync,
{
    fn new() -> Self {
        DocketEventBusInner {
            event_bus: EventBus::new(),
            phantom_data: PhantomData,
        }
    }

    fn register(&self, listener: L) -> DocketResult<SubscriberRef> {
        self.event_bus
            .subscribe(DOCKET_EVENT, Box::new(listener))
            .map(SubscriberRef::new)
            .map_err(Self::docket_error)
    }

    fn deregister(&self, subscriber: SubscriberRef) -> DocketResult<()> {
        self.event_bus
            .unsubscribe(DOCKET_EVENT, &subscriber.inner)
            .map(|_| ())
            .map_err(Self::docket_error)
    }

    fn publish(&self, event: E) -> DocketResult<()> {
        // no listeners registered yet means no event type either
        let handler_count = match self.event_bus.get_handler_count(DOCKET_EVENT) {
            Ok(count) => count,
            Err(BasuError::EventTypeNotFOUND) => return Ok(()),
            Err(e) => return Err(Self::docket_error(e)),
        };

        if handler_count == 0 {
            return Ok(());
        }

        let basu_event = Event::new(event);
        self.event_bus
            .publish(DOCKET_EVENT, &basu_event)
            .map(|_| ())
            .map_err(Self::docket_error)
    }

    fn close(&self) -> DocketResult<()> {
        self.event_bus
            .clear()
            .map(|_| ())
            .map_err(Self::docket_error)
    }

    fn has_listeners(&self) -> bool {
        match self.event_bus.get_handler_count(DOCKET_EVENT) {
            Ok(count) => count > 0,
            Err(BasuError::EventTypeNotFOUND) => false,
            Err(e) => {
                log::warn!("Failed to check listeners: {}, defaulting to false", e);
                false
            }
        }
    }

    fn docket_error(e: BasuError) -> DocketError {
        match e {
            BasuError::EventTypeNotFOUND => DocketError::new(
                "Event bus error: the requested event type is not registered",
                ErrorKind::EventError,
            ),
            BasuError::MutexPoisoned => DocketError::new(
                "Event bus error: internal mutex poisoned",
                ErrorKind::EventError,
            ),
            BasuError::HandlerError(e) => {
                let error_message = e
                    .source()
                    .map(|s| s.to_string())
                    .unwrap_or_else(|| e.to_string());
                DocketError::new(
                    &format!("Event handler error: {}", error_message),
                    ErrorKind::EventError,
                )
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    #[derive(Clone)]
    struct CountingListener(Arc<AtomicUsize>);

    impl Handle<u32> for CountingListener {
        fn handle(&self, event: &Event<u32>) -> Result<(), BasuError> {
            self.0.fetch_add(event.data as usize, Ordering::SeqCst);
            Ok(())
        }
    }

    #[test]
    fn test_publish_without_listeners_is_noop() {
        let event_bus: DocketEventBus<u32, CountingListener> = DocketEventBus::new();
        assert!(!event_bus.has_listeners());
        assert!(event_bus.publish(1).is_ok());
    }

    #[test]
    fn test_register_publish_deregister() {
        let counter = Arc::new(AtomicUsize::new(0));
        let event_bus: DocketEventBus<u32, CountingListener> = DocketEventBus::new();
        let subscriber = event_bus.register(CountingListener(counter.clone())).unwrap();
        assert!(event_bus.has_listeners());

        event_bus.publish(2).unwrap();
        event_bus.publish(3).unwrap();
        awaitility::at_most(Duration::from_secs(1)).until(|| counter.load(Ordering::SeqCst) == 5);

        event_bus.deregister(subscriber).unwrap();
        assert!(!event_bus.has_listeners());
        event_bus.publish(10).unwrap();
        assert_eq!(counter.load(Ordering::SeqCst), 5);
    }

    #[test]
    fn test_close_clears_listeners() {
        let counter = Arc::new(AtomicUsize::new(0));
        let event_bus: DocketEventBus<u32, CountingListener> = DocketEventBus::new();
        event_bus.register(CountingListener(counter)).unwrap();
        event_bus.close().unwrap();
        assert!(!event_bus.has_listeners());
    }
}
