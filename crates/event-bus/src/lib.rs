use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::{broadcast, mpsc};
use tracing::trace;

use webnav_core_types::{EventObserver, NavError, NavigatorEvent};

/// Trait implemented by payload types that can be carried on the bus.
pub trait Event: Clone + Send + Sync + std::fmt::Debug + 'static {}

impl<T> Event for T where T: Clone + Send + Sync + std::fmt::Debug + 'static {}

#[async_trait]
pub trait EventBus<E>: Send + Sync
where
    E: Event,
{
    async fn publish(&self, event: E) -> Result<(), NavError>;
    fn subscribe(&self) -> broadcast::Receiver<E>;
}

/// Broadcast bus living inside one process.
pub struct InMemoryBus<E>
where
    E: Event,
{
    sender: broadcast::Sender<E>,
}

impl<E> InMemoryBus<E>
where
    E: Event,
{
    pub fn new(capacity: usize) -> Arc<Self> {
        let (sender, _) = broadcast::channel(capacity.max(1));
        Arc::new(Self { sender })
    }

    /// Publish without awaiting; an absent audience is not an error here.
    pub fn emit(&self, event: E) {
        if self.sender.send(event).is_err() {
            trace!("event dropped: no subscribers");
        }
    }

    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

#[async_trait]
impl<E> EventBus<E> for InMemoryBus<E>
where
    E: Event,
{
    async fn publish(&self, event: E) -> Result<(), NavError> {
        self.sender
            .send(event)
            .map(|_| ())
            .map_err(|err| NavError::new(err.to_string()))
    }

    fn subscribe(&self) -> broadcast::Receiver<E> {
        self.sender.subscribe()
    }
}

/// Helper to materialise an mpsc receiver from the bus subscription
/// so callers can await events without handling broadcast semantics directly.
pub fn to_mpsc<E>(bus: Arc<InMemoryBus<E>>, capacity: usize) -> mpsc::Receiver<E>
where
    E: Event,
{
    let mut rx = bus.subscribe();
    let (tx, out_rx) = mpsc::channel(capacity.max(1));
    tokio::spawn(async move {
        loop {
            match rx.recv().await {
                Ok(ev) => {
                    if tx.send(ev).await.is_err() {
                        break;
                    }
                }
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    trace!(skipped, "subscriber lagged behind the bus");
                }
                Err(broadcast::error::RecvError::Closed) => break,
            }
        }
    });
    out_rx
}

/// [`EventObserver`] that forwards navigator progress onto a bus.
#[derive(Clone)]
pub struct BusObserver {
    bus: Arc<InMemoryBus<NavigatorEvent>>,
}

impl BusObserver {
    pub fn new(bus: Arc<InMemoryBus<NavigatorEvent>>) -> Self {
        Self { bus }
    }

    pub fn bus(&self) -> Arc<InMemoryBus<NavigatorEvent>> {
        Arc::clone(&self.bus)
    }
}

impl EventObserver for BusObserver {
    fn on_event(&self, event: &NavigatorEvent) {
        self.bus.emit(event.clone());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::time::{timeout, Duration};

    #[tokio::test]
    async fn publish_without_subscribers_is_an_error() {
        let bus = InMemoryBus::<u32>::new(4);
        assert!(bus.publish(1).await.is_err());
        bus.emit(2);
        assert_eq!(bus.subscriber_count(), 0);
    }

    #[tokio::test]
    async fn observer_forwards_to_subscribers() {
        let bus = InMemoryBus::<NavigatorEvent>::new(8);
        let mut rx = to_mpsc(Arc::clone(&bus), 8);
        let observer = BusObserver::new(Arc::clone(&bus));

        observer.on_event(&NavigatorEvent::PlanReady { steps: 3 });

        let received = timeout(Duration::from_millis(500), rx.recv())
            .await
            .expect("event in time")
            .expect("channel open");
        assert_eq!(received, NavigatorEvent::PlanReady { steps: 3 });
    }
}
