//! Event Bus: a statically-typed event enum plus a subscriber interface, modeled on
//! `notification::{DataListener, PresenceListener}` but collapsed into a single enum/trait
//! since this system has one event stream, not a data/presence split.

mod event;

pub use event::{Event, TracingListener};

use async_trait::async_trait;
use std::fmt::Debug;
use std::sync::Arc;
use tokio::sync::broadcast;
use tracing::{debug, warn};

/// An observer of the event stream. Implementations must not block — the bus fans events
/// out over a bounded channel, and a listener that blocks only starves itself, never the
/// request path, but a slow listener dropping events is expected behavior under load.
#[async_trait]
pub trait EventListener: Sync + Send + Debug {
    async fn handle(&self, event: Arc<Event>);
}

#[async_trait]
impl<T: EventListener + ?Sized> EventListener for Arc<T> {
    async fn handle(&self, event: Arc<Event>) {
        (**self).handle(event).await
    }
}

const CHANNEL_CAPACITY: usize = 1024;

/// Fire-and-forget publisher. Cloning an [`EventBus`] shares the underlying channel.
#[derive(Clone)]
pub struct EventBus {
    sender: broadcast::Sender<Arc<Event>>,
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new()
    }
}

impl EventBus {
    pub fn new() -> Self {
        let (sender, _) = broadcast::channel(CHANNEL_CAPACITY);
        EventBus { sender }
    }

    /// Publishes `event`. Never blocks; if there are no subscribers this is a no-op.
    pub fn emit(&self, event: Event) {
        let event = Arc::new(event);
        debug!(?event, "event emitted");
        // An error here only means nobody is currently subscribed.
        let _ = self.sender.send(event);
    }

    /// Spawns a background task that feeds every event to `listener` until the bus is dropped.
    pub fn subscribe(&self, listener: Arc<dyn EventListener>) {
        let mut rx = self.sender.subscribe();
        tokio::spawn(async move {
            loop {
                match rx.recv().await {
                    Ok(event) => listener.handle(event).await,
                    Err(broadcast::error::RecvError::Lagged(skipped)) => {
                        warn!(skipped, "event listener fell behind, dropping events");
                    }
                    Err(broadcast::error::RecvError::Closed) => break,
                }
            }
        });
    }
}
