use std::sync::Arc;

use tokio::sync::broadcast;

use banter_types::events::GatewayEvent;

/// Fan-out hub for gateway events. Mutation handlers publish here after
/// their write commits; every connected client holds a subscription and
/// re-queries whatever the event invalidates.
#[derive(Clone)]
pub struct Dispatcher {
    inner: Arc<DispatcherInner>,
}

struct DispatcherInner {
    /// Broadcast channel for gateway events — all connected clients receive all events
    broadcast_tx: broadcast::Sender<GatewayEvent>,
}

impl Dispatcher {
    pub fn new() -> Self {
        let (broadcast_tx, _) = broadcast::channel(1024);
        Self {
            inner: Arc::new(DispatcherInner { broadcast_tx }),
        }
    }

    /// Subscribe to gateway events. Dropping the receiver deregisters the
    /// subscriber.
    pub fn subscribe(&self) -> broadcast::Receiver<GatewayEvent> {
        self.inner.broadcast_tx.subscribe()
    }

    /// Publish an event to all connected clients.
    pub fn broadcast(&self, event: GatewayEvent) {
        let _ = self.inner.broadcast_tx.send(event);
    }

    /// Number of live subscribers.
    pub fn subscriber_count(&self) -> usize {
        self.inner.broadcast_tx.receiver_count()
    }
}

impl Default for Dispatcher {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn broadcast_reaches_all_subscribers() {
        let dispatcher = Dispatcher::new();
        let mut rx1 = dispatcher.subscribe();
        let mut rx2 = dispatcher.subscribe();

        dispatcher.broadcast(GatewayEvent::PresenceUpdate { online: 7 });

        for rx in [&mut rx1, &mut rx2] {
            match rx.recv().await.unwrap() {
                GatewayEvent::PresenceUpdate { online } => assert_eq!(online, 7),
                other => panic!("unexpected event: {:?}", other),
            }
        }
    }

    #[tokio::test]
    async fn broadcast_without_subscribers_is_fine() {
        let dispatcher = Dispatcher::new();
        dispatcher.broadcast(GatewayEvent::Ready);
        assert_eq!(dispatcher.subscriber_count(), 0);
    }

    #[tokio::test]
    async fn dropping_receiver_deregisters() {
        let dispatcher = Dispatcher::new();
        let rx = dispatcher.subscribe();
        assert_eq!(dispatcher.subscriber_count(), 1);
        drop(rx);
        assert_eq!(dispatcher.subscriber_count(), 0);
    }
}
