use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};

use tokio::sync::mpsc::{self, error::TrySendError};
use tracing::{debug, trace};

use domain::FleetEvent;
use domain::fleet::FleetAggregate;
use domain::gateway::DeviceStatus;

pub const DEFAULT_QUEUE_CAPACITY: usize = 16;

struct HubState {
    latest: Arc<FleetAggregate>,
    subscribers: HashMap<u64, mpsc::Sender<FleetEvent>>,
    next_id: u64,
    dropped: u64,
}

impl HubState {
    /// Enqueue without waiting. A full queue loses this event for that
    /// subscriber only; a closed queue removes the subscriber.
    fn fan_out(&mut self, event: FleetEvent) {
        let mut dropped = 0;
        self.subscribers.retain(|id, tx| match tx.try_send(event.clone()) {
            Ok(()) => true,
            Err(TrySendError::Full(_)) => {
                trace!(
                    subscriber = id,
                    event = event.event_type(),
                    "Subscriber queue full, dropping event"
                );
                dropped += 1;
                true
            }
            Err(TrySendError::Closed(_)) => {
                debug!(subscriber = id, "Subscriber gone, removing");
                false
            }
        });
        self.dropped += dropped;
    }
}

fn lock(state: &Mutex<HubState>) -> MutexGuard<'_, HubState> {
    state.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Fan-out of fleet updates to any number of subscribers.
///
/// Publishing never blocks on a subscriber: each one owns a small bounded
/// queue and misses updates while that queue is full.
pub struct StreamHub {
    state: Arc<Mutex<HubState>>,
    capacity: usize,
}

/// Keeps a subscription alive. Dropping it unsubscribes.
#[derive(Debug)]
pub struct SubscriptionHandle {
    id: u64,
    state: Weak<Mutex<HubState>>,
}

impl SubscriptionHandle {
    pub fn id(&self) -> u64 {
        self.id
    }
}

impl Drop for SubscriptionHandle {
    fn drop(&mut self) {
        if let Some(state) = self.state.upgrade() {
            lock(&state).subscribers.remove(&self.id);
        }
    }
}

impl std::fmt::Debug for HubState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HubState")
            .field("subscribers", &self.subscribers.len())
            .field("dropped", &self.dropped)
            .finish()
    }
}

impl StreamHub {
    pub fn new(capacity: usize, initial: FleetAggregate) -> Self {
        Self {
            state: Arc::new(Mutex::new(HubState {
                latest: Arc::new(initial),
                subscribers: HashMap::new(),
                next_id: 0,
                dropped: 0,
            })),
            capacity: capacity.max(1),
        }
    }

    /// Register a subscriber. The current aggregate is already queued on the
    /// returned receiver.
    pub fn subscribe(&self) -> (SubscriptionHandle, mpsc::Receiver<FleetEvent>) {
        let (tx, rx) = mpsc::channel(self.capacity);
        let mut state = lock(&self.state);

        let id = state.next_id;
        state.next_id += 1;
        // Fresh queue with capacity >= 1, cannot be full.
        let _ = tx.try_send(FleetEvent::AggregateUpdated(state.latest.clone()));
        state.subscribers.insert(id, tx);
        debug!(subscriber = id, total = state.subscribers.len(), "Subscriber added");

        let handle = SubscriptionHandle {
            id,
            state: Arc::downgrade(&self.state),
        };
        (handle, rx)
    }

    /// Remove a subscriber. Safe to call more than once and concurrently with a push.
    pub fn unsubscribe(&self, handle: &SubscriptionHandle) {
        if lock(&self.state).subscribers.remove(&handle.id).is_some() {
            debug!(subscriber = handle.id, "Subscriber removed");
        }
    }

    /// Push a committed gateway status followed by the aggregate it produced.
    ///
    /// The aggregate is computed while the hub is locked so that concurrent
    /// commits reach subscribers in the order they were computed.
    pub fn publish_commit(
        &self,
        status: Arc<DeviceStatus>,
        aggregate: impl FnOnce() -> FleetAggregate,
    ) {
        let mut state = lock(&self.state);
        let aggregate = Arc::new(aggregate());
        state.latest = aggregate.clone();
        state.fan_out(FleetEvent::GatewayUpdated(status));
        state.fan_out(FleetEvent::AggregateUpdated(aggregate));
    }

    pub fn publish_aggregate(&self, aggregate: FleetAggregate) {
        let mut state = lock(&self.state);
        let aggregate = Arc::new(aggregate);
        state.latest = aggregate.clone();
        state.fan_out(FleetEvent::AggregateUpdated(aggregate));
    }

    /// Aggregate most recently pushed (or the initial one)
    pub fn latest(&self) -> Arc<FleetAggregate> {
        lock(&self.state).latest.clone()
    }

    pub fn subscriber_count(&self) -> usize {
        lock(&self.state).subscribers.len()
    }

    /// Events lost to full subscriber queues since startup
    pub fn dropped_count(&self) -> u64 {
        lock(&self.state).dropped
    }
}

impl std::fmt::Debug for StreamHub {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StreamHub")
            .field("state", &*lock(&self.state))
            .field("capacity", &self.capacity)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn aggregate_with(num_devices: usize) -> FleetAggregate {
        FleetAggregate {
            num_devices,
            ..FleetAggregate::empty()
        }
    }

    #[tokio::test]
    async fn test_subscribe_gets_current_aggregate() {
        let hub = StreamHub::new(4, FleetAggregate::empty());
        let (_handle, mut rx) = hub.subscribe();

        let event = rx.recv().await.unwrap();
        let aggregate = event.as_aggregate().unwrap();
        assert_eq!(aggregate.num_devices, 0);
        assert_eq!(aggregate.num_online, 0);
        assert_eq!(aggregate.total_site_power, 0.0);
    }

    #[tokio::test]
    async fn test_late_subscriber_sees_latest() {
        let hub = StreamHub::new(4, FleetAggregate::empty());
        hub.publish_aggregate(aggregate_with(3));

        let (_handle, mut rx) = hub.subscribe();
        let event = rx.recv().await.unwrap();
        assert_eq!(event.as_aggregate().unwrap().num_devices, 3);
    }

    #[test]
    fn test_full_queue_drops_newest_without_blocking() {
        let hub = StreamHub::new(2, FleetAggregate::empty());
        let (_slow, mut slow_rx) = hub.subscribe();
        let (_fast, mut fast_rx) = hub.subscribe();

        // Initial message occupies one slot of each queue.
        assert!(fast_rx.try_recv().is_ok());

        hub.publish_aggregate(aggregate_with(1));
        hub.publish_aggregate(aggregate_with(2));

        // slow: [initial, 1]; 2 was dropped
        assert_eq!(slow_rx.try_recv().unwrap().as_aggregate().unwrap().num_devices, 0);
        assert_eq!(slow_rx.try_recv().unwrap().as_aggregate().unwrap().num_devices, 1);
        assert!(slow_rx.try_recv().is_err());

        // fast drained earlier and received both
        assert_eq!(fast_rx.try_recv().unwrap().as_aggregate().unwrap().num_devices, 1);
        assert_eq!(fast_rx.try_recv().unwrap().as_aggregate().unwrap().num_devices, 2);

        assert_eq!(hub.dropped_count(), 1);
        assert_eq!(hub.subscriber_count(), 2);
    }

    #[test]
    fn test_unsubscribe_and_drop() {
        let hub = StreamHub::new(4, FleetAggregate::empty());
        let (first, _rx1) = hub.subscribe();
        let (second, _rx2) = hub.subscribe();
        assert_eq!(hub.subscriber_count(), 2);

        hub.unsubscribe(&first);
        hub.unsubscribe(&first);
        assert_eq!(hub.subscriber_count(), 1);

        drop(second);
        assert_eq!(hub.subscriber_count(), 0);
        drop(first);
    }

    #[test]
    fn test_closed_receiver_is_pruned_on_publish() {
        let hub = StreamHub::new(4, FleetAggregate::empty());
        let (_handle, rx) = hub.subscribe();
        drop(rx);

        hub.publish_aggregate(aggregate_with(1));
        assert_eq!(hub.subscriber_count(), 0);
    }

    #[test]
    fn test_handle_outliving_hub() {
        let hub = StreamHub::new(4, FleetAggregate::empty());
        let (handle, _rx) = hub.subscribe();
        drop(hub);
        drop(handle);
    }
}
