//! Broadcasting run events to subscribers.

use crossbeam_channel::{bounded, Sender};
use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};

use super::types::{DropReason, EventFilter, EventHandle, RunEvent, SubscriptionId};

/// Default per-subscriber buffer.
const DEFAULT_BUFFER_SIZE: usize = 1000;

struct Subscription {
    filter: EventFilter,
    sender: Sender<RunEvent>,
}

impl Subscription {
    /// Returns false if the buffer is full or the receiver is gone.
    fn try_send(&self, event: RunEvent) -> bool {
        self.sender.try_send(event).is_ok()
    }
}

/// Fan-out of run events to in-process subscribers.
pub struct EventBus {
    subscriptions: RwLock<HashMap<SubscriptionId, Subscription>>,
    next_id: AtomicU64,
    buffer_size: usize,
}

impl EventBus {
    pub fn new() -> Self {
        Self::with_buffer_size(DEFAULT_BUFFER_SIZE)
    }

    pub fn with_buffer_size(buffer_size: usize) -> Self {
        Self {
            subscriptions: RwLock::new(HashMap::new()),
            next_id: AtomicU64::new(1),
            buffer_size,
        }
    }

    pub fn subscribe(&self, filter: EventFilter) -> EventHandle {
        let id = SubscriptionId(self.next_id.fetch_add(1, Ordering::SeqCst));
        let (sender, receiver) = bounded(self.buffer_size);

        self.subscriptions
            .write()
            .insert(id, Subscription { filter, sender });

        EventHandle { id, receiver }
    }

    pub fn unsubscribe(&self, id: SubscriptionId) {
        if let Some(sub) = self.subscriptions.write().remove(&id) {
            let _ = sub.sender.try_send(RunEvent::Dropped {
                reason: DropReason::Unsubscribed,
            });
        }
    }

    pub fn subscription_count(&self) -> usize {
        self.subscriptions.read().len()
    }

    pub fn has_subscribers(&self) -> bool {
        !self.subscriptions.read().is_empty()
    }

    /// Build and send an event only if someone is listening.
    pub fn publish_with<F>(&self, make: F)
    where
        F: FnOnce() -> RunEvent,
    {
        if self.has_subscribers() {
            self.publish(make());
        }
    }

    /// Send to every matching subscriber, dropping those that can't keep up.
    pub fn publish(&self, event: RunEvent) {
        let mut to_remove = Vec::new();

        {
            let subs = self.subscriptions.read();
            for (id, sub) in subs.iter() {
                if sub.filter.matches(&event) && !sub.try_send(event.clone()) {
                    to_remove.push(*id);
                }
            }
        }

        if !to_remove.is_empty() {
            let mut subs = self.subscriptions.write();
            for id in to_remove {
                if let Some(sub) = subs.remove(&id) {
                    tracing::debug!(subscription = id.0, "dropping slow run-event subscriber");
                    // Buffer is usually still full here; best effort.
                    let _ = sub.sender.try_send(RunEvent::Dropped {
                        reason: DropReason::BufferOverflow,
                    });
                }
            }
        }
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::RunOutcome;
    use crate::types::RunId;
    use std::time::Duration;

    fn finished(id: u64) -> RunEvent {
        RunEvent::RunFinished {
            run_id: RunId(id),
            outcome: RunOutcome::Completed,
        }
    }

    #[test]
    fn test_subscribe_unsubscribe() {
        let bus = EventBus::new();

        let handle = bus.subscribe(EventFilter::all());
        assert_eq!(bus.subscription_count(), 1);

        bus.unsubscribe(handle.id);
        assert_eq!(bus.subscription_count(), 0);
        assert!(matches!(
            handle.recv_timeout(Duration::from_millis(100)).unwrap(),
            RunEvent::Dropped {
                reason: DropReason::Unsubscribed
            }
        ));
    }

    #[test]
    fn test_publish_to_matching() {
        let bus = EventBus::new();
        let lifecycle = bus.subscribe(EventFilter::lifecycle());
        let steps = bus.subscribe(EventFilter::steps(vec!["bar".to_string()]));

        bus.publish(finished(1));

        assert_eq!(lifecycle.recv_timeout(Duration::from_millis(100)).unwrap(), finished(1));
        assert!(steps.recv_timeout(Duration::from_millis(50)).is_err());
    }

    #[test]
    fn test_publish_with_is_lazy() {
        let bus = EventBus::new();
        let mut built = false;
        bus.publish_with(|| {
            built = true;
            finished(1)
        });
        assert!(!built);
    }

    #[test]
    fn test_drop_slow_subscriber() {
        let bus = EventBus::with_buffer_size(2);
        let _handle = bus.subscribe(EventFilter::all());

        for i in 0..10 {
            bus.publish(finished(i));
        }

        assert_eq!(bus.subscription_count(), 0);
    }
}
