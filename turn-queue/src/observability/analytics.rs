use std::sync::Arc;
use tokio::sync::broadcast;
use tracing::debug;

use crate::QueueEvent;

/// Event fan-out plus live counters for committed transitions
#[derive(Clone)]
pub struct ObservabilityLayer {
    event_broadcaster: broadcast::Sender<QueueEvent>,
    metrics: Arc<super::LiveMetrics>,
}

impl ObservabilityLayer {
    pub fn new() -> Self {
        Self::with_capacity(1024)
    }

    pub fn with_capacity(capacity: usize) -> Self {
        let (event_broadcaster, _) = broadcast::channel(capacity.max(1));

        Self {
            event_broadcaster,
            metrics: Arc::new(super::LiveMetrics::new()),
        }
    }

    /// Publish a committed transition to every subscriber
    pub fn record(&self, event: QueueEvent) {
        match &event {
            QueueEvent::Joined { .. } => self.metrics.increment_joins(),
            QueueEvent::Called { .. } => self.metrics.increment_calls(),
            QueueEvent::Served { .. } => self.metrics.add_served(1),
            QueueEvent::Left { credited, .. } => self.metrics.increment_left(*credited),
            QueueEvent::Created { .. } | QueueEvent::StatusChanged { .. } => {}
        }

        debug!(event = event.event_name(), queue_id = %event.queue_id(), "recorded");
        // No subscribers is not an error
        let _ = self.event_broadcaster.send(event);
    }

    /// Subscribe to events committed from now on
    pub fn event_stream(&self) -> broadcast::Receiver<QueueEvent> {
        self.event_broadcaster.subscribe()
    }

    /// Get live metrics
    pub fn metrics(&self) -> &super::LiveMetrics {
        &self.metrics
    }
}

impl Default for ObservabilityLayer {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{ClientId, QueueId, UserId};
    use chrono::Utc;

    #[tokio::test]
    async fn test_record_fans_out_and_counts() {
        let layer = ObservabilityLayer::new();
        let mut events = layer.event_stream();

        layer.record(QueueEvent::Left {
            queue_id: QueueId::from("q1"),
            client_id: ClientId::from("c1"),
            user_id: UserId::from("u1"),
            credited: true,
            at: Utc::now(),
        });

        let event = events.recv().await.unwrap();
        assert_eq!(event.event_name(), "left");
        assert_eq!(layer.metrics().credited_leaves(), 1);
        assert_eq!(layer.metrics().served(), 1);
    }
}
