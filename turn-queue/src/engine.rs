use std::sync::Arc;

use chrono::Utc;
use tokio::sync::broadcast;
use tracing::{debug, info, instrument, warn};
use turn_core::TurnConfigSnapshot;

use crate::{
    announce::{Announcement, Announcer, TracingAnnouncer},
    backend::{BoxStream, DocumentStore},
    config::{EngineConfig, StoreConfig},
    observability::{LiveMetrics, ObservabilityLayer},
    transition::{self, Admission, CallOutcome, LeaveOutcome, StatusChange},
    types::{ClientId, NewQueue, Queue, QueueEvent, QueueId, QueueStatus, UserId},
    QueueError, QueueResult,
};

/// Queue operations engine.
///
/// Holds no queue state of its own: every operation is one transaction on
/// the store, so any number of engines (one per staff console, say) can
/// share a store and stay consistent.
pub struct QueueEngine<S: DocumentStore> {
    store: Arc<S>,
    config: EngineConfig,
    announcer: Arc<dyn Announcer>,
    observability: Arc<ObservabilityLayer>,
}

impl<S: DocumentStore> QueueEngine<S> {
    /// Create an engine with default guards and a log announcer
    pub fn new(store: S) -> Self {
        Self::with_config(store, EngineConfig::default())
    }

    pub fn with_config(store: S, config: EngineConfig) -> Self {
        Self {
            store: Arc::new(store),
            config,
            announcer: Arc::new(TracingAnnouncer),
            observability: Arc::new(ObservabilityLayer::new()),
        }
    }

    /// Create an engine configured from `queue.*` keys; the event channel
    /// is sized by `store.event_capacity`
    pub fn from_snapshot(store: S, snapshot: &TurnConfigSnapshot) -> Self {
        let capacity = StoreConfig::from_snapshot(snapshot).event_capacity;
        Self::with_config(store, EngineConfig::from_snapshot(snapshot))
            .with_observability(ObservabilityLayer::with_capacity(capacity))
    }

    pub fn with_announcer<A: Announcer + 'static>(mut self, announcer: A) -> Self {
        self.announcer = Arc::new(announcer);
        self
    }

    pub fn with_observability(mut self, observability: ObservabilityLayer) -> Self {
        self.observability = Arc::new(observability);
        self
    }

    /// Create an open queue with an empty roster
    #[instrument(skip(self, new), fields(organization_id = %new.organization_id, service_id = %new.service_id))]
    pub async fn create_queue(&self, new: NewQueue) -> QueueResult<Queue> {
        let now = Utc::now();
        let queue = Queue::new(QueueId::new(), new, now);
        self.store.insert(queue.clone()).await?;

        self.observability.record(QueueEvent::Created {
            queue_id: queue.id.clone(),
            organization_id: queue.organization_id.clone(),
            at: now,
        });
        info!(queue_id = %queue.id, "queue created");
        Ok(queue)
    }

    pub async fn get_queue(&self, queue_id: &QueueId) -> QueueResult<Queue> {
        self.store.get(queue_id).await
    }

    /// All queues, or those of one organization
    pub async fn list_queues(&self, organization_id: Option<&str>) -> QueueResult<Vec<Queue>> {
        self.store.list(organization_id).await
    }

    /// Current position of a user's first active entry
    pub async fn position_of(&self, queue_id: &QueueId, user_id: &UserId) -> QueueResult<Option<u32>> {
        Ok(self.store.get(queue_id).await?.position_of(user_id))
    }

    /// Admit a client at the back of the roster
    #[instrument(skip(self, admission), fields(queue_id = %queue_id, user_id = %admission.user_id))]
    pub async fn join(&self, queue_id: &QueueId, admission: Admission) -> QueueResult<ClientId> {
        let client_id = ClientId::new();
        let config = &self.config;

        let client = self
            .store
            .transact(queue_id, |queue| {
                transition::join(queue, &admission, client_id.clone(), Utc::now(), config)
            })
            .await
            .inspect_err(|err| self.observe_failure(err, true))?;

        self.observability.record(QueueEvent::Joined {
            queue_id: queue_id.clone(),
            client_id: client.id.clone(),
            user_id: client.user_id.clone(),
            position: client.position,
            at: client.joined_at,
        });
        info!(client_id = %client.id, position = client.position, estimated_time = %client.estimated_time, "client joined");
        Ok(client.id)
    }

    /// Serve the called client (if any) and call the next one
    #[instrument(skip(self), fields(queue_id = %queue_id))]
    pub async fn call_next(&self, queue_id: &QueueId) -> QueueResult<CallOutcome> {
        let config = &self.config;

        let outcome = self
            .store
            .transact(queue_id, |queue| transition::call_next(queue, Utc::now(), config))
            .await
            .inspect_err(|err| self.observe_failure(err, false))?;

        if outcome.is_noop() {
            debug!("roster empty, nothing to call");
            return Ok(outcome);
        }

        let first_ticket = outcome.current_number - outcome.served.len() as u64;
        for (offset, served) in outcome.served.iter().enumerate() {
            self.observability.record(QueueEvent::Served {
                queue_id: queue_id.clone(),
                client_id: served.id.clone(),
                ticket: first_ticket + offset as u64 + 1,
                at: served.served_at.unwrap_or_else(Utc::now),
            });
        }

        if let Some(called) = &outcome.called {
            self.observability.record(QueueEvent::Called {
                queue_id: queue_id.clone(),
                client_id: called.id.clone(),
                at: called.called_at.unwrap_or_else(Utc::now),
            });
            info!(client_id = %called.id, served = outcome.served.len(), "client called");
            self.announce(queue_id, called).await;
        } else {
            info!(served = outcome.served.len(), "roster drained");
        }

        Ok(outcome)
    }

    /// Remove a user's first entry; unknown users are a no-op
    #[instrument(skip(self), fields(queue_id = %queue_id, user_id = %user_id))]
    pub async fn leave(&self, queue_id: &QueueId, user_id: &UserId) -> QueueResult<LeaveOutcome> {
        let config = &self.config;

        let outcome = self
            .store
            .transact(queue_id, |queue| transition::leave(queue, user_id, Utc::now(), config))
            .await
            .inspect_err(|err| self.observe_failure(err, false))?;

        match &outcome.removed {
            Some(removed) => {
                let credited = outcome.credited();
                self.observability.record(QueueEvent::Left {
                    queue_id: queue_id.clone(),
                    client_id: removed.id.clone(),
                    user_id: removed.user_id.clone(),
                    credited,
                    at: outcome.left_at.unwrap_or_else(Utc::now),
                });
                info!(client_id = %removed.id, credited, "client left");
            }
            None => debug!("user not in roster"),
        }

        Ok(outcome)
    }

    /// Set the queue status; setting the current status commits nothing
    #[instrument(skip(self), fields(queue_id = %queue_id, status = %status))]
    pub async fn set_status(&self, queue_id: &QueueId, status: QueueStatus) -> QueueResult<StatusChange> {
        let config = &self.config;
        let change = self
            .store
            .transact(queue_id, |queue| transition::set_status(queue, status, config))
            .await
            .inspect_err(|err| self.observe_failure(err, false))?;

        self.record_status_change(queue_id, change);
        Ok(change)
    }

    pub async fn pause(&self, queue_id: &QueueId) -> QueueResult<StatusChange> {
        self.set_status(queue_id, QueueStatus::Paused).await
    }

    pub async fn resume(&self, queue_id: &QueueId) -> QueueResult<StatusChange> {
        self.set_status(queue_id, QueueStatus::Open).await
    }

    pub async fn close(&self, queue_id: &QueueId) -> QueueResult<StatusChange> {
        self.set_status(queue_id, QueueStatus::Closed).await
    }

    /// Staff console toggle: open becomes paused, anything else open
    #[instrument(skip(self), fields(queue_id = %queue_id))]
    pub async fn toggle_pause(&self, queue_id: &QueueId) -> QueueResult<StatusChange> {
        let config = &self.config;
        let change = self
            .store
            .transact(queue_id, |queue| {
                let target = if queue.status == QueueStatus::Open {
                    QueueStatus::Paused
                } else {
                    QueueStatus::Open
                };
                transition::set_status(queue, target, config)
            })
            .await
            .inspect_err(|err| self.observe_failure(err, false))?;

        self.record_status_change(queue_id, change);
        Ok(change)
    }

    /// Live view of one queue: current state, then every committed revision
    /// in order (see [`DocumentStore::subscribe_live`])
    pub async fn subscribe(&self, queue_id: &QueueId) -> QueueResult<BoxStream<Queue>> {
        self.store.subscribe_live(queue_id).await
    }

    /// Transitions committed through this engine from now on
    pub fn events(&self) -> broadcast::Receiver<QueueEvent> {
        self.observability.event_stream()
    }

    pub fn metrics(&self) -> &LiveMetrics {
        self.observability.metrics()
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    fn record_status_change(&self, queue_id: &QueueId, change: StatusChange) {
        if change.changed() {
            self.observability.record(QueueEvent::StatusChanged {
                queue_id: queue_id.clone(),
                from: change.from,
                to: change.to,
                at: Utc::now(),
            });
            info!(from = %change.from, to = %change.to, "status changed");
        }
    }

    async fn announce(&self, queue_id: &QueueId, called: &crate::QueueClient) {
        let announcement = Announcement::for_client(queue_id, called);
        if let Err(err) = self.announcer.announce(&announcement).await {
            self.observability.metrics().increment_announcements_failed();
            warn!(client_id = %called.id, error = %err, "announcement failed");
        }
    }

    fn observe_failure(&self, err: &QueueError, admission: bool) {
        let metrics = self.observability.metrics();
        match err {
            QueueError::TransactionConflict { attempts, .. } => {
                metrics.increment_conflicts();
                warn!(attempts, "transaction conflict surfaced to caller");
            }
            QueueError::AlreadyInQueue { .. }
            | QueueError::QueueFull { .. }
            | QueueError::InvalidState { .. }
            | QueueError::InvalidInput(_)
                if admission =>
            {
                metrics.increment_rejected_joins();
                debug!(error = %err, "admission rejected");
            }
            _ => debug!(error = %err, "operation failed"),
        }
    }
}

impl<S: DocumentStore> Clone for QueueEngine<S> {
    fn clone(&self) -> Self {
        Self {
            store: self.store.clone(),
            config: self.config.clone(),
            announcer: self.announcer.clone(),
            observability: self.observability.clone(),
        }
    }
}
