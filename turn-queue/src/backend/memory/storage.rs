use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::RwLock;
use rand::Rng;
use tokio::sync::broadcast;
use tokio_stream::{
    wrappers::{errors::BroadcastStreamRecvError, BroadcastStream},
    StreamExt,
};
use tracing::{debug, warn};

use crate::{
    backend::{BoxStream, DocumentStore},
    config::StoreConfig,
    types::{Queue, QueueId},
    QueueError, QueueResult,
};

/// One stored document plus the channel feeding its live subscribers
struct Slot {
    doc: Queue,
    live: broadcast::Sender<Queue>,
}

/// In-memory transactional store for tests, demos and single-process use.
///
/// Reads clone the document under a short read lock; transaction bodies run
/// without any lock held, and the commit re-checks the document version under
/// the write lock. Two racing writers therefore never both commit against
/// the same revision.
#[derive(Clone)]
pub struct MemoryStore {
    docs: Arc<RwLock<HashMap<QueueId, Slot>>>,
    config: StoreConfig,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::with_config(StoreConfig::default())
    }

    pub fn with_config(config: StoreConfig) -> Self {
        Self {
            docs: Arc::new(RwLock::new(HashMap::new())),
            config,
        }
    }

    pub fn config(&self) -> &StoreConfig {
        &self.config
    }

    /// Number of stored documents
    pub fn len(&self) -> usize {
        self.docs.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.docs.read().is_empty()
    }

    /// Bump the revision of a document as if another writer had committed.
    ///
    /// Test support: lets a transaction body provoke a conflict on itself.
    pub fn simulate_foreign_write(&self, id: &QueueId) -> QueueResult<()> {
        let mut docs = self.docs.write();
        let slot = docs
            .get_mut(id)
            .ok_or_else(|| QueueError::QueueNotFound(id.clone()))?;
        slot.doc.version += 1;
        // No subscribers is not an error
        let _ = slot.live.send(slot.doc.clone());
        Ok(())
    }

    /// Conditional write: succeeds only if the stored revision is `expected`
    fn commit(&self, id: &QueueId, expected: u64, mut next: Queue) -> QueueResult<bool> {
        let mut docs = self.docs.write();
        let slot = docs
            .get_mut(id)
            .ok_or_else(|| QueueError::QueueNotFound(id.clone()))?;

        if slot.doc.version != expected {
            return Ok(false);
        }

        next.version = expected + 1;
        slot.doc = next.clone();
        let _ = slot.live.send(next);
        Ok(true)
    }

    fn retry_delay(&self, attempt: u32) -> Duration {
        let jitter_cap = self.config.retry_base.as_millis() as u64;
        let jitter = rand::thread_rng().gen_range(0..=jitter_cap);
        self.config.backoff(attempt) + Duration::from_millis(jitter)
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl DocumentStore for MemoryStore {
    async fn get(&self, id: &QueueId) -> QueueResult<Queue> {
        let docs = self.docs.read();
        docs.get(id)
            .map(|slot| slot.doc.clone())
            .ok_or_else(|| QueueError::QueueNotFound(id.clone()))
    }

    async fn insert(&self, queue: Queue) -> QueueResult<()> {
        queue.check_invariants()?;

        let mut docs = self.docs.write();
        if docs.contains_key(&queue.id) {
            return Err(QueueError::QueueExists(queue.id));
        }

        let (live, _) = broadcast::channel(self.config.live_capacity.max(1));
        docs.insert(queue.id.clone(), Slot { doc: queue, live });
        Ok(())
    }

    async fn list(&self, organization_id: Option<&str>) -> QueueResult<Vec<Queue>> {
        let docs = self.docs.read();
        let mut queues: Vec<Queue> = docs
            .values()
            .filter(|slot| organization_id.map_or(true, |org| slot.doc.organization_id == org))
            .map(|slot| slot.doc.clone())
            .collect();
        queues.sort_by(|a, b| a.created_at.cmp(&b.created_at).then_with(|| a.id.cmp(&b.id)));
        Ok(queues)
    }

    async fn transact<T, F>(&self, id: &QueueId, mut body: F) -> QueueResult<T>
    where
        T: Send,
        F: FnMut(&mut Queue) -> QueueResult<T> + Send,
    {
        let attempts = self.config.max_retries.max(1);

        for attempt in 1..=attempts {
            let current = self.get(id).await?;
            let mut working = current.clone();

            let output = body(&mut working)?;

            if working.id != current.id {
                return Err(QueueError::Internal(format!(
                    "transaction body rewrote document id {} to {}",
                    current.id, working.id
                )));
            }

            if working.same_state(&current) {
                return Ok(output);
            }

            working.check_invariants()?;

            if self.commit(id, current.version, working)? {
                debug!(queue_id = %id, version = current.version + 1, attempt, "committed");
                return Ok(output);
            }

            debug!(queue_id = %id, attempt, "write conflict, retrying from a fresh read");
            if attempt < attempts {
                tokio::time::sleep(self.retry_delay(attempt)).await;
            }
        }

        warn!(queue_id = %id, attempts, "transaction retries exhausted");
        Err(QueueError::TransactionConflict {
            queue_id: id.clone(),
            attempts,
        })
    }

    async fn subscribe_live(&self, id: &QueueId) -> QueueResult<BoxStream<Queue>> {
        // Snapshot and subscription are taken under one lock so no commit
        // falls between them
        let (current, receiver) = {
            let docs = self.docs.read();
            let slot = docs
                .get(id)
                .ok_or_else(|| QueueError::QueueNotFound(id.clone()))?;
            (slot.doc.clone(), slot.live.subscribe())
        };

        let queue_id = id.clone();
        let revisions = BroadcastStream::new(receiver).filter_map(move |revision| match revision {
            Ok(queue) => Some(queue),
            Err(BroadcastStreamRecvError::Lagged(skipped)) => {
                warn!(queue_id = %queue_id, skipped, "live subscriber lagged, revisions skipped");
                None
            }
        });

        Ok(Box::pin(tokio_stream::once(current).chain(revisions)))
    }
}
