#[cfg(feature = "memory")]
pub mod memory;

use async_trait::async_trait;
use futures_core::Stream;
use std::pin::Pin;

use crate::{
    types::{Queue, QueueId},
    QueueResult,
};

/// Type alias for boxed streams (stable Rust compatible)
pub type BoxStream<T> = Pin<Box<dyn Stream<Item = T> + Send + 'static>>;

/// Transactional document store holding queue aggregates.
///
/// The engine owns no state of its own; every coordination between
/// concurrent callers happens through [`transact`](DocumentStore::transact).
#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Read the current committed document
    async fn get(&self, id: &QueueId) -> QueueResult<Queue>;

    /// Store a new document; fails with `QueueExists` on id collision
    async fn insert(&self, queue: Queue) -> QueueResult<()>;

    /// All documents, optionally restricted to one organization
    async fn list(&self, organization_id: Option<&str>) -> QueueResult<Vec<Queue>>;

    /// Optimistic read-modify-write.
    ///
    /// `body` receives a private copy of the current document. `Ok` commits
    /// the copy if nobody else committed in between, otherwise the store
    /// re-reads and runs `body` again, up to its retry limit, after which
    /// `TransactionConflict` is returned. `Err` aborts without writing. A
    /// body that leaves the document unchanged commits nothing.
    async fn transact<T, F>(&self, id: &QueueId, body: F) -> QueueResult<T>
    where
        T: Send,
        F: FnMut(&mut Queue) -> QueueResult<T> + Send;

    /// The current revision of one document, then every later committed
    /// revision in commit order. A subscriber that falls more than the
    /// store's buffer behind skips the oldest pending revisions.
    async fn subscribe_live(&self, id: &QueueId) -> QueueResult<BoxStream<Queue>>;
}
