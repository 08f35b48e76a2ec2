//! # turn-queue: live first-come-first-served service queues
//!
//! Each service queue is a single document holding its status, ticket
//! counters and an ordered roster of clients. Every operation (join, call
//! next, leave, status change) is one optimistic transaction against a
//! [`DocumentStore`]: the store hands the transition a private copy, commits
//! it only if nobody else committed in between, and otherwise re-runs it.
//! Concurrent staff consoles and client devices therefore always observe a
//! dense, gap-free roster with at most one called client at its front.
//!
//! ## Quick start
//!
//! ```rust,no_run
//! use turn_queue::prelude::*;
//!
//! # async fn run() -> QueueResult<()> {
//! let engine = QueueEngine::new(MemoryStore::new());
//! let queue = engine
//!     .create_queue(NewQueue {
//!         service_id: "consultation".into(),
//!         organization_id: "clinic-7".into(),
//!         estimated_wait_time: 10,
//!     })
//!     .await?;
//!
//! engine.join(&queue.id, Admission::new("u-1", "Amina", "555-0101")).await?;
//! let outcome = engine.call_next(&queue.id).await?;
//! assert!(outcome.called.is_some());
//! # Ok(())
//! # }
//! ```

pub mod announce;
pub mod backend;
pub mod config;
pub mod engine;
pub mod error;
pub mod estimate;
pub mod observability;
pub mod transition;
pub mod types;

pub use announce::{Announcement, Announcer, ChannelAnnouncer, TracingAnnouncer};
pub use backend::{BoxStream, DocumentStore};
pub use config::{EngineConfig, StoreConfig};
pub use engine::QueueEngine;
pub use error::{QueueError, QueueResult};
pub use transition::{Admission, CallOutcome, LeaveOutcome, StatusChange};
pub use types::{
    ClientId, ClientStatus, InvariantViolation, NewQueue, Queue, QueueClient, QueueEvent, QueueId,
    QueueStatus, UserId,
};

pub use observability::{LiveMetrics, MetricsSnapshot, ObservabilityLayer};

#[cfg(feature = "memory")]
pub use backend::memory::MemoryStore;

/// Everything a staff console or client app needs
pub mod prelude {
    pub use crate::{
        Admission, Announcer, CallOutcome, ClientId, ClientStatus, DocumentStore, EngineConfig,
        LeaveOutcome, NewQueue, Queue, QueueClient, QueueEngine, QueueError, QueueEvent, QueueId,
        QueueResult, QueueStatus, StatusChange, StoreConfig, UserId,
    };

    #[cfg(feature = "memory")]
    pub use crate::MemoryStore;

    pub use async_trait::async_trait;
}
