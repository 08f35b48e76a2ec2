pub mod ids;
pub mod status;
pub mod queue;
pub mod events;

pub use ids::{ClientId, QueueId, UserId};
pub use status::{ClientStatus, QueueStatus};
pub use queue::{InvariantViolation, NewQueue, Queue, QueueClient};
pub use events::QueueEvent;
