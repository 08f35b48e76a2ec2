//! Linear wait-time estimation.
//!
//! Every client ahead of you, plus your own slot, adds one
//! `estimated_wait_time` unit. The elapsed service time of the called
//! client is not taken into account.

use chrono::{DateTime, Duration, FixedOffset, Utc};

use crate::{types::Queue, QueueError, QueueResult};

/// Instant at which the client at `position` is expected to be served.
///
/// Fails with `InvalidInput` when the projection leaves chrono's range.
pub fn estimate_at(now: DateTime<Utc>, position: u32, wait_minutes: u32) -> QueueResult<DateTime<Utc>> {
    i64::from(position)
        .checked_mul(i64::from(wait_minutes))
        .and_then(Duration::try_minutes)
        .and_then(|offset| now.checked_add_signed(offset))
        .ok_or_else(|| {
            QueueError::InvalidInput(format!(
                "estimated wait of {wait_minutes} minutes at position {position} is out of range"
            ))
        })
}

/// Render an instant as a local `HH:MM` clock time
pub fn render_clock(at: DateTime<Utc>, offset: FixedOffset) -> String {
    at.with_timezone(&offset).format("%H:%M").to_string()
}

/// Recompute the estimate of every waiting entry from its current position
pub(crate) fn refresh_waiting(queue: &mut Queue, now: DateTime<Utc>, offset: FixedOffset) -> QueueResult<()> {
    let wait = queue.estimated_wait_time;
    for client in queue.roster.iter_mut().filter(|c| c.is_waiting()) {
        client.estimated_at = estimate_at(now, client.position, wait)?;
        client.estimated_time = render_clock(client.estimated_at, offset);
    }
    Ok(())
}
