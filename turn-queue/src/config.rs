use std::time::Duration;

use chrono::{FixedOffset, Offset, Utc};
use turn_core::TurnConfigSnapshot;

/// Behavior switches for the queue operations engine
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EngineConfig {
    /// Reject join on non-open queues, call-next on closed ones, and
    /// transitions out of `closed`
    pub enforce_status: bool,
    /// Reject a join when the user already holds an active entry
    pub reject_duplicates: bool,
    /// Maximum roster length accepted by join (`None` = unlimited)
    pub max_roster_size: Option<usize>,
    /// Recompute estimates of waiting clients on call-next and leave
    pub refresh_estimates: bool,
    /// Offset used to render `estimated_time` as a local clock time
    pub utc_offset_minutes: i32,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            enforce_status: true,
            reject_duplicates: true,
            max_roster_size: None,
            refresh_estimates: false,
            utc_offset_minutes: 0,
        }
    }
}

impl EngineConfig {
    /// No admission or status guards, snapshot estimates.
    pub fn permissive() -> Self {
        Self {
            enforce_status: false,
            reject_duplicates: false,
            ..Self::default()
        }
    }

    /// Read `queue.*` keys, falling back to defaults
    pub fn from_snapshot(snapshot: &TurnConfigSnapshot) -> Self {
        let defaults = Self::default();
        Self {
            enforce_status: snapshot
                .get_bool("queue.enforce_status")
                .unwrap_or(defaults.enforce_status),
            reject_duplicates: snapshot
                .get_bool("queue.reject_duplicates")
                .unwrap_or(defaults.reject_duplicates),
            max_roster_size: snapshot
                .get_usize("queue.max_roster_size")
                .or(defaults.max_roster_size),
            refresh_estimates: snapshot
                .get_bool("queue.refresh_estimates")
                .unwrap_or(defaults.refresh_estimates),
            utc_offset_minutes: snapshot
                .get_i64("queue.utc_offset_minutes")
                .and_then(|m| i32::try_from(m).ok())
                .unwrap_or(defaults.utc_offset_minutes),
        }
    }

    /// Display offset; out-of-range values fall back to UTC
    pub fn utc_offset(&self) -> FixedOffset {
        self.utc_offset_minutes
            .checked_mul(60)
            .and_then(FixedOffset::east_opt)
            .unwrap_or_else(|| Utc.fix())
    }
}

/// Conflict-retry policy for optimistic transactions
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoreConfig {
    /// Attempts before surfacing `TransactionConflict`
    pub max_retries: u32,
    /// First backoff step
    pub retry_base: Duration,
    /// Backoff ceiling
    pub retry_max: Duration,
    /// Capacity of the event broadcast channel
    pub event_capacity: usize,
    /// Revisions buffered per live subscriber before it starts skipping
    pub live_capacity: usize,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            max_retries: 5,
            retry_base: Duration::from_millis(2),
            retry_max: Duration::from_millis(50),
            event_capacity: 1024,
            live_capacity: 256,
        }
    }
}

impl StoreConfig {
    /// Read `store.*` keys, falling back to defaults
    pub fn from_snapshot(snapshot: &TurnConfigSnapshot) -> Self {
        let defaults = Self::default();
        Self {
            max_retries: snapshot
                .get_u64("store.max_retries")
                .and_then(|n| u32::try_from(n).ok())
                .unwrap_or(defaults.max_retries)
                .max(1),
            retry_base: snapshot
                .get_u64("store.retry_base_ms")
                .map(Duration::from_millis)
                .unwrap_or(defaults.retry_base),
            retry_max: snapshot
                .get_u64("store.retry_max_ms")
                .map(Duration::from_millis)
                .unwrap_or(defaults.retry_max),
            event_capacity: snapshot
                .get_usize("store.event_capacity")
                .filter(|n| *n > 0)
                .unwrap_or(defaults.event_capacity),
            live_capacity: snapshot
                .get_usize("store.live_capacity")
                .filter(|n| *n > 0)
                .unwrap_or(defaults.live_capacity),
        }
    }

    /// Exponential backoff before retry number `attempt` (1-based), capped
    pub fn backoff(&self, attempt: u32) -> Duration {
        let factor = 2u32.saturating_pow(attempt.saturating_sub(1));
        std::cmp::min(self.retry_base.saturating_mul(factor), self.retry_max)
    }
}
