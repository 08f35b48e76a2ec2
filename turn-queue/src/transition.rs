//! Deterministic state transitions over the queue aggregate.
//!
//! Each function is the body of one transaction: it takes the freshly read
//! aggregate, the transaction timestamp and the operation payload, and either
//! mutates the aggregate into its next committed state or returns an error
//! that aborts the transaction without writing. None of them read anything
//! outside their arguments, so a store may run them any number of times.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{
    config::EngineConfig,
    estimate,
    types::{ClientId, ClientStatus, Queue, QueueClient, QueueStatus, UserId},
    QueueError, QueueResult,
};

/// Client-supplied admission payload
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Admission {
    pub user_id: UserId,
    pub user_name: String,
    pub user_phone: String,
}

impl Admission {
    pub fn new(
        user_id: impl Into<UserId>,
        user_name: impl Into<String>,
        user_phone: impl Into<String>,
    ) -> Self {
        Self {
            user_id: user_id.into(),
            user_name: user_name.into(),
            user_phone: user_phone.into(),
        }
    }

    fn validate(&self) -> QueueResult<()> {
        if self.user_id.as_str().trim().is_empty() {
            return Err(QueueError::InvalidInput("user id must not be empty".to_string()));
        }
        if self.user_name.trim().is_empty() {
            return Err(QueueError::InvalidInput("user name must not be empty".to_string()));
        }
        Ok(())
    }
}

/// What a committed call-next did
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CallOutcome {
    /// Entries removed as served, with `served_at` stamped
    pub served: Vec<QueueClient>,
    /// Entry promoted to the called slot
    pub called: Option<QueueClient>,
    /// Ticket counter after the transition
    pub current_number: u64,
}

impl CallOutcome {
    pub fn is_noop(&self) -> bool {
        self.served.is_empty() && self.called.is_none()
    }
}

/// What a committed leave did
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LeaveOutcome {
    /// Removed entry; its status is `Served` when credited, `Cancelled` otherwise
    pub removed: Option<QueueClient>,
    /// Transaction time of the removal
    pub left_at: Option<DateTime<Utc>>,
}

impl LeaveOutcome {
    pub fn credited(&self) -> bool {
        self.removed
            .as_ref()
            .is_some_and(|c| c.status == ClientStatus::Served)
    }
}

/// What a committed status change did
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StatusChange {
    pub from: QueueStatus,
    pub to: QueueStatus,
}

impl StatusChange {
    pub fn changed(&self) -> bool {
        self.from != self.to
    }
}

/// Append a waiting entry at the back of the roster.
pub fn join(
    queue: &mut Queue,
    admission: &Admission,
    client_id: ClientId,
    now: DateTime<Utc>,
    config: &EngineConfig,
) -> QueueResult<QueueClient> {
    admission.validate()?;

    if config.enforce_status && !queue.status.accepts_admission() {
        return Err(QueueError::InvalidState {
            status: queue.status,
            operation: "join",
        });
    }

    if config.reject_duplicates && queue.entry_for(&admission.user_id).is_some() {
        return Err(QueueError::AlreadyInQueue {
            user_id: admission.user_id.clone(),
        });
    }

    if let Some(max) = config.max_roster_size {
        if queue.roster.len() >= max {
            return Err(QueueError::QueueFull { max });
        }
    }

    let position = queue.roster.len() as u32 + 1;
    let estimated_at = estimate::estimate_at(now, position, queue.estimated_wait_time)?;

    let client = QueueClient {
        id: client_id,
        user_id: admission.user_id.clone(),
        user_name: admission.user_name.clone(),
        user_phone: admission.user_phone.clone(),
        position,
        joined_at: now,
        called_at: None,
        served_at: None,
        estimated_time: estimate::render_clock(estimated_at, config.utc_offset()),
        estimated_at,
        status: ClientStatus::Waiting,
    };

    queue.roster.push(client.clone());
    Ok(client)
}

/// Serve the current called entry (if any) and promote the new front.
///
/// Issuing call-next is how staff both finish the current client and
/// summon the next one, so the previously called entry is taken as served.
pub fn call_next(
    queue: &mut Queue,
    now: DateTime<Utc>,
    config: &EngineConfig,
) -> QueueResult<CallOutcome> {
    if config.enforce_status && !queue.status.accepts_calls() {
        return Err(QueueError::InvalidState {
            status: queue.status,
            operation: "call next",
        });
    }

    let mut outcome = CallOutcome::default();

    for client in queue.roster.iter_mut().filter(|c| c.is_called()) {
        client.status = ClientStatus::Served;
        client.served_at = Some(now);
        outcome.served.push(client.clone());
    }

    let promoted = match queue
        .roster
        .iter_mut()
        .find(|c| c.status != ClientStatus::Served)
    {
        Some(front) if front.is_waiting() => {
            front.status = ClientStatus::Called;
            front.called_at = Some(now);
            Some(front.id.clone())
        }
        _ => None,
    };

    queue.roster.retain(|c| c.status != ClientStatus::Served);
    queue.renumber();
    queue.credit_served(outcome.served.len() as u64);

    if config.refresh_estimates {
        estimate::refresh_waiting(queue, now, config.utc_offset())?;
    }

    outcome.current_number = queue.current_number;
    outcome.called = promoted.and_then(|id| queue.roster.iter().find(|c| c.id == id).cloned());
    Ok(outcome)
}

/// Remove the first entry of `user_id`; a called entry is credited as served.
pub fn leave(
    queue: &mut Queue,
    user_id: &UserId,
    now: DateTime<Utc>,
    config: &EngineConfig,
) -> QueueResult<LeaveOutcome> {
    let Some(index) = queue.roster.iter().position(|c| &c.user_id == user_id) else {
        return Ok(LeaveOutcome::default());
    };

    let mut removed = queue.roster.remove(index);
    if removed.is_called() {
        removed.status = ClientStatus::Served;
        removed.served_at = Some(now);
        queue.credit_served(1);
    } else {
        removed.status = ClientStatus::Cancelled;
    }

    queue.renumber();

    if config.refresh_estimates {
        estimate::refresh_waiting(queue, now, config.utc_offset())?;
    }

    Ok(LeaveOutcome {
        removed: Some(removed),
        left_at: Some(now),
    })
}

/// Toggle the queue status; no roster side effects.
pub fn set_status(
    queue: &mut Queue,
    status: QueueStatus,
    config: &EngineConfig,
) -> QueueResult<StatusChange> {
    let from = queue.status;
    if config.enforce_status && from.is_terminal() && status != from {
        return Err(QueueError::InvalidState {
            status: from,
            operation: "reopen",
        });
    }

    queue.status = status;
    Ok(StatusChange { from, to: status })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{NewQueue, QueueId};
    use chrono::{Duration, TimeZone};

    fn t0() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 3, 4, 9, 0, 0).unwrap()
    }

    fn open_queue(wait: u32) -> Queue {
        Queue::new(
            QueueId::from("q1"),
            NewQueue {
                service_id: "consult".to_string(),
                organization_id: "clinic".to_string(),
                estimated_wait_time: wait,
            },
            t0(),
        )
    }

    fn admit(queue: &mut Queue, user: &str, config: &EngineConfig) -> QueueClient {
        join(
            queue,
            &Admission::new(user, user.to_uppercase(), "555-0100"),
            ClientId::from(format!("c-{user}")),
            t0(),
            config,
        )
        .unwrap()
    }

    #[test]
    fn join_estimates_linear_offset() {
        let config = EngineConfig::default();
        let mut queue = open_queue(10);
        admit(&mut queue, "a", &config);
        admit(&mut queue, "b", &config);

        let c = admit(&mut queue, "c", &config);
        assert_eq!(c.position, 3);
        assert_eq!(c.estimated_at - t0(), Duration::minutes(30));
        assert_eq!(c.estimated_time, "09:30");
        assert_eq!(c.status, ClientStatus::Waiting);
        assert!(queue.check_invariants().is_ok());
    }

    #[test]
    fn call_next_two_step() {
        let config = EngineConfig::default();
        let mut queue = open_queue(10);
        admit(&mut queue, "a", &config);
        admit(&mut queue, "b", &config);

        let first = call_next(&mut queue, t0(), &config).unwrap();
        assert!(first.served.is_empty());
        assert_eq!(first.called.as_ref().map(|c| c.id.as_str()), Some("c-a"));
        assert_eq!(queue.roster[0].status, ClientStatus::Called);
        assert_eq!(queue.roster[1].status, ClientStatus::Waiting);
        assert_eq!(queue.roster[1].position, 2);
        assert_eq!(queue.total_served, 0);

        let later = t0() + Duration::minutes(12);
        let second = call_next(&mut queue, later, &config).unwrap();
        assert_eq!(second.served.len(), 1);
        assert_eq!(second.served[0].served_at, Some(later));
        assert_eq!(queue.total_served, 1);
        assert_eq!(queue.current_number, 1);
        assert_eq!(queue.len(), 1);
        assert_eq!(queue.roster[0].id.as_str(), "c-b");
        assert_eq!(queue.roster[0].status, ClientStatus::Called);
        assert_eq!(queue.roster[0].position, 1);
        assert_eq!(queue.roster[0].called_at, Some(later));
        assert!(queue.check_invariants().is_ok());
    }

    #[test]
    fn call_next_on_empty_roster_is_noop() {
        let config = EngineConfig::default();
        let mut queue = open_queue(10);
        let before = queue.clone();

        let outcome = call_next(&mut queue, t0(), &config).unwrap();
        assert!(outcome.is_noop());
        assert_eq!(queue, before);
    }

    #[test]
    fn call_next_drains_last_called_client() {
        let config = EngineConfig::default();
        let mut queue = open_queue(5);
        admit(&mut queue, "a", &config);
        call_next(&mut queue, t0(), &config).unwrap();

        let outcome = call_next(&mut queue, t0(), &config).unwrap();
        assert_eq!(outcome.served.len(), 1);
        assert!(outcome.called.is_none());
        assert!(queue.is_empty());
        assert_eq!(queue.total_served, 1);
    }

    #[test]
    fn leave_while_called_is_credited() {
        let config = EngineConfig::default();
        let mut queue = open_queue(10);
        admit(&mut queue, "c", &config);
        admit(&mut queue, "d", &config);
        call_next(&mut queue, t0(), &config).unwrap();

        let outcome = leave(&mut queue, &UserId::from("c"), t0(), &config).unwrap();
        assert!(outcome.credited());
        assert_eq!(outcome.removed.unwrap().served_at, Some(t0()));
        assert_eq!(queue.total_served, 1);
        assert_eq!(queue.current_number, 1);
        assert_eq!(queue.roster[0].position, 1);
        assert!(queue.check_invariants().is_ok());
    }

    #[test]
    fn leave_while_waiting_shifts_later_entries() {
        let config = EngineConfig::default();
        let mut queue = open_queue(10);
        for user in ["a", "d", "e", "f"] {
            admit(&mut queue, user, &config);
        }

        let outcome = leave(&mut queue, &UserId::from("d"), t0(), &config).unwrap();
        let removed = outcome.removed.unwrap();
        assert_eq!(removed.status, ClientStatus::Cancelled);
        assert!(removed.served_at.is_none());
        assert_eq!(queue.total_served, 0);

        let ids: Vec<(&str, u32)> = queue
            .roster
            .iter()
            .map(|c| (c.id.as_str(), c.position))
            .collect();
        assert_eq!(ids, vec![("c-a", 1), ("c-e", 2), ("c-f", 3)]);
    }

    #[test]
    fn leave_unknown_user_is_noop() {
        let config = EngineConfig::default();
        let mut queue = open_queue(10);
        admit(&mut queue, "a", &config);
        let before = queue.clone();

        let outcome = leave(&mut queue, &UserId::from("ghost"), t0(), &config).unwrap();
        assert!(outcome.removed.is_none());
        assert_eq!(queue, before);
    }

    #[test]
    fn leave_removes_only_first_duplicate() {
        let config = EngineConfig::permissive();
        let mut queue = open_queue(10);
        admit(&mut queue, "a", &config);
        admit(&mut queue, "a", &config);

        leave(&mut queue, &UserId::from("a"), t0(), &config).unwrap();
        assert_eq!(queue.len(), 1);
        assert_eq!(queue.roster[0].position, 1);
    }

    #[test]
    fn guards_reject_admission() {
        let mut config = EngineConfig {
            max_roster_size: Some(2),
            ..EngineConfig::default()
        };
        let mut queue = open_queue(10);
        admit(&mut queue, "a", &config);

        let dup = join(&mut queue, &Admission::new("a", "A", ""), ClientId::new(), t0(), &config);
        assert!(matches!(dup, Err(QueueError::AlreadyInQueue { .. })));

        admit(&mut queue, "b", &config);
        let full = join(&mut queue, &Admission::new("c", "C", ""), ClientId::new(), t0(), &config);
        assert_eq!(full, Err(QueueError::QueueFull { max: 2 }));

        config.max_roster_size = None;
        queue.status = QueueStatus::Paused;
        let paused = join(&mut queue, &Admission::new("c", "C", ""), ClientId::new(), t0(), &config);
        assert!(matches!(paused, Err(QueueError::InvalidState { status: QueueStatus::Paused, .. })));

        let blank = join(&mut queue, &Admission::new("", "C", ""), ClientId::new(), t0(), &config);
        assert!(matches!(blank, Err(QueueError::InvalidInput(_))));
    }

    #[test]
    fn permissive_config_admits_anywhere() {
        let config = EngineConfig::permissive();
        let mut queue = open_queue(10);
        queue.status = QueueStatus::Closed;
        admit(&mut queue, "a", &config);
        admit(&mut queue, "a", &config);
        assert_eq!(queue.len(), 2);
        assert!(call_next(&mut queue, t0(), &config).is_ok());
    }

    #[test]
    fn paused_queue_can_still_be_drained() {
        let config = EngineConfig::default();
        let mut queue = open_queue(10);
        admit(&mut queue, "a", &config);
        set_status(&mut queue, QueueStatus::Paused, &config).unwrap();

        let outcome = call_next(&mut queue, t0(), &config).unwrap();
        assert!(outcome.called.is_some());

        set_status(&mut queue, QueueStatus::Closed, &config).unwrap();
        assert!(matches!(
            call_next(&mut queue, t0(), &config),
            Err(QueueError::InvalidState { status: QueueStatus::Closed, .. })
        ));
    }

    #[test]
    fn closed_is_terminal_when_enforced() {
        let config = EngineConfig::default();
        let mut queue = open_queue(10);
        set_status(&mut queue, QueueStatus::Closed, &config).unwrap();

        assert!(set_status(&mut queue, QueueStatus::Open, &config).is_err());
        let same = set_status(&mut queue, QueueStatus::Closed, &config).unwrap();
        assert!(!same.changed());
    }

    #[test]
    fn closed_can_reopen_when_permissive() {
        let config = EngineConfig::permissive();
        let mut queue = open_queue(10);
        set_status(&mut queue, QueueStatus::Closed, &config).unwrap();

        let change = set_status(&mut queue, QueueStatus::Open, &config).unwrap();
        assert_eq!(change.from, QueueStatus::Closed);
        assert_eq!(queue.status, QueueStatus::Open);
    }

    #[test]
    fn join_with_unrepresentable_estimate_aborts() {
        let config = EngineConfig::default();
        let mut queue = open_queue(u32::MAX);
        let before = queue.clone();

        let result = join(
            &mut queue,
            &Admission::new("a", "A", ""),
            ClientId::from("c-a"),
            t0(),
            &config,
        );
        // Position 1 still fits: one unit of ~8k years
        assert!(result.is_ok());

        for n in 0..40 {
            let _ = join(
                &mut queue,
                &Admission::new(format!("u{n}").as_str(), "U", ""),
                ClientId::from(format!("c-{n}")),
                t0(),
                &config,
            );
        }
        assert!(queue.len() < 41);
        assert!(queue.len() > before.len());
        assert!(queue.check_invariants().is_ok());
        let overflow = join(
            &mut queue,
            &Admission::new("late", "Late", ""),
            ClientId::from("c-late"),
            t0(),
            &config,
        );
        assert!(matches!(overflow, Err(QueueError::InvalidInput(_))));
    }

    #[test]
    fn refresh_recomputes_waiting_estimates() {
        let config = EngineConfig {
            refresh_estimates: true,
            ..EngineConfig::default()
        };
        let mut queue = open_queue(10);
        for user in ["a", "b", "c"] {
            admit(&mut queue, user, &config);
        }
        assert_eq!(queue.roster[2].estimated_time, "09:30");

        let later = t0() + Duration::minutes(5);
        leave(&mut queue, &UserId::from("a"), later, &config).unwrap();
        assert_eq!(queue.roster[1].estimated_time, "09:25");

        call_next(&mut queue, later, &config).unwrap();
        assert_eq!(queue.roster[0].status, ClientStatus::Called);
        assert_eq!(queue.roster[1].estimated_at, later + Duration::minutes(20));
    }

    #[test]
    fn snapshot_estimates_are_kept_by_default() {
        let config = EngineConfig::default();
        let mut queue = open_queue(10);
        admit(&mut queue, "a", &config);
        admit(&mut queue, "b", &config);

        leave(&mut queue, &UserId::from("a"), t0() + Duration::minutes(5), &config).unwrap();
        assert_eq!(queue.roster[0].estimated_time, "09:20");
    }
}
