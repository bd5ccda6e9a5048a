use rusqlite::Connection;
use uuid::Uuid;

use crate::db::queries;
use crate::errors::AppError;
use crate::models::{EntryStatus, Queue, QueueEntry};

/// How many recent served entries feed the observed per-person service time.
const SERVICE_TIME_SAMPLE: i64 = 10;

#[derive(Debug, thiserror::Error)]
pub enum LedgerError {
    #[error("queue not found")]
    QueueNotFound,

    #[error("queue is paused")]
    QueuePaused,

    #[error("queue is full")]
    QueueFull,

    #[error("already in this queue")]
    AlreadyQueued,

    #[error("no waiting entries")]
    NoWaitingEntries,

    #[error("entry not found")]
    EntryNotFound,

    #[error("entry is {from}, cannot become {to}")]
    InvalidTransition {
        from: &'static str,
        to: &'static str,
    },

    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

impl From<LedgerError> for AppError {
    fn from(e: LedgerError) -> Self {
        match e {
            LedgerError::QueueNotFound
            | LedgerError::EntryNotFound
            | LedgerError::NoWaitingEntries => AppError::NotFound(e.to_string()),
            LedgerError::QueuePaused
            | LedgerError::QueueFull
            | LedgerError::AlreadyQueued
            | LedgerError::InvalidTransition { .. } => AppError::Conflict(e.to_string()),
            LedgerError::Internal(e) => AppError::Internal(e),
        }
    }
}

#[derive(Debug, Default)]
pub struct NewEntry {
    pub customer_id: Option<String>,
    pub guest_name: Option<String>,
    pub guest_email: Option<String>,
    pub guest_phone: Option<String>,
}

/// Append a new entry to the queue ledger.
///
/// Rejects joins against inactive, paused or full queues, and duplicate
/// active entries for the same customer. The assigned position is one
/// greater than any position ever issued in the queue, so positions are
/// unique and join order equals position order.
pub fn join_queue(
    conn: &Connection,
    queue_id: &str,
    who: NewEntry,
) -> Result<QueueEntry, LedgerError> {
    let queue = queries::get_queue(conn, queue_id)?
        .filter(|q| q.is_active)
        .ok_or(LedgerError::QueueNotFound)?;

    if queue.is_paused {
        return Err(LedgerError::QueuePaused);
    }

    let active = queries::active_entry_count(conn, queue_id)?;
    if active >= queue.max_capacity {
        return Err(LedgerError::QueueFull);
    }

    if let Some(customer_id) = who.customer_id.as_deref() {
        if queries::get_customer_active_entry(conn, queue_id, customer_id)?.is_some() {
            return Err(LedgerError::AlreadyQueued);
        }
    }

    let position = queries::next_position(conn, queue_id)?;
    let ahead = queries::people_ahead(conn, queue_id, position)?;
    let estimate = estimate_wait(conn, &queue, ahead)?;

    let entry = QueueEntry {
        id: Uuid::new_v4().to_string(),
        queue_id: queue_id.to_string(),
        customer_id: who.customer_id,
        guest_name: who.guest_name,
        guest_email: who.guest_email,
        guest_phone: who.guest_phone,
        position,
        status: EntryStatus::Waiting,
        estimated_wait_time: Some(estimate),
        joined_at: queries::now_ts(),
        called_at: None,
        served_at: None,
    };
    queries::insert_entry(conn, &entry)?;

    Ok(entry)
}

/// Promote the earliest waiting entry to called.
pub fn call_next(conn: &Connection, queue_id: &str) -> Result<QueueEntry, LedgerError> {
    let queue = queries::get_queue(conn, queue_id)?
        .filter(|q| q.is_active)
        .ok_or(LedgerError::QueueNotFound)?;

    let entry = queries::get_first_waiting_entry(conn, &queue.id)?
        .ok_or(LedgerError::NoWaitingEntries)?;

    transition(conn, &entry.id, EntryStatus::Called)
}

/// Move an entry through the status machine, stamping called_at/served_at.
pub fn transition(
    conn: &Connection,
    entry_id: &str,
    next: EntryStatus,
) -> Result<QueueEntry, LedgerError> {
    let entry = queries::get_entry(conn, entry_id)?.ok_or(LedgerError::EntryNotFound)?;

    if !entry.status.can_become(next) {
        return Err(LedgerError::InvalidTransition {
            from: entry.status.as_str(),
            to: next.as_str(),
        });
    }

    queries::set_entry_status(conn, entry_id, next)?;

    queries::get_entry(conn, entry_id)?.ok_or(LedgerError::EntryNotFound)
}

/// Estimated minutes until service for someone with `people_ahead`
/// waiting entries in front of them.
///
/// Uses the observed called-to-served interval of recent serves when the
/// queue has history, otherwise the queue's configured per-person minutes.
pub fn estimate_wait(conn: &Connection, queue: &Queue, people_ahead: i64) -> anyhow::Result<i64> {
    let per_person = match queries::avg_service_minutes(conn, &queue.id, SERVICE_TIME_SAMPLE)? {
        Some(observed) if observed > 0.0 => observed,
        _ => queue.average_wait_time as f64,
    };
    Ok((people_ahead as f64 * per_person).round() as i64)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db;
    use crate::models::{Account, AccountKind, Company};
    use rusqlite::params;

    fn setup() -> (Connection, String) {
        let conn = db::init_db(":memory:").unwrap();

        let account = Account {
            id: "comp-1".to_string(),
            email: "shop@example.com".to_string(),
            password_hash: "x".to_string(),
            kind: AccountKind::Company,
        };
        queries::create_account(&conn, &account).unwrap();

        let now = queries::now_ts();
        let company = Company {
            id: "comp-1".to_string(),
            name: "Test Shop".to_string(),
            email: "shop@example.com".to_string(),
            phone: None,
            address: None,
            logo_url: None,
            avatar_type: "default".to_string(),
            qr_code: "COMP_test".to_string(),
            created_at: now.clone(),
            updated_at: now.clone(),
        };
        queries::create_company(&conn, &company).unwrap();

        let queue = Queue {
            id: "queue-1".to_string(),
            company_id: "comp-1".to_string(),
            name: "Front Desk".to_string(),
            description: None,
            average_wait_time: 5,
            is_active: true,
            is_paused: false,
            max_capacity: 3,
            created_at: now.clone(),
            updated_at: now,
        };
        queries::create_queue(&conn, &queue).unwrap();

        (conn, "queue-1".to_string())
    }

    fn guest(name: &str) -> NewEntry {
        NewEntry {
            guest_name: Some(name.to_string()),
            ..NewEntry::default()
        }
    }

    #[test]
    fn test_join_assigns_sequential_positions() {
        let (conn, queue_id) = setup();

        let a = join_queue(&conn, &queue_id, guest("Alice")).unwrap();
        let b = join_queue(&conn, &queue_id, guest("Bob")).unwrap();

        assert_eq!(a.position, 1);
        assert_eq!(b.position, 2);
        assert_eq!(a.status, EntryStatus::Waiting);
        assert_eq!(a.estimated_wait_time, Some(0));
        // one person ahead at 5 min/person
        assert_eq!(b.estimated_wait_time, Some(5));
    }

    #[test]
    fn test_positions_are_never_reused() {
        let (conn, queue_id) = setup();

        let a = join_queue(&conn, &queue_id, guest("Alice")).unwrap();
        transition(&conn, &a.id, EntryStatus::Cancelled).unwrap();

        let b = join_queue(&conn, &queue_id, guest("Bob")).unwrap();
        assert_eq!(b.position, 2);
    }

    #[test]
    fn test_join_unknown_queue() {
        let (conn, _) = setup();
        let err = join_queue(&conn, "nope", guest("Alice")).unwrap_err();
        assert!(matches!(err, LedgerError::QueueNotFound));
    }

    #[test]
    fn test_join_paused_queue() {
        let (conn, queue_id) = setup();
        conn.execute("UPDATE queues SET is_paused = 1 WHERE id = ?1", params![queue_id])
            .unwrap();

        let err = join_queue(&conn, &queue_id, guest("Alice")).unwrap_err();
        assert!(matches!(err, LedgerError::QueuePaused));
    }

    #[test]
    fn test_join_inactive_queue_is_not_found() {
        let (conn, queue_id) = setup();
        conn.execute("UPDATE queues SET is_active = 0 WHERE id = ?1", params![queue_id])
            .unwrap();

        let err = join_queue(&conn, &queue_id, guest("Alice")).unwrap_err();
        assert!(matches!(err, LedgerError::QueueNotFound));
    }

    #[test]
    fn test_join_full_queue() {
        let (conn, queue_id) = setup();

        // max_capacity is 3
        for name in ["Alice", "Bob", "Carol"] {
            join_queue(&conn, &queue_id, guest(name)).unwrap();
        }
        let err = join_queue(&conn, &queue_id, guest("Dave")).unwrap_err();
        assert!(matches!(err, LedgerError::QueueFull));
    }

    #[test]
    fn test_serving_frees_capacity() {
        let (conn, queue_id) = setup();

        for name in ["Alice", "Bob", "Carol"] {
            join_queue(&conn, &queue_id, guest(name)).unwrap();
        }
        let called = call_next(&conn, &queue_id).unwrap();
        transition(&conn, &called.id, EntryStatus::Served).unwrap();

        let d = join_queue(&conn, &queue_id, guest("Dave")).unwrap();
        assert_eq!(d.position, 4);
    }

    #[test]
    fn test_duplicate_customer_join_rejected() {
        let (conn, queue_id) = setup();

        queries::create_account(
            &conn,
            &Account {
                id: "cust-1".to_string(),
                email: "alice@example.com".to_string(),
                password_hash: "x".to_string(),
                kind: AccountKind::Customer,
            },
        )
        .unwrap();
        conn.execute(
            "INSERT INTO customers (id, first_name, last_name, qr_code) VALUES ('cust-1', 'Alice', 'A', 'USER_test')",
            [],
        )
        .unwrap();

        let who = NewEntry {
            customer_id: Some("cust-1".to_string()),
            ..NewEntry::default()
        };
        join_queue(&conn, &queue_id, who).unwrap();

        let again = NewEntry {
            customer_id: Some("cust-1".to_string()),
            ..NewEntry::default()
        };
        let err = join_queue(&conn, &queue_id, again).unwrap_err();
        assert!(matches!(err, LedgerError::AlreadyQueued));
    }

    #[test]
    fn test_call_next_takes_lowest_position() {
        let (conn, queue_id) = setup();

        let a = join_queue(&conn, &queue_id, guest("Alice")).unwrap();
        join_queue(&conn, &queue_id, guest("Bob")).unwrap();

        let called = call_next(&conn, &queue_id).unwrap();
        assert_eq!(called.id, a.id);
        assert_eq!(called.status, EntryStatus::Called);
        assert!(called.called_at.is_some());
    }

    #[test]
    fn test_call_next_skips_cancelled() {
        let (conn, queue_id) = setup();

        let a = join_queue(&conn, &queue_id, guest("Alice")).unwrap();
        let b = join_queue(&conn, &queue_id, guest("Bob")).unwrap();
        transition(&conn, &a.id, EntryStatus::Cancelled).unwrap();

        let called = call_next(&conn, &queue_id).unwrap();
        assert_eq!(called.id, b.id);
    }

    #[test]
    fn test_call_next_empty_queue() {
        let (conn, queue_id) = setup();
        let err = call_next(&conn, &queue_id).unwrap_err();
        assert!(matches!(err, LedgerError::NoWaitingEntries));
    }

    #[test]
    fn test_served_entry_is_terminal() {
        let (conn, queue_id) = setup();

        let a = join_queue(&conn, &queue_id, guest("Alice")).unwrap();
        let called = call_next(&conn, &queue_id).unwrap();
        let served = transition(&conn, &called.id, EntryStatus::Served).unwrap();
        assert!(served.served_at.is_some());

        let err = transition(&conn, &a.id, EntryStatus::Cancelled).unwrap_err();
        assert!(matches!(err, LedgerError::InvalidTransition { .. }));
    }

    #[test]
    fn test_called_cannot_go_back_to_waiting() {
        let (conn, queue_id) = setup();

        join_queue(&conn, &queue_id, guest("Alice")).unwrap();
        let called = call_next(&conn, &queue_id).unwrap();

        let err = transition(&conn, &called.id, EntryStatus::Waiting).unwrap_err();
        assert!(matches!(err, LedgerError::InvalidTransition { .. }));
    }

    #[test]
    fn test_estimate_uses_configured_average_without_history() {
        let (conn, queue_id) = setup();
        let queue = queries::get_queue(&conn, &queue_id).unwrap().unwrap();

        assert_eq!(estimate_wait(&conn, &queue, 3).unwrap(), 15);
        assert_eq!(estimate_wait(&conn, &queue, 0).unwrap(), 0);
    }

    #[test]
    fn test_estimate_uses_observed_service_times() {
        let (conn, queue_id) = setup();
        let queue = queries::get_queue(&conn, &queue_id).unwrap().unwrap();

        // Two serves taking 10 minutes each.
        conn.execute_batch(
            "INSERT INTO queue_entries (id, queue_id, position, status, called_at, served_at)
             VALUES ('e1', 'queue-1', 1, 'served', '2026-08-25 10:00:00', '2026-08-25 10:10:00');
             INSERT INTO queue_entries (id, queue_id, position, status, called_at, served_at)
             VALUES ('e2', 'queue-1', 2, 'served', '2026-08-25 10:10:00', '2026-08-25 10:20:00');",
        )
        .unwrap();

        assert_eq!(estimate_wait(&conn, &queue, 2).unwrap(), 20);
    }
}
